use courier::config::Config;
use courier::http::handler::Handler;
use courier::http::headers::Headers;
use courier::http::request::Request;
use courier::http::response::StatusCode;
use courier::http::writer::ResponseWriter;
use courier::server::Server;
use tokio::io::AsyncWrite;

const BAD_REQUEST_PAGE: &str = "<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>Your request honestly kinda sucked.</p>
  </body>
</html>";

const SERVER_ERROR_PAGE: &str = "<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Okay, you know what? This one is on me.</p>
  </body>
</html>";

const SUCCESS_PAGE: &str = "<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>";

/// Most chunks `/stream/{n}` will send.
const MAX_STREAM_CHUNKS: usize = 100;

/// Demo routes exercising both body framings.
struct Routes;

impl Handler for Routes {
    async fn handle<W>(&self, w: &mut ResponseWriter<W>, req: &Request) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        match req.target() {
            "/yourproblem" => page(w, StatusCode::BadRequest, BAD_REQUEST_PAGE).await,
            "/myproblem" => page(w, StatusCode::InternalServerError, SERVER_ERROR_PAGE).await,
            target => match target.strip_prefix("/stream/") {
                Some(count) => match count.parse::<usize>() {
                    Ok(n) if n <= MAX_STREAM_CHUNKS => stream(w, n).await,
                    _ => page(w, StatusCode::BadRequest, BAD_REQUEST_PAGE).await,
                },
                None => page(w, StatusCode::Ok, SUCCESS_PAGE).await,
            },
        }
    }
}

async fn page<W>(w: &mut ResponseWriter<W>, status: StatusCode, html: &str) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut headers = Headers::new();
    headers.set("content-type", "text/html");
    headers.set("content-length", &html.len().to_string());
    headers.set("connection", "close");

    w.write_status_line(status).await?;
    w.write_headers(&headers).await?;
    w.write_body(html.as_bytes()).await?;
    Ok(())
}

/// Sends `n` JSON lines as separate chunks, then the total length as a trailer.
async fn stream<W>(w: &mut ResponseWriter<W>, n: usize) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut headers = Headers::new();
    headers.set("content-type", "application/json");
    headers.set("transfer-encoding", "chunked");
    headers.set("trailer", "x-content-length");
    headers.set("connection", "close");

    w.write_status_line(StatusCode::Ok).await?;
    w.write_headers(&headers).await?;

    let mut total = 0;
    for id in 0..n {
        let line = format!("{{\"id\": {}}}\n", id);
        total += w.write_chunk(line.as_bytes()).await?;
    }

    let mut trailers = Headers::new();
    trailers.set("x-content-length", &total.to_string());
    w.write_trailers(&trailers).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let server = Server::serve_with_limits(cfg.port, Routes, cfg.limits).await?;
    tracing::info!("Server started on port {}", cfg.port);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    server.close().await?;
    tracing::info!("Server gracefully stopped");
    Ok(())
}
