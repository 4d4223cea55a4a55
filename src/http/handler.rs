use std::future::Future;

use tokio::io::AsyncWrite;

use crate::http::request::Request;
use crate::http::writer::ResponseWriter;

/// Application code invoked once per parsed request.
///
/// The handler drives `writer` through its states itself. Returning an error
/// before anything was written makes the connection answer with a 500; after
/// that the connection is closed as is.
pub trait Handler: Send + Sync + 'static {
    fn handle<W>(
        &self,
        writer: &mut ResponseWriter<W>,
        request: &Request,
    ) -> impl Future<Output = anyhow::Result<()>> + Send
    where
        W: AsyncWrite + Unpin + Send;
}
