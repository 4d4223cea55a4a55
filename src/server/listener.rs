use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span};

use crate::http::connection::Connection;
use crate::http::handler::Handler;
use crate::http::limits::Limits;

/// Pause between a failed accept and the next attempt.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Default)]
struct Shutdown {
    closed: AtomicBool,
    wake: Notify,
}

/// A running listener and its accept loop.
///
/// Each accepted connection runs on its own task. [`Server::close`] stops
/// accepting and closes the listening socket; connections already accepted
/// run to completion.
pub struct Server {
    local_addr: SocketAddr,
    shutdown: Arc<Shutdown>,
    accept_loop: JoinHandle<()>,
}

impl Server {
    /// Listens on `port` on all interfaces with default limits.
    pub async fn serve<H: Handler>(port: u16, handler: H) -> anyhow::Result<Self> {
        Self::serve_with_limits(port, handler, Limits::default()).await
    }

    pub async fn serve_with_limits<H: Handler>(
        port: u16,
        handler: H,
        limits: Limits,
    ) -> anyhow::Result<Self> {
        Self::bind((Ipv4Addr::UNSPECIFIED, port), handler, limits).await
    }

    pub async fn bind<A, H>(addr: A, handler: H, limits: Limits) -> anyhow::Result<Self>
    where
        A: ToSocketAddrs,
        H: Handler,
    {
        let listener = TcpListener::bind(addr)
            .await
            .context("binding listener")?;
        let local_addr = listener.local_addr()?;
        info!("Listening on {}", local_addr);

        let shutdown = Arc::new(Shutdown::default());
        let accept_loop = tokio::spawn(accept_loop(
            listener,
            Arc::new(handler),
            limits,
            Arc::clone(&shutdown),
        ));

        Ok(Self {
            local_addr,
            shutdown,
            accept_loop,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.closed.load(Ordering::Acquire)
    }

    /// Stops accepting, closes the listening socket and waits for the accept
    /// loop to exit.
    pub async fn close(self) -> anyhow::Result<()> {
        self.shutdown.closed.store(true, Ordering::Release);
        self.shutdown.wake.notify_one();
        self.accept_loop.await.context("accept loop panicked")?;
        Ok(())
    }
}

async fn accept_loop<H: Handler>(
    listener: TcpListener,
    handler: Arc<H>,
    limits: Limits,
    shutdown: Arc<Shutdown>,
) {
    loop {
        let accepted = tokio::select! {
            res = listener.accept() => res,
            _ = shutdown.wake.notified() => break,
        };

        let (socket, peer) = match accepted {
            Ok(conn) => conn,
            Err(e) if shutdown.closed.load(Ordering::Acquire) => {
                debug!(error = %e, "accept failed after close");
                break;
            }
            Err(e) => {
                error!(error = %e, "failed to accept connection");
                if !pause_after_accept_error(&shutdown).await {
                    break;
                }
                continue;
            }
        };
        info!("Accepted connection from {}", peer);

        let conn = Connection::new(socket, Arc::clone(&handler), limits.clone());
        tokio::spawn(
            async move {
                if let Err(e) = conn.run().await {
                    error!("Connection error from {}: {:#}", peer, e);
                }
            }
            .instrument(info_span!("connection", %peer)),
        );
    }

    drop(listener);
    info!("Server closed, stopped listening");
}

/// Waits [`ACCEPT_RETRY_DELAY`]. Returns `false` if close was requested
/// meanwhile.
async fn pause_after_accept_error(shutdown: &Shutdown) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(ACCEPT_RETRY_DELAY) => true,
        _ = shutdown.wake.notified() => false,
    }
}
