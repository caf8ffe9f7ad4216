//! Connection handling for the REST API
//!
//! Accepts TCP connections and drives each one with hyper directly so that
//! header reads and idle keep-alive connections are bounded, then drains
//! open connections on shutdown within the configured grace period.

use crate::api::AppState;
use axum::Router;
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tower::Service;

use super::router;

#[derive(Clone, Copy, Debug)]
struct ConnectionLimits {
    header_read: Duration,
    idle: Duration,
}

/// Serve until SIGINT/SIGTERM, then drain in-flight requests.
///
/// Fails if draining takes longer than `shutdown_grace`.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_with_shutdown(listener, state, shutdown_signal()).await
}

pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    let limits = ConnectionLimits {
        header_read: state.config.read_timeout,
        idle: state.config.idle_timeout,
    };
    let grace = state.config.shutdown_grace;
    let app = router(state);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    // Every connection task holds a receiver; `closed()` fires once all are gone.
    let (open_tx, open_rx) = watch::channel(());

    tokio::pin!(shutdown);
    loop {
        let (stream, remote) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!("accept failed: {}", e);
                    continue;
                }
            },
            _ = &mut shutdown => break,
        };

        let app = app.clone();
        let shutdown_rx = shutdown_rx.clone();
        let open_rx = open_rx.clone();
        tokio::spawn(async move {
            serve_connection(stream, remote, app, limits, shutdown_rx).await;
            drop(open_rx);
        });
    }

    drop(listener);
    let _ = shutdown_tx.send(true);
    drop(open_rx);

    match tokio::time::timeout(grace, open_tx.closed()).await {
        Ok(()) => {
            tracing::info!("server stopped");
            Ok(())
        }
        Err(_) => {
            tracing::error!("in-flight requests still running after {:?}, forcing shutdown", grace);
            Err(anyhow::anyhow!("graceful shutdown exceeded {:?}", grace))
        }
    }
}

/// Tracks whether a connection is between requests, and since when.
struct Activity {
    in_flight: AtomicUsize,
    idle_since: Mutex<Instant>,
}

impl Activity {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            idle_since: Mutex::new(Instant::now()),
        }
    }

    fn begin(self: &Arc<Self>) -> Busy {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Busy(self.clone())
    }

    fn idle_for(&self) -> Option<Duration> {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            return None;
        }
        self.idle_since.lock().ok().map(|since| since.elapsed())
    }
}

struct Busy(Arc<Activity>);

impl Drop for Busy {
    fn drop(&mut self) {
        if let Ok(mut since) = self.0.idle_since.lock() {
            *since = Instant::now();
        }
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn serve_connection(
    stream: TcpStream,
    remote: SocketAddr,
    app: Router,
    limits: ConnectionLimits,
    mut shutdown: watch::Receiver<bool>,
) {
    let activity = Arc::new(Activity::new());
    let service = {
        let activity = activity.clone();
        hyper::service::service_fn(move |request: Request<Incoming>| {
            let busy = activity.begin();
            let mut app = app.clone();
            async move {
                let response = app.call(request).await;
                drop(busy);
                response
            }
        })
    };

    let mut builder = Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(limits.header_read);
    builder.http2().timer(TokioTimer::new());

    let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let mut idle_check = tokio::time::interval(idle_check_period(limits.idle));
    let mut draining = false;
    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!("connection from {} ended: {}", remote, e);
                }
                break;
            }
            _ = shutdown.changed(), if !draining => {
                conn.as_mut().graceful_shutdown();
                draining = true;
            }
            _ = idle_check.tick(), if !draining => {
                if activity.idle_for().is_some_and(|idle| idle >= limits.idle) {
                    tracing::debug!("closing idle connection from {}", remote);
                    conn.as_mut().graceful_shutdown();
                    draining = true;
                }
            }
        }
    }
}

fn idle_check_period(idle: Duration) -> Duration {
    (idle / 4).max(Duration::from_millis(100))
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
