//! HTTP surface for live subscribers.
//!
//! This module provides an HTTP server that:
//! - Streams every hub event to each client of GET /events (server-sent events)
//! - Returns the latest smoothed sample from GET /latest
//! - Reports health and pipeline counters
//!
//! # Architecture
//!
//! ```text
//! producer thread ──→ BroadcastHub ──→ Subscriber queue ──→ GET /events (one per client)
//!                          │
//!                          └──→ latest sample ──→ GET /latest
//! ```

use crate::hub::{BroadcastHub, Event, Sample, Subscriber};
use crate::stats::{SharedStats, StatsSnapshot};
use axum::{
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_stream::Stream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

/// Interval between SSE keep-alive comments.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind: IpAddr,
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Directory served for paths the API does not handle
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(bind: IpAddr, port: u16) -> Self {
        Self {
            bind,
            port,
            static_dir: None,
        }
    }

    /// Serve files from `dir` as a fallback.
    pub fn with_static_dir(mut self, dir: PathBuf) -> Self {
        self.static_dir = Some(dir);
        self
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            bind: config.bind,
            port: config.port,
            static_dir: config.static_dir.clone(),
        }
    }
}

/// Shared server state
pub struct ServerState {
    hub: Arc<BroadcastHub>,
    stats: SharedStats,
}

/// A push stream for one client, bound to one hub subscription.
///
/// The subscription is released when the stream is dropped, which axum does
/// as soon as the client disconnects. The stream ends when the hub closes
/// the queue.
pub struct EventStream {
    hub: Arc<BroadcastHub>,
    subscriber: Subscriber,
}

impl EventStream {
    /// Subscribe to `hub` and wrap the subscription.
    pub fn open(hub: Arc<BroadcastHub>) -> Self {
        let subscriber = hub.subscribe();
        Self { hub, subscriber }
    }

    pub fn subscriber(&self) -> &Subscriber {
        &self.subscriber
    }
}

impl Stream for EventStream {
    type Item = Result<SseEvent, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match ready!(this.subscriber.poll_recv(cx)) {
                Some(event) => match to_sse(&event) {
                    Ok(sse) => return Poll::Ready(Some(Ok(sse))),
                    Err(e) => {
                        tracing::warn!(error = %e, kind = event.kind(), "failed to encode event");
                    }
                },
                None => return Poll::Ready(None),
            }
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.hub.unsubscribe(&self.subscriber);
    }
}

/// Encode one hub event as an SSE message.
pub fn to_sse(event: &Event) -> Result<SseEvent, axum::Error> {
    SseEvent::default().json_data(event)
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Stats response
#[derive(Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    pub active_subscribers: usize,
    pub subscriber_capacity: usize,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /events
async fn events(State(state): State<Arc<ServerState>>) -> Sse<EventStream> {
    let stream = EventStream::open(state.hub.clone());
    tracing::info!(subscriber = %stream.subscriber().id(), "stream opened");
    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

/// GET /latest
async fn latest(State(state): State<Arc<ServerState>>) -> Json<Sample> {
    Json(state.hub.snapshot())
}

/// GET /stats
async fn pipeline_stats(State(state): State<Arc<ServerState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        stats: state.stats.stats(),
        active_subscribers: state.hub.subscriber_count(),
        subscriber_capacity: state.hub.capacity(),
    })
}

/// Build the router without binding it.
pub fn router(config: &ServerConfig, hub: Arc<BroadcastHub>, stats: SharedStats) -> Router {
    let state = Arc::new(ServerState { hub, stats });

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/events", get(events))
        .route("/latest", get(latest))
        .route("/stats", get(pipeline_stats));

    if let Some(ref dir) = config.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
///
/// Sending on the returned channel closes every subscriber and shuts the
/// server down gracefully.
pub async fn run(
    config: ServerConfig,
    hub: Arc<BroadcastHub>,
    stats: SharedStats,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(&config, hub.clone(), stats);

    let addr = SocketAddr::new(config.bind, config.port);
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("accel-stream server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
                // Open streams only end once their queues close.
                hub.close_all();
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::TapEvent;
    use crate::stats::create_shared_stats;
    use std::future::poll_fn;

    fn hub() -> Arc<BroadcastHub> {
        Arc::new(BroadcastHub::new(8, create_shared_stats()))
    }

    async fn next(stream: &mut EventStream) -> Option<Result<SseEvent, Infallible>> {
        poll_fn(|cx| Pin::new(&mut *stream).poll_next(cx)).await
    }

    #[tokio::test]
    async fn test_stream_forwards_in_order_and_unsubscribes_on_drop() {
        let hub = hub();
        let mut stream = EventStream::open(hub.clone());
        assert_eq!(hub.subscriber_count(), 1);

        hub.broadcast(Event::Data(Sample::new(0.0, 0.0, 1.0, 1)));
        hub.broadcast(Event::Tap(TapEvent::new(1)));

        assert!(next(&mut stream).await.is_some());
        assert!(next(&mut stream).await.is_some());

        drop(stream);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_ends_when_hub_closes() {
        let hub = hub();
        let mut stream = EventStream::open(hub.clone());

        hub.close_all();
        assert!(next(&mut stream).await.is_none());
        drop(stream);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_opened_after_close_ends_immediately() {
        let hub = hub();
        hub.close_all();

        let mut stream = EventStream::open(hub.clone());
        assert_eq!(hub.subscriber_count(), 0);
        hub.broadcast(Event::Data(Sample::new(0.0, 0.0, 1.0, 1)));
        assert!(next(&mut stream).await.is_none());
    }
}
