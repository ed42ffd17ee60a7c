//! Liveness endpoint for the process supervisor.
//!
//! `GET /health` answers `OK` as soon as the listener is bound. It deliberately
//! knows nothing about storage or the chat handshake: the supervisor must see the
//! process as alive while the slower startup stages are still running.

use std::net::SocketAddr;

use axum::{Router, routing};
use tokio::{net::TcpListener, task::JoinHandle};
use tracing::info;

use crate::base::{supervise::spawn_supervised, types::Res};

/// Body returned by the health check.
pub const HEALTH_BODY: &str = "OK";

pub fn router() -> Router {
    Router::new().route("/health", routing::get(health))
}

pub async fn health() -> &'static str {
    HEALTH_BODY
}

/// A bound, serving health endpoint.
///
/// The serving task lives for the rest of the process; dropping this handle does
/// not stop it.
pub struct HealthServer {
    addr: SocketAddr,
    _task: JoinHandle<()>,
}

impl HealthServer {
    /// Binds `0.0.0.0:port` and starts serving.
    pub async fn bind(port: u16) -> Res<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        Self::serve(listener)
    }

    /// Starts serving on an already bound listener.
    pub fn serve(listener: TcpListener) -> Res<Self> {
        let addr = listener.local_addr()?;

        let task = spawn_supervised("health", async move {
            axum::serve(listener, router()).await?;
            Ok(())
        });

        info!("Health endpoint listening on {}.", addr);

        Ok(Self { addr, _task: task })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt; // for `collect`
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tower::ServiceExt; // for `oneshot`

    #[tokio::test]
    async fn health_reports_ok() {
        let response = router().oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn other_paths_are_not_found() {
        let response = router().oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap()).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn responds_immediately_after_binding() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let server = HealthServer::serve(listener).unwrap();

        let mut stream = tokio::net::TcpStream::connect(server.local_addr()).await.unwrap();
        stream.write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with("OK"));
    }
}
