//! HTTP server assembly.
//!
//! Everything under `/api` sits behind the Basic-auth gate; `/health*` and
//! `/metrics` are open for probes and scrapers. Cached listing bodies are
//! streamed as-is, so compression is applied at this layer only.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, patch, post};
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;

use super::auth::{AuthState, basic_auth};
use super::middleware::track_requests;
use super::routes::{self, ApiState};
use crate::core::ShutdownService;
use crate::core::config::ServerConfig;

pub struct ApiServer {
    config: ServerConfig,
    state: ApiState,
    auth_state: AuthState,
    shutdown: ShutdownService,
}

impl ApiServer {
    pub fn new(
        config: ServerConfig,
        state: ApiState,
        auth_state: AuthState,
        shutdown: ShutdownService,
    ) -> Self {
        Self {
            config,
            state,
            auth_state,
            shutdown,
        }
    }

    pub fn router(&self) -> Router {
        let api = Router::new()
            .route(
                "/events",
                get(routes::events::list_events).post(routes::events::create_event),
            )
            .route(
                "/bookings",
                post(routes::bookings::create_booking).get(routes::bookings::list_bookings),
            )
            .route(
                "/bookings/initiatePayment",
                patch(routes::bookings::initiate_payment),
            )
            .route("/bookings/cancel", patch(routes::bookings::cancel_booking))
            .route("/seats", get(routes::seats::list_seats))
            .route("/seats/select", patch(routes::seats::select_seat))
            .route("/seats/release", patch(routes::seats::release_seat))
            .route("/payments/success", get(routes::payments::payment_success))
            .route("/payments/fail", get(routes::payments::payment_fail))
            .route(
                "/payments/notifications",
                post(routes::payments::payment_notifications),
            )
            .route("/reset", post(routes::reset::reset))
            .layer(axum::middleware::from_fn_with_state(
                self.auth_state.clone(),
                basic_auth,
            ))
            .with_state(self.state.clone());

        let probes = Router::new()
            .route("/health", get(routes::health::health))
            .route("/health/db", get(routes::health::health_db))
            .route("/health/search", get(routes::health::health_search))
            .route("/metrics", get(routes::health::metrics_endpoint))
            .with_state(self.state.clone());

        Router::new()
            .nest("/api", api)
            .merge(probes)
            .layer(axum::middleware::from_fn(track_requests))
            .layer(TimeoutLayer::new(self.config.request_timeout))
            .layer(CompressionLayer::new())
    }

    /// Bind and serve until shutdown is triggered
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid listen address {}:{}",
                    self.config.host, self.config.port
                )
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        tracing::info!(addr = %addr, "HTTP server listening");

        let wait = self.shutdown.wait();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(wait)
            .await
            .context("HTTP server error")?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
