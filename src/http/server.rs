//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with CRUD, health and admin handlers
//! - Wire up middleware (request id, tracing, timeout, backpressure, limits)
//! - Serve plain HTTP or TLS on the given listener
//! - Apply schema catalog reloads while serving

use axum::{
    extract::DefaultBodyLimit,
    http::Request,
    body::Body,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::config::schema::{GatewayConfig, TimeoutConfig};
use crate::http::handlers;
use crate::http::middleware::metrics::track_metrics;
use crate::http::request::{request_span, UuidRequestId};
use crate::lifecycle::Gateway;
use crate::net::tls::load_tls_config;
use crate::schema::SchemaCatalog;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
    pub timeouts: TimeoutConfig,
    pub started_at: Instant,
}

/// HTTP front end of the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    gateway: Gateway,
}

impl HttpServer {
    pub fn new(config: GatewayConfig, gateway: Gateway) -> Self {
        let state = AppState {
            gateway: gateway.clone(),
            timeouts: config.timeouts.clone(),
            started_at: Instant::now(),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            gateway,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Outermost first: request id, trace span, id propagation, request
    /// timeout, concurrency limit, metrics, body limit. Layers are applied per
    /// route, so the concurrency limit shares one semaphore across all of them.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/find/{database}/{collection}", get(handlers::find))
            .route("/insert/{database}/{collection}", post(handlers::insert))
            .route("/delete/{database}/{collection}/{id}", delete(handlers::delete))
            .route("/update/{database}/{collection}/{id}", put(handlers::update))
            .route("/health", get(handlers::health));

        if config.admin.enabled {
            router = router.merge(admin::router());
        }

        router
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(middleware::from_fn(track_metrics))
            .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_connections))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| request_span(request)))
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// Serve on `listener` until `shutdown` fires.
    ///
    /// Config updates only change the schema catalog; other settings are
    /// fixed for the life of the process.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let reloader = tokio::spawn(apply_config_updates(
            self.gateway.clone(),
            self.config.clone(),
            config_updates,
        ));

        let app = self.router.into_make_service();

        match &self.config.listener.tls {
            None => {
                tracing::info!(address = %addr, "HTTP server starting");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                    })
                    .await?;
            }
            Some(tls) => {
                tracing::info!(address = %addr, "HTTPS server starting");
                let rustls = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;

                let handle = axum_server::Handle::new();
                let drain = Duration::from_secs(self.config.timeouts.shutdown_secs);
                let shutdown_handle = handle.clone();
                tokio::spawn(async move {
                    let _ = shutdown.recv().await;
                    shutdown_handle.graceful_shutdown(Some(drain));
                });

                let std_listener = listener.into_std()?;
                std_listener.set_nonblocking(true)?;
                axum_server::from_tcp_rustls(std_listener, rustls)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
        }

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

async fn apply_config_updates(
    gateway: Gateway,
    mut current: GatewayConfig,
    mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
) {
    while let Some(next) = updates.recv().await {
        if next.schemas != current.schemas {
            gateway
                .accessors
                .reload_schemas(SchemaCatalog::from_config(&next.schemas));
            tracing::info!(
                default_schema = %next.schemas.default_schema,
                bindings = next.schemas.bindings.len(),
                "Schema catalog reloaded"
            );
        }

        if next.listener.bind_address != current.listener.bind_address
            || next.database.backend != current.database.backend
            || next.database.uri_template != current.database.uri_template
        {
            tracing::warn!("Listener and database changes take effect on restart");
        }

        current = next;
    }
}
