//! Service runtime.
//!
//! [`ServerHandle`] owns the full lifecycle: repositories, services, the
//! event broker and gateway, the HTTP/WebSocket listener and graceful
//! shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::{create_event_broker, EventService, SharedEventBroker, StreamService};
use crate::config::AppConfig;
use crate::domain::RepositoryProvider;
use crate::infrastructure::InMemoryRepositoryProvider;
use crate::interfaces::gateway::StreamGateway;
use crate::interfaces::http::modules::metrics::prometheus_handle;
use crate::interfaces::http::{create_api_router, RouterDeps};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

pub struct ServerOptions {
    pub config: AppConfig,
    /// Install the Prometheus recorder and serve `GET /metrics`
    pub enable_metrics: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            enable_metrics: true,
        }
    }
}

/// Handle to a running service.
///
/// ```rust,no_run
/// use datastream::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub gateway: Arc<StreamGateway>,
    pub broker: SharedEventBroker,
    pub repos: Arc<dyn RepositoryProvider>,
    pub config: AppConfig,
    /// Address actually bound (differs from the config when port 0 is used)
    pub local_addr: SocketAddr,

    shutdown: ShutdownCoordinator,
    api_task: JoinHandle<()>,
}

impl ServerHandle {
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let app_cfg = opts.config;
        app_cfg.validate()?;
        info!("Starting datastream service...");

        let prometheus = if opts.enable_metrics {
            prometheus_handle()
        } else {
            None
        };
        if prometheus.is_some() {
            info!("📊 Prometheus metrics recorder ready");
        }

        // ── Repositories & services ────────────────────────────
        let page_limits = app_cfg.streaming.page_limits();
        let repos: Arc<dyn RepositoryProvider> = InMemoryRepositoryProvider::shared();
        let broker = create_event_broker();
        let streams = Arc::new(StreamService::with_page_limits(repos.clone(), page_limits));
        let events = Arc::new(EventService::with_page_limits(
            repos.clone(),
            broker.clone(),
            page_limits,
        ));

        // ── Shutdown & gateway ─────────────────────────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();
        let gateway = Arc::new(StreamGateway::new(
            streams,
            events,
            broker.clone(),
            app_cfg.streaming.gateway_settings(),
            shutdown_signal.child_token(),
        ));
        info!(
            queue_capacity = app_cfg.streaming.queue_capacity,
            poll_interval_ms = app_cfg.streaming.poll_interval_ms,
            "🔔 Event broker initialized"
        );

        // ── HTTP / WebSocket listener ──────────────────────────
        let router = create_api_router(RouterDeps {
            gateway: gateway.clone(),
            prometheus,
            started_at: Instant::now(),
        });

        let listener = tokio::net::TcpListener::bind(app_cfg.server.address()).await?;
        let local_addr = listener.local_addr()?;
        info!("API listening on http://{}", local_addr);
        info!("OpenAPI document at http://{}/api-docs/openapi.json", local_addr);

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("🛑 API server received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("API server error: {}", e);
            }
        });

        info!("🚀 Datastream service started");

        Ok(Self {
            gateway,
            broker,
            repos,
            config: app_cfg,
            local_addr,
            shutdown,
            api_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Trigger shutdown on SIGINT / SIGTERM.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for shutdown to be triggered, then for the listener and all open
    /// sessions to finish, bounded by `server.shutdown_timeout`.
    pub async fn wait(self) {
        let Self {
            broker,
            shutdown,
            api_task,
            ..
        } = self;
        let abort = api_task.abort_handle();

        let completed = shutdown
            .shutdown_with_cleanup(|| async move {
                if let Err(e) = api_task.await {
                    error!("API server task panicked: {}", e);
                }
            })
            .await;

        if !completed {
            warn!(
                open_subscriptions = broker.total_subscriptions(),
                "Aborting API server after shutdown timeout"
            );
            abort.abort();
        }
        info!("👋 Datastream service shutdown complete");
    }

    pub async fn shutdown(self) {
        info!("🛑 Shutting down datastream service...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

/// Initialize tracing from the logging config. `RUST_LOG` overrides the
/// configured level. Call once, before [`ServerHandle::start`].
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.logging.format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing already initialized: {e}");
    }
}
