//! Synthese web front
//!
//! The entry point for all browser and API requests.
//! Handles:
//! - Login sessions and access control
//! - Request routing and HTML/JSON content negotiation
//! - Observability (logging, metrics, tracing)

mod flash;
mod forms;
mod handlers;
mod middleware;
mod views;


use axum::{
    extract::Request,
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use synthese_common::{
    auth::{CredentialStore, TokenService},
    config::{AppConfig, BootstrapConfig},
    db::DbPool,
    errors::Result,
    mail::{create_mailer, Mailer},
    metrics, Repository,
};
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Repository,
    pub credentials: CredentialStore,
    pub tokens: Arc<TokenService>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(config: AppConfig, pool: DbPool, mailer: Arc<dyn Mailer>) -> Result<Self> {
        let tokens = TokenService::from_config(&config)?;
        let repo = Repository::new(pool);

        Ok(Self {
            config: Arc::new(config),
            credentials: CredentialStore::new(repo.users()),
            repo,
            tokens: Arc::new(tokens),
            mailer,
        })
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    init_tracing(&config);

    info!("Starting Synthese v{}", synthese_common::VERSION);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .set_buckets(metrics::LATENCY_BUCKETS)?
            .with_http_listener(addr)
            .install()?;
        info!("Metrics exporter listening on {}", addr);
    }
    metrics::register_metrics();

    // Initialize database connection
    let db = DbPool::new(&config.database).await?;

    let mailer = create_mailer(&config.mail)?;
    info!(transport = %config.mail.transport, "Mail transport ready");

    let state = AppState::new(config, db, mailer).map_err(|e| {
        tracing::error!(error = %e, "Failed to build application state");
        e
    })?;

    if let Some(bootstrap) = state.config.bootstrap.clone() {
        bootstrap_user(&state, &bootstrap).await?;
    }

    let addr = SocketAddr::new(state.config.server.host.parse()?, state.config.server.port);

    // Build the router
    let app = create_router(state);

    // Start the server
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the configured account on first start and give it its password
///
/// An existing account with the same username is left untouched.
async fn bootstrap_user(state: &AppState, bootstrap: &BootstrapConfig) -> Result<()> {
    let users = state.repo.users();
    if users.find_by_username(&bootstrap.username).await?.is_some() {
        info!(username = %bootstrap.username, "Bootstrap user already present");
        return Ok(());
    }

    let user = users.create(&bootstrap.username, &bootstrap.email).await?;
    state
        .credentials
        .set_password(&user, &bootstrap.password)
        .await?;
    info!(user_id = user.id, username = %user.username, "Bootstrap user created");
    Ok(())
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let timeout = state.config.request_timeout();
    let max_concurrent = state.config.server.max_concurrent_requests;
    let service = state.config.observability.service_name.clone();

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    Router::new()
        // Health endpoints (no session)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Session endpoints
        .route("/login", get(handlers::auth::login_form).post(handlers::auth::login))
        .route("/logout", get(handlers::auth::logout))
        .route(
            "/reset_password_request",
            get(handlers::auth::reset_request_form).post(handlers::auth::reset_request),
        )
        .route(
            "/reset_password/{token}",
            get(handlers::auth::reset_password_form).post(handlers::auth::reset_password),
        )

        // Account endpoints
        .route("/", get(handlers::articles::index))
        .route("/index", get(handlers::articles::index))
        .route("/user/{username}", get(handlers::users::profile))
        .route(
            "/user_profile_edition",
            get(handlers::users::edit_form).post(handlers::users::edit),
        )

        // Article endpoints
        .route(
            "/create_article",
            get(handlers::articles::create_form).post(handlers::articles::create),
        )
        .route("/user_articles_list", get(handlers::articles::list))
        .route("/article/{id}", get(handlers::articles::show))
        .route(
            "/modify_article/{id}",
            get(handlers::articles::modify_form).post(handlers::articles::modify),
        )
        .route(
            "/delete_article/{id}",
            get(handlers::articles::delete).post(handlers::articles::delete),
        )

        // Keyword endpoint (JSON)
        .route("/add_keyword/{user_id}", post(handlers::keywords::add_keyword))

        .fallback(handlers::not_found)
        .route_layer(from_fn(middleware::metrics::track_requests))
        .layer(CatchPanicLayer::new())
        .layer(from_fn(middleware::negotiate::render_errors))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(ConcurrencyLimitLayer::new(max_concurrent))
        .layer(TraceLayer::new_for_http().make_span_with(move |request: &Request| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "request",
                service = %service,
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        }))
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
