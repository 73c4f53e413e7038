//! # shortly: a self-hostable short-link service
//!
//! `shortly` is a multi-tenant URL shortener with native account management.
//! Users register with an email and password, confirm the address via an
//! emailed token, and manage their own short links. Sessions are signed
//! tokens delivered as HttpOnly cookies and backed by a server-side session
//! store, so logout actually revokes access instead of waiting for the token
//! to expire.
//!
//! ## Architecture
//!
//! The HTTP layer is built on [Axum](https://github.com/tokio-rs/axum) and
//! persistence is PostgreSQL via `sqlx`. The crate is organized around a few
//! seams:
//!
//! - The **API layer** ([`api`]) holds the request handlers and their
//!   request/response models, documented with `utoipa`.
//! - The **auth layer** ([`auth`]) owns password hashing, session and
//!   confirmation tokens, the session store, and the [`AuthService`]
//!   orchestrating them.
//! - The **database layer** ([`db`]) abstracts storage behind narrow
//!   repository traits so services and handlers can be exercised against
//!   in-memory doubles.
//! - The **link service** ([`links`]) generates short codes and enforces
//!   ownership on deletion.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use shortly::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = shortly::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     shortly::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await
//! }
//! ```
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod errors;
pub mod links;
mod openapi;
pub mod telemetry;
mod types;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post, put},
};
use bon::Builder;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    auth::{password, service::AuthService},
    auth::store::SessionStore,
    config::CorsOrigin,
    db::handlers::{links::PgLinks, users::PgUsers},
    db::handlers::users::UserStore,
    db::models::users::UserCreateDBRequest,
    email::EmailService,
    links::LinkService,
    openapi::ApiDoc,
};

pub use config::Config;
pub use types::{LinkId, SessionId, UserId};

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<AuthService>,
    pub links: Arc<LinkService>,
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: creates the superuser on first run, updates its password on
/// subsequent runs when one is configured. When no admin password is set the
/// seeding is skipped entirely.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(config: &Config, users: &dyn UserStore) -> Result<(), anyhow::Error> {
    let Some(password) = config.admin_password.as_deref() else {
        info!("No admin password configured, skipping initial admin user");
        return Ok(());
    };

    let params = password::Argon2Params::from(&config.auth.password);
    let password_hash = password::hash_password_with_params(password, Some(params))?;

    if let Some(existing) = users.get_by_email(&config.admin_email).await? {
        users.update_password_hash(existing.id, &password_hash).await?;
        debug!("Admin user already exists, password refreshed");
        return Ok(());
    }

    users
        .create(&UserCreateDBRequest {
            email: config.admin_email.clone(),
            password_hash,
            is_active: true,
            is_superuser: true,
            is_verified: true,
        })
        .await?;
    info!(email = %config.admin_email, "Created initial admin user");

    Ok(())
}

/// Create CORS layer from configuration.
///
/// Origins are validated at config load time, so malformed header values can
/// only appear if validation was bypassed; those are skipped with a warning.
fn create_cors_layer(config: &Config) -> CorsLayer {
    let cors_config = &config.auth.security.cors;

    let mut origins = Vec::new();
    for origin in &cors_config.allowed_origins {
        let value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>(),
            CorsOrigin::Url(url) => url.as_str().parse::<HeaderValue>(),
        };
        match value {
            Ok(value) => origins.push(value),
            Err(_) => warn!(?origin, "Skipping CORS origin that is not a valid header value"),
        }
    }

    let mut cors = CorsLayer::new().allow_origin(origins).allow_credentials(cors_config.allow_credentials);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    cors
}

/// Build the application router with all endpoints and middleware.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> Router {
    let cors_layer = create_cors_layer(&state.config);

    Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/auth/register", post(api::handlers::auth::register))
        .route("/auth/confirm", get(api::handlers::auth::confirm))
        .route("/auth/login", post(api::handlers::auth::login))
        .route("/auth/logout", post(api::handlers::auth::logout))
        .route("/auth/logout-all", post(api::handlers::auth::logout_all))
        .route("/auth/me", get(api::handlers::auth::me))
        .route("/profile/email", put(api::handlers::profile::change_email))
        .route("/profile/password", put(api::handlers::profile::change_password))
        .route(
            "/links",
            get(api::handlers::links::list_links).post(api::handlers::links::create_link),
        )
        .route(
            "/links/{code}",
            get(api::handlers::links::resolve_link).delete(api::handlers::links::delete_link),
        )
        .route("/admin/login", post(api::handlers::admin::admin_login))
        .route("/admin/logout", post(api::handlers::admin::admin_logout))
        .route("/admin/session", get(api::handlers::admin::admin_session))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .with_state(state)
        .layer(cors_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Main application struct that owns all resources and lifecycle.
///
/// [`Application::new`] connects to the database, runs migrations, seeds the
/// admin user, and wires the services together; [`Application::serve`] binds
/// the listener and runs until the shutdown future resolves.
pub struct Application {
    router: Router,
    config: Arc<Config>,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting shortly with configuration: {:#?}", config);

        let pool = db::create_pool(&config.database).await?;
        db::run_migrations(&pool).await?;

        let users = Arc::new(PgUsers::new(pool.clone()));
        let links = Arc::new(PgLinks::new(pool.clone()));

        create_initial_admin_user(&config, users.as_ref()).await?;

        let config = Arc::new(config);
        let mailer = Arc::new(EmailService::new(&config)?);
        let sessions: Arc<dyn SessionStore> = Arc::new(auth::store::InMemorySessionStore::new());

        let auth_service = Arc::new(AuthService::new(users, sessions, mailer, config.clone()));
        let link_service = Arc::new(LinkService::new(links, config.clone()));

        let state = AppState::builder().config(config.clone()).auth(auth_service).links(link_service).build();

        let router = build_router(state);

        Ok(Self { router, config, pool })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("shortly listening on http://{bind_addr}");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
