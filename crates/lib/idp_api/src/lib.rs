//! # idp_api
//!
//! HTTP API library for the identity provider.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use idp_core::auth::{AuthError, PasswordHasher, TokenKeys};
use idp_core::store::CredentialStore;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{admin, applications, health, tokens, users};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Durable admins, applications and users.
    pub store: Arc<dyn CredentialStore>,
    /// Signers/verifiers for every token domain.
    pub keys: Arc<TokenKeys>,
    pub hasher: PasswordHasher,
    /// Hash checked on logins for unknown emails, so they cost the same
    /// bcrypt work as a wrong password.
    pub(crate) password_decoy: Arc<str>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// Build state from a store and configuration, rejecting unusable
    /// secrets or bcrypt cost up front.
    pub fn new(store: Arc<dyn CredentialStore>, config: ApiConfig) -> Result<Self, AuthError> {
        let keys = TokenKeys::new(&config.token_secrets)?;
        let hasher = PasswordHasher::new(config.bcrypt_cost)?;
        let password_decoy = hasher.hash("idp-login-decoy")?;
        Ok(Self {
            store,
            keys: Arc::new(keys),
            hasher,
            password_decoy: Arc::from(password_decoy),
            config,
        })
    }
}

/// Run embedded database migrations.
///
/// Delegates to `idp_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    idp_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
///
/// Routes are grouped by the token domain that guards them; the guard is a
/// `route_layer`, so unknown paths still answer 404 rather than 401.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/", get(health::hello))
        .route("/health", get(health::health))
        .route("/admin/register", post(admin::register_handler))
        .route("/admin/login", post(admin::login_handler))
        .route("/token/access", post(tokens::access_token_handler));

    // Admin session
    let admin_routes = Router::new()
        .route(
            "/admin/me",
            get(admin::me_handler)
                .patch(admin::update_me_handler)
                .delete(admin::delete_me_handler),
        )
        .route(
            "/applications",
            post(applications::create_application_handler)
                .get(applications::list_applications_handler),
        )
        .route(
            "/applications/{applicationID}",
            get(applications::get_application_handler)
                .patch(applications::update_application_handler)
                .delete(applications::delete_application_handler),
        )
        .route(
            "/applications/{applicationID}/refresh-token",
            post(applications::issue_refresh_token_handler)
                .put(applications::rotate_refresh_token_handler)
                .delete(applications::revoke_refresh_token_handler),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_admin,
        ));

    // Application access token
    let tenant_routes = Router::new()
        .route("/users", post(users::create_user_handler))
        .route("/users/login", post(users::login_user_handler))
        .route(
            "/applications/{applicationID}/users",
            get(users::list_users_handler),
        )
        .route(
            "/applications/{applicationID}/users/{userID}",
            get(users::get_user_handler)
                .patch(users::update_user_handler)
                .delete(users::delete_user_handler),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_access_token,
        ));

    // User session
    let user_routes = Router::new()
        .route("/users/me", get(users::me_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_user_session,
        ));

    let timeout =
        TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, state.config.request_timeout);

    Router::new()
        .merge(public)
        .merge(admin_routes)
        .merge(tenant_routes)
        .merge(user_routes)
        .layer(timeout)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
