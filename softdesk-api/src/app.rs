/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use softdesk_api::{app::AppState, config::Config};
/// use softdesk_shared::store::memory::MemoryStore;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = softdesk_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post},
    Router,
};
use softdesk_shared::auth::jwt::TokenLifetimes;
use softdesk_shared::auth::middleware::resolve_bearer;
use softdesk_shared::store::Store;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend shared by all services
    pub store: Arc<dyn Store>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    pub fn token_lifetimes(&self) -> TokenLifetimes {
        self.config.token_lifetimes()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                                   # Health check (public)
/// └── /api/
///     ├── POST /token/                          # Acquire token pair
///     ├── POST /token/refresh/                  # Refresh access token
///     ├── /user/                                # Register, list self
///     │   └── /:id/                             # Retrieve, update, soft delete
///     ├── /contributor/                         # My projects, join a project
///     │   └── DELETE /:project_id/              # Leave a project
///     └── /projects/
///         └── /:id/
///             └── /issues/
///                 └── /:id/
///                     └── /comments/
///                         └── /:id/
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost first):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Request timeout (tower-http TimeoutLayer, 408)
/// 5. Bearer resolution (`/api` only)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let api_routes = Router::new()
        .route("/token/", post(routes::auth::obtain_token))
        .route("/token/refresh/", post(routes::auth::refresh))
        .route(
            "/user/",
            get(routes::users::list_users).post(routes::users::register),
        )
        .route(
            "/user/:user_id/",
            get(routes::users::get_user)
                .patch(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        .route(
            "/contributor/",
            get(routes::contributors::my_projects).post(routes::contributors::join_project),
        )
        .route(
            "/contributor/:project_id/",
            delete(routes::contributors::leave_project),
        )
        .route(
            "/projects/",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/projects/:project_id/",
            get(routes::projects::get_project)
                .patch(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/projects/:project_id/issues/",
            get(routes::issues::list_issues).post(routes::issues::create_issue),
        )
        .route(
            "/projects/:project_id/issues/:issue_id/",
            get(routes::issues::get_issue)
                .patch(routes::issues::update_issue)
                .delete(routes::issues::delete_issue),
        )
        .route(
            "/projects/:project_id/issues/:issue_id/comments/",
            get(routes::comments::list_comments).post(routes::comments::create_comment),
        )
        .route(
            "/projects/:project_id/issues/:issue_id/comments/:comment_id/",
            get(routes::comments::get_comment)
                .patch(routes::comments::update_comment)
                .delete(routes::comments::delete_comment),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            bearer_auth_layer,
        ));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    // Combine all routes with middleware stack
    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Bearer authentication middleware layer
///
/// Resolves the Authorization header into an `AuthContext` and inserts it
/// into request extensions. Requests without the header pass through
/// anonymously; each operation then decides whether it needs an actor.
/// Invalid credentials are rejected here with 401.
async fn bearer_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let actor = resolve_bearer(state.store.as_ref(), req.headers(), state.jwt_secret()).await?;

    if let Some(ctx) = actor {
        req.extensions_mut().insert(ctx);
    }

    Ok(next.run(req).await)
}
