/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use reward_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = reward_api::app::build_router(AppState::new(pool, config));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::auth::jwt_auth_layer, routes};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post, put},
    Router,
};
use reward_shared::coordination::{
    Ledger, RankingReader, ReferralInviteCoordinator, StatusTransitionCoordinator,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned per request. Holds the pool, immutable config and the
/// coordinators, which keep no state of their own beyond a pool handle.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub ledger: Ledger,
    pub status: StatusTransitionCoordinator,
    pub invites: ReferralInviteCoordinator,
    pub ranking: RankingReader,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            ledger: Ledger::new(db.clone()),
            status: StatusTransitionCoordinator::new(db.clone()),
            invites: ReferralInviteCoordinator::new(db.clone(), config.rewards.invite_bonus),
            ranking: RankingReader::new(db.clone()),
            db,
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
///
/// ```text
/// /
/// ├── GET /health                          (public)
/// └── /v1                                  (bearer JWT)
///     ├── /tasks                           GET list, POST create
///     │   ├── /:id                         GET, PUT, DELETE
///     │   ├── /:id/status                  PATCH
///     │   └── /:id/description             GET
///     ├── /users                           GET list, POST create
///     │   ├── /by-email                    GET
///     │   ├── /invite                      POST
///     │   ├── /leader                      GET
///     │   ├── /top                         GET
///     │   ├── /:id                         GET, PUT, DELETE
///     │   ├── /:id/balance                 PUT ?amount=
///     │   ├── /:id/summary                 GET
///     │   ├── /:id/rank                    GET
///     │   ├── /:id/visits                  POST
///     │   └── /:id/full-info               GET
///     └── /referrals                       GET ?user_id=, POST
///         └── /:id                         GET, PUT, DELETE
/// ```
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/status", patch(routes::tasks::transition_status))
        .route("/:id/description", get(routes::tasks::get_description));

    let user_routes = Router::new()
        .route(
            "/",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route("/by-email", get(routes::users::get_user_by_email))
        .route("/invite", post(routes::users::invite_user))
        .route("/leader", get(routes::users::get_leader))
        .route("/top", get(routes::users::get_top_users))
        .route(
            "/:id",
            get(routes::users::get_user)
                .put(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        .route("/:id/balance", put(routes::users::adjust_balance))
        .route("/:id/summary", get(routes::users::get_user_summary))
        .route("/:id/rank", get(routes::users::get_user_rank))
        .route("/:id/visits", post(routes::users::record_visit))
        .route("/:id/full-info", get(routes::users::get_user_full_info));

    let referral_routes = Router::new()
        .route(
            "/",
            get(routes::referrals::list_referrals).post(routes::referrals::create_referral),
        )
        .route(
            "/:id",
            get(routes::referrals::get_referral)
                .put(routes::referrals::update_referral)
                .delete(routes::referrals::delete_referral),
        );

    let v1_routes = Router::new()
        .nest("/tasks", task_routes)
        .nest("/users", user_routes)
        .nest("/referrals", referral_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config.api.cors_origins))
        .with_state(state)
}

/// Permissive when `*` is listed, otherwise restricted to the given origins
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
