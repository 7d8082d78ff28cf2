use std::sync::Arc;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{AuthzMode, PermissionResolver, PolicyEvaluator, SqlitePermissionStore, StaffPolicyEvaluator};
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{health, permissions, positions, staff};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt: JwtConfig,
    pub authz_mode: AuthzMode,
}

impl AppConfig {
    pub fn new(jwt: JwtConfig, authz_mode: AuthzMode) -> Self {
        Self { jwt, authz_mode }
    }

    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            jwt: JwtConfig::from_env()?,
            authz_mode: AuthzMode::from_env(),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub authz_mode: AuthzMode,
    pub resolver: PermissionResolver<SqlitePermissionStore>,
    pub evaluator: Arc<dyn PolicyEvaluator>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: AppConfig) -> Self {
        let resolver = PermissionResolver::new(SqlitePermissionStore::new(pool.clone()));
        let evaluator: Arc<dyn PolicyEvaluator> = Arc::new(StaffPolicyEvaluator::new(resolver.clone()));

        Self {
            pool,
            jwt: Arc::new(config.jwt),
            authz_mode: config.authz_mode,
            resolver,
            evaluator,
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let config = AppConfig::from_env()?;
    create_app_with_config(pool, config).await
}

pub async fn create_app_with_config(pool: SqlitePool, config: AppConfig) -> Result<Router, AppError> {
    tracing::info!(authz_mode = ?config.authz_mode, "building router");
    let state = AppState::new(pool, config);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/api/health", get(health::health))
        .nest("/permissions", permissions::routes())
        .nest("/positions", positions::routes())
        .nest("/staff", staff::routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
