#![allow(dead_code)]

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt; // for `oneshot`

use hotel_backoffice::authz::{AuthzMode, Role};
use hotel_backoffice::jwt::JwtConfig;
use hotel_backoffice::{create_app_with_config, AppConfig};

pub const TEST_SECRET: &str = "test-secret";

pub struct TestApp {
    // keeps the database file alive for the duration of the test
    _dir: TempDir,
    pub pool: SqlitePool,
    pub router: Router,
    pub jwt: JwtConfig,
}

/// Fresh migrated database in a temp dir.
pub async fn test_pool() -> Result<(TempDir, SqlitePool)> {
    let dir = tempdir()?;
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("test.db"))
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
    )
    .await?;
    migrator.run(&pool).await?;

    Ok((dir, pool))
}

pub async fn spawn_app(mode: AuthzMode) -> Result<TestApp> {
    let (dir, pool) = test_pool().await?;
    let jwt = JwtConfig::new(TEST_SECRET, 1);
    let router = create_app_with_config(pool.clone(), AppConfig::new(jwt.clone(), mode)).await?;

    Ok(TestApp {
        _dir: dir,
        pool,
        router,
        jwt,
    })
}

pub async fn insert_hotel(pool: &SqlitePool, name: &str) -> Result<i64> {
    let id = sqlx::query(
        "INSERT INTO hotels (name, status, created_at, updated_at) VALUES (?, 1, datetime('now'), datetime('now'))",
    )
    .bind(name)
    .execute(pool)
    .await?
    .last_insert_rowid();
    Ok(id)
}

pub async fn permission_id(pool: &SqlitePool, name: &str) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>("SELECT permission_id FROM permissions WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(id)
}

impl TestApp {
    pub fn admin_token(&self) -> Result<String> {
        Ok(self.jwt.encode(1, Role::Admin, None)?)
    }

    pub fn staff_token(&self, staff_id: i64) -> Result<String> {
        Ok(self.jwt.encode(100 + staff_id, Role::Staff, Some(staff_id))?)
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.router.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        Ok((status, value))
    }
}

pub fn names(permissions: &Value) -> Vec<String> {
    let mut names: Vec<String> = permissions
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|p| p.get("name").and_then(Value::as_str).map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
