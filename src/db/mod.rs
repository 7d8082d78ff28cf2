use std::time::Duration;

use anyhow::Context;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::errors::AppResult;

pub async fn init() -> anyhow::Result<SqlitePool> {
	let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;

	let pool = SqlitePoolOptions::new()
		.max_connections(10)
		.min_connections(1)
		.acquire_timeout(Duration::from_secs(10))
		.connect(&database_url)
		.await
		.context("failed to connect to database")?;

	sqlx::migrate!()
		.run(&pool)
		.await
		.context("failed to run migrations")?;

	Ok(pool)
}

/// Tables whose integer primary key can be checked with [`row_exists`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
	Hotels,
	Positions,
	Staff,
	Permissions,
}

impl Table {
	fn name_and_key(self) -> (&'static str, &'static str) {
		match self {
			Table::Hotels => ("hotels", "hotel_id"),
			Table::Positions => ("positions", "position_id"),
			Table::Staff => ("staff", "staff_id"),
			Table::Permissions => ("permissions", "permission_id"),
		}
	}
}

pub async fn row_exists(pool: &SqlitePool, table: Table, id: i64) -> AppResult<bool> {
	let (name, key) = table.name_and_key();
	let sql = format!("SELECT EXISTS(SELECT 1 FROM {name} WHERE {key} = ?)");
	let exists: bool = sqlx::query_scalar(&sql).bind(id).fetch_one(pool).await?;
	Ok(exists)
}

/// The one row produced by an `INSERT .. RETURNING`.
///
/// Collect such statements with `fetch_all`. Stopping at the first row leaves
/// the statement un-reset, and its implicit transaction stays open on the
/// pooled connection where other connections cannot see the write yet.
pub fn single_row<T>(rows: Vec<T>) -> Result<T, sqlx::Error> {
	rows.into_iter().next().ok_or(sqlx::Error::RowNotFound)
}
