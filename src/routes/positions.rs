//! Position endpoints, including the base permission set of each position.

use std::collections::BTreeSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::app::AppState;
use crate::authz::{
    authorize,
    permissions::{MANAGE_POSITIONS, VIEW_STAFF},
};
use crate::db::{row_exists, single_row, Table};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::permission::{DbPermission, Permission, PermissionCheck};
use crate::models::position::*;
use crate::utils::{in_range, max_length, one_of, require_text, utc_now};

const NAME_MAX: usize = 255;
const CODE_MAX: usize = 50;
const POSITION_STATUSES: &[i64] = &[0, 1];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_positions).post(create_position))
        .route(
            "/:position_id",
            get(get_position).put(update_position).delete(delete_position),
        )
        .route("/:position_id/permissions", put(sync_position_permissions))
        .route("/:position_id/has-permission/:name", get(position_has_permission))
}

/// List positions
#[utoipa::path(
    get,
    path = "/positions",
    tag = "Positions",
    params(PositionFilter),
    responses((status = 200, description = "Positions", body = [Position])),
    security(("bearerAuth" = []))
)]
pub async fn list_positions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filter): Query<PositionFilter>,
) -> AppResult<Json<Vec<Position>>> {
    authorize(&state, &auth, VIEW_STAFF).await?;

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {POSITION_COLUMNS} FROM positions WHERE 1 = 1"));
    if let Some(hotel_id) = filter.hotel_id {
        query.push(" AND (hotel_id = ").push_bind(hotel_id).push(" OR hotel_id IS NULL)");
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status);
    }
    query.push(" ORDER BY level IS NULL, level, name");

    let positions = query
        .build_query_as::<DbPosition>()
        .fetch_all(&state.pool)
        .await?
        .into_iter()
        .map(Position::from)
        .collect();

    Ok(Json(positions))
}

/// Get a position with its permissions
#[utoipa::path(
    get,
    path = "/positions/{position_id}",
    tag = "Positions",
    params(("position_id" = i64, Path, description = "Position ID")),
    responses(
        (status = 200, description = "Position with permissions", body = PositionWithPermissions),
        (status = 404, description = "Position not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_position(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(position_id): Path<i64>,
) -> AppResult<Json<PositionWithPermissions>> {
    authorize(&state, &auth, VIEW_STAFF).await?;
    Ok(Json(load_with_permissions(&state.pool, position_id).await?))
}

/// Create a position
#[utoipa::path(
    post,
    path = "/positions",
    tag = "Positions",
    request_body = PositionCreateRequest,
    responses(
        (status = 201, description = "Position created", body = Position),
        (status = 400, description = "Invalid input"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_position(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<PositionCreateRequest>,
) -> AppResult<(StatusCode, Json<Position>)> {
    authorize(&state, &auth, MANAGE_POSITIONS).await?;

    require_text("name", &req.name, NAME_MAX)?;
    max_length("code", req.code.as_deref(), CODE_MAX)?;
    in_range("level", req.level, 1, 10)?;
    one_of("status", req.status, POSITION_STATUSES)?;
    ensure_hotel(&state.pool, req.hotel_id).await?;

    let now = utc_now();
    let sql = format!(
        "INSERT INTO positions (hotel_id, code, name, description, level, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {POSITION_COLUMNS}"
    );
    let position = sqlx::query_as::<_, DbPosition>(&sql)
        .bind(req.hotel_id)
        .bind(&req.code)
        .bind(req.name.trim())
        .bind(&req.description)
        .bind(req.level)
        .bind(req.status.unwrap_or(1))
        .bind(now)
        .bind(now)
        .fetch_all(&state.pool)
        .await
        .and_then(single_row)
        .map_err(|err| AppError::from_write(err, "position"))?;

    tracing::info!(position_id = position.position_id, name = %position.name, "position created");

    Ok((StatusCode::CREATED, Json(position.into())))
}

/// Update a position
#[utoipa::path(
    put,
    path = "/positions/{position_id}",
    tag = "Positions",
    params(("position_id" = i64, Path, description = "Position ID")),
    request_body = PositionUpdateRequest,
    responses(
        (status = 200, description = "Position updated", body = Position),
        (status = 404, description = "Position not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_position(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(position_id): Path<i64>,
    Json(req): Json<PositionUpdateRequest>,
) -> AppResult<Json<Position>> {
    authorize(&state, &auth, MANAGE_POSITIONS).await?;

    let mut position = fetch_position(&state.pool, position_id).await?;

    if let Some(name) = req.name.as_ref() {
        require_text("name", name, NAME_MAX)?;
        position.name = name.trim().to_string();
    }
    if let Some(code) = req.code {
        max_length("code", code.as_deref(), CODE_MAX)?;
        position.code = code;
    }
    if let Some(level) = req.level {
        in_range("level", level, 1, 10)?;
        position.level = level;
    }
    if let Some(status) = req.status {
        one_of("status", Some(status), POSITION_STATUSES)?;
        position.status = status;
    }
    if let Some(hotel_id) = req.hotel_id {
        ensure_hotel(&state.pool, hotel_id).await?;
        position.hotel_id = hotel_id;
    }
    if let Some(description) = req.description {
        position.description = description;
    }

    let now = utc_now();
    sqlx::query(
        "UPDATE positions SET hotel_id = ?, code = ?, name = ?, description = ?, level = ?, status = ?, updated_at = ? WHERE position_id = ?",
    )
    .bind(position.hotel_id)
    .bind(&position.code)
    .bind(&position.name)
    .bind(&position.description)
    .bind(position.level)
    .bind(position.status)
    .bind(now)
    .bind(position_id)
    .execute(&state.pool)
    .await
    .map_err(|err| AppError::from_write(err, "position"))?;

    position.updated_at = now;
    Ok(Json(position.into()))
}

/// Delete a position. Staff holding it become unassigned.
#[utoipa::path(
    delete,
    path = "/positions/{position_id}",
    tag = "Positions",
    params(("position_id" = i64, Path, description = "Position ID")),
    responses(
        (status = 204, description = "Position deleted"),
        (status = 404, description = "Position not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_position(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(position_id): Path<i64>,
) -> AppResult<StatusCode> {
    authorize(&state, &auth, MANAGE_POSITIONS).await?;

    let result = sqlx::query("DELETE FROM positions WHERE position_id = ?")
        .bind(position_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("position not found"));
    }

    tracing::info!(position_id, "position deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the permission set of a position
#[utoipa::path(
    put,
    path = "/positions/{position_id}/permissions",
    tag = "Positions",
    params(("position_id" = i64, Path, description = "Position ID")),
    request_body = AssignPositionPermissionsRequest,
    responses(
        (status = 200, description = "Permissions replaced", body = PositionWithPermissions),
        (status = 404, description = "Position or permission not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn sync_position_permissions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(position_id): Path<i64>,
    Json(req): Json<AssignPositionPermissionsRequest>,
) -> AppResult<Json<PositionWithPermissions>> {
    authorize(&state, &auth, MANAGE_POSITIONS).await?;

    let permission_ids: BTreeSet<i64> = req.permission_ids.into_iter().collect();

    let mut tx = state.pool.begin().await?;

    let position_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM positions WHERE position_id = ?)")
            .bind(position_id)
            .fetch_one(&mut *tx)
            .await?;
    if !position_exists {
        return Err(AppError::not_found("position not found"));
    }

    for permission_id in &permission_ids {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM permissions WHERE permission_id = ?)")
                .bind(permission_id)
                .fetch_one(&mut *tx)
                .await?;
        if !exists {
            return Err(AppError::not_found(format!("permission {permission_id} not found")));
        }
    }

    sqlx::query("DELETE FROM position_permissions WHERE position_id = ?")
        .bind(position_id)
        .execute(&mut *tx)
        .await?;

    for permission_id in &permission_ids {
        sqlx::query("INSERT INTO position_permissions (position_id, permission_id) VALUES (?, ?)")
            .bind(position_id)
            .bind(permission_id)
            .execute(&mut *tx)
            .await
            .map_err(|err| AppError::from_write(err, "position permission"))?;
    }

    tx.commit().await?;

    tracing::info!(position_id, count = permission_ids.len(), "position permissions replaced");

    Ok(Json(load_with_permissions(&state.pool, position_id).await?))
}

/// Check whether a position carries a permission
#[utoipa::path(
    get,
    path = "/positions/{position_id}/has-permission/{name}",
    tag = "Positions",
    params(
        ("position_id" = i64, Path, description = "Position ID"),
        ("name" = String, Path, description = "Permission name"),
    ),
    responses(
        (status = 200, description = "Check result", body = PermissionCheck),
        (status = 404, description = "Position not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn position_has_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((position_id, name)): Path<(i64, String)>,
) -> AppResult<Json<PermissionCheck>> {
    authorize(&state, &auth, VIEW_STAFF).await?;

    let granted = state.resolver.position_has_permission(position_id, &name).await?;
    Ok(Json(PermissionCheck {
        permission: name,
        granted,
    }))
}

async fn ensure_hotel(pool: &SqlitePool, hotel_id: Option<i64>) -> AppResult<()> {
    if let Some(id) = hotel_id {
        if !row_exists(pool, Table::Hotels, id).await? {
            return Err(AppError::bad_request(format!("hotel {id} does not exist")));
        }
    }
    Ok(())
}

async fn fetch_position(pool: &SqlitePool, position_id: i64) -> AppResult<DbPosition> {
    let sql = format!("SELECT {POSITION_COLUMNS} FROM positions WHERE position_id = ?");
    sqlx::query_as::<_, DbPosition>(&sql)
        .bind(position_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("position not found"))
}

async fn load_with_permissions(pool: &SqlitePool, position_id: i64) -> AppResult<PositionWithPermissions> {
    let position = fetch_position(pool, position_id).await?;

    let permissions = sqlx::query_as::<_, DbPermission>(
        "SELECT p.permission_id, p.name, p.display_name, p.description, p.module, p.created_at, p.updated_at \
         FROM permissions p \
         JOIN position_permissions pp ON pp.permission_id = p.permission_id \
         WHERE pp.position_id = ? \
         ORDER BY p.permission_id",
    )
    .bind(position_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(Permission::from)
    .collect();

    Ok(PositionWithPermissions {
        position: position.into(),
        permissions,
    })
}
