//! Permission catalog endpoints.
//!
//! Reading the catalog only needs a valid token; changing it needs
//! `manage_permissions`. Deleting a permission cascades to position
//! assignments and staff overrides.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use sqlx::SqlitePool;

use crate::app::AppState;
use crate::authz::{authorize, permissions::MANAGE_PERMISSIONS};
use crate::db::{row_exists, single_row, Table};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::permission::*;
use crate::models::staff_permission::{DbStaffPermission, StaffPermission};
use crate::utils::{max_length, require_text, utc_now};

const NAME_MAX: usize = 255;
const MODULE_MAX: usize = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_permissions).post(create_permission))
        .route("/module/:module", get(list_permissions_by_module))
        .route(
            "/:permission_id",
            get(get_permission).put(update_permission).delete(delete_permission),
        )
}

/// List permissions, optionally filtered by module
#[utoipa::path(
    get,
    path = "/permissions",
    tag = "Permissions",
    params(PermissionFilter),
    responses((status = 200, description = "Permission catalog", body = [Permission])),
    security(("bearerAuth" = []))
)]
pub async fn list_permissions(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(filter): Query<PermissionFilter>,
) -> AppResult<Json<Vec<Permission>>> {
    let permissions = match filter.module {
        Some(module) => fetch_by_module(&state.pool, &module).await?,
        None => {
            let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions ORDER BY module, name");
            sqlx::query_as::<_, DbPermission>(&sql)
                .fetch_all(&state.pool)
                .await?
                .into_iter()
                .map(Permission::from)
                .collect()
        }
    };

    Ok(Json(permissions))
}

/// List permissions of one module
#[utoipa::path(
    get,
    path = "/permissions/module/{module}",
    tag = "Permissions",
    params(("module" = String, Path, description = "Module tag, e.g. rooms")),
    responses((status = 200, description = "Permissions of the module", body = [Permission])),
    security(("bearerAuth" = []))
)]
pub async fn list_permissions_by_module(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(module): Path<String>,
) -> AppResult<Json<Vec<Permission>>> {
    Ok(Json(fetch_by_module(&state.pool, &module).await?))
}

/// Add a permission to the catalog
#[utoipa::path(
    post,
    path = "/permissions",
    tag = "Permissions",
    request_body = PermissionCreateRequest,
    responses(
        (status = 201, description = "Permission created", body = Permission),
        (status = 409, description = "Permission name already exists"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<PermissionCreateRequest>,
) -> AppResult<(StatusCode, Json<Permission>)> {
    authorize(&state, &auth, MANAGE_PERMISSIONS).await?;

    require_text("name", &req.name, NAME_MAX)?;
    require_text("display_name", &req.display_name, NAME_MAX)?;
    max_length("module", req.module.as_deref(), MODULE_MAX)?;

    let now = utc_now();
    let sql = format!(
        "INSERT INTO permissions (name, display_name, description, module, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?) RETURNING {PERMISSION_COLUMNS}"
    );
    let permission = sqlx::query_as::<_, DbPermission>(&sql)
        .bind(req.name.trim())
        .bind(&req.display_name)
        .bind(&req.description)
        .bind(&req.module)
        .bind(now)
        .bind(now)
        .fetch_all(&state.pool)
        .await
        .and_then(single_row)
        .map_err(|err| AppError::from_write(err, "permission"))?;

    tracing::info!(permission_id = permission.permission_id, name = %permission.name, "permission created");

    Ok((StatusCode::CREATED, Json(permission.into())))
}

/// Get a permission with the positions and staff overrides referencing it
#[utoipa::path(
    get,
    path = "/permissions/{permission_id}",
    tag = "Permissions",
    params(("permission_id" = i64, Path, description = "Permission ID")),
    responses(
        (status = 200, description = "Permission details", body = PermissionDetail),
        (status = 404, description = "Permission not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_permission(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(permission_id): Path<i64>,
) -> AppResult<Json<PermissionDetail>> {
    let permission = fetch_permission(&state.pool, permission_id).await?;

    let position_ids = sqlx::query_scalar::<_, i64>(
        "SELECT position_id FROM position_permissions WHERE permission_id = ? ORDER BY position_id",
    )
    .bind(permission_id)
    .fetch_all(&state.pool)
    .await?;

    let staff_overrides = sqlx::query_as::<_, DbStaffPermission>(
        "SELECT staff_id, permission_id, granted, created_at, updated_at FROM staff_permissions WHERE permission_id = ? ORDER BY staff_id",
    )
    .bind(permission_id)
    .fetch_all(&state.pool)
    .await?
    .into_iter()
    .map(StaffPermission::from)
    .collect();

    Ok(Json(PermissionDetail {
        permission: permission.into(),
        position_ids,
        staff_overrides,
    }))
}

/// Update a permission's name or metadata
#[utoipa::path(
    put,
    path = "/permissions/{permission_id}",
    tag = "Permissions",
    params(("permission_id" = i64, Path, description = "Permission ID")),
    request_body = PermissionUpdateRequest,
    responses(
        (status = 200, description = "Permission updated", body = Permission),
        (status = 404, description = "Permission not found"),
        (status = 409, description = "Name already exists, or the permission is referenced and cannot be renamed"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(permission_id): Path<i64>,
    Json(req): Json<PermissionUpdateRequest>,
) -> AppResult<Json<Permission>> {
    authorize(&state, &auth, MANAGE_PERMISSIONS).await?;

    let mut permission = fetch_permission(&state.pool, permission_id).await?;

    let mut renamed = false;
    if let Some(name) = req.name.as_ref() {
        require_text("name", name, NAME_MAX)?;
        let name = name.trim();
        if name != permission.name {
            permission.name = name.to_string();
            renamed = true;
        }
    }
    if let Some(display_name) = req.display_name.as_ref() {
        require_text("display_name", display_name, NAME_MAX)?;
        permission.display_name = display_name.clone();
    }
    if req.description.is_some() {
        permission.description = req.description.clone();
    }
    if req.module.is_some() {
        max_length("module", req.module.as_deref(), MODULE_MAX)?;
        permission.module = req.module.clone();
    }

    // Name is the key route checks resolve against; it is frozen once any
    // position or override refers to the permission.
    let sql = if renamed {
        "UPDATE permissions SET name = ?, display_name = ?, description = ?, module = ?, updated_at = ? \
         WHERE permission_id = ? \
         AND NOT EXISTS (SELECT 1 FROM position_permissions WHERE permission_id = permissions.permission_id) \
         AND NOT EXISTS (SELECT 1 FROM staff_permissions WHERE permission_id = permissions.permission_id)"
    } else {
        "UPDATE permissions SET name = ?, display_name = ?, description = ?, module = ?, updated_at = ? WHERE permission_id = ?"
    };

    let now = utc_now();
    let result = sqlx::query(sql)
        .bind(&permission.name)
        .bind(&permission.display_name)
        .bind(&permission.description)
        .bind(&permission.module)
        .bind(now)
        .bind(permission_id)
        .execute(&state.pool)
        .await
        .map_err(|err| AppError::from_write(err, "permission"))?;

    if result.rows_affected() == 0 {
        if renamed && row_exists(&state.pool, Table::Permissions, permission_id).await? {
            return Err(AppError::conflict(
                "permission is assigned to positions or staff; only display metadata can change",
            ));
        }
        return Err(AppError::not_found("permission not found"));
    }

    permission.updated_at = now;
    Ok(Json(permission.into()))
}

/// Remove a permission from the catalog
#[utoipa::path(
    delete,
    path = "/permissions/{permission_id}",
    tag = "Permissions",
    params(("permission_id" = i64, Path, description = "Permission ID")),
    responses(
        (status = 204, description = "Permission deleted"),
        (status = 404, description = "Permission not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(permission_id): Path<i64>,
) -> AppResult<StatusCode> {
    authorize(&state, &auth, MANAGE_PERMISSIONS).await?;

    let affected = sqlx::query("DELETE FROM permissions WHERE permission_id = ?")
        .bind(permission_id)
        .execute(&state.pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("permission not found"));
    }

    tracing::info!(permission_id, "permission deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_by_module(pool: &SqlitePool, module: &str) -> AppResult<Vec<Permission>> {
    let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions WHERE module = ? ORDER BY name");
    let rows = sqlx::query_as::<_, DbPermission>(&sql)
        .bind(module)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(Permission::from).collect())
}

async fn fetch_permission(pool: &SqlitePool, permission_id: i64) -> AppResult<DbPermission> {
    let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions WHERE permission_id = ?");
    sqlx::query_as::<_, DbPermission>(&sql)
        .bind(permission_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("permission not found"))
}
