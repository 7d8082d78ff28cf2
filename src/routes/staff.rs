//! Staff endpoints and the per-staff permission overrides.
//!
//! Grants and revokes never touch the position a staff member holds; they
//! write a single override row keyed by (staff, permission).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::app::AppState;
use crate::authz::{
    authorize,
    permissions::{MANAGE_PERMISSIONS, MANAGE_STAFF, VIEW_STAFF},
    SqlitePermissionStore,
};
use crate::db::{row_exists, single_row, Table};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::permission::PermissionCheck;
use crate::models::staff::*;
use crate::models::staff_permission::{DbStaffPermission, GrantPermissionRequest, StaffPermission};
use crate::utils::{max_length, one_of, require_text, utc_now};

const NAME_MAX: usize = 255;
const EMPLOYEE_CODE_MAX: usize = 50;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_staff).post(create_staff))
        .route("/:staff_id", get(get_staff).put(update_staff).delete(delete_staff))
        .route(
            "/:staff_id/permissions",
            get(list_overrides).post(grant_permission),
        )
        .route("/:staff_id/permissions/:permission_id", delete(revoke_permission))
        .route("/:staff_id/effective-permissions", get(effective_permissions))
        .route("/:staff_id/has-permission/:name", get(staff_has_permission))
}

/// List staff
#[utoipa::path(
    get,
    path = "/staff",
    tag = "Staff",
    params(StaffFilter),
    responses((status = 200, description = "Staff members", body = [Staff])),
    security(("bearerAuth" = []))
)]
pub async fn list_staff(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filter): Query<StaffFilter>,
) -> AppResult<Json<Vec<Staff>>> {
    authorize(&state, &auth, VIEW_STAFF).await?;

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {STAFF_COLUMNS} FROM staff WHERE 1 = 1"));
    if let Some(hotel_id) = filter.hotel_id {
        query.push(" AND hotel_id = ").push_bind(hotel_id);
    }
    if let Some(position_id) = filter.position_id {
        query.push(" AND position_id = ").push_bind(position_id);
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        query
            .push(" AND (full_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR employee_code LIKE ")
            .push_bind(pattern.clone())
            .push(" OR email LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    query.push(" ORDER BY full_name, staff_id");

    let staff = query
        .build_query_as::<DbStaff>()
        .fetch_all(&state.pool)
        .await?
        .into_iter()
        .map(Staff::from)
        .collect();

    Ok(Json(staff))
}

/// Get a staff member with overrides and resolved permissions
#[utoipa::path(
    get,
    path = "/staff/{staff_id}",
    tag = "Staff",
    params(("staff_id" = i64, Path, description = "Staff ID")),
    responses(
        (status = 200, description = "Staff details", body = StaffDetail),
        (status = 404, description = "Staff not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_staff(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(staff_id): Path<i64>,
) -> AppResult<Json<StaffDetail>> {
    authorize(&state, &auth, VIEW_STAFF).await?;

    // one snapshot, so `permissions` and `all_permissions` always agree
    let mut tx = state.pool.begin().await?;
    let staff = fetch_staff(&mut tx, staff_id).await?;
    let permissions = fetch_overrides(&mut tx, staff_id).await?;
    let subject = SqlitePermissionStore::read_subject(&mut tx, staff_id).await?;
    tx.commit().await?;

    let all_permissions = subject.effective_permissions().into_vec();

    Ok(Json(StaffDetail {
        staff: staff.into(),
        permissions,
        all_permissions,
    }))
}

/// Create a staff member
#[utoipa::path(
    post,
    path = "/staff",
    tag = "Staff",
    request_body = StaffCreateRequest,
    responses(
        (status = 201, description = "Staff created", body = Staff),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email or employee code already in use"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_staff(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<StaffCreateRequest>,
) -> AppResult<(StatusCode, Json<Staff>)> {
    authorize(&state, &auth, MANAGE_STAFF).await?;

    require_text("full_name", &req.full_name, NAME_MAX)?;
    validate_fields(
        req.employee_code.as_deref(),
        req.gender.as_deref(),
        req.contract_type.as_deref(),
        req.status,
        req.salary,
    )?;
    ensure_references(&state.pool, Some(req.hotel_id), req.position_id).await?;

    let now = utc_now();
    let sql = format!(
        "INSERT INTO staff (hotel_id, position_id, full_name, email, phone, date_of_birth, gender, address, employee_code, hire_date, contract_type, salary, status, notes, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {STAFF_COLUMNS}"
    );
    let staff = sqlx::query_as::<_, DbStaff>(&sql)
        .bind(req.hotel_id)
        .bind(req.position_id)
        .bind(req.full_name.trim())
        .bind(&req.email)
        .bind(&req.phone)
        .bind(req.date_of_birth)
        .bind(&req.gender)
        .bind(&req.address)
        .bind(&req.employee_code)
        .bind(req.hire_date)
        .bind(&req.contract_type)
        .bind(req.salary)
        .bind(req.status.unwrap_or(1))
        .bind(&req.notes)
        .bind(now)
        .bind(now)
        .fetch_all(&state.pool)
        .await
        .and_then(single_row)
        .map_err(|err| AppError::from_write(err, "staff"))?;

    tracing::info!(staff_id = staff.staff_id, hotel_id = staff.hotel_id, "staff created");

    Ok((StatusCode::CREATED, Json(staff.into())))
}

/// Update a staff member
#[utoipa::path(
    put,
    path = "/staff/{staff_id}",
    tag = "Staff",
    params(("staff_id" = i64, Path, description = "Staff ID")),
    request_body = StaffUpdateRequest,
    responses(
        (status = 200, description = "Staff updated", body = Staff),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Staff not found"),
        (status = 409, description = "Email or employee code already in use"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_staff(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(staff_id): Path<i64>,
    Json(req): Json<StaffUpdateRequest>,
) -> AppResult<Json<Staff>> {
    authorize(&state, &auth, MANAGE_STAFF).await?;

    let mut conn = state.pool.acquire().await?;
    let mut staff = fetch_staff(&mut conn, staff_id).await?;
    drop(conn);

    if let Some(full_name) = req.full_name.as_ref() {
        require_text("full_name", full_name, NAME_MAX)?;
        staff.full_name = full_name.trim().to_string();
    }
    validate_fields(
        req.employee_code.as_ref().and_then(Option::as_deref),
        req.gender.as_ref().and_then(Option::as_deref),
        req.contract_type.as_ref().and_then(Option::as_deref),
        req.status,
        req.salary.flatten(),
    )?;
    ensure_references(&state.pool, req.hotel_id, req.position_id.flatten()).await?;

    if let Some(hotel_id) = req.hotel_id {
        staff.hotel_id = hotel_id;
    }
    if let Some(position_id) = req.position_id {
        staff.position_id = position_id;
    }
    if let Some(status) = req.status {
        staff.status = status;
    }
    if let Some(email) = req.email {
        staff.email = email;
    }
    if let Some(phone) = req.phone {
        staff.phone = phone;
    }
    if let Some(date_of_birth) = req.date_of_birth {
        staff.date_of_birth = date_of_birth;
    }
    if let Some(gender) = req.gender {
        staff.gender = gender;
    }
    if let Some(address) = req.address {
        staff.address = address;
    }
    if let Some(employee_code) = req.employee_code {
        staff.employee_code = employee_code;
    }
    if let Some(hire_date) = req.hire_date {
        staff.hire_date = hire_date;
    }
    if let Some(contract_type) = req.contract_type {
        staff.contract_type = contract_type;
    }
    if let Some(salary) = req.salary {
        staff.salary = salary;
    }
    if let Some(notes) = req.notes {
        staff.notes = notes;
    }

    let now = utc_now();
    sqlx::query(
        "UPDATE staff SET hotel_id = ?, position_id = ?, full_name = ?, email = ?, phone = ?, date_of_birth = ?, gender = ?, address = ?, \
         employee_code = ?, hire_date = ?, contract_type = ?, salary = ?, status = ?, notes = ?, updated_at = ? WHERE staff_id = ?",
    )
    .bind(staff.hotel_id)
    .bind(staff.position_id)
    .bind(&staff.full_name)
    .bind(&staff.email)
    .bind(&staff.phone)
    .bind(staff.date_of_birth)
    .bind(&staff.gender)
    .bind(&staff.address)
    .bind(&staff.employee_code)
    .bind(staff.hire_date)
    .bind(&staff.contract_type)
    .bind(staff.salary)
    .bind(staff.status)
    .bind(&staff.notes)
    .bind(now)
    .bind(staff_id)
    .execute(&state.pool)
    .await
    .map_err(|err| AppError::from_write(err, "staff"))?;

    staff.updated_at = now;
    Ok(Json(staff.into()))
}

/// Delete a staff member and their overrides
#[utoipa::path(
    delete,
    path = "/staff/{staff_id}",
    tag = "Staff",
    params(("staff_id" = i64, Path, description = "Staff ID")),
    responses(
        (status = 204, description = "Staff deleted"),
        (status = 404, description = "Staff not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_staff(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(staff_id): Path<i64>,
) -> AppResult<StatusCode> {
    authorize(&state, &auth, MANAGE_STAFF).await?;

    let result = sqlx::query("DELETE FROM staff WHERE staff_id = ?")
        .bind(staff_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("staff not found"));
    }

    tracing::info!(staff_id, "staff deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// List the explicit grant/revoke overrides of a staff member
#[utoipa::path(
    get,
    path = "/staff/{staff_id}/permissions",
    tag = "Staff Permissions",
    params(("staff_id" = i64, Path, description = "Staff ID")),
    responses(
        (status = 200, description = "Override rows", body = [StaffPermission]),
        (status = 404, description = "Staff not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_overrides(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(staff_id): Path<i64>,
) -> AppResult<Json<Vec<StaffPermission>>> {
    authorize(&state, &auth, VIEW_STAFF).await?;

    if !row_exists(&state.pool, Table::Staff, staff_id).await? {
        return Err(AppError::not_found("staff not found"));
    }

    let mut conn = state.pool.acquire().await?;
    Ok(Json(fetch_overrides(&mut conn, staff_id).await?))
}

/// Grant a permission to a staff member regardless of position
#[utoipa::path(
    post,
    path = "/staff/{staff_id}/permissions",
    tag = "Staff Permissions",
    params(("staff_id" = i64, Path, description = "Staff ID")),
    request_body = GrantPermissionRequest,
    responses(
        (status = 200, description = "Grant recorded", body = StaffPermission),
        (status = 404, description = "Staff or permission not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn grant_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(staff_id): Path<i64>,
    Json(req): Json<GrantPermissionRequest>,
) -> AppResult<Json<StaffPermission>> {
    authorize(&state, &auth, MANAGE_PERMISSIONS).await?;
    Ok(Json(state.resolver.grant(staff_id, req.permission_id).await?))
}

/// Revoke a permission from a staff member even if their position carries it
#[utoipa::path(
    delete,
    path = "/staff/{staff_id}/permissions/{permission_id}",
    tag = "Staff Permissions",
    params(
        ("staff_id" = i64, Path, description = "Staff ID"),
        ("permission_id" = i64, Path, description = "Permission ID"),
    ),
    responses(
        (status = 200, description = "Revocation recorded", body = StaffPermission),
        (status = 404, description = "Staff or permission not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn revoke_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((staff_id, permission_id)): Path<(i64, i64)>,
) -> AppResult<Json<StaffPermission>> {
    authorize(&state, &auth, MANAGE_PERMISSIONS).await?;
    Ok(Json(state.resolver.revoke(staff_id, permission_id).await?))
}

/// Resolved permission set of a staff member
#[utoipa::path(
    get,
    path = "/staff/{staff_id}/effective-permissions",
    tag = "Staff Permissions",
    params(("staff_id" = i64, Path, description = "Staff ID")),
    responses(
        (status = 200, description = "Effective permissions", body = EffectivePermissionsResponse),
        (status = 404, description = "Staff not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn effective_permissions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(staff_id): Path<i64>,
) -> AppResult<Json<EffectivePermissionsResponse>> {
    authorize(&state, &auth, VIEW_STAFF).await?;

    let subject = state.resolver.subject(staff_id).await?;
    let permissions = subject.effective_permissions().into_vec();

    Ok(Json(EffectivePermissionsResponse {
        staff_id,
        position_id: subject.staff.position_id,
        permissions,
    }))
}

/// Check a single permission for a staff member
#[utoipa::path(
    get,
    path = "/staff/{staff_id}/has-permission/{name}",
    tag = "Staff Permissions",
    params(
        ("staff_id" = i64, Path, description = "Staff ID"),
        ("name" = String, Path, description = "Permission name"),
    ),
    responses(
        (status = 200, description = "Check result", body = PermissionCheck),
        (status = 404, description = "Staff not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn staff_has_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((staff_id, name)): Path<(i64, String)>,
) -> AppResult<Json<PermissionCheck>> {
    authorize(&state, &auth, VIEW_STAFF).await?;

    let granted = state.resolver.has_permission(staff_id, &name).await?;
    Ok(Json(PermissionCheck {
        permission: name,
        granted,
    }))
}

fn validate_fields(
    employee_code: Option<&str>,
    gender: Option<&str>,
    contract_type: Option<&str>,
    status: Option<i64>,
    salary: Option<f64>,
) -> AppResult<()> {
    max_length("employee_code", employee_code, EMPLOYEE_CODE_MAX)?;
    one_of("gender", gender, GENDERS)?;
    one_of("contract_type", contract_type, CONTRACT_TYPES)?;
    one_of("status", status, STAFF_STATUSES)?;
    if salary.is_some_and(|s| s < 0.0) {
        return Err(AppError::bad_request("salary must not be negative"));
    }
    Ok(())
}

async fn ensure_references(
    pool: &SqlitePool,
    hotel_id: Option<i64>,
    position_id: Option<i64>,
) -> AppResult<()> {
    if let Some(id) = hotel_id {
        if !row_exists(pool, Table::Hotels, id).await? {
            return Err(AppError::bad_request(format!("hotel {id} does not exist")));
        }
    }
    if let Some(id) = position_id {
        if !row_exists(pool, Table::Positions, id).await? {
            return Err(AppError::bad_request(format!("position {id} does not exist")));
        }
    }
    Ok(())
}

async fn fetch_staff(conn: &mut SqliteConnection, staff_id: i64) -> AppResult<DbStaff> {
    let sql = format!("SELECT {STAFF_COLUMNS} FROM staff WHERE staff_id = ?");
    sqlx::query_as::<_, DbStaff>(&sql)
        .bind(staff_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("staff not found"))
}

async fn fetch_overrides(
    conn: &mut SqliteConnection,
    staff_id: i64,
) -> AppResult<Vec<StaffPermission>> {
    let rows = sqlx::query_as::<_, DbStaffPermission>(
        "SELECT staff_id, permission_id, granted, created_at, updated_at FROM staff_permissions WHERE staff_id = ? ORDER BY permission_id",
    )
    .bind(staff_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(StaffPermission::from).collect())
}
