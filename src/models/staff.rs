use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::permission::Permission;
use super::staff_permission::StaffPermission;

pub const GENDERS: &[&str] = &["male", "female", "other"];
pub const CONTRACT_TYPES: &[&str] = &["full_time", "part_time", "contract", "intern"];
/// 1: active, 0: inactive, 2: on leave
pub const STAFF_STATUSES: &[i64] = &[0, 1, 2];

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Staff {
    pub staff_id: i64,
    pub hotel_id: i64,
    pub position_id: Option<i64>,
    #[schema(example = "Nguyen Van A")]
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[schema(example = "female")]
    pub gender: Option<String>,
    pub address: Option<String>,
    #[schema(example = "EMP-0042")]
    pub employee_code: Option<String>,
    pub hire_date: Option<NaiveDate>,
    #[schema(example = "full_time")]
    pub contract_type: Option<String>,
    pub salary: Option<f64>,
    #[schema(example = 1)]
    pub status: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbStaff {
    pub staff_id: i64,
    pub hotel_id: i64,
    pub position_id: Option<i64>,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub employee_code: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub contract_type: Option<String>,
    pub salary: Option<f64>,
    pub status: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbStaff> for Staff {
    fn from(db: DbStaff) -> Self {
        Staff {
            staff_id: db.staff_id,
            hotel_id: db.hotel_id,
            position_id: db.position_id,
            full_name: db.full_name,
            email: db.email,
            phone: db.phone,
            date_of_birth: db.date_of_birth,
            gender: db.gender,
            address: db.address,
            employee_code: db.employee_code,
            hire_date: db.hire_date,
            contract_type: db.contract_type,
            salary: db.salary,
            status: db.status,
            notes: db.notes,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

pub const STAFF_COLUMNS: &str = "staff_id, hotel_id, position_id, full_name, email, phone, date_of_birth, gender, address, employee_code, hire_date, contract_type, salary, status, notes, created_at, updated_at";

/// Staff record plus its explicit overrides and the resolved permission set.
#[derive(Debug, Serialize, ToSchema)]
pub struct StaffDetail {
    #[serde(flatten)]
    pub staff: Staff,
    pub permissions: Vec<StaffPermission>,
    pub all_permissions: Vec<Permission>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EffectivePermissionsResponse {
    pub staff_id: i64,
    pub position_id: Option<i64>,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StaffCreateRequest {
    pub hotel_id: i64,
    pub position_id: Option<i64>,
    #[schema(example = "Nguyen Van A")]
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub employee_code: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub contract_type: Option<String>,
    pub salary: Option<f64>,
    pub status: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StaffUpdateRequest {
    pub hotel_id: Option<i64>,
    /// Absent keeps the current position, `null` unassigns it
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<i64>)]
    pub position_id: Option<Option<i64>>,
    pub full_name: Option<String>,
    // the optional profile fields below are cleared by an explicit `null`
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub date_of_birth: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub gender: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub employee_code: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub hire_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub contract_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<f64>)]
    pub salary: Option<Option<f64>>,
    pub status: Option<i64>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StaffFilter {
    pub hotel_id: Option<i64>,
    pub position_id: Option<i64>,
    pub status: Option<i64>,
    /// Matches full name, employee code or email
    pub search: Option<String>,
}
