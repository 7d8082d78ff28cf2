//! Default permission catalog, seeded once per deployment.

use sqlx::SqlitePool;

use crate::errors::{AppError, AppResult};
use crate::utils::utc_now;

use super::permissions::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub display_name: &'static str,
    pub module: &'static str,
}

const fn entry(name: &'static str, display_name: &'static str, module: &'static str) -> CatalogEntry {
    CatalogEntry {
        name,
        display_name,
        module,
    }
}

pub const DEFAULT_PERMISSIONS: &[CatalogEntry] = &[
    // Hotels
    entry(VIEW_HOTELS, "View hotels", "hotels"),
    entry(MANAGE_HOTELS, "Manage hotels", "hotels"),
    // Room types
    entry(VIEW_ROOM_TYPES, "View room types", "room_types"),
    entry(MANAGE_ROOM_TYPES, "Manage room types", "room_types"),
    // Rooms
    entry(VIEW_ROOMS, "View rooms", "rooms"),
    entry(MANAGE_ROOMS, "Manage rooms", "rooms"),
    entry(UPDATE_ROOM_STATUS, "Update room status", "rooms"),
    // Staff management
    entry(VIEW_STAFF, "View staff", "staff"),
    entry(MANAGE_STAFF, "Manage staff", "staff"),
    entry(MANAGE_DEPARTMENTS, "Manage departments", "staff"),
    entry(MANAGE_POSITIONS, "Manage positions", "staff"),
    entry(MANAGE_PERMISSIONS, "Manage permissions", "staff"),
    // Bookings
    entry(VIEW_BOOKINGS, "View bookings", "bookings"),
    entry(MANAGE_BOOKINGS, "Manage bookings", "bookings"),
    entry(CHECK_IN_OUT, "Check-in/Check-out", "bookings"),
];

/// Upsert every catalog entry by name. Existing rows keep their id, so
/// position assignments and staff overrides survive a re-seed.
pub async fn seed(pool: &SqlitePool) -> AppResult<usize> {
    let mut tx = pool.begin().await?;
    let now = utc_now();

    for item in DEFAULT_PERMISSIONS {
        let description = format!("{} in the system.", item.display_name);
        sqlx::query(
            r#"
            INSERT INTO permissions (name, display_name, description, module, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (name) DO UPDATE SET
                display_name = excluded.display_name,
                description = excluded.description,
                module = excluded.module,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(item.name)
        .bind(item.display_name)
        .bind(&description)
        .bind(item.module)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|err| AppError::from_write(err, "permission"))?;
    }

    tx.commit().await?;

    tracing::info!(count = DEFAULT_PERMISSIONS.len(), "permission catalog seeded");
    Ok(DEFAULT_PERMISSIONS.len())
}
