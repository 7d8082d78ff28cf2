mod common;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use serde_json::json;

use common::names;
use hotel_backoffice::authz::{catalog, AuthzMode};

#[tokio::test]
async fn catalog_create_list_and_conflict() -> Result<()> {
    let app = common::spawn_app(AuthzMode::Strict).await?;
    catalog::seed(&app.pool).await?;
    let token = app.admin_token()?;
    let token = Some(token.as_str());

    let (status, created) = app
        .send(
            "POST",
            "/permissions",
            token,
            Some(json!({"name": "manage_minibar", "display_name": "Manage minibar", "module": "rooms"})),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", created);
    assert_eq!(created["module"], "rooms");

    let (status, _) = app
        .send(
            "POST",
            "/permissions",
            token,
            Some(json!({"name": "manage_minibar", "display_name": "Again"})),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send("POST", "/permissions", token, Some(json!({"name": "x", "display_name": ""})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "POST",
            "/permissions",
            token,
            Some(json!({"name": "y", "display_name": "Y", "module": "m".repeat(101)})),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, rooms) = app.send("GET", "/permissions/module/rooms", token, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        names(&rooms),
        vec!["manage_minibar", "manage_rooms", "update_room_status", "view_rooms"]
    );

    let (_, filtered) = app.send("GET", "/permissions?module=bookings", token, None).await?;
    assert_eq!(filtered.as_array().map(Vec::len), Some(3));

    let (_, all) = app.send("GET", "/permissions", token, None).await?;
    assert_eq!(all.as_array().map(Vec::len), Some(16));

    Ok(())
}

#[tokio::test]
async fn detail_update_and_cascading_delete() -> Result<()> {
    let app = common::spawn_app(AuthzMode::Strict).await?;
    catalog::seed(&app.pool).await?;
    let token = app.admin_token()?;
    let token = Some(token.as_str());
    let hotel_id = common::insert_hotel(&app.pool, "Riverside").await?;
    let manage_rooms = common::permission_id(&app.pool, "manage_rooms").await?;

    let (_, position) = app
        .send("POST", "/positions", token, Some(json!({"name": "Maintenance"})))
        .await?;
    let position_id = position["position_id"].as_i64().context("missing position_id")?;
    app.send(
        "PUT",
        &format!("/positions/{}/permissions", position_id),
        token,
        Some(json!({"permission_ids": [manage_rooms]})),
    )
    .await?;

    let (_, staff) = app
        .send("POST", "/staff", token, Some(json!({"hotel_id": hotel_id, "full_name": "Pham D"})))
        .await?;
    let staff_id = staff["staff_id"].as_i64().context("missing staff_id")?;
    app.send(
        "POST",
        &format!("/staff/{}/permissions", staff_id),
        token,
        Some(json!({"permission_id": manage_rooms})),
    )
    .await?;

    let (status, detail) = app
        .send("GET", &format!("/permissions/{}", manage_rooms), token, None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["name"], "manage_rooms");
    assert_eq!(detail["position_ids"], json!([position_id]));
    assert_eq!(detail["staff_overrides"][0]["staff_id"], staff_id);

    let (status, updated) = app
        .send(
            "PUT",
            &format!("/permissions/{}", manage_rooms),
            token,
            Some(json!({"display_name": "Manage rooms and fixtures"})),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["display_name"], "Manage rooms and fixtures");
    assert_eq!(updated["name"], "manage_rooms");

    let (status, _) = app
        .send(
            "PUT",
            &format!("/permissions/{}", manage_rooms),
            token,
            Some(json!({"name": "view_rooms"})),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send("DELETE", &format!("/permissions/{}", manage_rooms), token, None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, position) = app
        .send("GET", &format!("/positions/{}", position_id), token, None)
        .await?;
    assert!(names(&position["permissions"]).is_empty());

    let (_, overrides) = app
        .send("GET", &format!("/staff/{}/permissions", staff_id), token, None)
        .await?;
    assert_eq!(overrides, json!([]));

    let (status, _) = app
        .send("GET", &format!("/permissions/{}", manage_rooms), token, None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn referenced_permissions_keep_their_name() -> Result<()> {
    let app = common::spawn_app(AuthzMode::Strict).await?;
    catalog::seed(&app.pool).await?;
    let token = app.admin_token()?;
    let token = Some(token.as_str());
    let hotel_id = common::insert_hotel(&app.pool, "Riverside").await?;
    let manage_rooms = common::permission_id(&app.pool, "manage_rooms").await?;
    let manage_departments = common::permission_id(&app.pool, "manage_departments").await?;

    let (_, position) = app
        .send("POST", "/positions", token, Some(json!({"name": "Maintenance"})))
        .await?;
    let position_id = position["position_id"].as_i64().context("missing position_id")?;
    app.send(
        "PUT",
        &format!("/positions/{}/permissions", position_id),
        token,
        Some(json!({"permission_ids": [manage_rooms]})),
    )
    .await?;
    let (_, staff) = app
        .send(
            "POST",
            "/staff",
            token,
            Some(json!({"hotel_id": hotel_id, "position_id": position_id, "full_name": "Ly G"})),
        )
        .await?;
    let staff_id = staff["staff_id"].as_i64().context("missing staff_id")?;

    let (status, _) = app
        .send(
            "PUT",
            &format!("/permissions/{}", manage_rooms),
            token,
            Some(json!({"name": "renamed_rooms"})),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, check) = app
        .send("GET", &format!("/staff/{}/has-permission/manage_rooms", staff_id), token, None)
        .await?;
    assert_eq!(check["granted"], true);

    // resending the current name together with metadata is allowed
    let (status, updated) = app
        .send(
            "PUT",
            &format!("/permissions/{}", manage_rooms),
            token,
            Some(json!({"name": "manage_rooms", "description": "Rooms and fixtures"})),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "update failed: {}", updated);
    assert_eq!(updated["description"], "Rooms and fixtures");

    // an override alone also freezes the name
    app.send(
        "DELETE",
        &format!("/staff/{}/permissions/{}", staff_id, manage_departments),
        token,
        None,
    )
    .await?;
    let (status, _) = app
        .send(
            "PUT",
            &format!("/permissions/{}", manage_departments),
            token,
            Some(json!({"name": "manage_teams"})),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, created) = app
        .send(
            "POST",
            "/permissions",
            token,
            Some(json!({"name": "manage_minibar", "display_name": "Manage minibar"})),
        )
        .await?;
    let minibar = created["permission_id"].as_i64().context("missing permission_id")?;
    let (status, renamed) = app
        .send(
            "PUT",
            &format!("/permissions/{}", minibar),
            token,
            Some(json!({"name": "restock_minibar"})),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "restock_minibar");

    Ok(())
}
