use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::models;
use crate::routes::{health, permissions, positions, staff};

#[derive(OpenApi)]
#[openapi(
	paths(
		health::health,
		permissions::list_permissions,
		permissions::list_permissions_by_module,
		permissions::create_permission,
		permissions::get_permission,
		permissions::update_permission,
		permissions::delete_permission,
		positions::list_positions,
		positions::get_position,
		positions::create_position,
		positions::update_position,
		positions::delete_position,
		positions::sync_position_permissions,
		positions::position_has_permission,
		staff::list_staff,
		staff::get_staff,
		staff::create_staff,
		staff::update_staff,
		staff::delete_staff,
		staff::list_overrides,
		staff::grant_permission,
		staff::revoke_permission,
		staff::effective_permissions,
		staff::staff_has_permission
	),
	components(
		schemas(
			health::HealthResponse,
			models::permission::Permission,
			models::permission::PermissionCreateRequest,
			models::permission::PermissionUpdateRequest,
			models::permission::PermissionDetail,
			models::permission::PermissionCheck,
			models::position::Position,
			models::position::PositionWithPermissions,
			models::position::PositionCreateRequest,
			models::position::PositionUpdateRequest,
			models::position::AssignPositionPermissionsRequest,
			models::staff::Staff,
			models::staff::StaffDetail,
			models::staff::StaffCreateRequest,
			models::staff::StaffUpdateRequest,
			models::staff::EffectivePermissionsResponse,
			models::staff_permission::StaffPermission,
			models::staff_permission::GrantPermissionRequest
		)
	),
	tags(
		(name = "Health", description = "Liveness and database status"),
		(name = "Permissions", description = "Permission catalog"),
		(name = "Positions", description = "Positions and their base permission sets"),
		(name = "Staff", description = "Staff records"),
		(name = "Staff Permissions", description = "Per-staff overrides and permission resolution")
	)
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(&ApiDoc::openapi())?;

	normalize_path_operations(&mut doc);
	ensure_security_components(&mut doc)?;
	ensure_global_security(&mut doc)?;
	ensure_openapi_version(&mut doc)?;
	add_examples(&mut doc);
	ensure_servers(&mut doc, port);

	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.with_credentials(true)
		.persist_authorization(true);

	let doc_json = Arc::new(serde_json::to_value(&doc)?);

	let json_route = get(move || {
		let doc_json = Arc::clone(&doc_json);
		async move { Json((*doc_json).clone()) }
	});

	Ok(Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config)))
}

fn normalize_path_operations(doc: &mut Value) {
	if let Some(paths) = doc.get_mut("paths").and_then(Value::as_object_mut) {
		let snapshot = paths.clone();
		for (path, item) in snapshot {
			if let Some(ops) = item.as_object() {
				let mut normalized = Map::new();
				for (method, val) in ops {
					let key = method.to_lowercase();
					if let Some(existing) = normalized.get_mut(&key) {
						merge_values(existing, val);
					} else {
						normalized.insert(key, val.clone());
					}
				}
				paths.insert(path, Value::Object(normalized));
			}
		}
	}
}

fn root_object(doc: &mut Value) -> anyhow::Result<&mut Map<String, Value>> {
	doc.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("OpenAPI root must be an object"))
}

fn ensure_security_components(doc: &mut Value) -> anyhow::Result<()> {
	let components = root_object(doc)?
		.entry("components")
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("components must be an object"))?;

	let schemes = components
		.entry("securitySchemes")
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("securitySchemes must be an object"))?;

	schemes.insert(
		"bearerAuth".to_string(),
		json!({
			"type": "http",
			"scheme": "bearer",
			"bearerFormat": "JWT"
		}),
	);
	Ok(())
}

fn ensure_global_security(doc: &mut Value) -> anyhow::Result<()> {
	root_object(doc)?
		.entry("security")
		.or_insert_with(|| json!([{ "bearerAuth": [] }]));
	Ok(())
}

fn ensure_openapi_version(doc: &mut Value) -> anyhow::Result<()> {
	root_object(doc)?
		.entry("openapi")
		.or_insert_with(|| Value::String("3.1.0".to_string()));
	Ok(())
}

fn add_examples(doc: &mut Value) {
	if let Some(paths) = doc.get_mut("paths").and_then(Value::as_object_mut) {
		for item in paths.values_mut() {
			if let Some(operations) = item.as_object_mut() {
				for operation in operations.values_mut() {
					apply_parameter_examples(operation);
					apply_request_examples(operation);
					apply_response_examples(operation);
				}
			}
		}
	}
}

fn apply_parameter_examples(operation: &mut Value) {
	let Some(parameters) = operation.get_mut("parameters").and_then(Value::as_array_mut) else { return; };

	for parameter in parameters.iter_mut() {
		let example = match parameter.get("name").and_then(Value::as_str) {
			Some("staff_id") => json!(12),
			Some("position_id") => json!(3),
			Some("permission_id") => json!(7),
			Some("name") => json!("manage_rooms"),
			Some("module") => json!("rooms"),
			_ => continue,
		};
		if let Some(obj) = parameter.as_object_mut() {
			obj.entry("example").or_insert(example);
		}
	}
}

fn apply_request_examples(operation: &mut Value) {
	let Some(request_body) = operation.get_mut("requestBody") else { return; };
	let Some(content) = request_body.get_mut("content").and_then(Value::as_object_mut) else { return; };
	let Some(app_json) = content.get_mut("application/json").and_then(Value::as_object_mut) else { return; };
	let Some(schema) = app_json.get("schema").and_then(Value::as_object) else { return; };
	let Some(reference) = schema.get("$ref").and_then(Value::as_str) else { return; };

	let example = match reference {
		"#/components/schemas/PermissionCreateRequest" => Some(json!({
			"name": "manage_minibar",
			"display_name": "Manage minibar",
			"description": "Restock and bill minibar items",
			"module": "rooms"
		})),
		"#/components/schemas/PositionCreateRequest" => Some(json!({
			"hotel_id": 1,
			"code": "HK-MGR",
			"name": "Housekeeping Manager",
			"level": 3
		})),
		"#/components/schemas/AssignPositionPermissionsRequest" => Some(json!({
			"permission_ids": [6, 7]
		})),
		"#/components/schemas/StaffCreateRequest" => Some(json!({
			"hotel_id": 1,
			"position_id": 3,
			"full_name": "Nguyen Van A",
			"email": "a.nguyen@example.com",
			"employee_code": "EMP-0042",
			"gender": "male",
			"contract_type": "full_time"
		})),
		"#/components/schemas/GrantPermissionRequest" => Some(json!({
			"permission_id": 13
		})),
		_ => None,
	};

	if let Some(example) = example {
		app_json.insert("example".to_string(), example);
	}
}

fn apply_response_examples(operation: &mut Value) {
	let Some(responses) = operation.get_mut("responses").and_then(Value::as_object_mut) else { return; };

	for response in responses.values_mut() {
		let Some(content) = response.get_mut("content").and_then(Value::as_object_mut) else { continue; };
		let Some(app_json) = content.get_mut("application/json").and_then(Value::as_object_mut) else { continue; };
		let Some(reference) = app_json
			.get("schema")
			.and_then(|schema| schema.get("$ref"))
			.and_then(Value::as_str)
		else {
			continue;
		};

		let example = match reference {
			"#/components/schemas/StaffPermission" => Some(json!({
				"staff_id": 12,
				"permission_id": 13,
				"granted": true,
				"created_at": "2026-02-06T15:00:00Z",
				"updated_at": "2026-02-06T15:00:00Z"
			})),
			"#/components/schemas/PermissionCheck" => Some(json!({
				"permission": "manage_rooms",
				"granted": false
			})),
			"#/components/schemas/EffectivePermissionsResponse" => Some(json!({
				"staff_id": 12,
				"position_id": 3,
				"permissions": [{
					"permission_id": 7,
					"name": "update_room_status",
					"display_name": "Update room status",
					"description": null,
					"module": "rooms",
					"created_at": "2026-02-06T15:00:00Z",
					"updated_at": "2026-02-06T15:00:00Z"
				}]
			})),
			_ => None,
		};

		if let Some(example) = example {
			app_json.insert("example".to_string(), example);
		}
	}
}

fn ensure_servers(doc: &mut Value, port: u16) {
	// https when the server is started with a certificate
	let tls_enabled = std::env::var("CERT_PATH").is_ok() && std::env::var("KEY_PATH").is_ok();
	let scheme = if tls_enabled { "https" } else { "http" };
	let server_url = format!("{scheme}://localhost:{port}");

	match doc.get_mut("servers") {
		Some(Value::Array(arr)) => {
			let has = arr.iter().any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !has {
				arr.push(json!({ "url": server_url }));
			}
		}
		_ => {
			doc["servers"] = json!([{ "url": server_url }]);
		}
	}
}

fn merge_values(target: &mut Value, addition: &Value) {
	match (target, addition) {
		(Value::Object(dest), Value::Object(src)) => {
			for (key, value) in src {
				if let Some(existing) = dest.get_mut(key) {
					merge_values(existing, value);
				} else {
					dest.insert(key.clone(), value.clone());
				}
			}
		}
		(Value::Array(dest), Value::Array(src)) => {
			for item in src {
				if !dest.contains(item) {
					dest.push(item.clone());
				}
			}
		}
		_ => {}
	}
}
