//! Tool catalog handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::middleware::auth::Actor;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::tool::{Tool, ToolPatch};
use crate::services::audit_service::AuditEntry;

use super::MessageResponse;

async fn fetch_tool(state: &SharedState, id: i64) -> Result<Tool> {
    sqlx::query_as::<_, Tool>("SELECT * FROM tools WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tool {id} not found")))
}

#[derive(Debug, Deserialize)]
pub struct ListToolsQuery {
    pub category: Option<String>,
    pub active_only: Option<bool>,
}

pub async fn list_tools(
    State(state): State<SharedState>,
    Query(query): Query<ListToolsQuery>,
) -> Result<Json<Vec<Tool>>> {
    let tools = sqlx::query_as::<_, Tool>(
        r#"
        SELECT * FROM tools
        WHERE (?1 IS NULL OR category = ?1)
          AND (?2 IS NULL OR is_active = 1)
        ORDER BY name
        "#,
    )
    .bind(&query.category)
    .bind(query.active_only.filter(|&active| active))
    .fetch_all(&state.db)
    .await?;
    Ok(Json(tools))
}

pub async fn get_tool(State(state): State<SharedState>, Path(id): Path<i64>) -> Result<Json<Tool>> {
    Ok(Json(fetch_tool(&state, id).await?))
}

pub async fn tool_categories(State(state): State<SharedState>) -> Result<Json<Vec<String>>> {
    let categories = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT category FROM tools WHERE category IS NOT NULL ORDER BY category",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(categories))
}

#[derive(Debug, Deserialize)]
pub struct CreateToolRequest {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub icon: Option<String>,
}

pub async fn create_tool(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateToolRequest>,
) -> Result<(StatusCode, Json<Tool>)> {
    if req.name.trim().is_empty() || req.display_name.trim().is_empty() {
        return Err(AppError::Validation(
            "name and display_name are required".to_string(),
        ));
    }

    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM tools WHERE name = ?)")
        .bind(req.name.trim())
        .fetch_one(&state.db)
        .await?;
    if exists {
        return Err(AppError::Conflict(format!(
            "Tool '{}' already exists",
            req.name.trim()
        )));
    }

    let id = sqlx::query(
        "INSERT INTO tools (name, display_name, description, category, icon) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(req.name.trim())
    .bind(req.display_name.trim())
    .bind(&req.description)
    .bind(&req.category)
    .bind(&req.icon)
    .execute(&state.db)
    .await?
    .last_insert_rowid();

    let tool = fetch_tool(&state, id).await?;

    state
        .audit
        .record(
            AuditEntry::new("tools.create")
                .actor(actor.user_id)
                .target("tool", id)
                .target_name(&tool.name)
                .new_value(json!({"name": tool.name, "category": tool.category}).to_string())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok((StatusCode::CREATED, Json(tool)))
}

pub async fn update_tool(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(patch): Json<ToolPatch>,
) -> Result<Json<Tool>> {
    if patch.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }

    let mut tool = fetch_tool(&state, id).await?;
    let old = json!({
        "display_name": tool.display_name,
        "category": tool.category,
        "is_active": tool.is_active,
    });
    patch.apply(&mut tool);

    sqlx::query(
        r#"
        UPDATE tools
        SET display_name = ?, description = ?, category = ?, icon = ?,
            is_active = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&tool.display_name)
    .bind(&tool.description)
    .bind(&tool.category)
    .bind(&tool.icon)
    .bind(tool.is_active)
    .bind(id)
    .execute(&state.db)
    .await?;

    let tool = fetch_tool(&state, id).await?;

    state
        .audit
        .record(
            AuditEntry::new("tools.update")
                .actor(actor.user_id)
                .target("tool", id)
                .target_name(&tool.name)
                .old_value(old.to_string())
                .new_value(
                    json!({
                        "display_name": tool.display_name,
                        "category": tool.category,
                        "is_active": tool.is_active,
                    })
                    .to_string(),
                )
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(tool))
}

pub async fn delete_tool(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    let tool = fetch_tool(&state, id).await?;

    sqlx::query("DELETE FROM tools WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    state
        .audit
        .record(
            AuditEntry::new("tools.delete")
                .actor(actor.user_id)
                .target("tool", id)
                .target_name(&tool.name)
                .old_value(json!({"name": tool.name}).to_string())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(MessageResponse::new("Tool deleted")))
}
