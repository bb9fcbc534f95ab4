use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, JsonRejection};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use http::header;
use serde_json::{json, Value};

use super::error::ApiError;
use super::AppState;
use crate::error::Error;
use crate::model::{Category, CategoryPatch, Member, MemberFields};
use crate::scoring;
use crate::service::{parse_bulk_payload, ResetOutcome};
use crate::sheet::{self, Sheet};

type ApiResult<T> = Result<Json<T>, ApiError>;

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ============================================================================
// Members
// ============================================================================

pub async fn list_members(State(state): State<AppState>) -> ApiResult<Vec<Member>> {
    Ok(Json(state.service.list_members().await?))
}

pub async fn create_member(
    State(state): State<AppState>,
    body: Result<Json<MemberFields>, JsonRejection>,
) -> ApiResult<Member> {
    let Json(fields) = body?;
    Ok(Json(state.service.create_member(fields).await?))
}

pub async fn bulk_replace(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Vec<Member>> {
    let Json(payload) = body?;
    let records = parse_bulk_payload(&payload)?;
    Ok(Json(state.service.bulk_replace(records).await?))
}

pub async fn reset_points(State(state): State<AppState>) -> ApiResult<ResetOutcome> {
    Ok(Json(state.service.reset_all_points().await?))
}

pub async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<MemberFields>, JsonRejection>,
) -> ApiResult<Member> {
    let Json(fields) = body?;
    Ok(Json(state.service.update_member(&id, fields).await?))
}

pub async fn delete_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    state.service.delete_member(&id).await?;
    Ok(Json(json!({ "msg": "Member removed" })))
}

pub async fn adjust_member(
    State(state): State<AppState>,
    Path((id, category)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Member> {
    let Json(payload) = body?;
    let value = parse_adjust_value(&payload)?;
    Ok(Json(state.service.adjust_member(&id, &category, value).await?))
}

/// Read `value` from an adjust body. Missing, null and zero all mean
/// "no value given".
fn parse_adjust_value(payload: &Value) -> Result<i64, Error> {
    match payload.get("value") {
        None | Some(Value::Null) => Err(Error::invalid("Value is required")),
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_i64() {
                return Ok(v);
            }
            n.as_f64()
                .and_then(scoring::whole_number)
                .ok_or_else(|| Error::invalid("Value must be a whole number"))
        }
        Some(_) => Err(Error::invalid("Value must be a number")),
    }
}

// ============================================================================
// Sheets
// ============================================================================

pub async fn import_sheet(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Vec<Member>> {
    let text = sheet::decode_text(&body?)?;
    let sheet = Sheet::parse(&text);
    Ok(Json(state.service.import_sheet(&sheet).await?))
}

pub async fn export_sheet(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let sheet = state.service.export_sheet().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/tab-separated-values; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"team-points.tsv\"",
            ),
        ],
        sheet.to_tsv(),
    ))
}

// ============================================================================
// Categories
// ============================================================================

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    Ok(Json(state.service.list_categories().await?))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<CategoryPatch>, JsonRejection>,
) -> ApiResult<Category> {
    let Json(patch) = body?;
    Ok(Json(state.service.update_category(&id, patch).await?))
}

pub async fn update_category_by_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Result<Json<CategoryPatch>, JsonRejection>,
) -> ApiResult<Category> {
    let Json(patch) = body?;
    Ok(Json(state.service.update_category_by_key(&key, patch).await?))
}
