use crate::{error::AppError, AppState};
use analytics::{bucket, observation_window, DailyHistogram};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, NaiveDate, Utc};
use core_types::{
    from_epoch, parse_timestamp, CategoryPlace, Location, ManagementEntry, ManagementUpdate,
    MarkerPoint, Place,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

type JsonBody<T> = WithRejection<Json<T>, AppError>;
type IdPath = WithRejection<Path<i32>, AppError>;

/// Body of `PUT /api/management/:id`.
///
/// The location can be given either as the structured `building` + `floor`
/// pair or as the legacy `"<building> <floor>층"` string.
#[derive(Debug, Deserialize)]
pub struct UpdateManagementBody {
    pub name: Option<String>,
    pub type_name: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
    pub building: Option<String>,
    pub floor: Option<i32>,
    pub shake_date: Option<String>,
}

/// Body of `PATCH /api/management/shake/:id`.
#[derive(Debug, Deserialize)]
pub struct ShakeBody {
    pub status: Option<String>,
    #[serde(default)]
    pub shake_date: Option<ShakeDateInput>,
}

/// Sensors send epoch numbers; people send strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ShakeDateInput {
    Epoch(i64),
    Text(String),
}

impl ShakeDateInput {
    fn resolve(&self) -> Result<DateTime<Utc>, AppError> {
        let resolved = match self {
            ShakeDateInput::Epoch(value) => from_epoch(*value)?,
            ShakeDateInput::Text(text) => parse_timestamp(text)?,
        };
        Ok(resolved)
    }
}

#[derive(Debug, Serialize)]
pub struct StatusMessage<T> {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl StatusMessage<()> {
    fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub places: Vec<CategoryPlace>,
}

/// The movement chart: a day histogram plus the window it covers.
#[derive(Debug, Serialize)]
pub struct MovementResponse {
    #[serde(flatten)]
    pub histogram: DailyHistogram,
    pub name: String,
    pub shake_date: DateTime<Utc>,
    pub end_date: NaiveDate,
}

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

/// Accepts a plain `YYYY-MM-DD` date or any timestamp form, keeping the day.
fn parse_date(input: &str) -> Result<NaiveDate, AppError> {
    match NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d") {
        Ok(date) => Ok(date),
        Err(_) => Ok(parse_timestamp(input)?.date_naive()),
    }
}

impl UpdateManagementBody {
    fn location(&self) -> Result<Location, AppError> {
        match (&self.building, self.floor, &self.location) {
            (Some(building), Some(floor), _) if !building.trim().is_empty() => {
                Ok(Location::new(building.trim(), floor))
            }
            (_, _, Some(legacy)) => Ok(legacy.parse::<Location>()?),
            _ => Err(AppError::Validation(
                "location (or building and floor) is required".to_string(),
            )),
        }
    }
}

/// # GET /api/management
pub async fn list_management(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ManagementEntry>>, AppError> {
    let entries = state.store.list_management().await?;
    Ok(Json(entries))
}

/// # GET /api/places
pub async fn list_places(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Place>>, AppError> {
    let places = state.store.list_places().await?;
    Ok(Json(places))
}

/// # GET /api/marker
pub async fn list_markers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MarkerPoint>>, AppError> {
    let markers = state.store.list_markers().await?;
    Ok(Json(markers))
}

/// # GET /api/category?type=<int>
pub async fn list_category(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<CategoryResponse>, AppError> {
    let raw = params
        .get("type")
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Validation("Missing type parameter".to_string()))?;
    let type_id: i32 = raw
        .parse()
        .map_err(|_| AppError::Validation("Invalid type parameter".to_string()))?;

    let places = state.store.categories_by_type(type_id).await?;
    if places.is_empty() {
        return Err(AppError::NotFound(format!("No places found for type {type_id}")));
    }
    Ok(Json(CategoryResponse { places }))
}

/// # PUT /api/management/:id
/// Rebinds the marker's name, type and floor and updates the dates. The type
/// and location are resolved first; nothing is written unless both resolve.
pub async fn update_management(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(body), _): JsonBody<UpdateManagementBody>,
) -> Result<Json<StatusMessage<ManagementEntry>>, AppError> {
    let location = body.location()?;
    let name = required(body.name, "name")?;
    let type_name = required(body.type_name, "type_name")?;
    let date = body.date.as_deref().map(parse_date).transpose()?;
    let shake_date = body.shake_date.as_deref().map(parse_timestamp).transpose()?;

    let Some(type_id) = state.store.find_type_id(&type_name).await? else {
        tracing::warn!(%type_name, "Update rejected: unknown type.");
        return Err(AppError::Validation(format!("Unknown type: {type_name}")));
    };
    let Some(floor_key) = state.store.find_floor_key(&location).await? else {
        tracing::warn!(%location, "Update rejected: unknown location.");
        return Err(AppError::Validation(format!("Unknown location: {location}")));
    };

    let update = ManagementUpdate {
        name,
        type_id,
        floor_key,
        date,
        shake_date,
    };
    let entry = state
        .store
        .update_management(id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Marker for management entry {id} not found")))?;

    tracing::info!(id, name = %entry.name, "Management entry updated.");
    Ok(Json(StatusMessage {
        status: "success",
        message: "Management entry updated".to_string(),
        data: Some(entry),
    }))
}

/// # DELETE /api/management/:id
/// Removes the management row and its marker in one transaction.
pub async fn delete_management(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(id), _): IdPath,
) -> Result<Json<StatusMessage<()>>, AppError> {
    if !state.store.delete_management(id).await? {
        return Err(AppError::NotFound(format!("Management entry {id} not found")));
    }
    tracing::info!(id, "Management entry and marker deleted.");
    Ok(Json(StatusMessage::success("Management entry deleted")))
}

/// # GET /api/management/movement/:id
/// Shake events per day over the month that starts at the row's `shake_date`,
/// with days cut at the configured reporting offset.
pub async fn get_movement(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(id), _): IdPath,
) -> Result<Json<MovementResponse>, AppError> {
    let anchor = state
        .store
        .find_shake_anchor(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Management entry {id} not found")))?;
    let shake_date = anchor
        .shake_date
        .ok_or_else(|| AppError::Validation(format!("Management entry {id} has no shake_date")))?;

    let (start, end) = observation_window(shake_date.with_timezone(&state.report_offset))
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let rows = state
        .store
        .daily_shake_counts(id, start, end, state.report_offset)
        .await?;

    Ok(Json(MovementResponse {
        histogram: bucket(start, end, &rows),
        name: anchor.name,
        shake_date,
        end_date: end,
    }))
}

/// # PATCH /api/management/shake/:id
/// Stores the reported status and appends it to the history log.
pub async fn record_shake(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(body), _): JsonBody<ShakeBody>,
) -> Result<Json<StatusMessage<()>>, AppError> {
    let status = required(body.status, "status")?;
    let at = match &body.shake_date {
        Some(input) => input.resolve()?,
        None => Utc::now(),
    };

    if !state.store.record_shake(id, &status, at).await? {
        return Err(AppError::NotFound(format!("Management entry {id} not found")));
    }
    tracing::info!(id, %status, shake_date = %at, "Shake recorded.");
    Ok(Json(StatusMessage::success("Shake status recorded")))
}

/// # GET /api/db-connect
/// Liveness probe. Uses its own `{status, message}` error shape.
pub async fn db_connect(State(state): State<Arc<AppState>>) -> Response {
    match state.store.server_time().await {
        Ok(time) => Json(json!({
            "status": "success",
            "message": "Database connection successful",
            "time": time,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = ?e, "Database liveness probe failed.");
            let mut body = json!({ "status": "error", "message": "Database connection failed" });
            if state.expose_details {
                body["details"] = json!(e.to_string());
            }
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}
