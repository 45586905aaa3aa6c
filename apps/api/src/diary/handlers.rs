use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{DiaryEntry, WeatherRecord};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct DiaryRequest {
    pub date: NaiveDate,
    pub text: String,
}

#[derive(Deserialize)]
pub struct DateQuery {
    pub date: NaiveDate,
}

#[derive(Deserialize)]
pub struct RangeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}

/// POST /api/v1/diary
pub async fn handle_create_diary(
    State(state): State<AppState>,
    Json(req): Json<DiaryRequest>,
) -> Result<(StatusCode, Json<DiaryEntry>), AppError> {
    let entry = state.diary.create_diary(req.date, &req.text).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /api/v1/diary
pub async fn handle_read_diary(
    State(state): State<AppState>,
    Query(params): Query<DateQuery>,
) -> Result<Json<Vec<DiaryEntry>>, AppError> {
    Ok(Json(state.diary.read_diary(params.date).await?))
}

/// GET /api/v1/diaries
pub async fn handle_read_diaries(
    State(state): State<AppState>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<Vec<DiaryEntry>>, AppError> {
    if params.start_date > params.end_date {
        return Err(AppError::Validation(format!(
            "start_date {} is after end_date {}",
            params.start_date, params.end_date
        )));
    }
    let entries = state
        .diary
        .read_diaries(params.start_date, params.end_date)
        .await?;
    Ok(Json(entries))
}

/// PUT /api/v1/diary
pub async fn handle_update_diary(
    State(state): State<AppState>,
    Json(req): Json<DiaryRequest>,
) -> Result<Json<DiaryEntry>, AppError> {
    Ok(Json(state.diary.update_diary(req.date, &req.text).await?))
}

/// DELETE /api/v1/diary
pub async fn handle_delete_diary(
    State(state): State<AppState>,
    Query(params): Query<DateQuery>,
) -> Result<Json<DeleteResponse>, AppError> {
    let deleted = state.diary.delete_diary(params.date).await?;
    Ok(Json(DeleteResponse { deleted }))
}

/// GET /api/v1/weather
pub async fn handle_resolve_weather(
    State(state): State<AppState>,
    Query(params): Query<DateQuery>,
) -> Result<Json<WeatherRecord>, AppError> {
    Ok(Json(state.diary.resolve_weather(params.date).await?))
}

/// POST /api/v1/weather/ingest
/// Runs the daily ingestion on demand for today's local date.
pub async fn handle_ingest_weather(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<WeatherRecord>), AppError> {
    let record = state.diary.ingest_weather(Local::now().date_naive()).await?;
    Ok((StatusCode::CREATED, Json(record)))
}
