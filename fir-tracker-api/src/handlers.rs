//! API request handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use fir_tracker_core::{
    CaseFilter, CaseStats, CompleteCaseRequest, CreateCaseRequest, GroupStats, PerformanceSummary,
    UpdateCaseRequest,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{ApiError, AppState};

// ==================== Case Handlers ====================

/// Register a new case
pub async fn create_case(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = state.clock.now();
    let mut case = req.into_case(now)?;
    case.recompute(now);

    let saved = state.storage.create(case).await?;

    tracing::info!(
        case_id = %saved.id,
        fir_number = %saved.fir_number,
        status = %saved.status,
        "Created case"
    );

    Ok((StatusCode::CREATED, Json(saved)))
}

/// List cases matching the query filter, newest first
pub async fn list_cases(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<CaseFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let cases = state.storage.list(&filter).await?;
    Ok(Json(cases))
}

pub async fn get_case(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let case = state
        .storage
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Case {} not found", id)))?;

    Ok(Json(case))
}

/// Apply a partial update and refresh the derived fields
pub async fn update_case(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateCaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut case = state
        .storage
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Case {} not found", id)))?;

    let now = state.clock.now();
    case.apply(patch)?;
    case.recompute(now);
    case.updated_at = now;

    let saved = state.storage.update(case).await?;
    tracing::info!(case_id = %saved.id, fir_number = %saved.fir_number, "Updated case");

    Ok(Json(saved))
}

/// Close the investigation with a charge-sheet
pub async fn complete_case(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<CompleteCaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut case = state
        .storage
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Case {} not found", id)))?;

    let now = state.clock.now();
    case.complete(req.cc_number, req.cc_date, now)?;
    case.recompute(now);
    case.updated_at = now;

    let saved = state.storage.update(case).await?;
    tracing::info!(
        case_id = %saved.id,
        fir_number = %saved.fir_number,
        days_elapsed = saved.days_elapsed,
        quality = %saved.quality.as_str(),
        "Completed case"
    );

    Ok(Json(saved))
}

// ==================== Dashboard Handlers ====================

pub async fn case_stats(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let cases = state.storage.list(&CaseFilter::default()).await?;
    Ok(Json(CaseStats::from_cases(&cases)))
}

pub async fn station_stats(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let cases = state.storage.list(&CaseFilter::default()).await?;
    Ok(Json(GroupStats::by_station(&cases)))
}

pub async fn officer_stats(
    State(state): State<Arc<AppState>>,
    Path(station): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = CaseFilter {
        police_station: Some(station.clone()),
        ..Default::default()
    };
    let cases = state.storage.list(&filter).await?;
    Ok(Json(GroupStats::by_io(&cases, &station)))
}

pub async fn sub_division_stats(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let cases = state.storage.list(&CaseFilter::default()).await?;
    Ok(Json(GroupStats::by_sub_division(&cases)))
}

/// Quality of disposal across every case
pub async fn performance(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let cases = state.storage.list(&CaseFilter::default()).await?;
    Ok(Json(PerformanceSummary::from_cases(&cases)))
}

// ==================== Alert Handlers ====================

/// Run one alert sweep now and report what it did
pub async fn trigger_sweep(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Manual alert sweep requested");
    let summary = state.dispatcher.sweep_now().await?;
    Ok(Json(summary))
}

// ==================== Health Check ====================

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "fir-tracker",
        "sweep_running": state.dispatcher.is_running(),
    }))
}
