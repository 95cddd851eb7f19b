//! Routes for appending and reading events.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use chronicle_core::event::{AggregateId, Attrs, Event, EventNames, EventTime};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /events.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendEventRequest {
    /// Aggregate the event belongs to.
    pub aggregate_id: AggregateId,
    /// Event name.
    pub name: String,
    /// Domain payload.
    #[serde(default)]
    pub attrs: Attrs,
}

/// Query string for GET /events.
#[derive(Debug, Deserialize)]
pub struct ReadByNamesQuery {
    /// Comma-separated event names.
    pub names: Option<String>,
    /// Lower bound (inclusive) on the ordering token.
    pub from: Option<String>,
}

/// Response body for event list reads.
#[derive(Debug, Serialize)]
pub struct EventsResponse {
    /// Events in ascending `time` order.
    pub events: Vec<Event>,
}

/// Interprets a path segment as an aggregate id. All-digit segments that fit
/// in an `i64` are numeric.
fn parse_aggregate_id(segment: String) -> AggregateId {
    match segment.parse::<i64>() {
        Ok(number) if segment.bytes().all(|b| b.is_ascii_digit()) => AggregateId::Number(number),
        _ => AggregateId::Text(segment),
    }
}

fn parse_time(raw: &str) -> Result<EventTime, ApiError> {
    raw.parse::<EventTime>()
        .map_err(|e| ApiError::Validation(e.to_string()))
}

fn parse_names(raw: &str) -> EventNames {
    let mut names: Vec<String> = raw.split(',').map(|name| name.trim().to_owned()).collect();
    if names.len() == 1 {
        EventNames::Single(names.remove(0))
    } else {
        EventNames::Many(names)
    }
}

/// POST /events
#[instrument(skip(state, request), fields(aggregate_id = %request.aggregate_id, name = %request.name))]
async fn append_event(
    State(state): State<AppState>,
    Json(request): Json<AppendEventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let event = state
        .repository
        .append(request.aggregate_id, request.name, request.attrs)
        .await?;

    info!(time = %event.time, "event appended");

    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /aggregates/{aggregate_id}/events
#[instrument(skip(state))]
async fn read_by_aggregate(
    State(state): State<AppState>,
    Path(aggregate_id): Path<String>,
) -> Result<Json<EventsResponse>, ApiError> {
    let aggregate_id = parse_aggregate_id(aggregate_id);
    let events = state.repository.read_by_aggregate(&aggregate_id).await?;

    info!(count = events.len(), "read events by aggregate");

    Ok(Json(EventsResponse { events }))
}

/// GET /events?names=a,b&from=<token>
#[instrument(skip(state))]
async fn read_by_names(
    State(state): State<AppState>,
    Query(query): Query<ReadByNamesQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    let names = query
        .names
        .as_deref()
        .map(parse_names)
        .ok_or_else(|| ApiError::Validation("names query parameter is required".to_owned()))?;
    let from = match query.from.as_deref() {
        Some(raw) => parse_time(raw)?,
        None => EventTime::MIN,
    };

    let events = state.repository.read_by_names(names, from).await?;

    info!(count = events.len(), "read events by names");

    Ok(Json(EventsResponse { events }))
}

/// GET /events/{time}
#[instrument(skip(state))]
async fn read_event(
    State(state): State<AppState>,
    Path(time): Path<String>,
) -> Result<Json<Event>, ApiError> {
    let time = parse_time(&time)?;
    let event = state
        .repository
        .read_event(time)
        .await?
        .ok_or(ApiError::EventNotFound(time))?;

    Ok(Json(event))
}

/// Returns the router for event operations.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", post(append_event).get(read_by_names))
        .route("/events/{time}", get(read_event))
        .route("/aggregates/{aggregate_id}/events", get(read_by_aggregate))
}
