// libs/booking-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{DateTime, Utc};
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    BookingError, BookingListQuery, BookingStatus, CancelBookingRequest, CreateBookingRequest,
    RescheduleBookingRequest, UpdateProgressRequest,
};
use crate::services::access::AccessService;
use crate::services::booking::BookingService;
use crate::services::progress::ProgressService;
use crate::services::queries::BookingQueryService;

use shared_database::supabase::SupabaseClient;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct BookingListParams {
    pub status: Option<BookingStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    /// Comma-separated specialist ids.
    pub specialist_ids: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl BookingListParams {
    fn into_query(self) -> Result<BookingListQuery, AppError> {
        let specialist_ids = match self.specialist_ids.as_deref() {
            None => Vec::new(),
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    Uuid::parse_str(s)
                        .map_err(|_| AppError::BadRequest(format!("Invalid specialist id: {}", s)))
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(BookingListQuery {
            status: self.status,
            from_date: self.from_date,
            to_date: self.to_date,
            specialist_ids,
            search: self.search,
            page: self.page,
            limit: self.limit,
        })
    }
}

// ==============================================================================
// HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_booking(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = BookingService::new(&state).map_err(map_booking_error)?;
    let view = service
        .create_booking(request, &user, token)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": view,
    })))
}

#[axum::debug_handler]
pub async fn list_bookings(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(params): Query<BookingListParams>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let query = params.into_query()?;

    let supabase = Arc::new(SupabaseClient::new(&state));
    let access = AccessService::new(Arc::clone(&supabase));
    let scope = access
        .resolve_scope(&user, token)
        .await
        .map_err(map_booking_error)?;

    let response = BookingQueryService::with_client(supabase)
        .list_bookings(&scope, &query, token)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "items": response.items,
        "pagination": response.pagination,
    })))
}

#[axum::debug_handler]
pub async fn get_booking(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = BookingService::new(&state).map_err(map_booking_error)?;
    let view = service
        .get_booking(booking_id, &user, token)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({ "booking": view })))
}

#[axum::debug_handler]
pub async fn update_progress(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<UpdateProgressRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let view = ProgressService::new(&state)
        .transition(booking_id, request.progress, &user, request.note, token)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": view,
    })))
}

#[axum::debug_handler]
pub async fn reschedule_booking(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<RescheduleBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = BookingService::new(&state).map_err(map_booking_error)?;
    let view = service
        .reschedule_booking(booking_id, request, &user, token)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": view,
    })))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<CancelBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = BookingService::new(&state).map_err(map_booking_error)?;
    let view = service
        .cancel_booking(booking_id, request, &user, token)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": view,
    })))
}

fn map_booking_error(e: BookingError) -> AppError {
    match e {
        BookingError::NotFound
        | BookingError::SpecialistNotFound
        | BookingError::AppointmentTypeNotOffered => AppError::NotFound(e.to_string()),
        BookingError::AccessDenied => AppError::Forbidden(e.to_string()),
        BookingError::InvalidTransition { .. } => AppError::Conflict(e.to_string()),
        BookingError::Validation(_) => AppError::BadRequest(e.to_string()),
        BookingError::ExternalService(_) => AppError::ExternalService(e.to_string()),
        BookingError::InconsistentState { .. } => AppError::Internal(e.to_string()),
        BookingError::Database(_) => AppError::Database(e.to_string()),
    }
}
