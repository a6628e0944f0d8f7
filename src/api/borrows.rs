//! Borrow lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::borrow::{
        BorrowDetails, BorrowHistoryQuery, BorrowRecord, CreateBorrowRequest, TransitionOutcome,
    },
};

use super::{AdminUser, AuthenticatedUser};

/// Request to borrow a book
#[utoipa::path(
    post,
    path = "/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowRequest,
    responses(
        (status = 201, description = "Request created, awaiting approval", body = BorrowRecord),
        (status = 404, description = "Book not found"),
        (status = 422, description = "An active request for this book already exists")
    )
)]
pub async fn request_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowRecord>)> {
    let record = state
        .services
        .borrows
        .request(claims.user_id(), request.book_id)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// The caller's borrow history
#[utoipa::path(
    get,
    path = "/borrows/history",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(BorrowHistoryQuery),
    responses(
        (status = 200, description = "Borrow history, newest first", body = Vec<BorrowDetails>)
    )
)]
pub async fn my_history(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowHistoryQuery>,
) -> AppResult<Json<Vec<BorrowDetails>>> {
    let records = state
        .services
        .borrows
        .history(claims.user_id(), query.book_id)
        .await?;
    Ok(Json(records))
}

/// Requests awaiting a decision
#[utoipa::path(
    get,
    path = "/borrows/pending",
    tag = "borrows",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending requests", body = Vec<BorrowDetails>),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn list_pending(
    State(state): State<crate::AppState>,
    AdminUser(_claims): AdminUser,
) -> AppResult<Json<Vec<BorrowDetails>>> {
    let records = state.services.borrows.pending().await?;
    Ok(Json(records))
}

/// Get a borrow record
#[utoipa::path(
    get,
    path = "/borrows/{id}",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Borrow record ID")
    ),
    responses(
        (status = 200, description = "Borrow record", body = BorrowRecord),
        (status = 403, description = "Not your record"),
        (status = 404, description = "Borrow record not found")
    )
)]
pub async fn get_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BorrowRecord>> {
    let record = state.services.borrows.get(id, &claims).await?;
    Ok(Json(record))
}

/// Approve a pending request
#[utoipa::path(
    post,
    path = "/borrows/{id}/approve",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Borrow record ID")
    ),
    responses(
        (status = 200, description = "Request approved", body = TransitionOutcome),
        (status = 404, description = "Borrow record not found"),
        (status = 422, description = "Not pending, or no copy available")
    )
)]
pub async fn approve_borrow(
    State(state): State<crate::AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TransitionOutcome>> {
    let outcome = state.services.borrows.approve(id).await?;
    Ok(Json(outcome))
}

/// Reject a pending request
#[utoipa::path(
    post,
    path = "/borrows/{id}/reject",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Borrow record ID")
    ),
    responses(
        (status = 200, description = "Request rejected", body = TransitionOutcome),
        (status = 404, description = "Borrow record not found"),
        (status = 422, description = "Not pending")
    )
)]
pub async fn reject_borrow(
    State(state): State<crate::AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TransitionOutcome>> {
    let outcome = state.services.borrows.reject(id).await?;
    Ok(Json(outcome))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/borrows/{id}/return",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Borrow record ID")
    ),
    responses(
        (status = 200, description = "Book returned, with the fine if it was late", body = TransitionOutcome),
        (status = 403, description = "Not your loan"),
        (status = 404, description = "Borrow record not found"),
        (status = 422, description = "Not currently approved")
    )
)]
pub async fn return_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TransitionOutcome>> {
    let outcome = state.services.borrows.return_book(id, &claims).await?;
    Ok(Json(outcome))
}
