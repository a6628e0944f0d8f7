//! Fine endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::fine::{Fine, FineDetails, FineQuery},
};

use super::{AdminUser, AuthenticatedUser};

/// The caller's fines
#[utoipa::path(
    get,
    path = "/fines",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(FineQuery),
    responses(
        (status = 200, description = "Fines charged to the caller", body = Vec<FineDetails>)
    )
)]
pub async fn my_fines(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<FineQuery>,
) -> AppResult<Json<Vec<FineDetails>>> {
    let fines = state
        .services
        .fines
        .list_for_user(claims.user_id(), query.status)
        .await?;
    Ok(Json(fines))
}

/// All fines
#[utoipa::path(
    get,
    path = "/fines/all",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(FineQuery),
    responses(
        (status = 200, description = "All fines", body = Vec<FineDetails>),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn list_all_fines(
    State(state): State<crate::AppState>,
    AdminUser(_claims): AdminUser,
    Query(query): Query<FineQuery>,
) -> AppResult<Json<Vec<FineDetails>>> {
    let fines = state.services.fines.list_all(query.status).await?;
    Ok(Json(fines))
}

/// Pay a fine
#[utoipa::path(
    post,
    path = "/fines/{id}/pay",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Fine ID")
    ),
    responses(
        (status = 200, description = "Fine paid", body = Fine),
        (status = 403, description = "Not your fine"),
        (status = 404, description = "Fine not found"),
        (status = 422, description = "Fine is not pending")
    )
)]
pub async fn pay_fine(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Fine>> {
    let fine = state.services.fines.pay(id, &claims).await?;
    Ok(Json(fine))
}

/// Waive a fine
#[utoipa::path(
    post,
    path = "/fines/{id}/waive",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Fine ID")
    ),
    responses(
        (status = 200, description = "Fine waived", body = Fine),
        (status = 404, description = "Fine not found"),
        (status = 422, description = "Fine is not pending")
    )
)]
pub async fn waive_fine(
    State(state): State<crate::AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Fine>> {
    let fine = state.services.fines.waive(id).await?;
    Ok(Json(fine))
}
