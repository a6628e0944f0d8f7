//! API handlers for Biblio REST endpoints

pub mod auth;
pub mod books;
pub mod borrows;
pub mod fines;
pub mod health;
pub mod openapi;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{
    error::AppError,
    models::{
        book::Book,
        user::{TokenType, User, UserClaims},
    },
    repository::page_bounds,
    AppState,
};

/// Decode and check the bearer access token
fn access_claims(parts: &Parts, state: &AppState) -> Result<UserClaims, AppError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

    let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
        .map_err(|e| AppError::Authentication(e.to_string()))?;

    // Refresh tokens are only good for /auth/refresh
    if claims.token_type != TokenType::Access {
        return Err(AppError::Authentication("Access token required".to_string()));
    }

    Ok(claims)
}

/// Extractor for authenticated user from JWT access token.
///
/// The role is taken from the user row, not the token, and deactivated
/// accounts are turned away.
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = access_claims(parts, state)?;
        let claims = state.services.users.current_claims(claims).await?;
        Ok(AuthenticatedUser(claims))
    }
}

/// Extractor for administrator-only routes
pub struct AdminUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = access_claims(parts, state)?;
        // A member token never grants admin rights, no lookup needed
        claims.require_admin()?;

        let claims = state.services.users.current_claims(claims).await?;
        claims.require_admin()?;
        Ok(AdminUser(claims))
    }
}

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
#[aliases(PaginatedBooks = PaginatedResponse<Book>, PaginatedUsers = PaginatedResponse<User>)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Items on this page
    pub items: Vec<T>,
    /// Total number of matching items
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Items per page
    pub per_page: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Echo the page actually served, after clamping
    pub fn new(items: Vec<T>, total: i64, page: Option<i64>, per_page: Option<i64>) -> Self {
        let (limit, offset) = page_bounds(page, per_page);
        Self {
            items,
            total,
            page: offset / limit + 1,
            per_page: limit,
        }
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/me", get(auth::me))
        // Catalog
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Borrowing
        .route("/borrows", post(borrows::request_borrow))
        .route("/borrows/history", get(borrows::my_history))
        .route("/borrows/pending", get(borrows::list_pending))
        .route("/borrows/:id", get(borrows::get_borrow))
        .route("/borrows/:id/approve", post(borrows::approve_borrow))
        .route("/borrows/:id/reject", post(borrows::reject_borrow))
        .route("/borrows/:id/return", post(borrows::return_borrow))
        // Fines
        .route("/fines", get(fines::my_fines))
        .route("/fines/all", get(fines::list_all_fines))
        .route("/fines/:id/pay", post(fines::pay_fine))
        .route("/fines/:id/waive", post(fines::waive_fine))
        // Users
        .route("/users", get(users::list_users))
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/approve", post(users::approve_user))
        .route("/users/:id/role", put(users::update_role))
        .route("/users/:id/borrows", get(users::user_borrows))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
