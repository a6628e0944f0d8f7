//! Fines repository for database operations

use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::fine::{Fine, FineAction, FineDetails, FineStatus},
};

const FINE_COLUMNS: &str = "id, borrow_record_id, amount, reason, status, created_at, updated_at";

const DETAILS_SELECT: &str = r#"
    SELECT f.id, f.borrow_record_id, r.user_id, u.username, r.book_id, b.title AS book_title,
           f.amount, f.reason, f.status, f.created_at, f.updated_at
    FROM fines f
    JOIN borrow_records r ON r.id = f.borrow_record_id
    JOIN users u ON u.id = r.user_id
    JOIN books b ON b.id = r.book_id
"#;

#[derive(Clone)]
pub struct FinesRepository {
    pool: Pool<Postgres>,
}

impl FinesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get fine with its borrower
    pub async fn get_details(&self, id: Uuid) -> AppResult<FineDetails> {
        sqlx::query_as::<_, FineDetails>(&format!("{} WHERE f.id = $1", DETAILS_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Fine with id {} not found", id)))
    }

    /// List fines, optionally for one user and/or one status, newest first
    pub async fn list(
        &self,
        user_id: Option<Uuid>,
        status: Option<FineStatus>,
    ) -> AppResult<Vec<FineDetails>> {
        let fines = sqlx::query_as::<_, FineDetails>(&format!(
            r#"{}
            WHERE ($1::uuid IS NULL OR r.user_id = $1)
              AND ($2::text IS NULL OR f.status = $2)
            ORDER BY f.created_at DESC
            "#,
            DETAILS_SELECT
        ))
        .bind(user_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(fines)
    }

    /// Insert a fine inside the caller's transaction
    pub async fn insert(conn: &mut PgConnection, fine: &Fine) -> AppResult<Fine> {
        let created = sqlx::query_as::<_, Fine>(&format!(
            r#"
            INSERT INTO fines (id, borrow_record_id, amount, reason, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            FINE_COLUMNS
        ))
        .bind(fine.id)
        .bind(fine.borrow_record_id)
        .bind(fine.amount)
        .bind(&fine.reason)
        .bind(fine.status)
        .bind(fine.created_at)
        .bind(fine.updated_at)
        .fetch_one(conn)
        .await?;

        Ok(created)
    }

    /// PENDING -> PAID / WAIVED under a row lock
    pub async fn settle(&self, id: Uuid, action: FineAction) -> AppResult<Fine> {
        let mut tx = self.pool.begin().await?;

        let fine = sqlx::query_as::<_, Fine>(&format!(
            "SELECT {} FROM fines WHERE id = $1 FOR UPDATE",
            FINE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Fine with id {} not found", id)))?;

        let next = fine.status.apply(action)?;

        let updated = sqlx::query_as::<_, Fine>(&format!(
            "UPDATE fines SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            FINE_COLUMNS
        ))
        .bind(id)
        .bind(next)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }
}
