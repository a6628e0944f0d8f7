//! Borrow records repository.
//!
//! Every transition runs in one transaction that locks the borrow record and
//! then its book (`FOR UPDATE`, always in that order). The status write, the
//! copy counter write and any fine insert commit together or not at all, and
//! two admins approving the last copy at the same time serialize on the book
//! row: the second one sees zero copies.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, TransitionError},
    models::{
        book::Book,
        borrow::{BorrowDetails, BorrowRecord, BorrowStatus, TransitionOutcome},
        fine::{Fine, FinePolicy},
    },
};

use super::{fines::FinesRepository, is_unique_violation};

const RECORD_COLUMNS: &str =
    "id, user_id, book_id, status, borrow_date, return_date, created_at, updated_at";

const DETAILS_SELECT: &str = r#"
    SELECT r.id, r.user_id, u.username, r.book_id, b.title AS book_title,
           r.status, r.borrow_date, r.return_date, r.created_at, r.updated_at
    FROM borrow_records r
    JOIN users u ON u.id = r.user_id
    JOIN books b ON b.id = r.book_id
"#;

const ONE_ACTIVE_INDEX: &str = "borrow_records_one_active_per_user_book";

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get borrow record by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<BorrowRecord> {
        sqlx::query_as::<_, BorrowRecord>(&format!(
            "SELECT {} FROM borrow_records WHERE id = $1",
            RECORD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", id)))
    }

    /// PENDING requests awaiting an admin, newest first
    pub async fn list_pending(&self) -> AppResult<Vec<BorrowDetails>> {
        let records = sqlx::query_as::<_, BorrowDetails>(&format!(
            "{} WHERE r.status = $1 ORDER BY r.created_at DESC",
            DETAILS_SELECT
        ))
        .bind(BorrowStatus::Pending)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// A user's borrow history, optionally for one book, newest first
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        book_id: Option<Uuid>,
    ) -> AppResult<Vec<BorrowDetails>> {
        let records = sqlx::query_as::<_, BorrowDetails>(&format!(
            "{} WHERE r.user_id = $1 AND ($2::uuid IS NULL OR r.book_id = $2) ORDER BY r.created_at DESC",
            DETAILS_SELECT
        ))
        .bind(user_id)
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Create a PENDING request unless the user already has an active one for this book
    pub async fn request(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<BorrowRecord> {
        let mut tx = self.pool.begin().await?;

        let book_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(book_id)
            .fetch_one(&mut *tx)
            .await?;

        if !book_exists {
            return Err(AppError::NotFound(format!("Book with id {} not found", book_id)));
        }

        let has_active: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM borrow_records
                WHERE user_id = $1 AND book_id = $2 AND status IN ('PENDING', 'APPROVED')
            )
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        if has_active {
            return Err(TransitionError::ActiveRequestExists.into());
        }

        let record = BorrowRecord::new_request(user_id, book_id, now);

        // A concurrent request can slip past the check above; the partial
        // unique index catches it.
        let created = sqlx::query_as::<_, BorrowRecord>(&format!(
            r#"
            INSERT INTO borrow_records (id, user_id, book_id, status, borrow_date, return_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            RECORD_COLUMNS
        ))
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.book_id)
        .bind(record.status)
        .bind(record.borrow_date)
        .bind(record.return_date)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, ONE_ACTIVE_INDEX) {
                AppError::from(TransitionError::ActiveRequestExists)
            } else {
                AppError::Database(e)
            }
        })?;

        tx.commit().await?;
        Ok(created)
    }

    /// PENDING -> APPROVED, decrementing the book's available copies
    pub async fn approve(&self, id: Uuid, today: NaiveDate) -> AppResult<TransitionOutcome> {
        let mut tx = self.pool.begin().await?;

        let mut record = lock_record(&mut tx, id).await?;
        let mut book = lock_book(&mut tx, record.book_id).await?;

        record.approve(&mut book, today)?;

        let record = save_record(&mut tx, &record).await?;
        save_counter(&mut tx, &book).await?;

        tx.commit().await?;

        Ok(TransitionOutcome {
            record,
            available_copies: book.available_copies,
            fine: None,
        })
    }

    /// PENDING -> REJECTED
    pub async fn reject(&self, id: Uuid) -> AppResult<TransitionOutcome> {
        let mut tx = self.pool.begin().await?;

        let mut record = lock_record(&mut tx, id).await?;
        record.reject()?;
        let record = save_record(&mut tx, &record).await?;

        let available_copies: i32 =
            sqlx::query_scalar("SELECT available_copies FROM books WHERE id = $1")
                .bind(record.book_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(TransitionOutcome {
            record,
            available_copies,
            fine: None,
        })
    }

    /// APPROVED -> RETURNED, incrementing the book's available copies and
    /// charging a fine when the loan ran past the grace period.
    ///
    /// `authorize` runs against the locked record before anything changes.
    pub async fn mark_returned<F>(
        &self,
        id: Uuid,
        today: NaiveDate,
        policy: &FinePolicy,
        authorize: F,
    ) -> AppResult<TransitionOutcome>
    where
        F: FnOnce(&BorrowRecord) -> AppResult<()>,
    {
        let mut tx = self.pool.begin().await?;

        let mut record = lock_record(&mut tx, id).await?;
        authorize(&record)?;
        let mut book = lock_book(&mut tx, record.book_id).await?;

        record.mark_returned(&mut book, today)?;

        let record = save_record(&mut tx, &record).await?;
        save_counter(&mut tx, &book).await?;

        let fine = match record.borrow_date.and_then(|borrowed| policy.assess(borrowed, today)) {
            Some(amount) => {
                let fine = Fine::overdue(record.id, amount, Utc::now());
                Some(FinesRepository::insert(&mut tx, &fine).await?)
            }
            None => None,
        };

        tx.commit().await?;

        Ok(TransitionOutcome {
            record,
            available_copies: book.available_copies,
            fine,
        })
    }
}

async fn lock_record(conn: &mut PgConnection, id: Uuid) -> AppResult<BorrowRecord> {
    sqlx::query_as::<_, BorrowRecord>(&format!(
        "SELECT {} FROM borrow_records WHERE id = $1 FOR UPDATE",
        RECORD_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", id)))
}

async fn lock_book(conn: &mut PgConnection, id: Uuid) -> AppResult<Book> {
    sqlx::query_as::<_, Book>(
        r#"
        SELECT id, title, author, genre, isbn, publisher, publication_date,
               total_copies, available_copies, created_at, updated_at
        FROM books WHERE id = $1 FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
}

async fn save_record(conn: &mut PgConnection, record: &BorrowRecord) -> AppResult<BorrowRecord> {
    let saved = sqlx::query_as::<_, BorrowRecord>(&format!(
        r#"
        UPDATE borrow_records
        SET status = $2, borrow_date = $3, return_date = $4, updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        RECORD_COLUMNS
    ))
    .bind(record.id)
    .bind(record.status)
    .bind(record.borrow_date)
    .bind(record.return_date)
    .fetch_one(conn)
    .await?;

    Ok(saved)
}

async fn save_counter(conn: &mut PgConnection, book: &Book) -> AppResult<()> {
    sqlx::query("UPDATE books SET available_copies = $2, updated_at = NOW() WHERE id = $1")
        .bind(book.id)
        .bind(book.available_copies)
        .execute(conn)
        .await?;
    Ok(())
}
