//! Books repository for database operations

use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery},
};

use super::{contains_pattern, page_bounds};

const BOOK_COLUMNS: &str = "id, title, author, genre, isbn, publisher, publication_date, \
                            total_copies, available_copies, created_at, updated_at";

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Search books with filters and pagination, ordered by title
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let (limit, offset) = page_bounds(query.page, query.per_page);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books WHERE TRUE");
        push_book_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM books WHERE TRUE",
            BOOK_COLUMNS
        ));
        push_book_filters(&mut select, query);
        select
            .push(" ORDER BY title, id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let books = select.build_query_as::<Book>().fetch_all(&self.pool).await?;

        Ok((books, total))
    }

    /// Insert a new book
    pub async fn create(&self, book: &Book) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (
                id, title, author, genre, isbn, publisher, publication_date,
                total_copies, available_copies, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.publication_date)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(book.created_at)
        .bind(book.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Apply an edit under a row lock.
    ///
    /// The counter may be moved by a concurrent approval or return, so the
    /// edit is applied to the locked row rather than to a stale copy.
    pub async fn update_with<F>(&self, id: Uuid, edit: F) -> AppResult<Book>
    where
        F: FnOnce(&mut Book) -> AppResult<()>,
    {
        let mut tx = self.pool.begin().await?;

        let mut book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE id = $1 FOR UPDATE",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        edit(&mut book)?;

        let updated = sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books SET
                title = $2, author = $3, genre = $4, isbn = $5, publisher = $6,
                publication_date = $7, total_copies = $8, available_copies = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.publication_date)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a book that has no copy out and no open request.
    ///
    /// Locks the book's borrow records before the book itself, the same
    /// order borrow transitions use, since the delete cascades to them.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM borrow_records WHERE book_id = $1 FOR UPDATE")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE id = $1 FOR UPDATE",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        if book.lent_out() > 0 {
            return Err(AppError::BusinessRule(format!(
                "Cannot delete book with {} borrowed copies",
                book.lent_out()
            )));
        }

        let open_requests: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE book_id = $1 AND status IN ('PENDING', 'APPROVED')",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if open_requests > 0 {
            return Err(AppError::BusinessRule(format!(
                "Cannot delete book with {} open borrow requests",
                open_requests
            )));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn push_book_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &BookQuery) {
    if let Some(ref q) = query.q {
        let pattern = contains_pattern(q);
        builder
            .push(" AND (LOWER(title) LIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR LOWER(author) LIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR LOWER(COALESCE(genre, '')) LIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR LOWER(COALESCE(isbn, '')) LIKE ")
            .push_bind(pattern)
            .push(r" ESCAPE '\')");
    }
    if let Some(ref title) = query.title {
        builder
            .push(" AND LOWER(title) LIKE ")
            .push_bind(contains_pattern(title))
            .push(r" ESCAPE '\'");
    }
    if let Some(ref author) = query.author {
        builder
            .push(" AND LOWER(author) LIKE ")
            .push_bind(contains_pattern(author))
            .push(r" ESCAPE '\'");
    }
    if let Some(ref genre) = query.genre {
        builder
            .push(" AND LOWER(genre) LIKE ")
            .push_bind(contains_pattern(genre))
            .push(r" ESCAPE '\'");
    }
    if let Some(ref isbn) = query.isbn {
        builder.push(" AND isbn = ").push_bind(isbn.clone());
    }
    match query.available {
        Some(true) => {
            builder.push(" AND available_copies > 0");
        }
        Some(false) => {
            builder.push(" AND available_copies = 0");
        }
        None => {}
    }
}
