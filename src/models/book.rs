//! Book (catalog entry) model and its copy counter

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, TransitionError};

/// Book model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    /// ISBN or any other identifying code
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub total_copies: i32,
    /// Copies currently on the shelf; only moved by borrow approvals and returns
    pub available_copies: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Build a new catalog entry with every copy on the shelf
    pub fn new(data: CreateBook, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: data.title,
            author: data.author,
            genre: data.genre,
            isbn: data.isbn,
            publisher: data.publisher,
            publication_date: data.publication_date,
            total_copies: data.total_copies,
            available_copies: data.total_copies,
            created_at: now,
            updated_at: now,
        }
    }

    /// Number of copies currently lent out
    pub fn lent_out(&self) -> i32 {
        self.total_copies - self.available_copies
    }

    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    /// Take one copy off the shelf
    pub fn take_copy(&mut self) -> Result<(), TransitionError> {
        if self.available_copies <= 0 {
            return Err(TransitionError::NoAvailableCopies);
        }
        self.available_copies -= 1;
        Ok(())
    }

    /// Put one copy back on the shelf
    pub fn restore_copy(&mut self) -> Result<(), TransitionError> {
        if self.available_copies >= self.total_copies {
            return Err(TransitionError::AllCopiesOnShelf);
        }
        self.available_copies += 1;
        Ok(())
    }

    /// Change the number of copies owned, keeping the lent-out count unchanged
    pub fn resize(&mut self, new_total: i32) -> Result<(), AppError> {
        let lent_out = self.lent_out();
        if new_total < lent_out {
            return Err(AppError::BusinessRule(format!(
                "Cannot reduce total copies to {} while {} copies are lent out",
                new_total, lent_out
            )));
        }
        self.total_copies = new_total;
        self.available_copies = new_total - lent_out;
        Ok(())
    }

    /// Apply a partial update from an admin
    pub fn apply_update(&mut self, update: UpdateBook) -> Result<(), AppError> {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(author) = update.author {
            self.author = author;
        }
        if let Some(genre) = update.genre {
            self.genre = Some(genre);
        }
        if let Some(isbn) = update.isbn {
            self.isbn = Some(isbn);
        }
        if let Some(publisher) = update.publisher {
            self.publisher = Some(publisher);
        }
        if let Some(date) = update.publication_date {
            self.publication_date = Some(date);
        }
        if let Some(total) = update.total_copies {
            self.resize(total)?;
        }
        Ok(())
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "Author is required"))]
    pub author: String,
    #[validate(length(max = 100))]
    pub genre: Option<String>,
    #[validate(length(max = 32))]
    pub isbn: Option<String>,
    #[validate(length(max = 255))]
    pub publisher: Option<String>,
    pub publication_date: Option<NaiveDate>,
    #[serde(default = "default_total_copies")]
    #[validate(range(min = 1, message = "A book needs at least one copy"))]
    pub total_copies: i32,
}

fn default_total_copies() -> i32 {
    1
}

/// Update book request (all fields optional)
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub author: Option<String>,
    #[validate(length(max = 100))]
    pub genre: Option<String>,
    #[validate(length(max = 32))]
    pub isbn: Option<String>,
    #[validate(length(max = 255))]
    pub publisher: Option<String>,
    pub publication_date: Option<NaiveDate>,
    #[validate(range(min = 1, message = "A book needs at least one copy"))]
    pub total_copies: Option<i32>,
}

/// Book search parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Free text over title, author, genre and ISBN
    pub q: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub isbn: Option<String>,
    /// true: only books with a copy on the shelf; false: only fully lent-out books
    pub available: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
