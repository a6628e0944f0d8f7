//! Borrow record model and the borrow lifecycle state machine
//!
//! ```text
//! PENDING --approve--> APPROVED --return--> RETURNED
//!    |
//!    +----reject-----> REJECTED
//! ```
//!
//! Every transition is checked against the current status before anything is
//! written. Approve and return also move the book's copy counter; callers
//! persist the record and the book together or not at all.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{book::Book, fine::Fine, text_column};
use crate::error::TransitionError;

/// Borrow record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BorrowStatus {
    Pending,
    Approved,
    Rejected,
    Returned,
}

impl BorrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::Pending => "PENDING",
            BorrowStatus::Approved => "APPROVED",
            BorrowStatus::Rejected => "REJECTED",
            BorrowStatus::Returned => "RETURNED",
        }
    }

    /// PENDING and APPROVED records count against the one-active-request rule
    pub fn is_active(&self) -> bool {
        matches!(self, BorrowStatus::Pending | BorrowStatus::Approved)
    }

    /// Statuses in which a copy has left the shelf at some point
    pub fn has_borrow_date(&self) -> bool {
        matches!(self, BorrowStatus::Approved | BorrowStatus::Returned)
    }

    /// Transition function of the lifecycle
    pub fn apply(self, action: BorrowAction) -> Result<BorrowStatus, TransitionError> {
        match (self, action) {
            (BorrowStatus::Pending, BorrowAction::Approve) => Ok(BorrowStatus::Approved),
            (BorrowStatus::Pending, BorrowAction::Reject) => Ok(BorrowStatus::Rejected),
            (BorrowStatus::Approved, BorrowAction::Return) => Ok(BorrowStatus::Returned),
            (current, BorrowAction::Return) => Err(TransitionError::NotApproved { current }),
            (current, action) => Err(TransitionError::NotPending {
                action: action.past_tense(),
                current,
            }),
        }
    }
}

impl std::fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BorrowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(BorrowStatus::Pending),
            "APPROVED" => Ok(BorrowStatus::Approved),
            "REJECTED" => Ok(BorrowStatus::Rejected),
            "RETURNED" => Ok(BorrowStatus::Returned),
            _ => Err(format!("Invalid borrow status: {}", s)),
        }
    }
}

text_column!(BorrowStatus);

/// Actions an admin or member can take on a borrow record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowAction {
    Approve,
    Reject,
    Return,
}

impl BorrowAction {
    fn past_tense(&self) -> &'static str {
        match self {
            BorrowAction::Approve => "approved",
            BorrowAction::Reject => "rejected",
            BorrowAction::Return => "returned",
        }
    }
}

/// Borrow record model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub status: BorrowStatus,
    /// Set when the request is approved
    pub borrow_date: Option<NaiveDate>,
    /// Set when the book comes back
    pub return_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BorrowRecord {
    /// A fresh PENDING request. The book's counter is untouched until approval.
    pub fn new_request(user_id: Uuid, book_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            book_id,
            status: BorrowStatus::Pending,
            borrow_date: None,
            return_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// PENDING -> APPROVED, taking one copy of `book` off the shelf
    pub fn approve(&mut self, book: &mut Book, today: NaiveDate) -> Result<(), TransitionError> {
        let next = self.status.apply(BorrowAction::Approve)?;
        book.take_copy()?;
        self.status = next;
        self.borrow_date = Some(today);
        Ok(())
    }

    /// PENDING -> REJECTED
    pub fn reject(&mut self) -> Result<(), TransitionError> {
        self.status = self.status.apply(BorrowAction::Reject)?;
        Ok(())
    }

    /// APPROVED -> RETURNED, putting the copy back on the shelf
    pub fn mark_returned(&mut self, book: &mut Book, today: NaiveDate) -> Result<(), TransitionError> {
        let next = self.status.apply(BorrowAction::Return)?;
        book.restore_copy()?;
        self.status = next;
        self.return_date = Some(today);
        Ok(())
    }

    /// Whole days between approval and return, once both are known
    pub fn days_borrowed(&self) -> Option<i64> {
        match (self.borrow_date, self.return_date) {
            (Some(borrowed), Some(returned)) => Some((returned - borrowed).num_days()),
            _ => None,
        }
    }

    /// Date fields agree with the status
    pub fn dates_consistent(&self) -> bool {
        self.borrow_date.is_some() == self.status.has_borrow_date()
            && self.return_date.is_some() == (self.status == BorrowStatus::Returned)
    }
}

/// Borrow record joined with its book and borrower, for listings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowDetails {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub book_id: Uuid,
    pub book_title: String,
    pub status: BorrowStatus,
    pub borrow_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a lifecycle transition: the updated record, the book's counter
/// after the transition, and the fine charged on a late return
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransitionOutcome {
    pub record: BorrowRecord,
    pub available_copies: i32,
    pub fine: Option<Fine>,
}

/// Borrow request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBorrowRequest {
    pub book_id: Uuid,
}

/// Filter for a member's borrow history
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BorrowHistoryQuery {
    pub book_id: Option<Uuid>,
}
