//! Overdue fines

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::text_column;
use crate::error::TransitionError;

pub const OVERDUE_REASON: &str = "OVERDUE";

/// Fine status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FineStatus {
    Pending,
    Paid,
    Waived,
}

impl FineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FineStatus::Pending => "PENDING",
            FineStatus::Paid => "PAID",
            FineStatus::Waived => "WAIVED",
        }
    }

    /// PENDING is the only status a fine can leave
    pub fn apply(self, action: FineAction) -> Result<FineStatus, TransitionError> {
        match (self, action) {
            (FineStatus::Pending, FineAction::Pay) => Ok(FineStatus::Paid),
            (FineStatus::Pending, FineAction::Waive) => Ok(FineStatus::Waived),
            (current, action) => Err(TransitionError::FineNotPending {
                action: match action {
                    FineAction::Pay => "paid",
                    FineAction::Waive => "waived",
                },
                current,
            }),
        }
    }
}

impl std::fmt::Display for FineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FineStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(FineStatus::Pending),
            "PAID" => Ok(FineStatus::Paid),
            "WAIVED" => Ok(FineStatus::Waived),
            _ => Err(format!("Invalid fine status: {}", s)),
        }
    }
}

text_column!(FineStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FineAction {
    Pay,
    Waive,
}

/// Fine model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Fine {
    pub id: Uuid,
    pub borrow_record_id: Uuid,
    pub amount: Decimal,
    pub reason: String,
    pub status: FineStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Fine {
    pub fn overdue(borrow_record_id: Uuid, amount: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            borrow_record_id,
            amount,
            reason: OVERDUE_REASON.to_string(),
            status: FineStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fine joined with the borrower and book it was charged for
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FineDetails {
    pub id: Uuid,
    pub borrow_record_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub book_id: Uuid,
    pub book_title: String,
    pub amount: Decimal,
    pub reason: String,
    pub status: FineStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fine list filter
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct FineQuery {
    pub status: Option<FineStatus>,
}

/// When a return is late, and by how much
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinePolicy {
    /// Days a book may be kept without a fine
    pub grace_period_days: i64,
    /// Charged per day beyond the grace period
    pub daily_rate: Decimal,
}

impl FinePolicy {
    /// Fine owed for a loan running from `borrowed` to `returned`, if any.
    ///
    /// Amounts are rounded to cents; anything that rounds to zero or below
    /// is no fine at all.
    pub fn assess(&self, borrowed: NaiveDate, returned: NaiveDate) -> Option<Decimal> {
        let days = (returned - borrowed).num_days();
        if days <= self.grace_period_days {
            return None;
        }
        let overdue_days = days - self.grace_period_days;
        let amount = (self.daily_rate * Decimal::from(overdue_days)).round_dp(2);
        (amount > Decimal::ZERO).then_some(amount)
    }
}

impl Default for FinePolicy {
    fn default() -> Self {
        Self {
            grace_period_days: 14,
            daily_rate: Decimal::new(200, 2),
        }
    }
}
