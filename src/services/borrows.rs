//! Borrow lifecycle service

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        borrow::{BorrowDetails, BorrowRecord, TransitionOutcome},
        fine::FinePolicy,
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowsService {
    repository: Repository,
    policy: FinePolicy,
}

impl BorrowsService {
    pub fn new(repository: Repository, policy: FinePolicy) -> Self {
        Self { repository, policy }
    }

    /// File a PENDING request for the calling member
    pub async fn request(&self, user_id: Uuid, book_id: Uuid) -> AppResult<BorrowRecord> {
        let record = self
            .repository
            .borrows
            .request(user_id, book_id, Utc::now())
            .await?;

        tracing::info!(borrow_id = %record.id, user_id = %user_id, book_id = %book_id, "Borrow requested");
        Ok(record)
    }

    /// Approve a pending request, taking a copy off the shelf
    pub async fn approve(&self, id: Uuid) -> AppResult<TransitionOutcome> {
        let outcome = self
            .repository
            .borrows
            .approve(id, Utc::now().date_naive())
            .await?;

        tracing::info!(
            borrow_id = %id,
            book_id = %outcome.record.book_id,
            available_copies = outcome.available_copies,
            "Borrow approved"
        );
        Ok(outcome)
    }

    /// Reject a pending request
    pub async fn reject(&self, id: Uuid) -> AppResult<TransitionOutcome> {
        let outcome = self.repository.borrows.reject(id).await?;
        tracing::info!(borrow_id = %id, "Borrow rejected");
        Ok(outcome)
    }

    /// Return an approved loan. Members may only return their own.
    pub async fn return_book(&self, id: Uuid, caller: &UserClaims) -> AppResult<TransitionOutcome> {
        let outcome = self
            .repository
            .borrows
            .mark_returned(id, Utc::now().date_naive(), &self.policy, |record| {
                caller.require_owner_or_admin(record.user_id)
            })
            .await?;

        match &outcome.fine {
            Some(fine) => tracing::info!(
                borrow_id = %id,
                fine_id = %fine.id,
                amount = %fine.amount,
                "Book returned late, fine charged"
            ),
            None => tracing::info!(borrow_id = %id, "Book returned"),
        }

        Ok(outcome)
    }

    /// Get a borrow record visible to the caller
    pub async fn get(&self, id: Uuid, caller: &UserClaims) -> AppResult<BorrowRecord> {
        let record = self.repository.borrows.get_by_id(id).await?;
        caller.require_owner_or_admin(record.user_id)?;
        Ok(record)
    }

    /// The caller's own borrow history
    pub async fn history(&self, user_id: Uuid, book_id: Option<Uuid>) -> AppResult<Vec<BorrowDetails>> {
        self.repository.borrows.list_for_user(user_id, book_id).await
    }

    /// Requests waiting for an admin decision
    pub async fn pending(&self) -> AppResult<Vec<BorrowDetails>> {
        self.repository.borrows.list_pending().await
    }
}
