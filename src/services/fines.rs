//! Fines service

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        fine::{Fine, FineAction, FineDetails, FineStatus},
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct FinesService {
    repository: Repository,
}

impl FinesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Fines charged to one user
    pub async fn list_for_user(&self, user_id: Uuid, status: Option<FineStatus>) -> AppResult<Vec<FineDetails>> {
        self.repository.fines.list(Some(user_id), status).await
    }

    /// Every fine in the system
    pub async fn list_all(&self, status: Option<FineStatus>) -> AppResult<Vec<FineDetails>> {
        self.repository.fines.list(None, status).await
    }

    /// Pay a pending fine. Members may only pay their own.
    pub async fn pay(&self, id: Uuid, caller: &UserClaims) -> AppResult<Fine> {
        let details = self.repository.fines.get_details(id).await?;
        caller.require_owner_or_admin(details.user_id)?;

        let fine = self.repository.fines.settle(id, FineAction::Pay).await?;
        tracing::info!(fine_id = %id, amount = %fine.amount, paid_by = %caller.user_id(), "Fine paid");
        Ok(fine)
    }

    /// Waive a pending fine (admin)
    pub async fn waive(&self, id: Uuid) -> AppResult<Fine> {
        let fine = self.repository.fines.settle(id, FineAction::Waive).await?;
        tracing::info!(fine_id = %id, "Fine waived");
        Ok(fine)
    }
}
