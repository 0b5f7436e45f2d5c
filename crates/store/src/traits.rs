//! Store contracts, one trait per bounded context.
//!
//! All methods return [`DomainResult`]; backends map their transport errors
//! to `DomainError::Storage` and never panic.

use async_trait::async_trait;

use idealab_core::{DomainResult, IdeaId, IncubationId, ItemId, RequestId, UserId};
use idealab_ideas::{Idea, IdeaStatus};
use idealab_incubation::{IncubationJob, JobStatus};
use idealab_inventory::{InventoryItem, InventoryRequest, ItemPatch, RequestStatus, RequestView};

/// Catalog of lendable items.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_item(&self, item: InventoryItem) -> DomainResult<()>;

    async fn get_item(&self, id: ItemId) -> DomainResult<InventoryItem>;

    /// Active items only, ordered by name.
    async fn list_active(&self) -> DomainResult<Vec<InventoryItem>>;

    async fn update_item(&self, id: ItemId, patch: ItemPatch) -> DomainResult<InventoryItem>;

    /// Admin stock delta; returns the new `quantity_available`.
    /// `NotFound` on an unknown id.
    async fn adjust_available(&self, id: ItemId, delta: i64) -> DomainResult<i64>;
}

/// Inventory requests and the guarded approval path.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Persist a freshly submitted request plus its lines. Stock untouched.
    async fn insert_request(&self, request: &InventoryRequest) -> DomainResult<()>;

    async fn get_request(&self, id: RequestId) -> DomainResult<RequestView>;

    /// The one multi-step, must-be-atomic operation in the system.
    /// Status guard, per-line stock validation, decrement and status write
    /// all commit together or not at all.
    async fn approve_request(&self, id: RequestId) -> DomainResult<RequestView>;

    /// Status guard then status write. No stock effect ever.
    async fn reject_request(&self, id: RequestId) -> DomainResult<RequestView>;

    /// Owner-only withdrawal while still submitted. No stock effect.
    async fn cancel_request(&self, id: RequestId, by: UserId) -> DomainResult<RequestView>;

    /// Requester's own requests, newest first.
    async fn list_requests_for_user(&self, user_id: UserId) -> DomainResult<Vec<RequestView>>;

    /// Admin list, optionally filtered by status, newest first.
    async fn list_requests(&self, status: Option<RequestStatus>) -> DomainResult<Vec<RequestView>>;
}

/// Idea submissions.
#[async_trait]
pub trait IdeaStore: Send + Sync {
    async fn insert_idea(&self, idea: &Idea) -> DomainResult<()>;

    async fn advance_idea(&self, id: IdeaId, next: IdeaStatus) -> DomainResult<Idea>;

    async fn list_ideas(&self, user_id: Option<UserId>) -> DomainResult<Vec<Idea>>;
}

/// Incubation jobs.
#[async_trait]
pub trait IncubationStore: Send + Sync {
    async fn insert_job(&self, job: &IncubationJob) -> DomainResult<()>;

    async fn advance_job(&self, id: IncubationId, next: JobStatus) -> DomainResult<IncubationJob>;

    async fn cancel_job(&self, id: IncubationId, by: UserId) -> DomainResult<IncubationJob>;

    async fn list_jobs(&self, user_id: Option<UserId>) -> DomainResult<Vec<IncubationJob>>;
}
