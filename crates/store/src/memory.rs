//! In-memory store for dev and tests.
//!
//! One mutex guards all process state, so every operation (including the
//! multi-step approval) is atomic by construction. This backend is the
//! executable model the Postgres backend is tested against.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use idealab_core::{DomainError, DomainResult, IdeaId, IncubationId, ItemId, RequestId, UserId};
use idealab_ideas::{Idea, IdeaStatus};
use idealab_incubation::{IncubationJob, JobStatus};
use idealab_inventory::{
    InventoryItem, InventoryRequest, ItemPatch, LineView, RequestStatus, RequestView, check_stock,
};

use crate::traits::{CatalogStore, IdeaStore, IncubationStore, RequestStore};

#[derive(Debug, Default)]
struct State {
    items: HashMap<ItemId, InventoryItem>,
    requests: HashMap<RequestId, InventoryRequest>,
    ideas: HashMap<IdeaId, Idea>,
    jobs: HashMap<IncubationId, IncubationJob>,
}

/// All four stores over a single in-process mutex.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> DomainResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| DomainError::storage("state lock poisoned"))
    }
}

fn view_of(state: &State, request: &InventoryRequest) -> DomainResult<RequestView> {
    let mut lines = Vec::with_capacity(request.lines.len());
    for line in &request.lines {
        let item = state
            .items
            .get(&line.item_id)
            .ok_or_else(|| DomainError::storage("request line references missing item"))?;
        lines.push(LineView {
            item_id: line.item_id,
            item_name: item.name.clone(),
            quantity: line.quantity,
        });
    }
    Ok(RequestView {
        id: request.id,
        user_id: request.user_id,
        requester: request.requester.clone(),
        status: request.status,
        created_at: request.created_at,
        lines,
    })
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn create_item(&self, item: InventoryItem) -> DomainResult<()> {
        self.lock()?.items.insert(item.id, item);
        Ok(())
    }

    async fn get_item(&self, id: ItemId) -> DomainResult<InventoryItem> {
        self.lock()?.items.get(&id).cloned().ok_or(DomainError::NotFound)
    }

    async fn list_active(&self) -> DomainResult<Vec<InventoryItem>> {
        let state = self.lock()?;
        let mut items: Vec<InventoryItem> =
            state.items.values().filter(|i| i.is_active).cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn update_item(&self, id: ItemId, patch: ItemPatch) -> DomainResult<InventoryItem> {
        let mut state = self.lock()?;
        let item = state.items.get_mut(&id).ok_or(DomainError::NotFound)?;
        item.apply_patch(patch)?;
        Ok(item.clone())
    }

    async fn adjust_available(&self, id: ItemId, delta: i64) -> DomainResult<i64> {
        let mut state = self.lock()?;
        let item = state.items.get_mut(&id).ok_or(DomainError::NotFound)?;
        item.adjust_available(delta)
    }
}

#[async_trait]
impl RequestStore for InMemoryStore {
    async fn insert_request(&self, request: &InventoryRequest) -> DomainResult<()> {
        let mut state = self.lock()?;
        // Every line must reference a known item, or the request could never
        // be viewed or approved.
        for line in &request.lines {
            if !state.items.contains_key(&line.item_id) {
                return Err(DomainError::NotFound);
            }
        }
        state.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn get_request(&self, id: RequestId) -> DomainResult<RequestView> {
        let state = self.lock()?;
        let request = state.requests.get(&id).ok_or(DomainError::NotFound)?;
        view_of(&state, request)
    }

    async fn approve_request(&self, id: RequestId) -> DomainResult<RequestView> {
        let mut state = self.lock()?;

        let request = state.requests.get(&id).ok_or(DomainError::NotFound)?.clone();
        request.ensure_submitted()?;

        // Nothing below mutates until every line has passed.
        check_stock(&request.lines, |item_id| {
            state
                .items
                .get(&item_id)
                .map(|i| (i.name.clone(), i.quantity_available))
        })?;

        for line in &request.lines {
            let item = state
                .items
                .get_mut(&line.item_id)
                .ok_or_else(|| DomainError::storage("request line references missing item"))?;
            item.quantity_available -= line.quantity;
        }

        let stored = state.requests.get_mut(&id).ok_or(DomainError::NotFound)?;
        stored.approve()?;
        let stored = stored.clone();
        view_of(&state, &stored)
    }

    async fn reject_request(&self, id: RequestId) -> DomainResult<RequestView> {
        let mut state = self.lock()?;
        let request = state.requests.get_mut(&id).ok_or(DomainError::NotFound)?;
        request.reject()?;
        let request = request.clone();
        view_of(&state, &request)
    }

    async fn cancel_request(&self, id: RequestId, by: UserId) -> DomainResult<RequestView> {
        let mut state = self.lock()?;
        let request = state.requests.get_mut(&id).ok_or(DomainError::NotFound)?;
        request.cancel(by)?;
        let request = request.clone();
        view_of(&state, &request)
    }

    async fn list_requests_for_user(&self, user_id: UserId) -> DomainResult<Vec<RequestView>> {
        let state = self.lock()?;
        let mut views: Vec<RequestView> = state
            .requests
            .values()
            .filter(|r| r.user_id == user_id)
            .map(|r| view_of(&state, r))
            .collect::<DomainResult<_>>()?;
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(views)
    }

    async fn list_requests(&self, status: Option<RequestStatus>) -> DomainResult<Vec<RequestView>> {
        let state = self.lock()?;
        let mut views: Vec<RequestView> = state
            .requests
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .map(|r| view_of(&state, r))
            .collect::<DomainResult<_>>()?;
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(views)
    }
}

#[async_trait]
impl IdeaStore for InMemoryStore {
    async fn insert_idea(&self, idea: &Idea) -> DomainResult<()> {
        self.lock()?.ideas.insert(idea.id, idea.clone());
        Ok(())
    }

    async fn advance_idea(&self, id: IdeaId, next: IdeaStatus) -> DomainResult<Idea> {
        let mut state = self.lock()?;
        let idea = state.ideas.get_mut(&id).ok_or(DomainError::NotFound)?;
        idea.advance(next)?;
        Ok(idea.clone())
    }

    async fn list_ideas(&self, user_id: Option<UserId>) -> DomainResult<Vec<Idea>> {
        let state = self.lock()?;
        let mut ideas: Vec<Idea> = state
            .ideas
            .values()
            .filter(|i| user_id.is_none_or(|u| i.user_id == u))
            .cloned()
            .collect();
        ideas.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(ideas)
    }
}

#[async_trait]
impl IncubationStore for InMemoryStore {
    async fn insert_job(&self, job: &IncubationJob) -> DomainResult<()> {
        self.lock()?.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn advance_job(&self, id: IncubationId, next: JobStatus) -> DomainResult<IncubationJob> {
        let mut state = self.lock()?;
        let job = state.jobs.get_mut(&id).ok_or(DomainError::NotFound)?;
        job.advance(next)?;
        Ok(job.clone())
    }

    async fn cancel_job(&self, id: IncubationId, by: UserId) -> DomainResult<IncubationJob> {
        let mut state = self.lock()?;
        let job = state.jobs.get_mut(&id).ok_or(DomainError::NotFound)?;
        job.cancel(by)?;
        Ok(job.clone())
    }

    async fn list_jobs(&self, user_id: Option<UserId>) -> DomainResult<Vec<IncubationJob>> {
        let state = self.lock()?;
        let mut jobs: Vec<IncubationJob> = state
            .jobs
            .values()
            .filter(|j| user_id.is_none_or(|u| j.user_id == u))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use idealab_inventory::{ItemDraft, RequesterInfo};

    use super::*;

    fn requester() -> RequesterInfo {
        RequesterInfo {
            name: "Rahul".to_string(),
            department: "ME".to_string(),
            phone: "9800000000".to_string(),
            purpose: "mini sumo robot".to_string(),
        }
    }

    async fn seed_item(store: &InMemoryStore, name: &str, total: i64) -> ItemId {
        let item = InventoryItem::create(
            ItemId::new(),
            ItemDraft {
                name: name.to_string(),
                category: "general".to_string(),
                description: String::new(),
                quantity_total: total,
            },
            Utc::now(),
        )
        .unwrap();
        let id = item.id;
        store.create_item(item).await.unwrap();
        id
    }

    async fn seed_request(
        store: &InMemoryStore,
        user_id: UserId,
        lines: Vec<(ItemId, i64)>,
    ) -> RequestId {
        let request =
            InventoryRequest::submit(RequestId::new(), user_id, requester(), lines, Utc::now())
                .unwrap();
        let id = request.id;
        store.insert_request(&request).await.unwrap();
        id
    }

    #[tokio::test]
    async fn approve_decrements_stock_and_marks_approved() {
        let store = InMemoryStore::new();
        let item = seed_item(&store, "Raspberry Pi", 5).await;
        let request = seed_request(&store, UserId::new(), vec![(item, 3)]).await;

        let view = store.approve_request(request).await.unwrap();
        assert_eq!(view.status, RequestStatus::Approved);
        assert_eq!(store.get_item(item).await.unwrap().quantity_available, 2);
    }

    #[tokio::test]
    async fn failed_approval_changes_nothing() {
        let store = InMemoryStore::new();
        let scarce = seed_item(&store, "Raspberry Pi", 2).await;
        let plentiful = seed_item(&store, "Breadboard", 20).await;
        let request = seed_request(&store, UserId::new(), vec![(scarce, 3), (plentiful, 1)]).await;

        let err = store.approve_request(request).await.unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock("Raspberry Pi"));

        // All-or-nothing: neither item moved, status still submitted.
        assert_eq!(store.get_item(scarce).await.unwrap().quantity_available, 2);
        assert_eq!(store.get_item(plentiful).await.unwrap().quantity_available, 20);
        assert_eq!(
            store.get_request(request).await.unwrap().status,
            RequestStatus::Submitted
        );

        // Still rejectable afterwards, with no stock effect.
        let view = store.reject_request(request).await.unwrap();
        assert_eq!(view.status, RequestStatus::Rejected);
        assert_eq!(store.get_item(scarce).await.unwrap().quantity_available, 2);
    }

    #[tokio::test]
    async fn approving_twice_never_spends_stock_twice() {
        let store = InMemoryStore::new();
        let item = seed_item(&store, "Multimeter", 10).await;
        let request = seed_request(&store, UserId::new(), vec![(item, 4)]).await;

        store.approve_request(request).await.unwrap();
        let err = store.approve_request(request).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        assert_eq!(store.get_item(item).await.unwrap().quantity_available, 6);
    }

    #[tokio::test]
    async fn cancel_is_owner_scoped_and_terminal() {
        let store = InMemoryStore::new();
        let item = seed_item(&store, "Servo Motor", 4).await;
        let owner = UserId::new();
        let request = seed_request(&store, owner, vec![(item, 1)]).await;

        let err = store.cancel_request(request, UserId::new()).await.unwrap_err();
        assert_eq!(err, DomainError::Forbidden);

        store.cancel_request(request, owner).await.unwrap();
        assert!(matches!(
            store.cancel_request(request, owner).await.unwrap_err(),
            DomainError::InvalidState(_)
        ));
        // A cancelled request cannot be approved either.
        assert!(matches!(
            store.approve_request(request).await.unwrap_err(),
            DomainError::InvalidState(_)
        ));
    }

    #[tokio::test]
    async fn reads_are_unchanged_by_a_failed_approval() {
        let store = InMemoryStore::new();
        let item = seed_item(&store, "LiPo Battery", 1).await;
        let user = UserId::new();
        seed_request(&store, user, vec![(item, 5)]).await;

        let before = store.list_requests_for_user(user).await.unwrap();
        let _ = store.approve_request(before[0].id).await.unwrap_err();
        let after = store.list_requests_for_user(user).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn competing_approvals_never_oversell_an_item() {
        let store = Arc::new(InMemoryStore::new());
        let item = seed_item(&store, "Laser Module", 4).await;
        let r1 = seed_request(&store, UserId::new(), vec![(item, 4)]).await;
        let r2 = seed_request(&store, UserId::new(), vec![(item, 4)]).await;

        let (a, b) = tokio::join!(
            {
                let store = store.clone();
                tokio::spawn(async move { store.approve_request(r1).await })
            },
            {
                let store = store.clone();
                tokio::spawn(async move { store.approve_request(r2).await })
            },
        );
        let results = [a.unwrap(), b.unwrap()];

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(DomainError::InsufficientStock { .. })
        )));
        assert_eq!(store.get_item(item).await.unwrap().quantity_available, 0);
    }

    #[tokio::test]
    async fn submitting_a_request_for_an_unknown_item_is_not_found() {
        let store = InMemoryStore::new();
        let known = seed_item(&store, "Breadboard", 5).await;

        let request = InventoryRequest::submit(
            RequestId::new(),
            UserId::new(),
            requester(),
            vec![(known, 1), (ItemId::new(), 1)],
            Utc::now(),
        )
        .unwrap();

        let err = store.insert_request(&request).await.unwrap_err();
        assert_eq!(err, DomainError::NotFound);
        // Nothing was persisted, so the request is not half-visible.
        assert_eq!(
            store.get_request(request.id).await.unwrap_err(),
            DomainError::NotFound
        );
    }

    #[tokio::test]
    async fn adjust_available_reports_unknown_items() {
        let store = InMemoryStore::new();
        assert_eq!(
            store.adjust_available(ItemId::new(), 1).await.unwrap_err(),
            DomainError::NotFound
        );
    }

    #[tokio::test]
    async fn catalog_listing_is_active_only_and_name_ordered() {
        let store = InMemoryStore::new();
        let b = seed_item(&store, "Breadboard", 5).await;
        let _a = seed_item(&store, "Arduino Uno", 5).await;
        store
            .update_item(
                b,
                ItemPatch {
                    is_active: Some(false),
                    ..ItemPatch::default()
                },
            )
            .await
            .unwrap();

        let listed = store.list_active().await.unwrap();
        assert_eq!(
            listed.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
            vec!["Arduino Uno"]
        );
    }
}
