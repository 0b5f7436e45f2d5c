//! Infrastructure wiring and workflow orchestration.
//!
//! `AppServices` owns the four store handles (dependency-injected, never
//! global), the event bus, and the realtime broadcast channel feeding SSE
//! clients. Route handlers call these methods and map errors at the edge.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use idealab_core::{
    DomainResult, IdeaId, IncubationId, ItemId, RequestId, UserId,
};
use idealab_events::{Event, EventBus, EventEnvelope, InMemoryEventBus};
use idealab_ideas::{Idea, IdeaDraft, IdeaStatus, idea};
use idealab_incubation::{IncubationJob, JobDraft, JobStatus, job};
use idealab_inventory::{
    InventoryItem, InventoryRequest, ItemDraft, ItemPatch, RequestStatus, RequestView,
    RequesterInfo, item, request,
};
use idealab_store::{
    CatalogStore, IdeaStore, IncubationStore, InMemoryStore, PostgresStore, RequestStore,
};

use crate::config::Config;

/// Application services: stores + event distribution.
pub struct AppServices {
    catalog: Arc<dyn CatalogStore>,
    requests: Arc<dyn RequestStore>,
    ideas: Arc<dyn IdeaStore>,
    incubation: Arc<dyn IncubationStore>,
    bus: Arc<InMemoryEventBus<EventEnvelope>>,
    realtime_tx: broadcast::Sender<EventEnvelope>,
}

/// Build services against Postgres when configured, the in-memory store
/// otherwise.
pub async fn build_services(config: &Config) -> DomainResult<AppServices> {
    match &config.database_url {
        Some(url) => {
            let store = Arc::new(PostgresStore::connect(url).await?);
            store.migrate().await?;
            tracing::info!("connected to postgres store");
            Ok(AppServices::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store,
            ))
        }
        None => {
            let store = Arc::new(InMemoryStore::new());
            Ok(AppServices::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store,
            ))
        }
    }
}

impl AppServices {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        requests: Arc<dyn RequestStore>,
        ideas: Arc<dyn IdeaStore>,
        incubation: Arc<dyn IncubationStore>,
    ) -> Self {
        let bus: Arc<InMemoryEventBus<EventEnvelope>> = Arc::new(InMemoryEventBus::new());

        // Realtime channel (SSE): lossy broadcast, fed from the bus below.
        let (realtime_tx, _realtime_rx) = broadcast::channel::<EventEnvelope>(256);

        // Background subscriber: bus -> SSE broadcast.
        {
            let sub = bus.subscribe();
            let tx = realtime_tx.clone();
            tokio::task::spawn_blocking(move || {
                loop {
                    match sub.recv() {
                        Ok(envelope) => {
                            // Lossy; no backpressure on workflows.
                            let _ = tx.send(envelope);
                        }
                        Err(_) => break,
                    }
                }
            });
        }

        Self {
            catalog,
            requests,
            ideas,
            incubation,
            bus,
            realtime_tx,
        }
    }

    /// Publish a domain event. State is already committed by the time this
    /// runs, so a failed notification is logged and dropped, never bubbled.
    fn publish<E: Event + Serialize>(&self, event: &E) {
        match EventEnvelope::from_event(event) {
            Ok(envelope) => {
                if let Err(e) = self.bus.publish(envelope) {
                    tracing::warn!("event publish failed: {e:?}");
                }
            }
            Err(e) => tracing::warn!("event serialization failed: {e}"),
        }
    }

    // -------------------------
    // Catalog
    // -------------------------

    pub async fn create_item(&self, draft: ItemDraft) -> DomainResult<InventoryItem> {
        let created = InventoryItem::create(ItemId::new(), draft, Utc::now())?;
        self.catalog.create_item(created.clone()).await?;
        self.publish(&item::CatalogEvent::ItemCreated(item::ItemCreated {
            item_id: created.id,
            name: created.name.clone(),
            occurred_at: created.created_at,
        }));
        Ok(created)
    }

    pub async fn list_items(&self) -> DomainResult<Vec<InventoryItem>> {
        self.catalog.list_active().await
    }

    pub async fn update_item(&self, id: ItemId, patch: ItemPatch) -> DomainResult<InventoryItem> {
        let updated = self.catalog.update_item(id, patch).await?;
        self.publish(&item::CatalogEvent::ItemUpdated(item::ItemUpdated {
            item_id: id,
            occurred_at: Utc::now(),
        }));
        Ok(updated)
    }

    pub async fn adjust_item(&self, id: ItemId, delta: i64) -> DomainResult<i64> {
        let available = self.catalog.adjust_available(id, delta).await?;
        self.publish(&item::CatalogEvent::StockAdjusted(item::StockAdjusted {
            item_id: id,
            delta,
            quantity_available: available,
            occurred_at: Utc::now(),
        }));
        Ok(available)
    }

    // -------------------------
    // Inventory requests
    // -------------------------

    pub async fn submit_request(
        &self,
        user_id: UserId,
        requester: RequesterInfo,
        lines: Vec<(ItemId, i64)>,
    ) -> DomainResult<RequestView> {
        let submitted =
            InventoryRequest::submit(RequestId::new(), user_id, requester, lines, Utc::now())?;
        self.requests.insert_request(&submitted).await?;
        self.publish(&request::RequestEvent::Submitted(request::RequestSubmitted {
            request_id: submitted.id,
            user_id,
            occurred_at: submitted.created_at,
        }));
        self.requests.get_request(submitted.id).await
    }

    pub async fn approve_request(&self, id: RequestId) -> DomainResult<RequestView> {
        let view = self.requests.approve_request(id).await?;
        self.publish(&request::RequestEvent::Approved(request::RequestApproved {
            request_id: id,
            occurred_at: Utc::now(),
        }));
        Ok(view)
    }

    pub async fn reject_request(&self, id: RequestId) -> DomainResult<RequestView> {
        let view = self.requests.reject_request(id).await?;
        self.publish(&request::RequestEvent::Rejected(request::RequestRejected {
            request_id: id,
            occurred_at: Utc::now(),
        }));
        Ok(view)
    }

    pub async fn cancel_request(&self, id: RequestId, by: UserId) -> DomainResult<RequestView> {
        let view = self.requests.cancel_request(id, by).await?;
        self.publish(&request::RequestEvent::Cancelled(request::RequestCancelled {
            request_id: id,
            user_id: by,
            occurred_at: Utc::now(),
        }));
        Ok(view)
    }

    pub async fn request(&self, id: RequestId) -> DomainResult<RequestView> {
        self.requests.get_request(id).await
    }

    pub async fn requests_for_user(&self, user_id: UserId) -> DomainResult<Vec<RequestView>> {
        self.requests.list_requests_for_user(user_id).await
    }

    pub async fn all_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> DomainResult<Vec<RequestView>> {
        self.requests.list_requests(status).await
    }

    // -------------------------
    // Ideas
    // -------------------------

    pub async fn submit_idea(&self, user_id: UserId, draft: IdeaDraft) -> DomainResult<Idea> {
        let submitted = Idea::submit(IdeaId::new(), user_id, draft, Utc::now())?;
        self.ideas.insert_idea(&submitted).await?;
        self.publish(&idea::IdeaEvent::Submitted(idea::IdeaSubmitted {
            idea_id: submitted.id,
            user_id,
            occurred_at: submitted.created_at,
        }));
        Ok(submitted)
    }

    pub async fn advance_idea(&self, id: IdeaId, next: IdeaStatus) -> DomainResult<Idea> {
        let advanced = self.ideas.advance_idea(id, next).await?;
        self.publish(&idea::IdeaEvent::StatusChanged(idea::IdeaStatusChanged {
            idea_id: id,
            status: advanced.status,
            occurred_at: Utc::now(),
        }));
        Ok(advanced)
    }

    pub async fn list_ideas(&self, user_id: Option<UserId>) -> DomainResult<Vec<Idea>> {
        self.ideas.list_ideas(user_id).await
    }

    // -------------------------
    // Incubation
    // -------------------------

    pub async fn submit_job(&self, user_id: UserId, draft: JobDraft) -> DomainResult<IncubationJob> {
        let submitted = IncubationJob::submit(IncubationId::new(), user_id, draft, Utc::now())?;
        self.incubation.insert_job(&submitted).await?;
        self.publish(&job::IncubationEvent::Submitted(job::JobSubmitted {
            job_id: submitted.id,
            user_id,
            machine: submitted.machine,
            occurred_at: submitted.created_at,
        }));
        Ok(submitted)
    }

    pub async fn advance_job(
        &self,
        id: IncubationId,
        next: JobStatus,
    ) -> DomainResult<IncubationJob> {
        let advanced = self.incubation.advance_job(id, next).await?;
        self.publish(&job::IncubationEvent::StatusChanged(job::JobStatusChanged {
            job_id: id,
            status: advanced.status,
            occurred_at: Utc::now(),
        }));
        Ok(advanced)
    }

    pub async fn cancel_job(&self, id: IncubationId, by: UserId) -> DomainResult<IncubationJob> {
        let cancelled = self.incubation.cancel_job(id, by).await?;
        self.publish(&job::IncubationEvent::StatusChanged(job::JobStatusChanged {
            job_id: id,
            status: cancelled.status,
            occurred_at: Utc::now(),
        }));
        Ok(cancelled)
    }

    pub async fn list_jobs(&self, user_id: Option<UserId>) -> DomainResult<Vec<IncubationJob>> {
        self.incubation.list_jobs(user_id).await
    }
}

/// SSE stream of event envelopes for connected admin screens.
pub fn sse_stream(
    services: Arc<AppServices>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx.subscribe();
    let stream = BroadcastStream::new(rx)
        .filter_map(|message| message.ok())
        .map(|envelope| {
            Ok(SseEvent::default()
                .event(envelope.event_type().to_string())
                .data(serde_json::to_string(&envelope).unwrap_or_default()))
        });
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
