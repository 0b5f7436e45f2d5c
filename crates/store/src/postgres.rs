//! Postgres-backed store implementation.
//!
//! The approval path is the part that matters: status guard, per-line stock
//! validation, decrement and the status write all run inside one transaction,
//! with `FOR UPDATE` row locks on the affected items taken in a stable order.
//! Two approvals competing for the same stock therefore serialize at the
//! database, and the loser sees the winner's decrement before validating.
//!
//! SQLx errors are mapped to `DomainError` at this boundary: `RowNotFound`
//! and foreign-key violations become `NotFound`, everything else `Storage`.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use idealab_core::{
    DomainError, DomainResult, IdeaId, IncubationId, ItemId, LineId, RequestId, UserId,
};
use idealab_ideas::{Idea, IdeaStatus};
use idealab_incubation::{IncubationJob, JobStatus, Machine};
use idealab_inventory::{
    InventoryItem, InventoryRequest, ItemPatch, LineView, RequestLine, RequestStatus, RequestView,
    RequesterInfo, check_stock,
};

use crate::traits::{CatalogStore, IdeaStore, IncubationStore, RequestStore};

/// All four stores over a `sqlx` connection pool.
///
/// The pool is constructed by the host application and injected here; this
/// crate never reads configuration or holds global state.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with a small pool. Lifecycle belongs to the caller.
    pub async fn connect(database_url: &str) -> DomainResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply embedded migrations.
    pub async fn migrate(&self) -> DomainResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("migration failed: {e}")))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// Postgres error code for a foreign key violation. Surfaces when a request
// line references an item id that does not exist.
const FOREIGN_KEY_VIOLATION: &str = "23503";

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DomainError {
    match err {
        sqlx::Error::RowNotFound => DomainError::NotFound,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
            DomainError::NotFound
        }
        sqlx::Error::Database(db) => {
            DomainError::storage(format!("database error in {operation}: {}", db.message()))
        }
        other => DomainError::storage(format!("sqlx error in {operation}: {other}")),
    }
}

fn parse_status<T: FromStr<Err = DomainError>>(raw: &str) -> DomainResult<T> {
    raw.parse()
        .map_err(|_| DomainError::storage(format!("unexpected status value in store: {raw}")))
}

fn item_from_row(row: &PgRow) -> Result<InventoryItem, sqlx::Error> {
    Ok(InventoryItem {
        id: ItemId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        quantity_total: row.try_get("quantity_total")?,
        quantity_available: row.try_get("quantity_available")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn idea_from_row(row: &PgRow) -> DomainResult<Idea> {
    let status: String = get(row, "status")?;
    Ok(Idea {
        id: IdeaId::from_uuid(get(row, "id")?),
        user_id: UserId::from_uuid(get(row, "user_id")?),
        title: get(row, "title")?,
        description: get(row, "description")?,
        category: get(row, "category")?,
        status: parse_status::<IdeaStatus>(&status)?,
        created_at: get(row, "created_at")?,
    })
}

fn job_from_row(row: &PgRow) -> DomainResult<IncubationJob> {
    let machine: String = get(row, "machine")?;
    let status: String = get(row, "status")?;
    Ok(IncubationJob {
        id: IncubationId::from_uuid(get(row, "id")?),
        user_id: UserId::from_uuid(get(row, "user_id")?),
        machine: machine
            .parse::<Machine>()
            .map_err(|_| DomainError::storage(format!("unexpected machine value: {machine}")))?,
        title: get(row, "title")?,
        details: get(row, "details")?,
        status: parse_status::<JobStatus>(&status)?,
        created_at: get(row, "created_at")?,
    })
}

fn get<'r, T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>>(
    row: &'r PgRow,
    column: &str,
) -> DomainResult<T> {
    row.try_get(column)
        .map_err(|e| map_sqlx_error("decode_row", e))
}

#[async_trait]
impl CatalogStore for PostgresStore {
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    async fn create_item(&self, item: InventoryItem) -> DomainResult<()> {
        sqlx::query(
            r#"
            INSERT INTO items (
                id, name, category, description,
                quantity_total, quantity_available, is_active, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.name)
        .bind(&item.category)
        .bind(&item.description)
        .bind(item.quantity_total)
        .bind(item.quantity_available)
        .bind(item.is_active)
        .bind(item.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_item", e))?;
        Ok(())
    }

    async fn get_item(&self, id: ItemId) -> DomainResult<InventoryItem> {
        let row = sqlx::query("SELECT * FROM items WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_item", e))?
            .ok_or(DomainError::NotFound)?;
        item_from_row(&row).map_err(|e| map_sqlx_error("get_item", e))
    }

    async fn list_active(&self) -> DomainResult<Vec<InventoryItem>> {
        let rows = sqlx::query("SELECT * FROM items WHERE is_active ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_active", e))?;
        rows.iter()
            .map(|r| item_from_row(r).map_err(|e| map_sqlx_error("list_active", e)))
            .collect()
    }

    #[instrument(skip(self, patch), fields(item_id = %id))]
    async fn update_item(&self, id: ItemId, patch: ItemPatch) -> DomainResult<InventoryItem> {
        let mut tx = begin(&self.pool).await?;

        let row = sqlx::query("SELECT * FROM items WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_item", e))?
            .ok_or(DomainError::NotFound)?;
        let mut item = item_from_row(&row).map_err(|e| map_sqlx_error("update_item", e))?;
        item.apply_patch(patch)?;

        sqlx::query(
            r#"
            UPDATE items
            SET name = $2, category = $3, description = $4,
                quantity_total = $5, quantity_available = $6, is_active = $7
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(&item.name)
        .bind(&item.category)
        .bind(&item.description)
        .bind(item.quantity_total)
        .bind(item.quantity_available)
        .bind(item.is_active)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_item", e))?;

        commit(tx).await?;
        Ok(item)
    }

    #[instrument(skip(self), fields(item_id = %id, delta))]
    async fn adjust_available(&self, id: ItemId, delta: i64) -> DomainResult<i64> {
        let mut tx = begin(&self.pool).await?;

        let row = sqlx::query("SELECT * FROM items WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("adjust_available", e))?
            .ok_or(DomainError::NotFound)?;
        let mut item = item_from_row(&row).map_err(|e| map_sqlx_error("adjust_available", e))?;
        let available = item.adjust_available(delta)?;

        sqlx::query("UPDATE items SET quantity_available = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(available)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("adjust_available", e))?;

        commit(tx).await?;
        Ok(available)
    }
}

async fn begin(pool: &PgPool) -> DomainResult<Transaction<'_, Postgres>> {
    pool.begin().await.map_err(|e| map_sqlx_error("begin", e))
}

async fn commit(tx: Transaction<'_, Postgres>) -> DomainResult<()> {
    tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
}

/// Lock the request row and return `(owner, status)`.
async fn lock_request(
    tx: &mut Transaction<'_, Postgres>,
    id: RequestId,
) -> DomainResult<(UserId, RequestStatus)> {
    let row = sqlx::query("SELECT user_id, status FROM requests WHERE id = $1 FOR UPDATE")
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_request", e))?
        .ok_or(DomainError::NotFound)?;
    let user_id = UserId::from_uuid(get(&row, "user_id")?);
    let status: String = get(&row, "status")?;
    Ok((user_id, parse_status::<RequestStatus>(&status)?))
}

fn ensure_submitted(status: RequestStatus) -> DomainResult<()> {
    if status != RequestStatus::Submitted {
        return Err(DomainError::invalid_state("request already processed"));
    }
    Ok(())
}

async fn set_request_status(
    tx: &mut Transaction<'_, Postgres>,
    id: RequestId,
    status: RequestStatus,
) -> DomainResult<()> {
    sqlx::query("UPDATE requests SET status = $2 WHERE id = $1")
        .bind(id.as_uuid())
        .bind(status.as_str())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("set_request_status", e))?;
    Ok(())
}

impl PostgresStore {
    /// Fetch full request views for an arbitrary base query over `requests`.
    async fn fetch_views(
        &self,
        base: &str,
        bind_uuid: Option<Uuid>,
        bind_text: Option<&str>,
    ) -> DomainResult<Vec<RequestView>> {
        let mut query = sqlx::query(base);
        if let Some(uuid) = bind_uuid {
            query = query.bind(uuid);
        }
        if let Some(text) = bind_text {
            query = query.bind(text);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("fetch_views", e))?;

        let mut views = Vec::with_capacity(rows.len());
        let mut ids = Vec::with_capacity(rows.len());
        for row in &rows {
            let status: String = get(row, "status")?;
            let id: Uuid = get(row, "id")?;
            ids.push(id);
            views.push(RequestView {
                id: RequestId::from_uuid(id),
                user_id: UserId::from_uuid(get(row, "user_id")?),
                requester: RequesterInfo {
                    name: get(row, "requester_name")?,
                    department: get(row, "department")?,
                    phone: get(row, "phone")?,
                    purpose: get(row, "purpose")?,
                },
                status: parse_status::<RequestStatus>(&status)?,
                created_at: get::<DateTime<Utc>>(row, "created_at")?,
                lines: Vec::new(),
            });
        }
        if views.is_empty() {
            return Ok(views);
        }

        // One round trip for all line items, joined with their names,
        // in submission order (line ids are time-ordered).
        let line_rows = sqlx::query(
            r#"
            SELECT l.request_id, l.item_id, l.quantity, i.name AS item_name
            FROM request_lines l
            JOIN items i ON i.id = l.item_id
            WHERE l.request_id = ANY($1)
            ORDER BY l.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch_views", e))?;

        let mut by_request: HashMap<Uuid, Vec<LineView>> = HashMap::new();
        for row in &line_rows {
            let request_id: Uuid = get(row, "request_id")?;
            by_request.entry(request_id).or_default().push(LineView {
                item_id: ItemId::from_uuid(get(row, "item_id")?),
                item_name: get(row, "item_name")?,
                quantity: get(row, "quantity")?,
            });
        }
        for view in &mut views {
            if let Some(lines) = by_request.remove(view.id.as_uuid()) {
                view.lines = lines;
            }
        }
        Ok(views)
    }
}

#[async_trait]
impl RequestStore for PostgresStore {
    #[instrument(skip(self, request), fields(request_id = %request.id))]
    async fn insert_request(&self, request: &InventoryRequest) -> DomainResult<()> {
        let mut tx = begin(&self.pool).await?;

        sqlx::query(
            r#"
            INSERT INTO requests (
                id, user_id, requester_name, department, phone, purpose, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(request.id.as_uuid())
        .bind(request.user_id.as_uuid())
        .bind(&request.requester.name)
        .bind(&request.requester.department)
        .bind(&request.requester.phone)
        .bind(&request.requester.purpose)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_request", e))?;

        for line in &request.lines {
            sqlx::query(
                "INSERT INTO request_lines (id, request_id, item_id, quantity) VALUES ($1, $2, $3, $4)",
            )
            .bind(line.id.as_uuid())
            .bind(request.id.as_uuid())
            .bind(line.item_id.as_uuid())
            .bind(line.quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_request", e))?;
        }

        commit(tx).await
    }

    async fn get_request(&self, id: RequestId) -> DomainResult<RequestView> {
        let views = self
            .fetch_views(
                "SELECT * FROM requests WHERE id = $1",
                Some(*id.as_uuid()),
                None,
            )
            .await?;
        views.into_iter().next().ok_or(DomainError::NotFound)
    }

    #[instrument(skip(self), fields(request_id = %id))]
    async fn approve_request(&self, id: RequestId) -> DomainResult<RequestView> {
        let mut tx = begin(&self.pool).await?;

        let (_, status) = lock_request(&mut tx, id).await?;
        ensure_submitted(status)?;

        // Lock the referenced item rows in item-id order so two approvals
        // competing for overlapping items cannot deadlock.
        let rows = sqlx::query(
            r#"
            SELECT l.id AS line_id, l.item_id, l.quantity, i.name, i.quantity_available
            FROM request_lines l
            JOIN items i ON i.id = l.item_id
            WHERE l.request_id = $1
            ORDER BY l.item_id
            FOR UPDATE OF i
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("approve_request", e))?;

        let mut lines = Vec::with_capacity(rows.len());
        let mut stock: HashMap<ItemId, (String, i64)> = HashMap::new();
        for row in &rows {
            let item_id = ItemId::from_uuid(get(row, "item_id")?);
            lines.push(RequestLine {
                id: LineId::from_uuid(get(row, "line_id")?),
                item_id,
                quantity: get(row, "quantity")?,
            });
            stock.insert(item_id, (get(row, "name")?, get(row, "quantity_available")?));
        }
        // Validate in submission order so the first failing line is the one
        // reported (line ids are time-ordered).
        lines.sort_by_key(|l| *l.id.as_uuid());
        check_stock(&lines, |item_id| stock.get(&item_id).cloned())?;

        for line in &lines {
            sqlx::query(
                "UPDATE items SET quantity_available = quantity_available - $2 WHERE id = $1",
            )
            .bind(line.item_id.as_uuid())
            .bind(line.quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("approve_request", e))?;
        }

        set_request_status(&mut tx, id, RequestStatus::Approved).await?;
        commit(tx).await?;

        self.get_request(id).await
    }

    #[instrument(skip(self), fields(request_id = %id))]
    async fn reject_request(&self, id: RequestId) -> DomainResult<RequestView> {
        let mut tx = begin(&self.pool).await?;
        let (_, status) = lock_request(&mut tx, id).await?;
        ensure_submitted(status)?;
        set_request_status(&mut tx, id, RequestStatus::Rejected).await?;
        commit(tx).await?;
        self.get_request(id).await
    }

    #[instrument(skip(self), fields(request_id = %id))]
    async fn cancel_request(&self, id: RequestId, by: UserId) -> DomainResult<RequestView> {
        let mut tx = begin(&self.pool).await?;
        let (owner, status) = lock_request(&mut tx, id).await?;
        if owner != by {
            return Err(DomainError::Forbidden);
        }
        ensure_submitted(status)?;
        set_request_status(&mut tx, id, RequestStatus::Cancelled).await?;
        commit(tx).await?;
        self.get_request(id).await
    }

    async fn list_requests_for_user(&self, user_id: UserId) -> DomainResult<Vec<RequestView>> {
        self.fetch_views(
            "SELECT * FROM requests WHERE user_id = $1 ORDER BY created_at DESC",
            Some(*user_id.as_uuid()),
            None,
        )
        .await
    }

    async fn list_requests(&self, status: Option<RequestStatus>) -> DomainResult<Vec<RequestView>> {
        match status {
            Some(status) => {
                self.fetch_views(
                    "SELECT * FROM requests WHERE status = $1 ORDER BY created_at DESC",
                    None,
                    Some(status.as_str()),
                )
                .await
            }
            None => {
                self.fetch_views("SELECT * FROM requests ORDER BY created_at DESC", None, None)
                    .await
            }
        }
    }
}

#[async_trait]
impl IdeaStore for PostgresStore {
    #[instrument(skip(self, idea), fields(idea_id = %idea.id))]
    async fn insert_idea(&self, idea: &Idea) -> DomainResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ideas (id, user_id, title, description, category, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(idea.id.as_uuid())
        .bind(idea.user_id.as_uuid())
        .bind(&idea.title)
        .bind(&idea.description)
        .bind(&idea.category)
        .bind(idea.status.as_str())
        .bind(idea.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_idea", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(idea_id = %id))]
    async fn advance_idea(&self, id: IdeaId, next: IdeaStatus) -> DomainResult<Idea> {
        let mut tx = begin(&self.pool).await?;

        let row = sqlx::query("SELECT * FROM ideas WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("advance_idea", e))?
            .ok_or(DomainError::NotFound)?;
        let mut idea = idea_from_row(&row)?;
        idea.advance(next)?;

        sqlx::query("UPDATE ideas SET status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(idea.status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("advance_idea", e))?;

        commit(tx).await?;
        Ok(idea)
    }

    async fn list_ideas(&self, user_id: Option<UserId>) -> DomainResult<Vec<Idea>> {
        let rows = match user_id {
            Some(user_id) => {
                sqlx::query("SELECT * FROM ideas WHERE user_id = $1 ORDER BY created_at DESC")
                    .bind(user_id.as_uuid())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT * FROM ideas ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| map_sqlx_error("list_ideas", e))?;
        rows.iter().map(idea_from_row).collect()
    }
}

#[async_trait]
impl IncubationStore for PostgresStore {
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn insert_job(&self, job: &IncubationJob) -> DomainResult<()> {
        sqlx::query(
            r#"
            INSERT INTO incubation_jobs (id, user_id, machine, title, details, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.user_id.as_uuid())
        .bind(job.machine.as_str())
        .bind(&job.title)
        .bind(&job.details)
        .bind(job.status.as_str())
        .bind(job.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_job", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn advance_job(&self, id: IncubationId, next: JobStatus) -> DomainResult<IncubationJob> {
        let mut tx = begin(&self.pool).await?;

        let row = sqlx::query("SELECT * FROM incubation_jobs WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("advance_job", e))?
            .ok_or(DomainError::NotFound)?;
        let mut job = job_from_row(&row)?;
        job.advance(next)?;

        sqlx::query("UPDATE incubation_jobs SET status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(job.status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("advance_job", e))?;

        commit(tx).await?;
        Ok(job)
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn cancel_job(&self, id: IncubationId, by: UserId) -> DomainResult<IncubationJob> {
        let mut tx = begin(&self.pool).await?;

        let row = sqlx::query("SELECT * FROM incubation_jobs WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("cancel_job", e))?
            .ok_or(DomainError::NotFound)?;
        let mut job = job_from_row(&row)?;
        job.cancel(by)?;

        sqlx::query("UPDATE incubation_jobs SET status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(job.status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("cancel_job", e))?;

        commit(tx).await?;
        Ok(job)
    }

    async fn list_jobs(&self, user_id: Option<UserId>) -> DomainResult<Vec<IncubationJob>> {
        let rows = match user_id {
            Some(user_id) => {
                sqlx::query(
                    "SELECT * FROM incubation_jobs WHERE user_id = $1 ORDER BY created_at DESC",
                )
                .bind(user_id.as_uuid())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query("SELECT * FROM incubation_jobs ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| map_sqlx_error("list_jobs", e))?;
        rows.iter().map(job_from_row).collect()
    }
}
