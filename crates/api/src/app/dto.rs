use serde::Deserialize;

use idealab_core::{ItemId, UserId};
use idealab_inventory::RequesterInfo;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateItemBody {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub quantity_total: i64,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockBody {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequestBody {
    pub user_id: UserId,
    pub requester: RequesterInfo,
    pub items: Vec<RequestLineBody>,
}

#[derive(Debug, Deserialize)]
pub struct RequestLineBody {
    pub id: ItemId,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CancelBody {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct RequestListQuery {
    pub user_id: Option<UserId>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitIdeaBody {
    pub user_id: UserId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitJobBody {
    pub user_id: UserId,
    pub machine: String,
    pub title: String,
    #[serde(default)]
    pub details: String,
}

/// Status transitions arrive as strings and are parsed against the relevant
/// state machine, so a bad value is a domain `InvalidInput`, not a 422.
#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct UserScopedQuery {
    pub user_id: Option<UserId>,
}
