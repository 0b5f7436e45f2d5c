//! Inventory lending domain: the item catalog and the request aggregate.
//!
//! The one invariant worth protecting lives here: allocated stock must never
//! go negative. Items are decremented only by request approval; submission
//! reserves nothing.

pub mod item;
pub mod request;

pub use item::{CatalogEvent, InventoryItem, ItemDraft, ItemPatch};
pub use request::{
    InventoryRequest, LineView, RequestEvent, RequestLine, RequestStatus, RequestView,
    RequesterInfo, check_stock,
};
