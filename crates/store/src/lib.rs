//! Persistence for the lab backend.
//!
//! Two interchangeable backends sit behind the store traits:
//!
//! - [`memory::InMemoryStore`]: one mutex over process state, for dev and
//!   tests. Every operation is trivially atomic.
//! - [`postgres::PostgresStore`]: `sqlx` over a connection pool. Request
//!   approval runs validation, stock decrement and the status write inside a
//!   single transaction with row locks on the affected items, so two
//!   competing approvals can never both spend the same stock.

pub mod memory;
pub mod postgres;
pub mod traits;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use traits::{CatalogStore, IdeaStore, IncubationStore, RequestStore};
