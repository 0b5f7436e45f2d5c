use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use idealab_core::{DomainError, DomainResult, ItemId};
use idealab_events::Event;

/// A lendable catalog item.
///
/// `quantity_total` is the capacity ceiling, changed only by admin edits.
/// `quantity_available` is the shared mutable state of the system; outside of
/// the admin adjust path it is decremented only by request approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub name: String,
    pub category: String,
    pub description: String,
    pub quantity_total: i64,
    pub quantity_available: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Admin input for creating an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    pub category: String,
    pub description: String,
    pub quantity_total: i64,
}

/// Admin input for editing an item. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub quantity_total: Option<i64>,
    pub is_active: Option<bool>,
}

impl InventoryItem {
    /// Create a fresh item from an admin draft. New items start fully stocked.
    pub fn create(id: ItemId, draft: ItemDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        if draft.name.trim().is_empty() {
            return Err(DomainError::invalid_input("item name cannot be empty"));
        }
        if draft.quantity_total < 0 {
            return Err(DomainError::invalid_input("quantity_total cannot be negative"));
        }
        Ok(Self {
            id,
            name: draft.name,
            category: draft.category,
            description: draft.description,
            quantity_total: draft.quantity_total,
            quantity_available: draft.quantity_total,
            is_active: true,
            created_at: now,
        })
    }

    /// Apply an admin edit.
    ///
    /// Shrinking `quantity_total` clamps `quantity_available` down so the
    /// `0 <= available <= total` invariant survives the edit.
    pub fn apply_patch(&mut self, patch: ItemPatch) -> DomainResult<()> {
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(DomainError::invalid_input("item name cannot be empty"));
            }
            self.name = name;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(total) = patch.quantity_total {
            if total < 0 {
                return Err(DomainError::invalid_input("quantity_total cannot be negative"));
            }
            self.quantity_total = total;
            self.quantity_available = self.quantity_available.min(total);
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        Ok(())
    }

    /// Admin stock delta. Keeps `quantity_available` inside `0..=total`;
    /// consistency with outstanding approved requests is admin-trusted.
    pub fn adjust_available(&mut self, delta: i64) -> DomainResult<i64> {
        let next = self.quantity_available + delta;
        if next < 0 || next > self.quantity_total {
            return Err(DomainError::invalid_input(format!(
                "adjustment leaves {} units available (bounds 0..={})",
                next, self.quantity_total
            )));
        }
        self.quantity_available = next;
        Ok(self.quantity_available)
    }
}

/// Event: ItemCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCreated {
    pub item_id: ItemId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdated {
    pub item_id: ItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockAdjusted (admin path only; approvals emit request events).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub item_id: ItemId,
    pub delta: i64,
    pub quantity_available: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogEvent {
    ItemCreated(ItemCreated),
    ItemUpdated(ItemUpdated),
    StockAdjusted(StockAdjusted),
}

impl Event for CatalogEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::ItemCreated(_) => "inventory.item.created",
            CatalogEvent::ItemUpdated(_) => "inventory.item.updated",
            CatalogEvent::StockAdjusted(_) => "inventory.item.stock_adjusted",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CatalogEvent::ItemCreated(e) => e.occurred_at,
            CatalogEvent::ItemUpdated(e) => e.occurred_at,
            CatalogEvent::StockAdjusted(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(total: i64) -> ItemDraft {
        ItemDraft {
            name: "Arduino Uno".to_string(),
            category: "electronics".to_string(),
            description: "microcontroller board".to_string(),
            quantity_total: total,
        }
    }

    #[test]
    fn create_starts_fully_stocked_and_active() {
        let item = InventoryItem::create(ItemId::new(), draft(5), Utc::now()).unwrap();
        assert_eq!(item.quantity_available, 5);
        assert_eq!(item.quantity_total, 5);
        assert!(item.is_active);
    }

    #[test]
    fn create_rejects_blank_name_and_negative_total() {
        let mut d = draft(5);
        d.name = "  ".to_string();
        assert!(matches!(
            InventoryItem::create(ItemId::new(), d, Utc::now()),
            Err(DomainError::InvalidInput(_))
        ));

        assert!(matches!(
            InventoryItem::create(ItemId::new(), draft(-1), Utc::now()),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn adjust_available_stays_within_bounds() {
        let mut item = InventoryItem::create(ItemId::new(), draft(5), Utc::now()).unwrap();

        assert_eq!(item.adjust_available(-3).unwrap(), 2);
        assert!(item.adjust_available(-3).is_err());
        assert_eq!(item.quantity_available, 2);
        assert!(item.adjust_available(4).is_err());
        assert_eq!(item.adjust_available(3).unwrap(), 5);
    }

    #[test]
    fn shrinking_total_clamps_available() {
        let mut item = InventoryItem::create(ItemId::new(), draft(10), Utc::now()).unwrap();
        item.apply_patch(ItemPatch {
            quantity_total: Some(4),
            ..ItemPatch::default()
        })
        .unwrap();
        assert_eq!(item.quantity_total, 4);
        assert_eq!(item.quantity_available, 4);
    }
}
