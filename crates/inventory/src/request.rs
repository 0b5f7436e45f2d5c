use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use idealab_core::{DomainError, DomainResult, ItemId, LineId, RequestId, UserId};
use idealab_events::Event;

/// Inventory request status lifecycle.
///
/// The only transitions are out of `submitted`; the other three states are
/// terminal for this subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Submitted,
    Approved,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Submitted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Submitted => "submitted",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Cancelled => "cancelled",
        }
    }
}

impl core::str::FromStr for RequestStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(RequestStatus::Submitted),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            "cancelled" => Ok(RequestStatus::Cancelled),
            other => Err(DomainError::invalid_input(format!(
                "unknown request status: {other}"
            ))),
        }
    }
}

/// Who is asking, and why. Collected at submission, shown to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequesterInfo {
    pub name: String,
    pub department: String,
    pub phone: String,
    pub purpose: String,
}

impl RequesterInfo {
    fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::invalid_input("requester name cannot be empty"));
        }
        if self.department.trim().is_empty() {
            return Err(DomainError::invalid_input("department cannot be empty"));
        }
        if self.purpose.trim().is_empty() {
            return Err(DomainError::invalid_input("purpose cannot be empty"));
        }
        Ok(())
    }
}

/// One (item, quantity) line of a request. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLine {
    pub id: LineId,
    pub item_id: ItemId,
    pub quantity: i64,
}

/// Aggregate root: a requester's submission of one or more lines.
///
/// Stock is not reserved at submission time; it is checked and decremented
/// only when an admin approves, so over-requesting between concurrent
/// submissions is legal until then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRequest {
    pub id: RequestId,
    pub user_id: UserId,
    pub requester: RequesterInfo,
    pub status: RequestStatus,
    pub lines: Vec<RequestLine>,
    pub created_at: DateTime<Utc>,
}

impl InventoryRequest {
    /// Build a new submitted request, validating input before anything is
    /// persisted: at least one line, every quantity positive, requester
    /// fields present.
    pub fn submit(
        id: RequestId,
        user_id: UserId,
        requester: RequesterInfo,
        lines: Vec<(ItemId, i64)>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        requester.validate()?;
        if lines.is_empty() {
            return Err(DomainError::invalid_input("request needs at least one item"));
        }
        for (item_id, quantity) in &lines {
            if *quantity <= 0 {
                return Err(DomainError::invalid_input(format!(
                    "quantity for item {item_id} must be positive"
                )));
            }
        }
        Ok(Self {
            id,
            user_id,
            requester,
            status: RequestStatus::Submitted,
            lines: lines
                .into_iter()
                .map(|(item_id, quantity)| RequestLine {
                    id: LineId::new(),
                    item_id,
                    quantity,
                })
                .collect(),
            created_at: now,
        })
    }

    /// Guard shared by every transition: only a submitted request may move.
    pub fn ensure_submitted(&self) -> DomainResult<()> {
        if self.status != RequestStatus::Submitted {
            return Err(DomainError::invalid_state("request already processed"));
        }
        Ok(())
    }

    pub fn ensure_owner(&self, user_id: UserId) -> DomainResult<()> {
        if self.user_id != user_id {
            return Err(DomainError::forbidden());
        }
        Ok(())
    }

    /// Mark approved. Callers are responsible for having decremented stock
    /// in the same storage transaction.
    pub fn approve(&mut self) -> DomainResult<()> {
        self.ensure_submitted()?;
        self.status = RequestStatus::Approved;
        Ok(())
    }

    /// Mark rejected. Never touches stock, regardless of availability.
    pub fn reject(&mut self) -> DomainResult<()> {
        self.ensure_submitted()?;
        self.status = RequestStatus::Rejected;
        Ok(())
    }

    /// Requester-initiated withdrawal. Owner-only, submitted-only, and no
    /// stock side effects since none was reserved.
    pub fn cancel(&mut self, by: UserId) -> DomainResult<()> {
        self.ensure_owner(by)?;
        self.ensure_submitted()?;
        self.status = RequestStatus::Cancelled;
        Ok(())
    }
}

/// Validate every line of a request against current availability.
///
/// Fails on the **first** line that cannot be satisfied, carrying that item's
/// display name, and touches nothing; the caller decrements only after this
/// returns `Ok`. Lines referencing the same item are checked cumulatively.
/// `availability` resolves an item to `(name, available)`; `None` means the
/// referenced item does not exist.
pub fn check_stock<F>(lines: &[RequestLine], mut availability: F) -> DomainResult<()>
where
    F: FnMut(ItemId) -> Option<(String, i64)>,
{
    let mut remaining: HashMap<ItemId, i64> = HashMap::new();
    for line in lines {
        let (name, available) = availability(line.item_id).ok_or(DomainError::NotFound)?;
        let rem = remaining.entry(line.item_id).or_insert(available);
        if *rem < line.quantity {
            return Err(DomainError::insufficient_stock(name));
        }
        *rem -= line.quantity;
    }
    Ok(())
}

// -------------------------
// Read surface
// -------------------------

/// One uniform nested shape for every reader of a request (requester view
/// and admin view alike): lines joined with their item names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestView {
    pub id: RequestId,
    pub user_id: UserId,
    pub requester: RequesterInfo,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<LineView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineView {
    pub item_id: ItemId,
    pub item_name: String,
    pub quantity: i64,
}

// -------------------------
// Domain events
// -------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSubmitted {
    pub request_id: RequestId,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestApproved {
    pub request_id: RequestId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRejected {
    pub request_id: RequestId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCancelled {
    pub request_id: RequestId,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestEvent {
    Submitted(RequestSubmitted),
    Approved(RequestApproved),
    Rejected(RequestRejected),
    Cancelled(RequestCancelled),
}

impl Event for RequestEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RequestEvent::Submitted(_) => "inventory.request.submitted",
            RequestEvent::Approved(_) => "inventory.request.approved",
            RequestEvent::Rejected(_) => "inventory.request.rejected",
            RequestEvent::Cancelled(_) => "inventory.request.cancelled",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RequestEvent::Submitted(e) => e.occurred_at,
            RequestEvent::Approved(e) => e.occurred_at,
            RequestEvent::Rejected(e) => e.occurred_at,
            RequestEvent::Cancelled(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn requester() -> RequesterInfo {
        RequesterInfo {
            name: "Anjali".to_string(),
            department: "ECE".to_string(),
            phone: "9400000000".to_string(),
            purpose: "line follower bot".to_string(),
        }
    }

    fn submitted(lines: Vec<(ItemId, i64)>) -> InventoryRequest {
        InventoryRequest::submit(RequestId::new(), UserId::new(), requester(), lines, Utc::now())
            .unwrap()
    }

    #[test]
    fn submit_rejects_empty_lines_and_nonpositive_quantities() {
        let err = InventoryRequest::submit(
            RequestId::new(),
            UserId::new(),
            requester(),
            vec![],
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));

        let err = InventoryRequest::submit(
            RequestId::new(),
            UserId::new(),
            requester(),
            vec![(ItemId::new(), 0)],
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn submit_rejects_missing_requester_fields() {
        let mut info = requester();
        info.department = String::new();
        let err = InventoryRequest::submit(
            RequestId::new(),
            UserId::new(),
            info,
            vec![(ItemId::new(), 1)],
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn approve_is_not_retryable() {
        let mut req = submitted(vec![(ItemId::new(), 2)]);
        req.approve().unwrap();
        assert_eq!(req.status, RequestStatus::Approved);

        let err = req.approve().unwrap_err();
        assert_eq!(err, DomainError::invalid_state("request already processed"));
    }

    #[test]
    fn no_transition_leaves_a_terminal_state() {
        let mut req = submitted(vec![(ItemId::new(), 1)]);
        let owner = req.user_id;
        req.reject().unwrap();

        assert!(req.approve().is_err());
        assert!(req.reject().is_err());
        assert!(req.cancel(owner).is_err());
        assert_eq!(req.status, RequestStatus::Rejected);
    }

    #[test]
    fn cancel_is_owner_only_and_single_shot() {
        let mut req = submitted(vec![(ItemId::new(), 1)]);
        let owner = req.user_id;

        assert_eq!(req.cancel(UserId::new()).unwrap_err(), DomainError::Forbidden);
        assert_eq!(req.status, RequestStatus::Submitted);

        req.cancel(owner).unwrap();
        assert_eq!(req.status, RequestStatus::Cancelled);
        assert!(matches!(req.cancel(owner), Err(DomainError::InvalidState(_))));
    }

    #[test]
    fn check_stock_fails_on_first_insufficient_line() {
        let scarce = ItemId::new();
        let plentiful = ItemId::new();
        let req = submitted(vec![(scarce, 3), (plentiful, 1)]);

        let mut stock = HashMap::new();
        stock.insert(scarce, ("Soldering Iron".to_string(), 2_i64));
        stock.insert(plentiful, ("Jumper Wires".to_string(), 50_i64));

        let err = check_stock(&req.lines, |id| stock.get(&id).cloned()).unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock("Soldering Iron"));
    }

    #[test]
    fn check_stock_sums_duplicate_lines_for_one_item() {
        let item = ItemId::new();
        let req = submitted(vec![(item, 30), (item, 30)]);

        let err = check_stock(&req.lines, |_| Some(("Acrylic Sheet".to_string(), 50)))
            .unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock("Acrylic Sheet"));
    }

    #[test]
    fn check_stock_reports_unknown_items_as_not_found() {
        let req = submitted(vec![(ItemId::new(), 1)]);
        let err = check_stock(&req.lines, |_| None).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    proptest! {
        /// If validation passes, decrementing every line leaves every touched
        /// item non-negative, so a passed check is a safe precondition for
        /// the decrement loop.
        #[test]
        fn passed_check_implies_safe_decrement(
            quantities in proptest::collection::vec(1_i64..50, 1..8),
            available in proptest::collection::vec(0_i64..100, 8),
        ) {
            let items: Vec<ItemId> = (0..quantities.len()).map(|_| ItemId::new()).collect();
            let req = submitted(items.iter().copied().zip(quantities.iter().copied()).collect());

            let mut stock: HashMap<ItemId, i64> = items
                .iter()
                .zip(available.iter())
                .map(|(id, avail)| (*id, *avail))
                .collect();

            let checked = check_stock(&req.lines, |id| {
                stock.get(&id).map(|a| (id.to_string(), *a))
            });

            if checked.is_ok() {
                for line in &req.lines {
                    let entry = stock.get_mut(&line.item_id).unwrap();
                    *entry -= line.quantity;
                    prop_assert!(*entry >= 0);
                }
            } else {
                // A failed check decrements nothing, so stock is untouched.
                for (id, avail) in items.iter().zip(available.iter()) {
                    prop_assert_eq!(stock[id], *avail);
                }
            }
        }
    }
}
