use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use idealab_core::{DomainError, DomainResult, IdeaId, UserId};
use idealab_events::Event;

/// Idea review lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaStatus {
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Completed,
}

impl IdeaStatus {
    /// Admin-driven edges. Anything else is `InvalidState`.
    fn can_advance_to(self, next: IdeaStatus) -> bool {
        matches!(
            (self, next),
            (IdeaStatus::Submitted, IdeaStatus::UnderReview)
                | (IdeaStatus::UnderReview, IdeaStatus::Approved)
                | (IdeaStatus::UnderReview, IdeaStatus::Rejected)
                | (IdeaStatus::Approved, IdeaStatus::Completed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IdeaStatus::Submitted => "submitted",
            IdeaStatus::UnderReview => "under_review",
            IdeaStatus::Approved => "approved",
            IdeaStatus::Rejected => "rejected",
            IdeaStatus::Completed => "completed",
        }
    }
}

impl core::str::FromStr for IdeaStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(IdeaStatus::Submitted),
            "under_review" => Ok(IdeaStatus::UnderReview),
            "approved" => Ok(IdeaStatus::Approved),
            "rejected" => Ok(IdeaStatus::Rejected),
            "completed" => Ok(IdeaStatus::Completed),
            other => Err(DomainError::invalid_input(format!(
                "unknown idea status: {other}"
            ))),
        }
    }
}

/// Submission input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaDraft {
    pub title: String,
    pub description: String,
    pub category: String,
}

/// A submitted idea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idea {
    pub id: IdeaId,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: IdeaStatus,
    pub created_at: DateTime<Utc>,
}

impl Idea {
    pub fn submit(
        id: IdeaId,
        user_id: UserId,
        draft: IdeaDraft,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if draft.title.trim().is_empty() {
            return Err(DomainError::invalid_input("idea title cannot be empty"));
        }
        if draft.description.trim().is_empty() {
            return Err(DomainError::invalid_input("idea description cannot be empty"));
        }
        Ok(Self {
            id,
            user_id,
            title: draft.title,
            description: draft.description,
            category: draft.category,
            status: IdeaStatus::Submitted,
            created_at: now,
        })
    }

    pub fn advance(&mut self, next: IdeaStatus) -> DomainResult<()> {
        if !self.status.can_advance_to(next) {
            return Err(DomainError::invalid_state(format!(
                "cannot move idea from {} to {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaSubmitted {
    pub idea_id: IdeaId,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaStatusChanged {
    pub idea_id: IdeaId,
    pub status: IdeaStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdeaEvent {
    Submitted(IdeaSubmitted),
    StatusChanged(IdeaStatusChanged),
}

impl Event for IdeaEvent {
    fn event_type(&self) -> &'static str {
        match self {
            IdeaEvent::Submitted(_) => "idea.submitted",
            IdeaEvent::StatusChanged(_) => "idea.status_changed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            IdeaEvent::Submitted(e) => e.occurred_at,
            IdeaEvent::StatusChanged(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idea() -> Idea {
        Idea::submit(
            IdeaId::new(),
            UserId::new(),
            IdeaDraft {
                title: "Smart irrigation".to_string(),
                description: "soil-moisture driven valve control".to_string(),
                category: "iot".to_string(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn review_path_reaches_completed() {
        let mut i = idea();
        i.advance(IdeaStatus::UnderReview).unwrap();
        i.advance(IdeaStatus::Approved).unwrap();
        i.advance(IdeaStatus::Completed).unwrap();
        assert_eq!(i.status, IdeaStatus::Completed);
    }

    #[test]
    fn skipping_review_is_rejected() {
        let mut i = idea();
        assert!(i.advance(IdeaStatus::Approved).is_err());
        assert!(i.advance(IdeaStatus::Completed).is_err());
        assert_eq!(i.status, IdeaStatus::Submitted);
    }

    #[test]
    fn rejected_is_terminal() {
        let mut i = idea();
        i.advance(IdeaStatus::UnderReview).unwrap();
        i.advance(IdeaStatus::Rejected).unwrap();
        assert!(i.advance(IdeaStatus::Approved).is_err());
    }
}
