use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use idealab_core::{DomainError, DomainResult, IncubationId, UserId};
use idealab_events::Event;

/// Which machine the job runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Machine {
    Printer3d,
    Laser,
}

impl Machine {
    pub fn as_str(self) -> &'static str {
        match self {
            Machine::Printer3d => "printer3d",
            Machine::Laser => "laser",
        }
    }
}

impl core::str::FromStr for Machine {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "printer3d" => Ok(Machine::Printer3d),
            "laser" => Ok(Machine::Laser),
            other => Err(DomainError::invalid_input(format!("unknown machine: {other}"))),
        }
    }
}

/// Incubation job lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Submitted,
    Approved,
    Rejected,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    fn can_advance_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Submitted, JobStatus::Approved)
                | (JobStatus::Submitted, JobStatus::Rejected)
                | (JobStatus::Approved, JobStatus::InProgress)
                | (JobStatus::InProgress, JobStatus::Completed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Submitted => "submitted",
            JobStatus::Approved => "approved",
            JobStatus::Rejected => "rejected",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl core::str::FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(JobStatus::Submitted),
            "approved" => Ok(JobStatus::Approved),
            "rejected" => Ok(JobStatus::Rejected),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(DomainError::invalid_input(format!(
                "unknown job status: {other}"
            ))),
        }
    }
}

/// Submission input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDraft {
    pub machine: Machine,
    pub title: String,
    pub details: String,
}

/// A submitted incubation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncubationJob {
    pub id: IncubationId,
    pub user_id: UserId,
    pub machine: Machine,
    pub title: String,
    pub details: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl IncubationJob {
    pub fn submit(
        id: IncubationId,
        user_id: UserId,
        draft: JobDraft,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if draft.title.trim().is_empty() {
            return Err(DomainError::invalid_input("job title cannot be empty"));
        }
        Ok(Self {
            id,
            user_id,
            machine: draft.machine,
            title: draft.title,
            details: draft.details,
            status: JobStatus::Submitted,
            created_at: now,
        })
    }

    /// Operator-driven transition.
    pub fn advance(&mut self, next: JobStatus) -> DomainResult<()> {
        if !self.status.can_advance_to(next) {
            return Err(DomainError::invalid_state(format!(
                "cannot move job from {} to {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Owner withdrawal, allowed only while the job is still submitted.
    pub fn cancel(&mut self, by: UserId) -> DomainResult<()> {
        if self.user_id != by {
            return Err(DomainError::forbidden());
        }
        if self.status != JobStatus::Submitted {
            return Err(DomainError::invalid_state("job already processed"));
        }
        self.status = JobStatus::Cancelled;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSubmitted {
    pub job_id: IncubationId,
    pub user_id: UserId,
    pub machine: Machine,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusChanged {
    pub job_id: IncubationId,
    pub status: JobStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncubationEvent {
    Submitted(JobSubmitted),
    StatusChanged(JobStatusChanged),
}

impl Event for IncubationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            IncubationEvent::Submitted(_) => "incubation.job.submitted",
            IncubationEvent::StatusChanged(_) => "incubation.job.status_changed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            IncubationEvent::Submitted(e) => e.occurred_at,
            IncubationEvent::StatusChanged(e) => e.occurred_at,
        }
    }
}
