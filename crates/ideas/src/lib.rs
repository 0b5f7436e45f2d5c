//! Idea submissions: students pitch a project, admins walk it through review.
//!
//! Unlike inventory requests this state machine does reach `completed`, and
//! it never touches stock.

pub mod idea;

pub use idea::{Idea, IdeaDraft, IdeaEvent, IdeaStatus};
