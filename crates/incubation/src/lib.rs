//! Incubation jobs: 3D-printing and laser-cutting work the lab runs for
//! students. Jobs move through an operator-driven lifecycle and, like ideas,
//! can reach `completed`.

pub mod job;

pub use job::{IncubationEvent, IncubationJob, JobDraft, JobStatus, Machine};
