//! Quarry Core
//!
//! Core types shared by the Quarry crawl orchestration system.
//!
//! This crate contains the domain types (pipeline definitions, schedules,
//! execution state, tasks and the externally stored records) used by the
//! orchestrator and by whatever workers consume its task queue.

pub mod domain;
