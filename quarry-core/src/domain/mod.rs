//! Core domain types
//!
//! This module contains the structures passed between the orchestrator, the
//! task queue transport and the storage collaborators. They carry data only;
//! scheduling and dispatch logic lives in the orchestrator.

pub mod pipeline;
pub mod record;
pub mod schedule;
pub mod state;
pub mod task;
