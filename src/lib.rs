//! # Pipeline Domain
//!
//! Core Domain-Driven Design (DDD) components for a sales pipeline: an
//! entity store, a globally ordered change log, and pipeline analytics.
//!
//! This crate provides the building blocks for a CRM-style pipeline:
//! - **Entities**: Deals, contacts, products and their owned notes and tasks
//! - **Stages**: The fixed seven-stage funnel with per-stage win probability
//! - **Store**: A single state owner that enforces aggregate invariants at
//!   the point of mutation
//! - **Change Log**: An append-only, globally ordered record of tracked
//!   deal mutations
//! - **Queries**: Weighted pipeline value, win rate, date-range change
//!   slices and stage-duration analytics
//! - **Preferences**: An async boundary for per-user display preferences
//!   that degrades to defaults on storage failure
//!
//! ## Design Principles
//!
//! 1. **Type Safety**: Phantom-typed IDs keep deal, contact and task
//!    identifiers from mixing
//! 2. **Single Writer**: All mutations flow through [`PipelineStore`], so
//!    invariants hold at every observable point
//! 3. **Derived Views**: Per-deal change history is a filter over the one
//!    global log, never a second copy
//! 4. **History Preserved**: Deleting a deal keeps its change records

#![warn(missing_docs)]

mod changes;
mod contact;
mod deal;
mod entity;
mod errors;
mod preferences;
mod product;
mod queries;
mod stage;
mod store;
mod user;

pub use changes::{tracked_field_changes, ChangeLog, ChangeType, DealChange};
pub use contact::{Activity, ActivityKind, Contact, ContactPatch, NewContact};
pub use deal::{
    ClientType, Deal, DealPatch, ImplementationTimeline, LeadSource, NewDeal, Note,
    StageTimestamp, Task,
};
pub use entity::{
    ActivityId, ChangeId, ContactId, DealId, Entity, EntityId, NoteId, ProductId, TaskId, UserId,
};
pub use errors::{DomainError, DomainResult};
pub use preferences::{
    DashboardValueKind, InMemoryPreferenceStore, PipelineViewKind, PreferenceStore,
    PreferenceSync, UserPreferences,
};
pub use product::Product;
pub use queries::{
    active_deals, average_deal_size, average_time_in_stage, changes_in_range, contacts_for_deal,
    deals_for_contact, pipeline_metrics, stage_breakdown, summarize_changes,
    weighted_pipeline_arr, weighted_pipeline_value, win_rate, ChangeSummary, PipelineMetrics,
    StageSlice,
};
pub use stage::{DealStage, StageMovement};
pub use store::{NewActivity, NewTask, PipelineStore, TaskPatch};
pub use user::{User, UserRole};

/// Marker types for phantom-typed entity IDs
pub mod markers {
    pub use crate::entity::{
        ActivityMarker, ChangeMarker, ContactMarker, DealMarker, NoteMarker, ProductMarker,
        TaskMarker, UserMarker,
    };
}
