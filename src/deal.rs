// Copyright 2025 Cowboy AI, LLC.

//! Deal aggregate and its owned child values
//!
//! A Deal is the aggregate root of the pipeline: it owns its stage history,
//! notes and tasks, and references contacts, an owning user and an optional
//! product. All mutations go through [`crate::store::PipelineStore`], which
//! enforces the aggregate invariants and records change history.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{ContactId, DealId, DealMarker, Entity, NoteId, ProductId, TaskId, UserId};
use crate::errors::{DomainError, DomainResult};
use crate::stage::DealStage;

/// Category of client behind a deal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientType {
    /// Commercial payer or employer
    Commercial,
    /// Medicaid plan
    Medicaid,
    /// Medicare plan
    Medicare,
}

/// How the lead originally reached us
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadSource {
    /// Referred by an existing client or partner
    Referral,
    /// Inbound through the website
    Website,
    /// Met at a conference or event
    Event,
    /// LinkedIn outreach
    #[serde(rename = "LinkedIn")]
    LinkedIn,
    /// Direct outreach
    Direct,
    /// Anything else
    Other,
}

/// One entry in a deal's stage history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimestamp {
    /// The stage entered
    pub stage: DealStage,
    /// When the deal entered it
    pub timestamp: DateTime<Utc>,
}

/// Planned implementation window for a won deal
///
/// `duration_months` is derived, never supplied: the whole-month difference
/// between start and go-live, floored at one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationTimeline {
    /// Implementation start date
    pub start_date: NaiveDate,
    /// Target go-live date
    pub go_live_date: NaiveDate,
    /// Whole months between start and go-live, minimum 1
    pub duration_months: u32,
}

impl ImplementationTimeline {
    /// Build a timeline, deriving the duration from the two dates
    pub fn new(start_date: NaiveDate, go_live_date: NaiveDate) -> DomainResult<Self> {
        if go_live_date < start_date {
            return Err(DomainError::validation(
                "implementation go-live date must not precede the start date",
            ));
        }

        let mut months = (go_live_date.year() - start_date.year()) * 12
            + (go_live_date.month() as i32 - start_date.month() as i32);
        // A partial final month does not count as a whole month
        if go_live_date.day() < start_date.day() {
            months -= 1;
        }

        Ok(Self {
            start_date,
            go_live_date,
            duration_months: months.max(1) as u32,
        })
    }
}

/// Free-text annotation on a deal, immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier
    pub id: NoteId,
    /// Deal this note belongs to
    pub deal_id: DealId,
    /// Author
    pub user_id: UserId,
    /// Note body
    pub content: String,
    /// When the note was written
    pub created_at: DateTime<Utc>,
}

/// A to-do item scoped to a deal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,
    /// Deal this task belongs to
    pub deal_id: DealId,
    /// Short title
    pub title: String,
    /// Longer description, if any
    pub description: Option<String>,
    /// When the task is due
    pub due_date: NaiveDate,
    /// Whether the task is done
    pub completed: bool,
    /// When the task was completed; set exactly once
    pub completed_at: Option<DateTime<Utc>>,
    /// User the task is assigned to
    pub assigned_to: UserId,
    /// User who created the task
    pub created_by: UserId,
    /// When the task was created
    pub created_at: DateTime<Utc>,
    /// Whether a due-date reminder has gone out
    pub reminder_sent: bool,
}

impl Task {
    /// Mark the task completed. Idempotent: a second call changes nothing
    /// and keeps the original completion timestamp.
    pub fn complete(&mut self, now: DateTime<Utc>) -> bool {
        if self.completed {
            return false;
        }
        self.completed = true;
        self.completed_at = Some(now);
        true
    }
}

/// A tracked sales opportunity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    /// Core entity data (id, created_at, updated_at)
    pub entity: Entity<DealMarker>,
    /// Client being sold to
    pub client_name: String,
    /// Category of client
    pub client_type: ClientType,
    /// Total monetary value of the deal
    pub deal_value: f64,
    /// Annual recurring revenue, when known
    pub annual_recurring_revenue: Option<f64>,
    /// First-year ARR, when known
    pub arr_year1: Option<f64>,
    /// One-time implementation revenue, when known
    pub implementation_revenue: Option<f64>,
    /// Planned implementation window, when known
    pub implementation_timeline: Option<ImplementationTimeline>,
    /// How the lead reached us
    pub lead_source: LeadSource,
    /// Current pipeline stage
    pub stage: DealStage,
    /// Every stage the deal has entered, in order, starting with creation
    pub stage_history: Vec<StageTimestamp>,
    /// Expected close date
    pub expected_close_date: NaiveDate,
    /// False once the deal reaches a terminal stage
    pub is_active: bool,
    /// Owning user
    pub owner_id: UserId,
    /// Assigned product, if any
    pub product_id: Option<ProductId>,
    /// Contacts associated with this deal
    pub contact_ids: Vec<ContactId>,
    /// Notes, oldest first
    pub notes: Vec<Note>,
    /// Tasks, oldest first
    pub tasks: Vec<Task>,
}

/// Fields required to create a deal
#[derive(Debug, Clone)]
pub struct NewDeal {
    /// Client being sold to
    pub client_name: String,
    /// Category of client
    pub client_type: ClientType,
    /// Total monetary value; must be positive
    pub deal_value: f64,
    /// How the lead reached us
    pub lead_source: LeadSource,
    /// Stage the deal starts in
    pub stage: DealStage,
    /// Expected close date
    pub expected_close_date: NaiveDate,
    /// Owning user
    pub owner_id: UserId,
    /// Annual recurring revenue, if already known
    pub annual_recurring_revenue: Option<f64>,
    /// First-year ARR, if already known
    pub arr_year1: Option<f64>,
    /// Implementation revenue, if already known
    pub implementation_revenue: Option<f64>,
    /// Implementation window, if already known
    pub implementation_timeline: Option<ImplementationTimeline>,
    /// Assigned product, if already chosen
    pub product_id: Option<ProductId>,
}

impl NewDeal {
    /// Minimal constructor; optional revenue fields start unset
    pub fn new(
        client_name: impl Into<String>,
        client_type: ClientType,
        deal_value: f64,
        lead_source: LeadSource,
        stage: DealStage,
        expected_close_date: NaiveDate,
        owner_id: UserId,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            client_type,
            deal_value,
            lead_source,
            stage,
            expected_close_date,
            owner_id,
            annual_recurring_revenue: None,
            arr_year1: None,
            implementation_revenue: None,
            implementation_timeline: None,
            product_id: None,
        }
    }
}

/// Partial update of a deal's fields. `None` means "leave unchanged".
///
/// Product assignment is deliberately absent: it goes through
/// `PipelineStore::assign_product_to_deal`, the single product surface.
#[derive(Debug, Clone, Default)]
pub struct DealPatch {
    /// New client name
    pub client_name: Option<String>,
    /// New client type
    pub client_type: Option<ClientType>,
    /// New deal value; must be positive
    pub deal_value: Option<f64>,
    /// New lead source
    pub lead_source: Option<LeadSource>,
    /// New expected close date
    pub expected_close_date: Option<NaiveDate>,
    /// New annual recurring revenue
    pub annual_recurring_revenue: Option<f64>,
    /// New first-year ARR
    pub arr_year1: Option<f64>,
    /// New implementation revenue
    pub implementation_revenue: Option<f64>,
    /// New implementation window
    pub implementation_timeline: Option<ImplementationTimeline>,
    /// New owning user
    pub owner_id: Option<UserId>,
}

impl Deal {
    /// Create a deal, seeding the stage history with the creation stage
    pub fn create(fields: NewDeal, now: DateTime<Utc>) -> DomainResult<Self> {
        if fields.client_name.trim().is_empty() {
            return Err(DomainError::validation("client name must not be empty"));
        }
        if fields.deal_value <= 0.0 {
            return Err(DomainError::validation("deal value must be positive"));
        }

        let id = DealId::new();
        Ok(Self {
            entity: Entity {
                id,
                created_at: now,
                updated_at: now,
            },
            client_name: fields.client_name,
            client_type: fields.client_type,
            deal_value: fields.deal_value,
            annual_recurring_revenue: fields.annual_recurring_revenue,
            arr_year1: fields.arr_year1,
            implementation_revenue: fields.implementation_revenue,
            implementation_timeline: fields.implementation_timeline,
            lead_source: fields.lead_source,
            stage: fields.stage,
            stage_history: vec![StageTimestamp {
                stage: fields.stage,
                timestamp: now,
            }],
            expected_close_date: fields.expected_close_date,
            is_active: !fields.stage.is_terminal(),
            owner_id: fields.owner_id,
            product_id: fields.product_id,
            contact_ids: Vec::new(),
            notes: Vec::new(),
            tasks: Vec::new(),
        })
    }

    /// This deal's ID
    pub fn id(&self) -> DealId {
        self.entity.id
    }

    /// Deal value weighted by the current stage's win probability
    pub fn weighted_value(&self) -> f64 {
        self.deal_value * self.stage.probability()
    }

    /// ARR weighted by the current stage's win probability. An unset ARR
    /// contributes zero.
    pub fn weighted_arr(&self) -> f64 {
        self.annual_recurring_revenue.unwrap_or(0.0) * self.stage.probability()
    }

    /// Move the deal to a new stage, appending to the stage history and
    /// maintaining `is_active`. A same-stage transition is a no-op and
    /// returns `false` without touching the history.
    pub fn enter_stage(&mut self, new_stage: DealStage, now: DateTime<Utc>) -> bool {
        if new_stage == self.stage {
            return false;
        }
        self.stage = new_stage;
        self.stage_history.push(StageTimestamp {
            stage: new_stage,
            timestamp: now,
        });
        self.is_active = !new_stage.is_terminal();
        self.entity.updated_at = now;
        true
    }

    /// Merge a patch into this deal. Validation failures leave the deal
    /// unchanged.
    pub fn apply_patch(&mut self, patch: DealPatch, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = &patch.client_name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("client name must not be empty"));
            }
        }
        if let Some(value) = patch.deal_value {
            if value <= 0.0 {
                return Err(DomainError::validation("deal value must be positive"));
            }
        }

        if let Some(name) = patch.client_name {
            self.client_name = name;
        }
        if let Some(client_type) = patch.client_type {
            self.client_type = client_type;
        }
        if let Some(value) = patch.deal_value {
            self.deal_value = value;
        }
        if let Some(source) = patch.lead_source {
            self.lead_source = source;
        }
        if let Some(date) = patch.expected_close_date {
            self.expected_close_date = date;
        }
        if let Some(arr) = patch.annual_recurring_revenue {
            self.annual_recurring_revenue = Some(arr);
        }
        if let Some(arr) = patch.arr_year1 {
            self.arr_year1 = Some(arr);
        }
        if let Some(revenue) = patch.implementation_revenue {
            self.implementation_revenue = Some(revenue);
        }
        if let Some(timeline) = patch.implementation_timeline {
            self.implementation_timeline = Some(timeline);
        }
        if let Some(owner) = patch.owner_id {
            self.owner_id = owner;
        }
        self.entity.updated_at = now;
        Ok(())
    }
}
