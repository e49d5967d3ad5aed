// Copyright 2025 Cowboy AI, LLC.

//! The pipeline state store
//!
//! [`PipelineStore`] is the single state owner for one session: it holds the
//! authoritative collections of deals, contacts and products, the activity
//! log, and the global change log. Every mutation goes through it so the
//! aggregate invariants hold at the point of mutation:
//!
//! - stage history is non-empty and append-only
//! - `is_active` always mirrors whether the stage is terminal
//! - at most one primary contact per deal
//! - tracked field updates emit exactly one change record per changed field
//!
//! Deleting a deal removes the aggregate and unlinks its contacts, but its
//! records stay in the global change log so historical reporting survives.
//! Contact deletion, by contrast, cascades everywhere. Both are deliberate.

use chrono::{NaiveDate, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::changes::{tracked_field_changes, ChangeLog, ChangeType, DealChange};
use crate::contact::{Activity, ActivityKind, Contact, ContactPatch, NewContact};
use crate::deal::{Deal, DealPatch, NewDeal, Note, Task};
use crate::entity::{ActivityId, ContactId, DealId, NoteId, ProductId, TaskId, UserId};
use crate::errors::{DomainError, DomainResult};
use crate::product::Product;
use crate::stage::DealStage;
use crate::user::User;

/// Fields required to create a task
#[derive(Debug, Clone)]
pub struct NewTask {
    /// Deal the task belongs to
    pub deal_id: DealId,
    /// Short title
    pub title: String,
    /// Longer description, if any
    pub description: Option<String>,
    /// When the task is due
    pub due_date: NaiveDate,
    /// User the task is assigned to
    pub assigned_to: UserId,
}

/// Partial update of a task. `None` means "leave unchanged".
///
/// Completion state is not patchable; it goes through
/// [`PipelineStore::complete_task`], which owns the completion timestamp.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New due date
    pub due_date: Option<NaiveDate>,
    /// New assignee
    pub assigned_to: Option<UserId>,
    /// New reminder flag
    pub reminder_sent: Option<bool>,
}

/// Fields required to log an activity
#[derive(Debug, Clone)]
pub struct NewActivity {
    /// Kind of touchpoint
    pub kind: ActivityKind,
    /// Short title
    pub title: String,
    /// Longer description, if any
    pub description: Option<String>,
    /// Contact involved
    pub contact_id: ContactId,
    /// Deal the touchpoint relates to, if any
    pub deal_id: Option<DealId>,
}

/// Single state owner for one pipeline session
#[derive(Debug, Default)]
pub struct PipelineStore {
    current_user: Option<User>,
    deals: IndexMap<DealId, Deal>,
    contacts: IndexMap<ContactId, Contact>,
    products: IndexMap<ProductId, Product>,
    activities: Vec<Activity>,
    change_log: ChangeLog,
}

impl PipelineStore {
    /// Create an empty store with no signed-in user
    pub fn new() -> Self {
        Self::default()
    }

    // --- session lifecycle ---

    /// Begin a session as the given user
    pub fn sign_in(&mut self, user: User) {
        debug!(user = %user.id, "session started");
        self.current_user = Some(user);
    }

    /// End the session. State is kept; mutations that need an acting user
    /// fail until the next sign-in.
    pub fn sign_out(&mut self) {
        self.current_user = None;
    }

    /// Drop all state, returning the store to its initial empty condition
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// The signed-in user, if any
    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    fn require_user(&self, operation: &str) -> DomainResult<UserId> {
        self.current_user
            .as_ref()
            .map(|u| u.id)
            .ok_or_else(|| DomainError::NotAuthenticated {
                operation: operation.to_string(),
            })
    }

    // --- read accessors ---

    /// Look up a deal
    pub fn deal(&self, id: DealId) -> Option<&Deal> {
        self.deals.get(&id)
    }

    /// All deals, in creation order
    pub fn deals(&self) -> impl Iterator<Item = &Deal> + Clone {
        self.deals.values()
    }

    /// Look up a contact
    pub fn contact(&self, id: ContactId) -> Option<&Contact> {
        self.contacts.get(&id)
    }

    /// All contacts, in creation order
    pub fn contacts(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.values()
    }

    /// Look up a product
    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id)
    }

    /// All products, in creation order
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    /// The global change log, in recording order
    pub fn changes(&self) -> &[DealChange] {
        self.change_log.records()
    }

    /// The change records of one deal, derived from the global log
    pub fn changes_for_deal(&self, deal_id: DealId) -> Vec<&DealChange> {
        self.change_log.for_deal(deal_id).collect()
    }

    /// All logged activities, in logging order
    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    // --- deal operations ---

    /// Create a deal. Emits exactly one `deal_added` record: field-level
    /// tracking starts only with later updates, never retroactively at
    /// creation.
    pub fn create_deal(&mut self, fields: NewDeal) -> DomainResult<DealId> {
        let user_id = self.require_user("create_deal")?;
        let now = Utc::now();

        let deal = Deal::create(fields, now)?;
        let deal_id = deal.id();
        debug!(deal = %deal_id, client = %deal.client_name, "deal created");

        self.change_log.append(
            deal_id,
            ChangeType::DealAdded,
            None,
            Some(Value::String(deal.client_name.clone())),
            user_id,
            now,
        );
        self.deals.insert(deal_id, deal);
        Ok(deal_id)
    }

    /// Merge a partial update into a deal, emitting one change record per
    /// tracked field that actually differs.
    pub fn update_deal(&mut self, id: DealId, patch: DealPatch) -> DomainResult<()> {
        let user_id = self.require_user("update_deal")?;
        let now = Utc::now();

        let deal = self
            .deals
            .get(&id)
            .ok_or_else(|| DomainError::not_found("Deal", id))?;

        let before = deal.clone();
        let mut after = before.clone();
        after.apply_patch(patch, now)?;

        for (change_type, previous, new) in tracked_field_changes(&before, &after) {
            self.change_log
                .append(id, change_type, previous, new, user_id, now);
        }
        self.deals.insert(id, after);
        Ok(())
    }

    /// Move a deal to a new stage.
    ///
    /// A same-stage transition is a no-op: no history entry, no change
    /// record. Entering a terminal stage from a non-terminal one emits a
    /// `deal_closed` record in addition to `stage_changed`; leaving a
    /// terminal stage re-activates the deal.
    pub fn transition_stage(&mut self, id: DealId, new_stage: DealStage) -> DomainResult<()> {
        let user_id = self.require_user("transition_stage")?;
        let now = Utc::now();

        let deal = self
            .deals
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Deal", id))?;

        let previous_stage = deal.stage;
        if !deal.enter_stage(new_stage, now) {
            debug!(deal = %id, stage = %new_stage, "same-stage transition ignored");
            return Ok(());
        }

        self.change_log.append(
            id,
            ChangeType::StageChanged,
            Some(Value::String(previous_stage.name().to_string())),
            Some(Value::String(new_stage.name().to_string())),
            user_id,
            now,
        );

        if new_stage.is_terminal() && !previous_stage.is_terminal() {
            self.change_log.append(
                id,
                ChangeType::DealClosed,
                Some(Value::String(previous_stage.name().to_string())),
                Some(Value::String(new_stage.name().to_string())),
                user_id,
                now,
            );
        }
        Ok(())
    }

    /// Delete a deal, unlinking its contacts. The deal's change records
    /// stay in the global log.
    pub fn delete_deal(&mut self, id: DealId) -> DomainResult<()> {
        let deal = self
            .deals
            .shift_remove(&id)
            .ok_or_else(|| DomainError::not_found("Deal", id))?;

        for contact in self.contacts.values_mut() {
            contact.deal_ids.retain(|d| *d != id);
        }
        debug!(deal = %id, client = %deal.client_name, "deal deleted");
        Ok(())
    }

    /// Assign a product to a deal, or clear the assignment with `None`.
    /// Emits a `product_added` record with the old and new references when
    /// the assignment actually changes.
    pub fn assign_product_to_deal(
        &mut self,
        deal_id: DealId,
        product_id: Option<ProductId>,
    ) -> DomainResult<()> {
        let user_id = self.require_user("assign_product_to_deal")?;
        let now = Utc::now();

        if let Some(pid) = product_id {
            if !self.products.contains_key(&pid) {
                return Err(DomainError::not_found("Product", pid));
            }
        }
        let deal = self
            .deals
            .get(&deal_id)
            .ok_or_else(|| DomainError::not_found("Deal", deal_id))?;

        let before = deal.clone();
        let mut after = before.clone();
        after.product_id = product_id;
        after.entity.updated_at = now;

        for (change_type, previous, new) in tracked_field_changes(&before, &after) {
            self.change_log
                .append(deal_id, change_type, previous, new, user_id, now);
        }
        if before.product_id != product_id {
            self.deals.insert(deal_id, after);
        }
        Ok(())
    }

    // --- note operations ---

    /// Append a note to a deal. Notes are immutable once created.
    pub fn add_note(&mut self, deal_id: DealId, content: impl Into<String>) -> DomainResult<NoteId> {
        let user_id = self.require_user("add_note")?;
        let now = Utc::now();

        let deal = self
            .deals
            .get_mut(&deal_id)
            .ok_or_else(|| DomainError::not_found("Deal", deal_id))?;

        let note = Note {
            id: NoteId::new(),
            deal_id,
            user_id,
            content: content.into(),
            created_at: now,
        };
        let note_id = note.id;
        deal.notes.push(note);
        deal.entity.updated_at = now;
        Ok(note_id)
    }

    // --- task operations ---

    /// Create a task on a deal
    pub fn create_task(&mut self, fields: NewTask) -> DomainResult<TaskId> {
        let user_id = self.require_user("create_task")?;
        let now = Utc::now();

        let deal = self
            .deals
            .get_mut(&fields.deal_id)
            .ok_or_else(|| DomainError::not_found("Deal", fields.deal_id))?;

        let task = Task {
            id: TaskId::new(),
            deal_id: fields.deal_id,
            title: fields.title,
            description: fields.description,
            due_date: fields.due_date,
            completed: false,
            completed_at: None,
            assigned_to: fields.assigned_to,
            created_by: user_id,
            created_at: now,
            reminder_sent: false,
        };
        let task_id = task.id;
        deal.tasks.push(task);
        deal.entity.updated_at = now;
        Ok(task_id)
    }

    /// Merge a partial update into a task
    pub fn update_task(&mut self, task_id: TaskId, patch: TaskPatch) -> DomainResult<()> {
        let now = Utc::now();
        let deal = self
            .deals
            .values_mut()
            .find(|d| d.tasks.iter().any(|t| t.id == task_id))
            .ok_or_else(|| DomainError::not_found("Task", task_id))?;
        let task = deal
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .expect("task present in this deal");

        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = Some(description);
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        if let Some(assigned_to) = patch.assigned_to {
            task.assigned_to = assigned_to;
        }
        if let Some(reminder_sent) = patch.reminder_sent {
            task.reminder_sent = reminder_sent;
        }
        deal.entity.updated_at = now;
        Ok(())
    }

    /// Mark a task completed. Idempotent: a repeat call leaves the original
    /// completion timestamp untouched.
    pub fn complete_task(&mut self, task_id: TaskId) -> DomainResult<()> {
        let now = Utc::now();
        let deal = self
            .deals
            .values_mut()
            .find(|d| d.tasks.iter().any(|t| t.id == task_id))
            .ok_or_else(|| DomainError::not_found("Task", task_id))?;
        let task = deal
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .expect("task present in this deal");

        if task.complete(now) {
            deal.entity.updated_at = now;
        }
        Ok(())
    }

    // --- contact operations ---

    /// Create a contact owned by the signed-in user. When created primary,
    /// every other contact sharing one of its deals loses the flag.
    pub fn create_contact(&mut self, fields: NewContact) -> DomainResult<ContactId> {
        let user_id = self.require_user("create_contact")?;
        let now = Utc::now();

        for deal_id in &fields.deal_ids {
            if !self.deals.contains_key(deal_id) {
                return Err(DomainError::not_found("Deal", deal_id));
            }
        }

        let contact = Contact::create(fields, user_id, now)?;
        let contact_id = contact.id();

        if contact.is_primary {
            self.clear_other_primaries(contact_id, &contact.deal_ids);
        }
        for deal_id in &contact.deal_ids {
            let deal = self.deals.get_mut(deal_id).expect("checked above");
            deal.contact_ids.push(contact_id);
            deal.entity.updated_at = now;
        }
        self.contacts.insert(contact_id, contact);
        Ok(contact_id)
    }

    /// Merge a partial update into a contact. Setting the primary flag
    /// atomically clears it on every other contact sharing a deal.
    pub fn update_contact(&mut self, id: ContactId, patch: ContactPatch) -> DomainResult<()> {
        let now = Utc::now();
        let contact = self
            .contacts
            .get(&id)
            .ok_or_else(|| DomainError::not_found("Contact", id))?;

        if patch.is_primary == Some(true) {
            let deal_ids = contact.deal_ids.clone();
            self.clear_other_primaries(id, &deal_ids);
        }
        let contact = self.contacts.get_mut(&id).expect("checked above");
        contact.apply_patch(patch, now);
        Ok(())
    }

    /// Delete a contact, cascading: it disappears from every deal's contact
    /// set and every activity referencing it is purged.
    pub fn delete_contact(&mut self, id: ContactId) -> DomainResult<()> {
        self.contacts
            .shift_remove(&id)
            .ok_or_else(|| DomainError::not_found("Contact", id))?;

        let now = Utc::now();
        for deal in self.deals.values_mut() {
            let before = deal.contact_ids.len();
            deal.contact_ids.retain(|c| *c != id);
            if deal.contact_ids.len() != before {
                deal.entity.updated_at = now;
            }
        }
        self.activities.retain(|a| a.contact_id != id);
        debug!(contact = %id, "contact deleted with cascade");
        Ok(())
    }

    /// Link a contact to a deal. Already-linked pairs are left as they are.
    pub fn link_contact_to_deal(&mut self, contact_id: ContactId, deal_id: DealId) -> DomainResult<()> {
        let now = Utc::now();
        if !self.deals.contains_key(&deal_id) {
            return Err(DomainError::not_found("Deal", deal_id));
        }
        let contact = self
            .contacts
            .get_mut(&contact_id)
            .ok_or_else(|| DomainError::not_found("Contact", contact_id))?;

        if !contact.deal_ids.contains(&deal_id) {
            contact.deal_ids.push(deal_id);
            contact.entity.updated_at = now;
        }
        let deal = self.deals.get_mut(&deal_id).expect("checked above");
        if !deal.contact_ids.contains(&contact_id) {
            deal.contact_ids.push(contact_id);
            deal.entity.updated_at = now;
        }
        Ok(())
    }

    /// Remove the link between a contact and a deal
    pub fn unlink_contact_from_deal(
        &mut self,
        contact_id: ContactId,
        deal_id: DealId,
    ) -> DomainResult<()> {
        let now = Utc::now();
        let contact = self
            .contacts
            .get_mut(&contact_id)
            .ok_or_else(|| DomainError::not_found("Contact", contact_id))?;
        contact.deal_ids.retain(|d| *d != deal_id);
        contact.entity.updated_at = now;

        if let Some(deal) = self.deals.get_mut(&deal_id) {
            deal.contact_ids.retain(|c| *c != contact_id);
            deal.entity.updated_at = now;
        }
        Ok(())
    }

    fn clear_other_primaries(&mut self, keep: ContactId, deal_ids: &[DealId]) {
        for contact in self.contacts.values_mut() {
            if contact.id() != keep
                && contact.is_primary
                && contact.deal_ids.iter().any(|d| deal_ids.contains(d))
            {
                contact.is_primary = false;
            }
        }
    }

    // --- product operations ---

    /// Add a product to the catalog
    pub fn create_product(
        &mut self,
        name: impl Into<String>,
        description: Option<String>,
    ) -> DomainResult<ProductId> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("product name must not be empty"));
        }
        let product = Product::new(name, description);
        let id = product.entity.id;
        self.products.insert(id, product);
        Ok(id)
    }

    // --- activity operations ---

    /// Log a touchpoint with a contact
    pub fn log_activity(&mut self, fields: NewActivity) -> DomainResult<ActivityId> {
        let user_id = self.require_user("log_activity")?;
        let now = Utc::now();

        if !self.contacts.contains_key(&fields.contact_id) {
            return Err(DomainError::not_found("Contact", fields.contact_id));
        }
        if let Some(deal_id) = fields.deal_id {
            if !self.deals.contains_key(&deal_id) {
                return Err(DomainError::not_found("Deal", deal_id));
            }
        }

        let activity = Activity {
            id: ActivityId::new(),
            kind: fields.kind,
            title: fields.title,
            description: fields.description,
            contact_id: fields.contact_id,
            deal_id: fields.deal_id,
            created_at: now,
            created_by: user_id,
        };
        let id = activity.id;
        self.activities.push(activity);
        Ok(id)
    }
}
