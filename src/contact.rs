//! Contact aggregate and activity log entries
//!
//! Contacts are standalone aggregates that may be linked to any number of
//! deals. At most one contact per deal carries the primary flag; the store
//! enforces that exclusivity atomically on update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{ActivityId, ContactId, ContactMarker, DealId, Entity, UserId};
use crate::errors::{DomainError, DomainResult};

/// A person associated with zero or more deals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Core entity data
    pub entity: Entity<ContactMarker>,
    /// Full name
    pub name: String,
    /// Job title
    pub title: String,
    /// Email address
    pub email: String,
    /// Phone number, if known
    pub phone: Option<String>,
    /// Company, if known
    pub company: Option<String>,
    /// LinkedIn profile URL, if known
    pub linkedin_url: Option<String>,
    /// Free-text notes about the person
    pub notes: Option<String>,
    /// Whether this is the primary contact on its deals
    pub is_primary: bool,
    /// Owning user
    pub owner_id: UserId,
    /// Deals this contact is linked to
    pub deal_ids: Vec<DealId>,
}

/// Fields required to create a contact
#[derive(Debug, Clone)]
pub struct NewContact {
    /// Full name
    pub name: String,
    /// Job title
    pub title: String,
    /// Email address
    pub email: String,
    /// Phone number, if known
    pub phone: Option<String>,
    /// Company, if known
    pub company: Option<String>,
    /// LinkedIn profile URL, if known
    pub linkedin_url: Option<String>,
    /// Free-text notes
    pub notes: Option<String>,
    /// Whether this contact should be primary on its deals
    pub is_primary: bool,
    /// Deals to link the contact to on creation
    pub deal_ids: Vec<DealId>,
}

impl NewContact {
    /// Minimal constructor; optional fields start unset
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            email: email.into(),
            phone: None,
            company: None,
            linkedin_url: None,
            notes: None,
            is_primary: false,
            deal_ids: Vec::new(),
        }
    }
}

/// Partial update of a contact. `None` means "leave unchanged".
#[derive(Debug, Clone, Default)]
pub struct ContactPatch {
    /// New name
    pub name: Option<String>,
    /// New title
    pub title: Option<String>,
    /// New email
    pub email: Option<String>,
    /// New phone number
    pub phone: Option<String>,
    /// New company
    pub company: Option<String>,
    /// New LinkedIn URL
    pub linkedin_url: Option<String>,
    /// New notes
    pub notes: Option<String>,
    /// New primary flag; setting `Some(true)` clears the flag on every
    /// other contact sharing a deal with this one
    pub is_primary: Option<bool>,
}

impl Contact {
    /// Create a contact from its creation fields
    pub fn create(fields: NewContact, owner_id: UserId, now: DateTime<Utc>) -> DomainResult<Self> {
        if fields.name.trim().is_empty() {
            return Err(DomainError::validation("contact name must not be empty"));
        }
        Ok(Self {
            entity: Entity {
                id: ContactId::new(),
                created_at: now,
                updated_at: now,
            },
            name: fields.name,
            title: fields.title,
            email: fields.email,
            phone: fields.phone,
            company: fields.company,
            linkedin_url: fields.linkedin_url,
            notes: fields.notes,
            is_primary: fields.is_primary,
            owner_id,
            deal_ids: fields.deal_ids,
        })
    }

    /// This contact's ID
    pub fn id(&self) -> ContactId {
        self.entity.id
    }

    /// Whether the contact is linked to the given deal
    pub fn is_linked_to(&self, deal_id: DealId) -> bool {
        self.deal_ids.contains(&deal_id)
    }

    /// Merge a patch into this contact
    pub fn apply_patch(&mut self, patch: ContactPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(phone) = patch.phone {
            self.phone = Some(phone);
        }
        if let Some(company) = patch.company {
            self.company = Some(company);
        }
        if let Some(url) = patch.linkedin_url {
            self.linkedin_url = Some(url);
        }
        if let Some(notes) = patch.notes {
            self.notes = Some(notes);
        }
        if let Some(primary) = patch.is_primary {
            self.is_primary = primary;
        }
        self.entity.updated_at = now;
    }
}

/// Kind of logged touchpoint with a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// Phone call
    Call,
    /// Email exchange
    Email,
    /// In-person or virtual meeting
    Meeting,
}

/// A logged touchpoint between a user and a contact, scoped to a deal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Unique identifier
    pub id: ActivityId,
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
    /// When the activity happened
    pub created_at: DateTime<Utc>,
    /// User who logged it
    pub created_by: UserId,
}
