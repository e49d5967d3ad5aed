//! Entity types with identity and lifecycle
//!
//! Entities are domain objects with identity that persists across time.
//! Every aggregate in the pipeline domain (deals, contacts, tasks, notes,
//! products) is built on the generic [`Entity`] with a phantom-typed ID.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

/// A generic entity with a typed ID
///
/// # Examples
///
/// ```rust
/// use pipeline_domain::{Entity, EntityId};
/// use pipeline_domain::markers::DealMarker;
///
/// let deal_entity = Entity::<DealMarker>::new();
/// assert_eq!(deal_entity.created_at, deal_entity.updated_at);
///
/// let id = EntityId::<DealMarker>::new();
/// let deal_entity = Entity::with_id(id);
/// assert_eq!(deal_entity.id, id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity<T> {
    /// The unique identifier for this entity
    pub id: EntityId<T>,
    /// When this entity was created
    pub created_at: DateTime<Utc>,
    /// When this entity was last updated
    pub updated_at: DateTime<Utc>,
}

impl<T> Entity<T> {
    /// Create a new entity with a generated ID
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create an entity with a specific ID
    pub fn with_id(id: EntityId<T>) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the entity's timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl<T> Default for Entity<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A typed entity ID using phantom types for type safety
///
/// These IDs are globally unique and persistent. The phantom type parameter
/// ensures that IDs for different entity types cannot be mixed up at compile
/// time: a `DealId` never accepts a `ContactId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId<T> {
    id: Uuid,
    #[serde(skip)]
    _phantom: PhantomData<T>,
}

impl<T> EntityId<T> {
    /// Create a new random entity ID
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            _phantom: PhantomData,
        }
    }

    /// Create an entity ID from a UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self {
            id,
            _phantom: PhantomData,
        }
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.id
    }
}

impl<T> fmt::Display for EntityId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl<T> Default for EntityId<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<EntityId<T>> for Uuid {
    fn from(id: EntityId<T>) -> Self {
        id.id
    }
}

impl<T> From<&EntityId<T>> for Uuid {
    fn from(id: &EntityId<T>) -> Self {
        id.id
    }
}

// Marker types for entity IDs

/// Marker for deal aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DealMarker;

/// Marker for contact aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactMarker;

/// Marker for task entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskMarker;

/// Marker for note entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteMarker;

/// Marker for product catalog entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductMarker;

/// Marker for users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserMarker;

/// Marker for activity log entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityMarker;

/// Marker for deal change records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeMarker;

/// ID of a deal
pub type DealId = EntityId<DealMarker>;
/// ID of a contact
pub type ContactId = EntityId<ContactMarker>;
/// ID of a task
pub type TaskId = EntityId<TaskMarker>;
/// ID of a note
pub type NoteId = EntityId<NoteMarker>;
/// ID of a product
pub type ProductId = EntityId<ProductMarker>;
/// ID of a user
pub type UserId = EntityId<UserMarker>;
/// ID of an activity log entry
pub type ActivityId = EntityId<ActivityMarker>;
/// ID of a deal change record
pub type ChangeId = EntityId<ChangeMarker>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_entity_new() {
        let entity: Entity<DealMarker> = Entity::new();

        assert!(!entity.id.as_uuid().is_nil());
        assert_eq!(entity.created_at, entity.updated_at);

        let age = Utc::now() - entity.created_at;
        assert!(age.num_seconds() < 1);
    }

    #[test]
    fn test_entity_with_id() {
        let id = EntityId::<ContactMarker>::new();
        let entity = Entity::with_id(id);

        assert_eq!(entity.id, id);
        assert_eq!(entity.created_at, entity.updated_at);
    }

    #[test]
    fn test_entity_touch() {
        let mut entity: Entity<DealMarker> = Entity::new();
        let original_created = entity.created_at;
        let original_updated = entity.updated_at;
        let original_id = entity.id;

        std::thread::sleep(std::time::Duration::from_millis(2));
        entity.touch();

        assert_eq!(entity.id, original_id);
        assert_eq!(entity.created_at, original_created);
        assert!(entity.updated_at > original_updated);
    }

    #[test]
    fn test_entity_id_uniqueness() {
        let id1 = DealId::new();
        let id2 = DealId::new();

        assert_ne!(id1, id2);
        assert!(!id1.as_uuid().is_nil());
    }

    #[test]
    fn test_entity_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = ContactId::from_uuid(uuid);

        assert_eq!(id.as_uuid(), &uuid);
        assert_eq!(format!("{id}"), format!("{uuid}"));
    }

    #[test]
    fn test_entity_id_serde() {
        let original = DealId::new();

        let json = serde_json::to_string(&original).unwrap();
        let deserialized: DealId = serde_json::from_str(&json).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_entity_id_as_map_key() {
        let mut map = HashMap::new();
        let id1 = DealId::new();
        let id2 = DealId::new();

        map.insert(id1, "acme");
        map.insert(id2, "globex");

        assert_eq!(map.get(&id1), Some(&"acme"));
        assert_eq!(map.get(&id2), Some(&"globex"));
        assert_eq!(map.len(), 2);
    }
}
