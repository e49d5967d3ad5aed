// Copyright 2025 Cowboy AI, LLC.

//! User display preferences and their sync boundary
//!
//! Preferences live behind an async [`PreferenceStore`] trait so the
//! persistence side can be a remote service. The sync layer never lets a
//! storage failure reach the caller: a failed load degrades to defaults and
//! a failed save keeps the in-memory value, both logged at warn level.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::entity::UserId;
use crate::errors::DomainError;

/// How the pipeline board is rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineViewKind {
    /// Kanban-style cards per stage
    #[default]
    Card,
    /// Flat table of deals
    List,
}

/// Which monetary figure dashboard widgets display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardValueKind {
    /// Total deal value
    #[default]
    Total,
    /// Annual recurring revenue
    Arr,
}

/// One user's display preferences
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Pipeline board rendering
    pub pipeline_view_type: PipelineViewKind,
    /// Dashboard monetary figure
    pub dashboard_value_type: DashboardValueKind,
}

/// Persistence boundary for preferences
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Load the stored preferences for a user. `Ok(None)` means no record
    /// exists yet; it is not an error.
    async fn get(&self, user_id: UserId) -> Result<Option<UserPreferences>, DomainError>;

    /// Create or replace the stored preferences for a user
    async fn upsert(
        &self,
        user_id: UserId,
        preferences: UserPreferences,
    ) -> Result<(), DomainError>;
}

/// In-memory preference store, used in tests and single-process setups
#[derive(Debug, Default, Clone)]
pub struct InMemoryPreferenceStore {
    records: Arc<RwLock<HashMap<UserId, UserPreferences>>>,
}

impl InMemoryPreferenceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for InMemoryPreferenceStore {
    async fn get(&self, user_id: UserId) -> Result<Option<UserPreferences>, DomainError> {
        Ok(self.records.read().await.get(&user_id).copied())
    }

    async fn upsert(
        &self,
        user_id: UserId,
        preferences: UserPreferences,
    ) -> Result<(), DomainError> {
        self.records.write().await.insert(user_id, preferences);
        Ok(())
    }
}

/// Keeps one user's preferences in memory and mirrors them to a
/// [`PreferenceStore`], absorbing storage failures.
pub struct PreferenceSync {
    store: Arc<dyn PreferenceStore>,
    user_id: UserId,
    current: UserPreferences,
}

impl PreferenceSync {
    /// Load the user's preferences, creating and persisting the default
    /// record when none exists. Storage failures degrade to defaults.
    pub async fn load_or_default(store: Arc<dyn PreferenceStore>, user_id: UserId) -> Self {
        let current = match store.get(user_id).await {
            Ok(Some(preferences)) => preferences,
            Ok(None) => {
                let defaults = UserPreferences::default();
                debug!(user = %user_id, "no preference record, creating defaults");
                if let Err(e) = store.upsert(user_id, defaults).await {
                    warn!(user = %user_id, error = %e, "failed to persist default preferences");
                }
                defaults
            }
            Err(e) => {
                warn!(user = %user_id, error = %e, "preference load failed, using defaults");
                UserPreferences::default()
            }
        };
        Self {
            store,
            user_id,
            current,
        }
    }

    /// The current in-memory preferences
    pub fn current(&self) -> UserPreferences {
        self.current
    }

    /// Set the pipeline view and persist the change
    pub async fn set_pipeline_view(&mut self, view: PipelineViewKind) {
        self.current.pipeline_view_type = view;
        self.persist().await;
    }

    /// Set the dashboard value figure and persist the change
    pub async fn set_dashboard_value(&mut self, value: DashboardValueKind) {
        self.current.dashboard_value_type = value;
        self.persist().await;
    }

    // The in-memory value is already updated when this runs; a failed save
    // only means the next session starts from older stored state.
    async fn persist(&self) {
        if let Err(e) = self.store.upsert(self.user_id, self.current).await {
            warn!(user = %self.user_id, error = %e, "failed to persist preferences");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStore;

    #[async_trait]
    impl PreferenceStore for FailingStore {
        async fn get(&self, _user_id: UserId) -> Result<Option<UserPreferences>, DomainError> {
            Err(DomainError::ExternalServiceError {
                service: "preferences".to_string(),
                message: "connection refused".to_string(),
            })
        }

        async fn upsert(
            &self,
            _user_id: UserId,
            _preferences: UserPreferences,
        ) -> Result<(), DomainError> {
            Err(DomainError::ExternalServiceError {
                service: "preferences".to_string(),
                message: "connection refused".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_first_load_creates_the_default_record() {
        let store = Arc::new(InMemoryPreferenceStore::new());
        let user_id = UserId::new();

        let sync = PreferenceSync::load_or_default(store.clone(), user_id).await;
        assert_eq!(sync.current(), UserPreferences::default());

        // The default record was persisted, not just held in memory
        let stored = store.get(user_id).await.unwrap();
        assert_eq!(stored, Some(UserPreferences::default()));
    }

    #[tokio::test]
    async fn test_updates_are_mirrored_to_the_store() {
        let store = Arc::new(InMemoryPreferenceStore::new());
        let user_id = UserId::new();

        let mut sync = PreferenceSync::load_or_default(store.clone(), user_id).await;
        sync.set_pipeline_view(PipelineViewKind::List).await;
        sync.set_dashboard_value(DashboardValueKind::Arr).await;

        let stored = store.get(user_id).await.unwrap().unwrap();
        assert_eq!(stored.pipeline_view_type, PipelineViewKind::List);
        assert_eq!(stored.dashboard_value_type, DashboardValueKind::Arr);
    }

    #[tokio::test]
    async fn test_second_load_returns_the_stored_record() {
        let store = Arc::new(InMemoryPreferenceStore::new());
        let user_id = UserId::new();

        let mut sync = PreferenceSync::load_or_default(store.clone(), user_id).await;
        sync.set_pipeline_view(PipelineViewKind::List).await;
        drop(sync);

        let reloaded = PreferenceSync::load_or_default(store, user_id).await;
        assert_eq!(reloaded.current().pipeline_view_type, PipelineViewKind::List);
    }

    #[tokio::test]
    async fn test_storage_failure_degrades_to_defaults() {
        let sync = PreferenceSync::load_or_default(Arc::new(FailingStore), UserId::new()).await;
        assert_eq!(sync.current(), UserPreferences::default());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_the_in_memory_value() {
        let mut sync = PreferenceSync::load_or_default(Arc::new(FailingStore), UserId::new()).await;
        sync.set_dashboard_value(DashboardValueKind::Arr).await;
        assert_eq!(sync.current().dashboard_value_type, DashboardValueKind::Arr);
    }

    #[test]
    fn test_preference_serde_labels() {
        let prefs = UserPreferences {
            pipeline_view_type: PipelineViewKind::Card,
            dashboard_value_type: DashboardValueKind::Arr,
        };
        let json = serde_json::to_string(&prefs).unwrap();
        assert_eq!(
            json,
            "{\"pipeline_view_type\":\"card\",\"dashboard_value_type\":\"arr\"}"
        );
    }
}
