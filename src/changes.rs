// Copyright 2025 Cowboy AI, LLC.

//! Deal change records and the global change log
//!
//! Every tracked mutation of a deal produces an immutable [`DealChange`].
//! Records live in one globally ordered [`ChangeLog`]; per-deal views are
//! derived from it by filtering, so the two views cannot drift apart.
//!
//! Ordering is by a store-assigned monotonic sequence number, not by wall
//! clock: two records created within the same millisecond still sort in
//! call order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::deal::Deal;
use crate::entity::{ChangeId, DealId, UserId};

/// What kind of transition a change record captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// The deal moved to a different stage
    StageChanged,
    /// The deal was created
    DealAdded,
    /// The deal entered a terminal stage
    DealClosed,
    /// Annual recurring revenue changed
    ArrUpdated,
    /// First-year ARR changed
    ArrYear1Updated,
    /// Implementation revenue changed
    ImplementationRevenueUpdated,
    /// Implementation timeline changed
    TimelineUpdated,
    /// A product was assigned or reassigned
    ProductAdded,
    /// The owning user changed
    OwnerChanged,
}

/// An immutable record of one field transition on one deal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealChange {
    /// Unique identifier
    pub id: ChangeId,
    /// Deal the change belongs to
    pub deal_id: DealId,
    /// Kind of transition
    pub change_type: ChangeType,
    /// Value before the change, when one existed
    pub previous_value: Option<Value>,
    /// Value after the change, when one exists
    pub new_value: Option<Value>,
    /// Position in the global order; assigned by the log, strictly increasing
    pub sequence: u64,
    /// When the change was recorded
    pub timestamp: DateTime<Utc>,
    /// User who performed the mutation
    pub user_id: UserId,
}

/// Append-only, globally ordered log of deal changes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeLog {
    records: Vec<DealChange>,
    next_sequence: u64,
}

impl ChangeLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, assigning it the next sequence number
    pub fn append(
        &mut self,
        deal_id: DealId,
        change_type: ChangeType,
        previous_value: Option<Value>,
        new_value: Option<Value>,
        user_id: UserId,
        timestamp: DateTime<Utc>,
    ) -> &DealChange {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.records.push(DealChange {
            id: ChangeId::new(),
            deal_id,
            change_type,
            previous_value,
            new_value,
            sequence,
            timestamp,
            user_id,
        });
        self.records.last().expect("record just pushed")
    }

    /// All records in global order
    pub fn records(&self) -> &[DealChange] {
        &self.records
    }

    /// The per-deal view, derived from the global log
    pub fn for_deal(&self, deal_id: DealId) -> impl Iterator<Item = &DealChange> {
        self.records.iter().filter(move |c| c.deal_id == deal_id)
    }

    /// Number of records in the log
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One entry of the tracked-field table: which change type a field maps to
/// and how to read its current value off a deal.
struct TrackedField {
    change_type: ChangeType,
    extract: fn(&Deal) -> Option<Value>,
}

/// The declarative table of deal fields whose updates produce change
/// records. Adding a trackable attribute means adding one row here.
const TRACKED_FIELDS: &[TrackedField] = &[
    TrackedField {
        change_type: ChangeType::ArrUpdated,
        extract: |deal| deal.annual_recurring_revenue.map(Value::from),
    },
    TrackedField {
        change_type: ChangeType::ArrYear1Updated,
        extract: |deal| deal.arr_year1.map(Value::from),
    },
    TrackedField {
        change_type: ChangeType::ImplementationRevenueUpdated,
        extract: |deal| deal.implementation_revenue.map(Value::from),
    },
    TrackedField {
        change_type: ChangeType::TimelineUpdated,
        extract: |deal| {
            deal.implementation_timeline
                .as_ref()
                .map(|t| serde_json::to_value(t).expect("timeline serializes"))
        },
    },
    TrackedField {
        change_type: ChangeType::OwnerChanged,
        extract: |deal| Some(Value::String(deal.owner_id.to_string())),
    },
    TrackedField {
        change_type: ChangeType::ProductAdded,
        extract: |deal| deal.product_id.map(|id| Value::String(id.to_string())),
    },
];

/// Diff two snapshots of the same deal against the tracked-field table.
///
/// Returns one `(change type, previous, new)` triple per field that
/// differs, in table order. Fields outside the table never produce records.
pub fn tracked_field_changes(
    before: &Deal,
    after: &Deal,
) -> Vec<(ChangeType, Option<Value>, Option<Value>)> {
    TRACKED_FIELDS
        .iter()
        .filter_map(|field| {
            let old = (field.extract)(before);
            let new = (field.extract)(after);
            (old != new).then_some((field.change_type, old, new))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::{ClientType, DealPatch, ImplementationTimeline, LeadSource, NewDeal};
    use crate::stage::DealStage;
    use chrono::NaiveDate;

    fn sample_deal() -> Deal {
        Deal::create(
            NewDeal::new(
                "Acme",
                ClientType::Commercial,
                200_000.0,
                LeadSource::Website,
                DealStage::LeadIdentified,
                NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
                UserId::new(),
            ),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_change_type_serde_labels() {
        assert_eq!(
            serde_json::to_string(&ChangeType::StageChanged).unwrap(),
            "\"stage_changed\""
        );
        assert_eq!(
            serde_json::to_string(&ChangeType::ArrYear1Updated).unwrap(),
            "\"arr_year1_updated\""
        );
        assert_eq!(
            serde_json::to_string(&ChangeType::ImplementationRevenueUpdated).unwrap(),
            "\"implementation_revenue_updated\""
        );
    }

    #[test]
    fn test_sequence_breaks_same_instant_ties() {
        let mut log = ChangeLog::new();
        let deal_id = DealId::new();
        let user = UserId::new();
        let instant = Utc::now();

        log.append(deal_id, ChangeType::DealAdded, None, None, user, instant);
        log.append(
            deal_id,
            ChangeType::ArrUpdated,
            None,
            Some(Value::from(1000.0)),
            user,
            instant,
        );

        let records = log.records();
        assert_eq!(records[0].timestamp, records[1].timestamp);
        assert!(records[0].sequence < records[1].sequence);
        assert_eq!(records[0].change_type, ChangeType::DealAdded);
    }

    #[test]
    fn test_per_deal_view_is_a_filter_of_the_global_log() {
        let mut log = ChangeLog::new();
        let deal_a = DealId::new();
        let deal_b = DealId::new();
        let user = UserId::new();

        log.append(deal_a, ChangeType::DealAdded, None, None, user, Utc::now());
        log.append(deal_b, ChangeType::DealAdded, None, None, user, Utc::now());
        log.append(
            deal_a,
            ChangeType::ArrUpdated,
            None,
            Some(Value::from(5.0)),
            user,
            Utc::now(),
        );

        let for_a: Vec<_> = log.for_deal(deal_a).collect();
        assert_eq!(for_a.len(), 2);
        assert!(for_a.iter().all(|c| c.deal_id == deal_a));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_tracked_diff_detects_each_field() {
        let before = sample_deal();

        let mut after = before.clone();
        after
            .apply_patch(
                DealPatch {
                    annual_recurring_revenue: Some(50_000.0),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();

        let changes = tracked_field_changes(&before, &after);
        assert_eq!(changes.len(), 1);
        let (change_type, old, new) = &changes[0];
        assert_eq!(*change_type, ChangeType::ArrUpdated);
        assert_eq!(*old, None);
        assert_eq!(*new, Some(Value::from(50_000.0)));
    }

    #[test]
    fn test_tracked_diff_reports_multiple_fields_in_table_order() {
        let before = sample_deal();
        let new_owner = UserId::new();

        let mut after = before.clone();
        after
            .apply_patch(
                DealPatch {
                    arr_year1: Some(25_000.0),
                    implementation_revenue: Some(10_000.0),
                    implementation_timeline: Some(
                        ImplementationTimeline::new(
                            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                        )
                        .unwrap(),
                    ),
                    owner_id: Some(new_owner),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();

        let kinds: Vec<ChangeType> = tracked_field_changes(&before, &after)
            .into_iter()
            .map(|(k, _, _)| k)
            .collect();
        assert_eq!(
            kinds,
            vec![
                ChangeType::ArrYear1Updated,
                ChangeType::ImplementationRevenueUpdated,
                ChangeType::TimelineUpdated,
                ChangeType::OwnerChanged,
            ]
        );
    }

    #[test]
    fn test_untracked_fields_produce_no_records() {
        let before = sample_deal();

        let mut after = before.clone();
        after
            .apply_patch(
                DealPatch {
                    client_name: Some("Acme Health".to_string()),
                    deal_value: Some(300_000.0),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();

        assert!(tracked_field_changes(&before, &after).is_empty());
    }

    #[test]
    fn test_equal_snapshots_diff_to_nothing() {
        let deal = sample_deal();
        assert!(tracked_field_changes(&deal, &deal).is_empty());
    }
}
