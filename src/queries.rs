// Copyright 2025 Cowboy AI, LLC.

//! Pipeline analytics over the store's state
//!
//! All queries here are pure functions over deal and change-record slices,
//! plus thin convenience methods on [`PipelineStore`] that feed them the
//! store's own collections. Monetary results are plain `f64`; rates are
//! percentages in the 0 to 100 range.

use std::collections::HashMap;

use chrono::{NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::changes::{ChangeType, DealChange};
use crate::contact::Contact;
use crate::deal::Deal;
use crate::entity::{ContactId, DealId};
use crate::stage::{DealStage, StageMovement};
use crate::store::PipelineStore;

/// Deals whose stage is not terminal
pub fn active_deals<'a>(deals: impl IntoIterator<Item = &'a Deal>) -> Vec<&'a Deal> {
    deals.into_iter().filter(|d| d.is_active).collect()
}

/// Probability-weighted sum of deal values over active deals
pub fn weighted_pipeline_value<'a>(deals: impl IntoIterator<Item = &'a Deal>) -> f64 {
    deals
        .into_iter()
        .filter(|d| d.is_active)
        .map(Deal::weighted_value)
        .sum()
}

/// Probability-weighted sum of annual recurring revenue over active deals.
/// Deals with no ARR recorded contribute zero.
pub fn weighted_pipeline_arr<'a>(deals: impl IntoIterator<Item = &'a Deal>) -> f64 {
    deals
        .into_iter()
        .filter(|d| d.is_active)
        .map(Deal::weighted_arr)
        .sum()
}

/// Won deals as a percentage of all closed deals, 0 when nothing has closed
pub fn win_rate<'a>(deals: impl IntoIterator<Item = &'a Deal>) -> f64 {
    let mut won = 0usize;
    let mut lost = 0usize;
    for deal in deals {
        match deal.stage {
            DealStage::ClosedWon => won += 1,
            DealStage::ClosedLost => lost += 1,
            _ => {}
        }
    }
    if won + lost == 0 {
        return 0.0;
    }
    won as f64 / (won + lost) as f64 * 100.0
}

/// Mean deal value across won deals, 0 when none have been won
pub fn average_deal_size<'a>(deals: impl IntoIterator<Item = &'a Deal>) -> f64 {
    let won: Vec<f64> = deals
        .into_iter()
        .filter(|d| d.stage == DealStage::ClosedWon)
        .map(|d| d.deal_value)
        .collect();
    if won.is_empty() {
        return 0.0;
    }
    won.iter().sum::<f64>() / won.len() as f64
}

/// Change records whose timestamp falls within `[start, end]`, where `end`
/// is inclusive through its last instant. Newest first; records from the
/// same instant keep reverse recording order.
pub fn changes_in_range<'a>(
    changes: &'a [DealChange],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<&'a DealChange> {
    let range_start = Utc.from_utc_datetime(&start.and_hms_opt(0, 0, 0).expect("valid time"));
    let range_end = Utc.from_utc_datetime(
        &end.and_hms_milli_opt(23, 59, 59, 999)
            .expect("valid time"),
    );

    let mut in_range: Vec<&DealChange> = changes
        .iter()
        .filter(|c| c.timestamp >= range_start && c.timestamp <= range_end)
        .collect();
    in_range.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then(b.sequence.cmp(&a.sequence))
    });
    in_range
}

/// Contacts linked to the given deal, preserving input order
pub fn contacts_for_deal<'a>(
    contacts: impl IntoIterator<Item = &'a Contact>,
    deal: &Deal,
) -> Vec<&'a Contact> {
    contacts
        .into_iter()
        .filter(|c| c.is_linked_to(deal.id()))
        .collect()
}

/// Deals linked to the given contact, preserving input order
pub fn deals_for_contact<'a>(
    deals: impl IntoIterator<Item = &'a Deal>,
    contact_id: ContactId,
) -> Vec<&'a Deal> {
    deals
        .into_iter()
        .filter(|d| d.contact_ids.contains(&contact_id))
        .collect()
}

/// Mean days spent in each stage, keyed by the stage that was departed.
///
/// Each consecutive pair in a deal's stage history contributes one sample
/// for the earlier stage: the whole-day difference between the two entry
/// timestamps. A deal still sitting in its latest stage contributes no
/// sample for it. Stages nothing has departed are absent from the map.
pub fn average_time_in_stage<'a>(
    deals: impl IntoIterator<Item = &'a Deal>,
) -> HashMap<DealStage, f64> {
    let mut samples: HashMap<DealStage, Vec<i64>> = HashMap::new();
    for deal in deals {
        for pair in deal.stage_history.windows(2) {
            let days = (pair[1].timestamp - pair[0].timestamp).num_days();
            samples.entry(pair[0].stage).or_default().push(days);
        }
    }
    samples
        .into_iter()
        .map(|(stage, days)| {
            let mean = days.iter().sum::<i64>() as f64 / days.len() as f64;
            (stage, mean.round())
        })
        .collect()
}

/// One column of the pipeline board: how many deals sit at a stage and
/// what they are worth unweighted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSlice {
    /// The stage
    pub stage: DealStage,
    /// Deals currently at this stage
    pub deal_count: usize,
    /// Unweighted sum of their deal values
    pub total_value: f64,
}

/// Per-stage deal counts and values in funnel order, one slice per stage
/// whether or not any deal sits there
pub fn stage_breakdown<'a>(deals: impl IntoIterator<Item = &'a Deal>) -> Vec<StageSlice> {
    let mut slices: Vec<StageSlice> = DealStage::ALL
        .iter()
        .map(|&stage| StageSlice {
            stage,
            deal_count: 0,
            total_value: 0.0,
        })
        .collect();
    for deal in deals {
        let slice = slices
            .iter_mut()
            .find(|s| s.stage == deal.stage)
            .expect("every stage has a slice");
        slice.deal_count += 1;
        slice.total_value += deal.deal_value;
    }
    slices
}

/// Roll-up of the headline pipeline numbers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineMetrics {
    /// Count of active deals
    pub active_deal_count: usize,
    /// Unweighted sum of active deal values
    pub total_pipeline_value: f64,
    /// Probability-weighted sum of active deal values
    pub weighted_pipeline_value: f64,
    /// Probability-weighted sum of active deal ARR
    pub weighted_pipeline_arr: f64,
    /// Won percentage of closed deals
    pub win_rate: f64,
    /// Mean value of won deals
    pub average_deal_size: f64,
    /// Per-stage deal counts and values, in funnel order
    pub stages: Vec<StageSlice>,
}

/// Compute the headline metrics in one pass over the deal collection
pub fn pipeline_metrics<'a>(deals: impl IntoIterator<Item = &'a Deal> + Clone) -> PipelineMetrics {
    PipelineMetrics {
        active_deal_count: active_deals(deals.clone()).len(),
        total_pipeline_value: deals
            .clone()
            .into_iter()
            .filter(|d| d.is_active)
            .map(|d| d.deal_value)
            .sum(),
        weighted_pipeline_value: weighted_pipeline_value(deals.clone()),
        weighted_pipeline_arr: weighted_pipeline_arr(deals.clone()),
        win_rate: win_rate(deals.clone()),
        average_deal_size: average_deal_size(deals.clone()),
        stages: stage_breakdown(deals),
    }
}

/// Aggregate view of a set of change records, typically a date-range slice
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeSummary {
    /// Stage moves toward closing
    pub deals_progressed: usize,
    /// Stage moves away from closing
    pub deals_regressed: usize,
    /// Deals created
    pub new_deals: usize,
    /// Deals that entered Closed Won
    pub deals_won: usize,
    /// Combined value of the won deals, where the deal still exists
    pub won_value: f64,
    /// Deals that entered Closed Lost
    pub deals_lost: usize,
    /// Combined value of the lost deals, where the deal still exists
    pub lost_value: f64,
    /// Net ARR movement across `arr_updated` and `arr_year1_updated` records
    pub net_arr_change: f64,
    /// Net movement across `implementation_revenue_updated` records
    pub net_implementation_change: f64,
}

impl ChangeSummary {
    /// Net pipeline movement: revenue field deltas plus won value, minus
    /// lost value
    pub fn total_net_change(&self) -> f64 {
        self.net_arr_change + self.net_implementation_change + self.won_value - self.lost_value
    }
}

fn stage_from_value(value: Option<&serde_json::Value>) -> Option<DealStage> {
    value?.as_str()?.parse().ok()
}

fn amount_from_value(value: Option<&serde_json::Value>) -> f64 {
    value.and_then(serde_json::Value::as_f64).unwrap_or(0.0)
}

/// Summarize a slice of change records.
///
/// `deal_value` resolves a deal's current value for the won/lost value
/// totals; it returns `None` for deals deleted since their records were
/// written, which then contribute only to the counts.
pub fn summarize_changes<F>(changes: &[&DealChange], deal_value: F) -> ChangeSummary
where
    F: Fn(DealId) -> Option<f64>,
{
    let mut summary = ChangeSummary::default();
    for change in changes {
        match change.change_type {
            ChangeType::StageChanged => {
                let previous = stage_from_value(change.previous_value.as_ref());
                let new = stage_from_value(change.new_value.as_ref());
                if let (Some(previous), Some(new)) = (previous, new) {
                    match StageMovement::classify(previous, new) {
                        StageMovement::Progressed => summary.deals_progressed += 1,
                        StageMovement::Regressed => summary.deals_regressed += 1,
                        StageMovement::Lateral => {}
                    }
                }
            }
            ChangeType::DealAdded => summary.new_deals += 1,
            ChangeType::DealClosed => match stage_from_value(change.new_value.as_ref()) {
                Some(DealStage::ClosedWon) => {
                    summary.deals_won += 1;
                    summary.won_value += deal_value(change.deal_id).unwrap_or(0.0);
                }
                Some(DealStage::ClosedLost) => {
                    summary.deals_lost += 1;
                    summary.lost_value += deal_value(change.deal_id).unwrap_or(0.0);
                }
                _ => {}
            },
            ChangeType::ArrUpdated | ChangeType::ArrYear1Updated => {
                summary.net_arr_change += amount_from_value(change.new_value.as_ref())
                    - amount_from_value(change.previous_value.as_ref());
            }
            ChangeType::ImplementationRevenueUpdated => {
                summary.net_implementation_change += amount_from_value(change.new_value.as_ref())
                    - amount_from_value(change.previous_value.as_ref());
            }
            _ => {}
        }
    }
    summary
}

impl PipelineStore {
    /// Headline metrics over this store's deals
    pub fn metrics(&self) -> PipelineMetrics {
        pipeline_metrics(self.deals())
    }

    /// Change records within the inclusive date range, newest first
    pub fn changes_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<&DealChange> {
        changes_in_range(self.changes(), start, end)
    }

    /// Summary of the change records within the inclusive date range
    pub fn change_summary_between(&self, start: NaiveDate, end: NaiveDate) -> ChangeSummary {
        summarize_changes(&self.changes_between(start, end), |deal_id| {
            self.deal(deal_id).map(|d| d.deal_value)
        })
    }

    /// Mean days spent in each departed stage across all deals
    pub fn average_time_in_stage(&self) -> HashMap<DealStage, f64> {
        average_time_in_stage(self.deals())
    }
}
