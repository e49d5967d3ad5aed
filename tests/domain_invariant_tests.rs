// Copyright 2025 Cowboy AI, LLC.

//! Property-based checks of the store invariants: change-log ordering,
//! stage-history monotonicity, active-flag consistency, and primary-contact
//! exclusivity hold under arbitrary operation sequences.

use chrono::NaiveDate;
use pipeline_domain::{
    ClientType, DealStage, LeadSource, NewContact, NewDeal, PipelineStore, User, UserId, UserRole,
};
use proptest::prelude::*;

fn arb_stage() -> impl Strategy<Value = DealStage> {
    prop_oneof![
        Just(DealStage::LeadIdentified),
        Just(DealStage::DiscoveryCall),
        Just(DealStage::RfpRfiSubmitted),
        Just(DealStage::DemoPresented),
        Just(DealStage::ContractNegotiation),
        Just(DealStage::ClosedWon),
        Just(DealStage::ClosedLost),
    ]
}

fn store_with_user() -> (PipelineStore, UserId) {
    let mut store = PipelineStore::new();
    let user = User::new("Prop Tester", "prop@example.com", UserRole::Admin);
    let user_id = user.id;
    store.sign_in(user);
    (store, user_id)
}

fn new_deal(owner: UserId) -> NewDeal {
    NewDeal::new(
        "Property Client",
        ClientType::Commercial,
        10_000.0,
        LeadSource::Other,
        DealStage::LeadIdentified,
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        owner,
    )
}

proptest! {
    #[test]
    fn stage_walk_keeps_history_and_active_flag_consistent(
        stages in prop::collection::vec(arb_stage(), 0..20)
    ) {
        let (mut store, owner) = store_with_user();
        let deal_id = store.create_deal(new_deal(owner)).unwrap();

        for stage in stages {
            store.transition_stage(deal_id, stage).unwrap();

            let deal = store.deal(deal_id).unwrap();
            prop_assert_eq!(deal.stage, stage);
            prop_assert_eq!(deal.is_active, !stage.is_terminal());
            prop_assert!(!deal.stage_history.is_empty());
            prop_assert_eq!(deal.stage_history.last().unwrap().stage, stage);
            prop_assert!(deal
                .stage_history
                .windows(2)
                .all(|pair| pair[0].timestamp <= pair[1].timestamp));
            // Consecutive history entries never repeat a stage
            prop_assert!(deal
                .stage_history
                .windows(2)
                .all(|pair| pair[0].stage != pair[1].stage));
        }
    }

    #[test]
    fn change_log_sequences_are_strictly_increasing(
        stages in prop::collection::vec(arb_stage(), 0..20)
    ) {
        let (mut store, owner) = store_with_user();
        let deal_id = store.create_deal(new_deal(owner)).unwrap();

        for stage in stages {
            store.transition_stage(deal_id, stage).unwrap();
        }

        let sequences: Vec<u64> = store.changes().iter().map(|c| c.sequence).collect();
        prop_assert!(sequences.windows(2).all(|pair| pair[0] < pair[1]));

        // The per-deal view preserves global order
        let per_deal: Vec<u64> = store
            .changes_for_deal(deal_id)
            .iter()
            .map(|c| c.sequence)
            .collect();
        prop_assert_eq!(per_deal, sequences);
    }

    #[test]
    fn at_most_one_primary_contact_per_deal(
        primary_flags in prop::collection::vec(any::<bool>(), 1..8)
    ) {
        let (mut store, owner) = store_with_user();
        let deal_id = store.create_deal(new_deal(owner)).unwrap();

        for (i, primary) in primary_flags.iter().enumerate() {
            let mut fields = NewContact::new(
                format!("Contact {i}"),
                "Stakeholder",
                format!("contact{i}@example.com"),
            );
            fields.deal_ids = vec![deal_id];
            fields.is_primary = *primary;
            store.create_contact(fields).unwrap();

            let primaries = store
                .contacts()
                .filter(|c| c.is_primary && c.deal_ids.contains(&deal_id))
                .count();
            prop_assert!(primaries <= 1);
        }
    }

    #[test]
    fn weighted_value_never_exceeds_deal_value(
        stage in arb_stage(),
        value in 1.0f64..10_000_000.0
    ) {
        let (mut store, owner) = store_with_user();
        let mut fields = new_deal(owner);
        fields.deal_value = value;
        let deal_id = store.create_deal(fields).unwrap();
        store.transition_stage(deal_id, stage).unwrap();

        let deal = store.deal(deal_id).unwrap();
        prop_assert!(deal.weighted_value() <= deal.deal_value);
        prop_assert!(deal.weighted_value() >= 0.0);
    }
}
