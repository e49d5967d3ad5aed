// Copyright 2025 Cowboy AI, LLC.

//! Pipeline stages and stage arithmetic
//!
//! A deal moves through a fixed pipeline of seven stages. The last two
//! (Closed Won, Closed Lost) are terminal. Each stage carries a fixed win
//! probability used to weight deal values, and a position in a total order
//! used to classify stage changes as progression or regression.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DomainError;

/// One of the seven fixed pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealStage {
    /// A lead has been identified but not yet engaged
    #[serde(rename = "Lead Identified")]
    LeadIdentified,
    /// An initial discovery call has taken place
    #[serde(rename = "Discovery Call")]
    DiscoveryCall,
    /// An RFP or RFI response has been submitted
    #[serde(rename = "RFP/RFI Submitted")]
    RfpRfiSubmitted,
    /// The product has been demonstrated
    #[serde(rename = "Demo Presented")]
    DemoPresented,
    /// Contract terms are being negotiated
    #[serde(rename = "Contract Negotiation")]
    ContractNegotiation,
    /// The deal closed in our favor (terminal)
    #[serde(rename = "Closed Won")]
    ClosedWon,
    /// The deal was lost (terminal)
    #[serde(rename = "Closed Lost")]
    ClosedLost,
}

impl DealStage {
    /// All stages in pipeline order
    pub const ALL: [DealStage; 7] = [
        DealStage::LeadIdentified,
        DealStage::DiscoveryCall,
        DealStage::RfpRfiSubmitted,
        DealStage::DemoPresented,
        DealStage::ContractNegotiation,
        DealStage::ClosedWon,
        DealStage::ClosedLost,
    ];

    /// Display name of this stage
    pub fn name(&self) -> &'static str {
        match self {
            DealStage::LeadIdentified => "Lead Identified",
            DealStage::DiscoveryCall => "Discovery Call",
            DealStage::RfpRfiSubmitted => "RFP/RFI Submitted",
            DealStage::DemoPresented => "Demo Presented",
            DealStage::ContractNegotiation => "Contract Negotiation",
            DealStage::ClosedWon => "Closed Won",
            DealStage::ClosedLost => "Closed Lost",
        }
    }

    /// Whether this stage ends the deal's lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, DealStage::ClosedWon | DealStage::ClosedLost)
    }

    /// Fixed win probability for this stage, in percent
    pub fn probability_percent(&self) -> u8 {
        match self {
            DealStage::LeadIdentified => 10,
            DealStage::DiscoveryCall => 25,
            DealStage::RfpRfiSubmitted => 40,
            DealStage::DemoPresented => 60,
            DealStage::ContractNegotiation => 80,
            DealStage::ClosedWon => 100,
            DealStage::ClosedLost => 0,
        }
    }

    /// Win probability as a fraction in `[0, 1]`
    pub fn probability(&self) -> f64 {
        f64::from(self.probability_percent()) / 100.0
    }

    /// Position in the pipeline order used for progression detection.
    ///
    /// Both terminal stages share the final index; [`StageMovement::classify`]
    /// applies the Closed Lost exception on top of this ordering.
    pub fn order_index(&self) -> usize {
        match self {
            DealStage::LeadIdentified => 0,
            DealStage::DiscoveryCall => 1,
            DealStage::RfpRfiSubmitted => 2,
            DealStage::DemoPresented => 3,
            DealStage::ContractNegotiation => 4,
            DealStage::ClosedWon | DealStage::ClosedLost => 5,
        }
    }
}

impl fmt::Display for DealStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DealStage {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DealStage::ALL
            .into_iter()
            .find(|stage| stage.name() == s)
            .ok_or_else(|| DomainError::ValidationError(format!("unknown deal stage: {s}")))
    }
}

/// Direction of a stage change, relative to the pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageMovement {
    /// The deal moved forward in the pipeline
    Progressed,
    /// The deal moved backward in the pipeline
    Regressed,
    /// Neither forward nor backward (same order position)
    Lateral,
}

impl StageMovement {
    /// Classify a stage change.
    ///
    /// A move to a higher order index is progression, a move to a lower one
    /// is regression. A transition into Closed Lost is never progression,
    /// even though Closed Lost ties with Closed Won at the end of the order;
    /// losses are tallied separately, so the move itself is lateral.
    pub fn classify(previous: DealStage, new: DealStage) -> StageMovement {
        if new == DealStage::ClosedLost {
            return StageMovement::Lateral;
        }

        match new.order_index().cmp(&previous.order_index()) {
            std::cmp::Ordering::Greater => StageMovement::Progressed,
            std::cmp::Ordering::Less => StageMovement::Regressed,
            std::cmp::Ordering::Equal => StageMovement::Lateral,
        }
    }
}
