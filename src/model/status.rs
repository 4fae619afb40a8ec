use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CostError;

/// Procurement lifecycle of a work package's contract. Informational only;
/// it never gates a write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkPackageCostStatus {
    #[default]
    #[serde(rename = "Awaiting Scoping")]
    AwaitingScoping,
    #[serde(rename = "Awaiting Tender Pack")]
    AwaitingTenderPack,
    #[serde(rename = "Awaiting Bid Submissions")]
    AwaitingBidSubmissions,
    #[serde(rename = "Pending Award")]
    PendingAward,
    #[serde(rename = "Awarded")]
    Awarded,
}

impl WorkPackageCostStatus {
    pub const ALL: [WorkPackageCostStatus; 5] = [
        WorkPackageCostStatus::AwaitingScoping,
        WorkPackageCostStatus::AwaitingTenderPack,
        WorkPackageCostStatus::AwaitingBidSubmissions,
        WorkPackageCostStatus::PendingAward,
        WorkPackageCostStatus::Awarded,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            WorkPackageCostStatus::AwaitingScoping => "Awaiting Scoping",
            WorkPackageCostStatus::AwaitingTenderPack => "Awaiting Tender Pack",
            WorkPackageCostStatus::AwaitingBidSubmissions => "Awaiting Bid Submissions",
            WorkPackageCostStatus::PendingAward => "Pending Award",
            WorkPackageCostStatus::Awarded => "Awarded",
        }
    }
}

impl fmt::Display for WorkPackageCostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for WorkPackageCostStatus {
    type Err = CostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.label() == s)
            .ok_or_else(|| CostError::validation(format!("unknown work package cost status '{s}'")))
    }
}

/// Lifecycle of a single variation order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariationOrderStatus {
    Proposed,
    Approved,
    Rejected,
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
}

/// Which summary total a variation order feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariationBucket {
    Approved,
    Pending,
    /// Never affects cost.
    Excluded,
}

impl VariationOrderStatus {
    pub const ALL: [VariationOrderStatus; 5] = [
        VariationOrderStatus::Proposed,
        VariationOrderStatus::Approved,
        VariationOrderStatus::Rejected,
        VariationOrderStatus::Pending,
        VariationOrderStatus::InProgress,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            VariationOrderStatus::Proposed => "Proposed",
            VariationOrderStatus::Approved => "Approved",
            VariationOrderStatus::Rejected => "Rejected",
            VariationOrderStatus::Pending => "Pending",
            VariationOrderStatus::InProgress => "In Progress",
        }
    }

    pub fn bucket(&self) -> VariationBucket {
        match self {
            VariationOrderStatus::Approved => VariationBucket::Approved,
            VariationOrderStatus::Proposed
            | VariationOrderStatus::Pending
            | VariationOrderStatus::InProgress => VariationBucket::Pending,
            VariationOrderStatus::Rejected => VariationBucket::Excluded,
        }
    }
}

impl fmt::Display for VariationOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for VariationOrderStatus {
    type Err = CostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.label() == s)
            .ok_or_else(|| CostError::validation(format!("unknown variation order status '{s}'")))
    }
}
