//! Contract summary derivation.
//!
//! The summary is never stored. [`SummaryCalculator::compute`] folds the
//! current variation orders into totals each time it is read.

use serde::{Deserialize, Serialize};

use crate::error::CostError;
use crate::model::{CostRecord, Money, VariationBucket, VariationOrder};

/// Five derived totals plus the allowances input, all non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSummary {
    pub original_contract_price: Money,
    pub allowances: Money,
    pub approved_variations: Money,
    pub pending_variations: Money,
    pub revised_contract_price: Money,
    pub estimate_final_contract_price: Money,
}

impl ContractSummary {
    /// Builds a summary, checking the price identities hold.
    pub fn new(
        original_contract_price: Money,
        allowances: Money,
        approved_variations: Money,
        pending_variations: Money,
    ) -> Result<Self, CostError> {
        let revised_contract_price = original_contract_price.checked_add(approved_variations)?;
        let estimate_final_contract_price = revised_contract_price.checked_add(pending_variations)?;
        let summary = Self {
            original_contract_price,
            allowances,
            approved_variations,
            pending_variations,
            revised_contract_price,
            estimate_final_contract_price,
        };
        summary.check()?;
        Ok(summary)
    }

    fn check(&self) -> Result<(), CostError> {
        // Money is non-negative by construction; these are the ordering
        // consequences of that, re-asserted on the output.
        if self.revised_contract_price < self.original_contract_price
            || self.estimate_final_contract_price < self.revised_contract_price
        {
            return Err(CostError::Internal(format!(
                "inconsistent contract summary: {self:?}"
            )));
        }
        Ok(())
    }
}

pub struct SummaryCalculator;

impl SummaryCalculator {
    /// Sum variation orders by bucket; rejected orders contribute nothing.
    pub fn compute(
        record: &CostRecord,
        orders: &[VariationOrder],
    ) -> Result<ContractSummary, CostError> {
        let (approved, pending) = orders.iter().try_fold(
            (Money::ZERO, Money::ZERO),
            |(approved, pending), vo| -> Result<_, CostError> {
                Ok(match vo.status.bucket() {
                    VariationBucket::Approved => (approved.checked_add(vo.value_amount)?, pending),
                    VariationBucket::Pending => (approved, pending.checked_add(vo.value_amount)?),
                    VariationBucket::Excluded => (approved, pending),
                })
            },
        )?;

        ContractSummary::new(
            record.original_contract_price,
            record.allowances,
            approved,
            pending,
        )
    }
}
