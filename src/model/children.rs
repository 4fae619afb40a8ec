//! Child entities owned by a [`CostRecord`](super::CostRecord).
//!
//! Each entity has a wire input type (raw decimals, as sent by clients) and a
//! validated draft the store accepts. Validation happens entirely in the
//! `validate` methods, before any row is touched.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::Money;
use super::record::{REFERENCE_MAX_LEN, check_len, check_required};
use super::status::VariationOrderStatus;
use crate::error::CostError;

pub const BREAKDOWN_ITEM_MAX_LEN: usize = 120;
pub const CONTACT_FIELD_MAX_LEN: usize = 160;

// --- Breakdown items ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownItem {
    pub id: String,
    pub item: String,
    pub description: Option<String>,
    pub value_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownItemInput {
    pub item: String,
    #[serde(default)]
    pub description: Option<String>,
    pub value_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownDraft {
    pub item: String,
    pub description: Option<String>,
    pub value_amount: Money,
}

impl BreakdownItemInput {
    pub fn validate(self) -> Result<BreakdownDraft, CostError> {
        check_required("item", &self.item, BREAKDOWN_ITEM_MAX_LEN)?;
        let value_amount = Money::field("value_amount", self.value_amount)?;
        Ok(BreakdownDraft {
            item: self.item.trim().to_string(),
            description: self.description,
            value_amount,
        })
    }
}

// --- Variation orders ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationOrder {
    pub id: String,
    pub vo_number: String,
    pub description: Option<String>,
    pub value_amount: Money,
    pub status: VariationOrderStatus,
    pub date_raised: NaiveDate,
    pub date_approved: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationOrderInput {
    pub vo_number: String,
    #[serde(default)]
    pub description: Option<String>,
    pub value_amount: Decimal,
    #[serde(default)]
    pub status: VariationOrderStatus,
    /// Required; modelled as optional so a missing date surfaces as a
    /// validation error rather than a body parse failure.
    #[serde(default)]
    pub date_raised: Option<NaiveDate>,
    #[serde(default)]
    pub date_approved: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariationOrderDraft {
    pub vo_number: String,
    pub description: Option<String>,
    pub value_amount: Money,
    pub status: VariationOrderStatus,
    pub date_raised: NaiveDate,
    pub date_approved: Option<NaiveDate>,
}

impl VariationOrderInput {
    pub fn validate(self) -> Result<VariationOrderDraft, CostError> {
        check_required("vo_number", &self.vo_number, REFERENCE_MAX_LEN)?;
        let value_amount = Money::field("value_amount", self.value_amount)?;
        let date_raised = self
            .date_raised
            .ok_or_else(|| CostError::validation("date_raised is required"))?;

        if let Some(approved) = self.date_approved {
            if self.status != VariationOrderStatus::Approved {
                return Err(CostError::validation(format!(
                    "date_approved is only allowed on approved variation orders (status is {})",
                    self.status
                )));
            }
            if approved < date_raised {
                return Err(CostError::validation(
                    "date_approved must not precede date_raised",
                ));
            }
        }

        Ok(VariationOrderDraft {
            vo_number: self.vo_number.trim().to_string(),
            description: self.description,
            value_amount,
            status: self.status,
            date_raised,
            date_approved: self.date_approved,
        })
    }
}

// --- Requisition to order ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequisitionToOrder {
    pub id: String,
    pub rto_number: Option<String>,
    pub supplier: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub subtotal_amount: Money,
    pub items: Vec<RtoSelectedItem>,
}

/// A breakdown line chosen for the requisition. The reference goes null when
/// the breakdown item is deleted; the selection row itself survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtoSelectedItem {
    pub id: String,
    pub breakdown_item_id: Option<String>,
    pub included: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RtoInput {
    #[serde(default)]
    pub rto_number: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<RtoSelectionInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtoSelectionInput {
    pub breakdown_item_id: String,
    #[serde(default = "default_included")]
    pub included: bool,
}

fn default_included() -> bool {
    true
}

impl RtoInput {
    /// Field-level checks only. Whether the selected breakdown items belong
    /// to the record is checked by the store inside the write transaction.
    pub fn validate(&self) -> Result<(), CostError> {
        if let Some(number) = &self.rto_number {
            check_required("rto_number", number, REFERENCE_MAX_LEN)?;
        }
        for (field, value) in [
            ("supplier", &self.supplier),
            ("contact_person", &self.contact_person),
            ("email", &self.email),
        ] {
            if let Some(value) = value {
                check_len(field, value, CONTACT_FIELD_MAX_LEN)?;
            }
        }
        if let Some(email) = &self.email {
            let trimmed = email.trim();
            if !trimmed.is_empty() && !looks_like_email(trimmed) {
                return Err(CostError::validation(format!("invalid email '{email}'")));
            }
        }

        let mut seen = HashSet::new();
        for selection in &self.items {
            if !seen.insert(selection.breakdown_item_id.as_str()) {
                return Err(CostError::validation(format!(
                    "breakdown item {} selected more than once",
                    selection.breakdown_item_id
                )));
            }
        }
        Ok(())
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}
