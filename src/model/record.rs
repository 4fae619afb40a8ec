use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::Money;
use super::status::WorkPackageCostStatus;
use crate::error::CostError;

/// Column width of the header reference numbers.
pub const REFERENCE_MAX_LEN: usize = 64;
/// Column width of work package identifiers.
pub const WORK_PACKAGE_ID_MAX_LEN: usize = 36;

/// The cost header and summary inputs of one work package.
///
/// Exactly one exists per work package; it is created on first access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub id: String,
    pub work_package_id: String,
    pub rto_number: Option<String>,
    pub po_number: Option<String>,
    pub status: WorkPackageCostStatus,
    pub original_contract_price: Money,
    pub allowances: Money,
    pub locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CostRecord {
    pub fn header(&self) -> Header {
        Header {
            rto_number: self.rto_number.clone(),
            po_number: self.po_number.clone(),
            status: self.status,
            locked: self.locked,
        }
    }
}

/// Header view returned by the header endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub rto_number: Option<String>,
    pub po_number: Option<String>,
    pub status: WorkPackageCostStatus,
    pub locked: bool,
}

/// Partial header update. Absent and `null` fields are both left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderPatch {
    #[serde(default)]
    pub rto_number: Option<String>,
    #[serde(default)]
    pub po_number: Option<String>,
    #[serde(default)]
    pub status: Option<WorkPackageCostStatus>,
    #[serde(default)]
    pub locked: Option<bool>,
}

impl HeaderPatch {
    pub fn lock() -> Self {
        Self {
            locked: Some(true),
            ..Default::default()
        }
    }

    pub fn unlock() -> Self {
        Self {
            locked: Some(false),
            ..Default::default()
        }
    }

    /// True when the patch touches anything other than the lock flag.
    pub fn has_field_changes(&self) -> bool {
        self.rto_number.is_some() || self.po_number.is_some() || self.status.is_some()
    }

    pub fn validate(&self) -> Result<(), CostError> {
        if let Some(rto) = &self.rto_number {
            check_len("rto_number", rto, REFERENCE_MAX_LEN)?;
        }
        if let Some(po) = &self.po_number {
            check_len("po_number", po, REFERENCE_MAX_LEN)?;
        }
        Ok(())
    }

    /// Applies the present non-lock fields onto `record`.
    pub fn apply_fields(&self, record: &mut CostRecord) {
        if let Some(rto) = &self.rto_number {
            record.rto_number = Some(rto.clone());
        }
        if let Some(po) = &self.po_number {
            record.po_number = Some(po.clone());
        }
        if let Some(status) = self.status {
            record.status = status;
        }
    }
}

/// Partial update of the summary's editable inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryPatch {
    #[serde(default)]
    pub original_contract_price: Option<Decimal>,
    #[serde(default)]
    pub allowances: Option<Decimal>,
}

impl SummaryPatch {
    /// Validates every present field before anything is applied, so a bad
    /// value leaves the record untouched.
    pub fn apply(&self, record: &mut CostRecord) -> Result<(), CostError> {
        let original = self
            .original_contract_price
            .map(|v| Money::field("original_contract_price", v))
            .transpose()?;
        let allowances = self
            .allowances
            .map(|v| Money::field("allowances", v))
            .transpose()?;

        if let Some(original) = original {
            record.original_contract_price = original;
        }
        if let Some(allowances) = allowances {
            record.allowances = allowances;
        }
        Ok(())
    }
}

pub(crate) fn check_len(field: &str, value: &str, max: usize) -> Result<(), CostError> {
    if value.chars().count() > max {
        return Err(CostError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

pub(crate) fn check_required(field: &str, value: &str, max: usize) -> Result<(), CostError> {
    if value.trim().is_empty() {
        return Err(CostError::validation(format!("{field} is required")));
    }
    check_len(field, value, max)
}

/// Work package ids are opaque, but must fit the reference column.
pub fn validate_work_package_id(id: &str) -> Result<(), CostError> {
    check_required("work_package_id", id, WORK_PACKAGE_ID_MAX_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CostRecord {
        let now = Utc::now();
        CostRecord {
            id: "c-1".into(),
            work_package_id: "wp-1".into(),
            rto_number: None,
            po_number: Some("PO-7".into()),
            status: WorkPackageCostStatus::AwaitingScoping,
            original_contract_price: Money::ZERO,
            allowances: Money::ZERO,
            locked: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn null_and_absent_fields_are_no_ops() {
        let patch: HeaderPatch = serde_json::from_str(r#"{"po_number": null}"#).unwrap();
        assert_eq!(patch, HeaderPatch::default());

        let mut rec = record();
        patch.apply_fields(&mut rec);
        assert_eq!(rec.po_number.as_deref(), Some("PO-7"));
    }

    #[test]
    fn apply_fields_only_touches_present_fields() {
        let mut rec = record();
        let patch = HeaderPatch {
            rto_number: Some("RTO-1".into()),
            status: Some(WorkPackageCostStatus::Awarded),
            ..Default::default()
        };
        patch.apply_fields(&mut rec);
        assert_eq!(rec.rto_number.as_deref(), Some("RTO-1"));
        assert_eq!(rec.po_number.as_deref(), Some("PO-7"));
        assert_eq!(rec.status, WorkPackageCostStatus::Awarded);
        assert!(!rec.locked);
    }

    #[test]
    fn lock_only_patch_has_no_field_changes() {
        assert!(!HeaderPatch::lock().has_field_changes());
        assert!(!HeaderPatch::unlock().has_field_changes());
        let patch = HeaderPatch {
            status: Some(WorkPackageCostStatus::PendingAward),
            locked: Some(false),
            ..Default::default()
        };
        assert!(patch.has_field_changes());
    }

    #[test]
    fn header_patch_rejects_long_reference() {
        let patch = HeaderPatch {
            po_number: Some("x".repeat(65)),
            ..Default::default()
        };
        assert!(matches!(patch.validate(), Err(CostError::Validation(_))));
    }

    #[test]
    fn summary_patch_is_all_or_nothing() {
        let mut rec = record();
        let patch = SummaryPatch {
            original_contract_price: Some("500".parse().unwrap()),
            allowances: Some("-1".parse().unwrap()),
        };
        assert!(patch.apply(&mut rec).is_err());
        assert_eq!(rec.original_contract_price, Money::ZERO);
    }

    #[test]
    fn summary_patch_accepts_numbers_and_strings() {
        let patch: SummaryPatch =
            serde_json::from_str(r#"{"original_contract_price": 100000, "allowances": "5000.00"}"#)
                .unwrap();
        let mut rec = record();
        patch.apply(&mut rec).unwrap();
        assert_eq!(rec.original_contract_price.to_string(), "100000.00");
        assert_eq!(rec.allowances.to_string(), "5000.00");
    }

    #[test]
    fn work_package_id_rules() {
        assert!(validate_work_package_id("wp-1").is_ok());
        assert!(validate_work_package_id("  ").is_err());
        assert!(validate_work_package_id(&"a".repeat(37)).is_err());
    }
}
