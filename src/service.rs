use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::error::{CostError, CostResult};
use crate::lock::{LockGate, LockState, LockTransition, WriteKind};
use crate::model::{
    BreakdownItem, BreakdownItemInput, CostRecord, Header, HeaderPatch, RequisitionToOrder,
    RtoInput, SummaryPatch, VariationOrder, VariationOrderInput, validate_work_package_id,
};
use crate::store::{CostTx, SqliteStore};
use crate::summary::{ContractSummary, SummaryCalculator};

/// Entry point for every cost operation on a work package.
///
/// Each call is one store transaction: ensure the record, run the lock gate,
/// write, and (for summaries) recompute from the persisted variation orders.
#[derive(Clone)]
pub struct CostService {
    store: Arc<Mutex<SqliteStore>>,
}

impl CostService {
    pub fn new(store: SqliteStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> CostResult<Self> {
        Ok(Self::new(SqliteStore::open(path)?))
    }

    pub fn in_memory() -> CostResult<Self> {
        Ok(Self::new(SqliteStore::open_in_memory()?))
    }

    fn with_tx<T>(&self, f: impl FnOnce(&CostTx<'_>) -> CostResult<T>) -> CostResult<T> {
        // A panic mid-transaction drops the rusqlite Transaction, which rolls
        // back, so the connection behind a poisoned lock is still consistent.
        let mut store = self.store.lock().unwrap_or_else(|poisoned| {
            warn!("cost store lock poisoned; recovering");
            poisoned.into_inner()
        });
        store.transaction(f)
    }

    /// Returns the work package's cost record, creating a zero-valued,
    /// unlocked one on first access. Repeated calls return the same record.
    pub fn ensure_cost_record(&self, work_package_id: &str) -> CostResult<CostRecord> {
        validate_work_package_id(work_package_id)?;
        self.with_tx(|tx| ensure(tx, work_package_id))
    }

    // --- Header ---

    pub fn get_header(&self, work_package_id: &str) -> CostResult<Header> {
        Ok(self.ensure_cost_record(work_package_id)?.header())
    }

    pub fn update_header(&self, work_package_id: &str, patch: HeaderPatch) -> CostResult<Header> {
        validate_work_package_id(work_package_id)?;
        patch.validate()?;

        self.with_tx(|tx| {
            let mut record = ensure(tx, work_package_id)?;
            let current = LockState::from(record.locked);
            let transition = LockGate::authorize_header(current, &patch)
                .inspect_err(|e| warn!(work_package_id, error = %e, "header update rejected"))?;

            match transition {
                LockTransition::Stay(_) | LockTransition::Lock => patch.apply_fields(&mut record),
                LockTransition::Unlock => {}
            }
            record.locked = transition.target().is_locked();
            tx.save_record(&mut record)?;

            if transition.target() != current {
                info!(work_package_id, from = %current, to = %transition.target(), "cost lock changed");
            }
            Ok(record.header())
        })
    }

    // --- Summary ---

    /// Always readable, locked or not. Recomputed on every call.
    pub fn get_summary(&self, work_package_id: &str) -> CostResult<ContractSummary> {
        validate_work_package_id(work_package_id)?;
        self.with_tx(|tx| {
            let record = ensure(tx, work_package_id)?;
            summarize(tx, &record)
        })
    }

    pub fn update_summary(
        &self,
        work_package_id: &str,
        patch: SummaryPatch,
    ) -> CostResult<ContractSummary> {
        validate_work_package_id(work_package_id)?;

        self.with_tx(|tx| {
            let mut record = ensure(tx, work_package_id)?;
            authorize(&record, WriteKind::Summary)?;
            patch.apply(&mut record)?;
            tx.save_record(&mut record)?;
            summarize(tx, &record)
        })
    }

    // --- Breakdown items ---

    pub fn list_breakdown_items(&self, work_package_id: &str) -> CostResult<Vec<BreakdownItem>> {
        validate_work_package_id(work_package_id)?;
        self.with_tx(|tx| {
            let record = ensure(tx, work_package_id)?;
            tx.list_breakdown_items(&record.id)
        })
    }

    pub fn add_breakdown_item(
        &self,
        work_package_id: &str,
        input: BreakdownItemInput,
    ) -> CostResult<BreakdownItem> {
        validate_work_package_id(work_package_id)?;
        let draft = input.validate()?;
        self.with_tx(|tx| {
            let record = ensure(tx, work_package_id)?;
            authorize(&record, WriteKind::BreakdownItem)?;
            tx.insert_breakdown_item(&record.id, &draft)
        })
    }

    pub fn update_breakdown_item(
        &self,
        work_package_id: &str,
        item_id: &str,
        input: BreakdownItemInput,
    ) -> CostResult<BreakdownItem> {
        validate_work_package_id(work_package_id)?;
        let draft = input.validate()?;
        self.with_tx(|tx| {
            let record = ensure(tx, work_package_id)?;
            authorize(&record, WriteKind::BreakdownItem)?;
            tx.update_breakdown_item(&record.id, item_id, &draft)
        })
    }

    pub fn delete_breakdown_item(&self, work_package_id: &str, item_id: &str) -> CostResult<()> {
        validate_work_package_id(work_package_id)?;
        self.with_tx(|tx| {
            let record = ensure(tx, work_package_id)?;
            authorize(&record, WriteKind::BreakdownItem)?;
            tx.delete_breakdown_item(&record.id, item_id)
        })
    }

    // --- Variation orders ---

    pub fn list_variation_orders(&self, work_package_id: &str) -> CostResult<Vec<VariationOrder>> {
        validate_work_package_id(work_package_id)?;
        self.with_tx(|tx| {
            let record = ensure(tx, work_package_id)?;
            tx.list_variation_orders(&record.id)
        })
    }

    pub fn add_variation_order(
        &self,
        work_package_id: &str,
        input: VariationOrderInput,
    ) -> CostResult<VariationOrder> {
        validate_work_package_id(work_package_id)?;
        let draft = input.validate()?;
        self.with_tx(|tx| {
            let record = ensure(tx, work_package_id)?;
            authorize(&record, WriteKind::VariationOrder)?;
            let vo = tx.insert_variation_order(&record.id, &draft)?;
            debug!(work_package_id, vo_id = %vo.id, status = %vo.status, "variation order added");
            Ok(vo)
        })
    }

    pub fn update_variation_order(
        &self,
        work_package_id: &str,
        vo_id: &str,
        input: VariationOrderInput,
    ) -> CostResult<VariationOrder> {
        validate_work_package_id(work_package_id)?;
        let draft = input.validate()?;
        self.with_tx(|tx| {
            let record = ensure(tx, work_package_id)?;
            authorize(&record, WriteKind::VariationOrder)?;
            tx.update_variation_order(&record.id, vo_id, &draft)
        })
    }

    pub fn delete_variation_order(&self, work_package_id: &str, vo_id: &str) -> CostResult<()> {
        validate_work_package_id(work_package_id)?;
        self.with_tx(|tx| {
            let record = ensure(tx, work_package_id)?;
            authorize(&record, WriteKind::VariationOrder)?;
            tx.delete_variation_order(&record.id, vo_id)
        })
    }

    // --- Requisition to order ---

    pub fn get_rto(&self, work_package_id: &str) -> CostResult<RequisitionToOrder> {
        validate_work_package_id(work_package_id)?;
        self.with_tx(|tx| {
            let record = ensure(tx, work_package_id)?;
            tx.get_rto(&record.id)?.ok_or_else(|| {
                CostError::not_found(format!("requisition to order for {work_package_id}"))
            })
        })
    }

    /// Creates or replaces the requisition. A supplied `rto_number` is also
    /// copied onto the header.
    pub fn save_rto(&self, work_package_id: &str, input: RtoInput) -> CostResult<RequisitionToOrder> {
        validate_work_package_id(work_package_id)?;
        input.validate()?;
        self.with_tx(|tx| {
            let mut record = ensure(tx, work_package_id)?;
            authorize(&record, WriteKind::Rto)?;
            let rto = tx.save_rto(&record.id, &input)?;
            if let Some(number) = &input.rto_number
                && record.rto_number.as_deref() != Some(number.as_str())
            {
                record.rto_number = Some(number.clone());
                tx.save_record(&mut record)?;
            }
            Ok(rto)
        })
    }

    pub fn delete_rto(&self, work_package_id: &str) -> CostResult<()> {
        validate_work_package_id(work_package_id)?;
        self.with_tx(|tx| {
            let record = ensure(tx, work_package_id)?;
            authorize(&record, WriteKind::Rto)?;
            if !tx.delete_rto(&record.id)? {
                return Err(CostError::not_found(format!(
                    "requisition to order for {work_package_id}"
                )));
            }
            Ok(())
        })
    }

    // --- Whole record ---

    /// Removes the record and every child. Does not create one first.
    pub fn delete_cost_record(&self, work_package_id: &str) -> CostResult<()> {
        validate_work_package_id(work_package_id)?;
        self.with_tx(|tx| {
            let record = tx
                .find_record(work_package_id)?
                .ok_or_else(|| CostError::not_found(format!("cost record for {work_package_id}")))?;
            authorize(&record, WriteKind::Record)?;
            tx.delete_record(work_package_id)?;
            info!(work_package_id, "cost record deleted");
            Ok(())
        })
    }
}

fn ensure(tx: &CostTx<'_>, work_package_id: &str) -> CostResult<CostRecord> {
    let (record, created) = tx.ensure_record(work_package_id)?;
    if created {
        info!(work_package_id, cost_id = %record.id, "cost record created");
    }
    Ok(record)
}

fn authorize(record: &CostRecord, kind: WriteKind) -> CostResult<()> {
    LockGate::authorize_write(LockState::from(record.locked), kind).inspect_err(|e| {
        warn!(work_package_id = %record.work_package_id, %kind, error = %e, "write rejected")
    })
}

fn summarize(tx: &CostTx<'_>, record: &CostRecord) -> CostResult<ContractSummary> {
    let orders = tx.list_variation_orders(&record.id)?;
    SummaryCalculator::compute(record, &orders)
}
