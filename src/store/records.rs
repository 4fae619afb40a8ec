use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

use super::{CostTx, new_id};
use crate::error::{CostError, CostResult};
use crate::model::{CostRecord, WorkPackageCostStatus};

const RECORD_COLUMNS: &str = "id, work_package_id, rto_number, po_number, status, \
     original_contract_price, allowances, locked, created_at, updated_at";

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CostRecord> {
    Ok(CostRecord {
        id: row.get(0)?,
        work_package_id: row.get(1)?,
        rto_number: row.get(2)?,
        po_number: row.get(3)?,
        status: row.get(4)?,
        original_contract_price: row.get(5)?,
        allowances: row.get(6)?,
        locked: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

impl CostTx<'_> {
    pub fn find_record(&self, work_package_id: &str) -> CostResult<Option<CostRecord>> {
        Ok(self
            .tx
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM work_package_costs WHERE work_package_id = ?1"),
                params![work_package_id],
                record_from_row,
            )
            .optional()?)
    }

    /// Returns the work package's record, inserting a zero-valued one first
    /// if none exists. The flag is true when this call created it.
    ///
    /// The insert is `ON CONFLICT DO NOTHING` followed by a re-select, so a
    /// racing creator converges on the single row the UNIQUE constraint allows.
    pub fn ensure_record(&self, work_package_id: &str) -> CostResult<(CostRecord, bool)> {
        if let Some(record) = self.find_record(work_package_id)? {
            return Ok((record, false));
        }

        let now = Utc::now();
        let inserted = self.tx.execute(
            r#"
            INSERT INTO work_package_costs
              (id, work_package_id, status, original_contract_price, allowances, locked, created_at, updated_at)
            VALUES (?1, ?2, ?3, '0.00', '0.00', 0, ?4, ?4)
            ON CONFLICT(work_package_id) DO NOTHING
            "#,
            params![
                new_id(),
                work_package_id,
                WorkPackageCostStatus::default(),
                now
            ],
        )?;

        let record = self.find_record(work_package_id)?.ok_or_else(|| {
            CostError::Internal(format!("cost record for {work_package_id} vanished after insert"))
        })?;
        Ok((record, inserted > 0))
    }

    /// Writes every mutable column of `record` back and bumps `updated_at`.
    pub fn save_record(&self, record: &mut CostRecord) -> CostResult<()> {
        let now = Utc::now();
        let updated = self.tx.execute(
            r#"
            UPDATE work_package_costs
            SET rto_number = ?2, po_number = ?3, status = ?4,
                original_contract_price = ?5, allowances = ?6, locked = ?7, updated_at = ?8
            WHERE id = ?1
            "#,
            params![
                record.id,
                record.rto_number,
                record.po_number,
                record.status,
                record.original_contract_price,
                record.allowances,
                record.locked,
                now
            ],
        )?;
        if updated == 0 {
            return Err(CostError::not_found(format!("cost record {}", record.id)));
        }
        record.updated_at = now;
        Ok(())
    }

    /// Deletes the record and, through the foreign keys, all of its children.
    pub fn delete_record(&self, work_package_id: &str) -> CostResult<bool> {
        let deleted = self.tx.execute(
            "DELETE FROM work_package_costs WHERE work_package_id = ?1",
            params![work_package_id],
        )?;
        Ok(deleted > 0)
    }

    pub(super) fn touch_record(&self, cost_id: &str) -> CostResult<()> {
        self.tx.execute(
            "UPDATE work_package_costs SET updated_at = ?2 WHERE id = ?1",
            params![cost_id, Utc::now()],
        )?;
        Ok(())
    }
}
