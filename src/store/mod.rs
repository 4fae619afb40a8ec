//! SQLite persistence for cost records and their children.
//!
//! Every service call runs inside one [`CostTx`], opened with
//! `BEGIN IMMEDIATE` so the ensure-or-create step and the following
//! read/modify/write cannot interleave with another writer. The UNIQUE
//! constraint on `work_package_id` backs that up at the schema level.

mod children;
mod columns;
mod records;

use std::path::{Path, PathBuf};

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use crate::error::CostResult;

#[derive(Debug)]
pub struct SqliteStore {
    path: Option<PathBuf>,
    conn: Connection,
}

impl SqliteStore {
    /// Opens (creating if needed) the database file and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> CostResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        let store = Self {
            path: Some(path),
            conn,
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> CostResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { path: None, conn };
        store.migrate()?;
        Ok(store)
    }

    /// `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn migrate(&self) -> CostResult<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;

            CREATE TABLE IF NOT EXISTS work_package_costs (
              id TEXT PRIMARY KEY,
              work_package_id TEXT NOT NULL,
              rto_number TEXT,
              po_number TEXT,
              status TEXT NOT NULL DEFAULT 'Awaiting Scoping',
              original_contract_price TEXT NOT NULL DEFAULT '0.00'
                CHECK (CAST(original_contract_price AS REAL) >= 0),
              allowances TEXT NOT NULL DEFAULT '0.00'
                CHECK (CAST(allowances AS REAL) >= 0),
              locked INTEGER NOT NULL DEFAULT 0,
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL,
              CONSTRAINT uq_costs_wp_id UNIQUE (work_package_id)
            );

            CREATE TABLE IF NOT EXISTS cost_breakdown_items (
              id TEXT PRIMARY KEY,
              work_package_cost_id TEXT NOT NULL
                REFERENCES work_package_costs(id) ON DELETE CASCADE,
              item TEXT NOT NULL,
              description TEXT,
              value_amount TEXT NOT NULL
                CONSTRAINT ck_breakdown_value_nonneg CHECK (CAST(value_amount AS REAL) >= 0),
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_breakdown_cost
              ON cost_breakdown_items(work_package_cost_id);

            CREATE TABLE IF NOT EXISTS variation_orders (
              id TEXT PRIMARY KEY,
              work_package_cost_id TEXT NOT NULL
                REFERENCES work_package_costs(id) ON DELETE CASCADE,
              vo_number TEXT NOT NULL,
              description TEXT,
              value_amount TEXT NOT NULL
                CONSTRAINT ck_vo_value_nonneg CHECK (CAST(value_amount AS REAL) >= 0),
              status TEXT NOT NULL DEFAULT 'Pending',
              date_raised TEXT NOT NULL,
              date_approved TEXT,
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_vo_cost
              ON variation_orders(work_package_cost_id);

            CREATE TABLE IF NOT EXISTS requisitions_to_order (
              id TEXT PRIMARY KEY,
              work_package_cost_id TEXT NOT NULL UNIQUE
                REFERENCES work_package_costs(id) ON DELETE CASCADE,
              rto_number TEXT UNIQUE,
              supplier TEXT,
              contact_person TEXT,
              email TEXT,
              notes TEXT,
              subtotal_amount TEXT NOT NULL DEFAULT '0.00',
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS rto_selected_items (
              id TEXT PRIMARY KEY,
              rto_id TEXT NOT NULL
                REFERENCES requisitions_to_order(id) ON DELETE CASCADE,
              breakdown_item_id TEXT
                REFERENCES cost_breakdown_items(id) ON DELETE SET NULL,
              included INTEGER NOT NULL DEFAULT 1,
              CONSTRAINT uq_rto_breakdown_item UNIQUE (rto_id, breakdown_item_id)
            );
            CREATE INDEX IF NOT EXISTS idx_rto_selected_breakdown
              ON rto_selected_items(breakdown_item_id);
            "#,
        )?;
        debug!(path = ?self.path, "cost store schema ready");
        Ok(())
    }

    /// Runs `f` inside one immediate transaction. Commits on `Ok`; on `Err`
    /// the transaction is dropped and everything it wrote is rolled back.
    pub fn transaction<T>(&mut self, f: impl FnOnce(&CostTx<'_>) -> CostResult<T>) -> CostResult<T> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let cost_tx = CostTx { tx };
        let value = f(&cost_tx)?;
        cost_tx.tx.commit()?;
        Ok(value)
    }
}

/// A single unit of work against the cost tables.
pub struct CostTx<'conn> {
    tx: Transaction<'conn>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CostError;
    use crate::model::{BreakdownItemInput, HeaderPatch, RtoInput, RtoSelectionInput};

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn breakdown(item: &str, amount: &str) -> crate::model::BreakdownDraft {
        BreakdownItemInput {
            item: item.into(),
            description: None,
            value_amount: amount.parse().unwrap(),
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn ensure_is_idempotent() {
        let mut store = store();
        let (first, created) = store.transaction(|tx| tx.ensure_record("wp-1")).unwrap();
        assert!(created);
        let (second, created) = store.transaction(|tx| tx.ensure_record("wp-1")).unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert!(!second.locked);
        assert!(second.original_contract_price.is_zero());

        let count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM work_package_costs", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn unique_work_package_constraint_backstops_duplicates() {
        let mut store = store();
        store.transaction(|tx| tx.ensure_record("wp-1")).unwrap();
        let dup = store.conn.execute(
            "INSERT INTO work_package_costs (id, work_package_id, created_at, updated_at)
             VALUES ('other', 'wp-1', 'now', 'now')",
            [],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let mut store = store();
        let result: CostResult<()> = store.transaction(|tx| {
            tx.ensure_record("wp-rollback")?;
            Err(CostError::validation("boom"))
        });
        assert!(result.is_err());
        let found = store.transaction(|tx| tx.find_record("wp-rollback")).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn save_record_persists_header_fields() {
        let mut store = store();
        store
            .transaction(|tx| {
                let (mut record, _) = tx.ensure_record("wp-1")?;
                HeaderPatch {
                    po_number: Some("PO-9".into()),
                    ..Default::default()
                }
                .apply_fields(&mut record);
                record.locked = true;
                tx.save_record(&mut record)
            })
            .unwrap();
        let record = store
            .transaction(|tx| tx.find_record("wp-1"))
            .unwrap()
            .unwrap();
        assert_eq!(record.po_number.as_deref(), Some("PO-9"));
        assert!(record.locked);
    }

    #[test]
    fn deleting_record_cascades_to_children() {
        let mut store = store();
        store
            .transaction(|tx| {
                let (record, _) = tx.ensure_record("wp-1")?;
                let item = tx.insert_breakdown_item(&record.id, &breakdown("Scaffold", "10"))?;
                tx.save_rto(
                    &record.id,
                    &RtoInput {
                        items: vec![RtoSelectionInput {
                            breakdown_item_id: item.id,
                            included: true,
                        }],
                        ..Default::default()
                    },
                )?;
                Ok(())
            })
            .unwrap();

        let deleted = store.transaction(|tx| tx.delete_record("wp-1")).unwrap();
        assert!(deleted);

        for table in [
            "cost_breakdown_items",
            "variation_orders",
            "requisitions_to_order",
            "rto_selected_items",
        ] {
            let count: i64 = store
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
                .unwrap();
            assert_eq!(count, 0, "{table} should be empty");
        }
    }

    #[test]
    fn deleting_breakdown_item_nulls_rto_selection() {
        let mut store = store();
        let rto = store
            .transaction(|tx| {
                let (record, _) = tx.ensure_record("wp-1")?;
                let a = tx.insert_breakdown_item(&record.id, &breakdown("A", "100"))?;
                let b = tx.insert_breakdown_item(&record.id, &breakdown("B", "50"))?;
                tx.save_rto(
                    &record.id,
                    &RtoInput {
                        items: vec![
                            RtoSelectionInput { breakdown_item_id: a.id.clone(), included: true },
                            RtoSelectionInput { breakdown_item_id: b.id, included: true },
                        ],
                        ..Default::default()
                    },
                )?;
                tx.delete_breakdown_item(&record.id, &a.id)?;
                tx.get_rto(&record.id)
            })
            .unwrap()
            .unwrap();

        assert_eq!(rto.items.len(), 2);
        assert_eq!(rto.items.iter().filter(|s| s.breakdown_item_id.is_none()).count(), 1);
        assert_eq!(rto.subtotal_amount.to_string(), "50.00");
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("costs.db");
        let id = {
            let mut store = SqliteStore::open(&path).unwrap();
            assert_eq!(store.path(), Some(path.as_path()));
            store.transaction(|tx| tx.ensure_record("wp-1")).unwrap().0.id
        };
        let mut store = SqliteStore::open(&path).unwrap();
        let record = store.transaction(|tx| tx.find_record("wp-1")).unwrap().unwrap();
        assert_eq!(record.id, id);
    }
}
