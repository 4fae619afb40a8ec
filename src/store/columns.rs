//! Column codecs. Amounts are stored as decimal TEXT so nothing passes
//! through SQLite's REAL affinity; statuses are stored as their labels.

use rusqlite::ToSql;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};

use crate::model::{Money, VariationOrderStatus, WorkPackageCostStatus};

impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse::<Money>()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for WorkPackageCostStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.label()))
    }
}

impl FromSql for WorkPackageCostStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for VariationOrderStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.label()))
    }
}

impl FromSql for VariationOrderStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn money_column_keeps_exact_text() {
        let conn = Connection::open_in_memory().unwrap();
        let amount: Money = "0.30".parse().unwrap();
        let stored: String = conn
            .query_row("SELECT ?1", [&amount], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, "0.30");
        let back: Money = conn.query_row("SELECT ?1", [&amount], |r| r.get(0)).unwrap();
        assert_eq!(back, amount);
    }

    #[test]
    fn unknown_status_label_fails_to_decode() {
        let conn = Connection::open_in_memory().unwrap();
        let result: rusqlite::Result<VariationOrderStatus> =
            conn.query_row("SELECT 'Cancelled'", [], |r| r.get(0));
        assert!(result.is_err());
        let ok: WorkPackageCostStatus = conn
            .query_row("SELECT 'Pending Award'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(ok, WorkPackageCostStatus::PendingAward);
    }
}
