use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

use super::{CostTx, new_id};
use crate::error::{CostError, CostResult};
use crate::model::{
    BreakdownDraft, BreakdownItem, Money, RequisitionToOrder, RtoInput, RtoSelectedItem,
    VariationOrder, VariationOrderDraft,
};

fn breakdown_from_row(row: &Row<'_>) -> rusqlite::Result<BreakdownItem> {
    Ok(BreakdownItem {
        id: row.get(0)?,
        item: row.get(1)?,
        description: row.get(2)?,
        value_amount: row.get(3)?,
    })
}

fn variation_from_row(row: &Row<'_>) -> rusqlite::Result<VariationOrder> {
    Ok(VariationOrder {
        id: row.get(0)?,
        vo_number: row.get(1)?,
        description: row.get(2)?,
        value_amount: row.get(3)?,
        status: row.get(4)?,
        date_raised: row.get(5)?,
        date_approved: row.get(6)?,
    })
}

impl CostTx<'_> {
    // --- Breakdown items ---

    pub fn list_breakdown_items(&self, cost_id: &str) -> CostResult<Vec<BreakdownItem>> {
        let mut stmt = self.tx.prepare(
            r#"
            SELECT id, item, description, value_amount
            FROM cost_breakdown_items
            WHERE work_package_cost_id = ?1
            ORDER BY rowid
            "#,
        )?;
        let rows = stmt
            .query_map(params![cost_id], breakdown_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn find_breakdown_item(&self, cost_id: &str, item_id: &str) -> CostResult<Option<BreakdownItem>> {
        Ok(self
            .tx
            .query_row(
                r#"
                SELECT id, item, description, value_amount
                FROM cost_breakdown_items
                WHERE id = ?1 AND work_package_cost_id = ?2
                "#,
                params![item_id, cost_id],
                breakdown_from_row,
            )
            .optional()?)
    }

    pub fn insert_breakdown_item(
        &self,
        cost_id: &str,
        draft: &BreakdownDraft,
    ) -> CostResult<BreakdownItem> {
        let id = new_id();
        let now = Utc::now();
        self.tx.execute(
            r#"
            INSERT INTO cost_breakdown_items
              (id, work_package_cost_id, item, description, value_amount, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
            params![id, cost_id, draft.item, draft.description, draft.value_amount, now],
        )?;
        self.touch_record(cost_id)?;
        Ok(BreakdownItem {
            id,
            item: draft.item.clone(),
            description: draft.description.clone(),
            value_amount: draft.value_amount,
        })
    }

    pub fn update_breakdown_item(
        &self,
        cost_id: &str,
        item_id: &str,
        draft: &BreakdownDraft,
    ) -> CostResult<BreakdownItem> {
        let updated = self.tx.execute(
            r#"
            UPDATE cost_breakdown_items
            SET item = ?3, description = ?4, value_amount = ?5, updated_at = ?6
            WHERE id = ?1 AND work_package_cost_id = ?2
            "#,
            params![
                item_id,
                cost_id,
                draft.item,
                draft.description,
                draft.value_amount,
                Utc::now()
            ],
        )?;
        if updated == 0 {
            return Err(CostError::not_found(format!("breakdown item {item_id}")));
        }
        self.refresh_rto_subtotal(cost_id)?;
        self.touch_record(cost_id)?;
        self.find_breakdown_item(cost_id, item_id)?
            .ok_or_else(|| CostError::not_found(format!("breakdown item {item_id}")))
    }

    /// Selection rows that referenced the item keep existing with a null
    /// reference (ON DELETE SET NULL).
    pub fn delete_breakdown_item(&self, cost_id: &str, item_id: &str) -> CostResult<()> {
        let deleted = self.tx.execute(
            "DELETE FROM cost_breakdown_items WHERE id = ?1 AND work_package_cost_id = ?2",
            params![item_id, cost_id],
        )?;
        if deleted == 0 {
            return Err(CostError::not_found(format!("breakdown item {item_id}")));
        }
        self.refresh_rto_subtotal(cost_id)?;
        self.touch_record(cost_id)?;
        Ok(())
    }

    // --- Variation orders ---

    pub fn list_variation_orders(&self, cost_id: &str) -> CostResult<Vec<VariationOrder>> {
        let mut stmt = self.tx.prepare(
            r#"
            SELECT id, vo_number, description, value_amount, status, date_raised, date_approved
            FROM variation_orders
            WHERE work_package_cost_id = ?1
            ORDER BY rowid
            "#,
        )?;
        let rows = stmt
            .query_map(params![cost_id], variation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn insert_variation_order(
        &self,
        cost_id: &str,
        draft: &VariationOrderDraft,
    ) -> CostResult<VariationOrder> {
        let id = new_id();
        let now = Utc::now();
        self.tx.execute(
            r#"
            INSERT INTO variation_orders
              (id, work_package_cost_id, vo_number, description, value_amount, status,
               date_raised, date_approved, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            "#,
            params![
                id,
                cost_id,
                draft.vo_number,
                draft.description,
                draft.value_amount,
                draft.status,
                draft.date_raised,
                draft.date_approved,
                now
            ],
        )?;
        self.touch_record(cost_id)?;
        Ok(variation_from_draft(id, draft))
    }

    pub fn update_variation_order(
        &self,
        cost_id: &str,
        vo_id: &str,
        draft: &VariationOrderDraft,
    ) -> CostResult<VariationOrder> {
        let updated = self.tx.execute(
            r#"
            UPDATE variation_orders
            SET vo_number = ?3, description = ?4, value_amount = ?5, status = ?6,
                date_raised = ?7, date_approved = ?8, updated_at = ?9
            WHERE id = ?1 AND work_package_cost_id = ?2
            "#,
            params![
                vo_id,
                cost_id,
                draft.vo_number,
                draft.description,
                draft.value_amount,
                draft.status,
                draft.date_raised,
                draft.date_approved,
                Utc::now()
            ],
        )?;
        if updated == 0 {
            return Err(CostError::not_found(format!("variation order {vo_id}")));
        }
        self.touch_record(cost_id)?;
        Ok(variation_from_draft(vo_id.to_string(), draft))
    }

    pub fn delete_variation_order(&self, cost_id: &str, vo_id: &str) -> CostResult<()> {
        let deleted = self.tx.execute(
            "DELETE FROM variation_orders WHERE id = ?1 AND work_package_cost_id = ?2",
            params![vo_id, cost_id],
        )?;
        if deleted == 0 {
            return Err(CostError::not_found(format!("variation order {vo_id}")));
        }
        self.touch_record(cost_id)?;
        Ok(())
    }

    // --- Requisition to order ---

    fn rto_id(&self, cost_id: &str) -> CostResult<Option<String>> {
        Ok(self
            .tx
            .query_row(
                "SELECT id FROM requisitions_to_order WHERE work_package_cost_id = ?1",
                params![cost_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn get_rto(&self, cost_id: &str) -> CostResult<Option<RequisitionToOrder>> {
        let rto = self
            .tx
            .query_row(
                r#"
                SELECT id, rto_number, supplier, contact_person, email, notes, subtotal_amount
                FROM requisitions_to_order
                WHERE work_package_cost_id = ?1
                "#,
                params![cost_id],
                |row| {
                    Ok(RequisitionToOrder {
                        id: row.get(0)?,
                        rto_number: row.get(1)?,
                        supplier: row.get(2)?,
                        contact_person: row.get(3)?,
                        email: row.get(4)?,
                        notes: row.get(5)?,
                        subtotal_amount: row.get(6)?,
                        items: Vec::new(),
                    })
                },
            )
            .optional()?;

        let Some(mut rto) = rto else {
            return Ok(None);
        };

        let mut stmt = self.tx.prepare(
            r#"
            SELECT id, breakdown_item_id, included
            FROM rto_selected_items
            WHERE rto_id = ?1
            ORDER BY rowid
            "#,
        )?;
        rto.items = stmt
            .query_map(params![rto.id], |row| {
                Ok(RtoSelectedItem {
                    id: row.get(0)?,
                    breakdown_item_id: row.get(1)?,
                    included: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(rto))
    }

    /// Creates the record's requisition or replaces its fields and selection
    /// in place (the RTO id is stable across saves). The subtotal is
    /// recomputed from the included selections.
    pub fn save_rto(&self, cost_id: &str, input: &RtoInput) -> CostResult<RequisitionToOrder> {
        for selection in &input.items {
            if self
                .find_breakdown_item(cost_id, &selection.breakdown_item_id)?
                .is_none()
            {
                return Err(CostError::not_found(format!(
                    "breakdown item {}",
                    selection.breakdown_item_id
                )));
            }
        }

        if let Some(number) = &input.rto_number {
            let taken: Option<String> = self
                .tx
                .query_row(
                    r#"
                    SELECT id FROM requisitions_to_order
                    WHERE rto_number = ?1 AND work_package_cost_id <> ?2
                    "#,
                    params![number, cost_id],
                    |row| row.get(0),
                )
                .optional()?;
            if taken.is_some() {
                return Err(CostError::validation(format!(
                    "rto_number {number} is already used by another work package"
                )));
            }
        }

        let now = Utc::now();
        let rto_id = match self.rto_id(cost_id)? {
            Some(id) => {
                self.tx.execute(
                    r#"
                    UPDATE requisitions_to_order
                    SET rto_number = ?2, supplier = ?3, contact_person = ?4, email = ?5,
                        notes = ?6, updated_at = ?7
                    WHERE id = ?1
                    "#,
                    params![
                        id,
                        input.rto_number,
                        input.supplier,
                        input.contact_person,
                        input.email,
                        input.notes,
                        now
                    ],
                )?;
                self.tx.execute(
                    "DELETE FROM rto_selected_items WHERE rto_id = ?1",
                    params![id],
                )?;
                id
            }
            None => {
                let id = new_id();
                self.tx.execute(
                    r#"
                    INSERT INTO requisitions_to_order
                      (id, work_package_cost_id, rto_number, supplier, contact_person, email,
                       notes, subtotal_amount, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '0.00', ?8, ?8)
                    "#,
                    params![
                        id,
                        cost_id,
                        input.rto_number,
                        input.supplier,
                        input.contact_person,
                        input.email,
                        input.notes,
                        now
                    ],
                )?;
                id
            }
        };

        for selection in &input.items {
            self.tx.execute(
                r#"
                INSERT INTO rto_selected_items (id, rto_id, breakdown_item_id, included)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![new_id(), rto_id, selection.breakdown_item_id, selection.included],
            )?;
        }

        self.refresh_rto_subtotal(cost_id)?;
        self.touch_record(cost_id)?;
        self.get_rto(cost_id)?
            .ok_or_else(|| CostError::Internal(format!("requisition {rto_id} vanished after save")))
    }

    pub fn delete_rto(&self, cost_id: &str) -> CostResult<bool> {
        let deleted = self.tx.execute(
            "DELETE FROM requisitions_to_order WHERE work_package_cost_id = ?1",
            params![cost_id],
        )?;
        if deleted > 0 {
            self.touch_record(cost_id)?;
        }
        Ok(deleted > 0)
    }

    /// Keeps `subtotal_amount` equal to the sum of included selections whose
    /// breakdown item still exists.
    fn refresh_rto_subtotal(&self, cost_id: &str) -> CostResult<()> {
        let Some(rto_id) = self.rto_id(cost_id)? else {
            return Ok(());
        };
        let mut stmt = self.tx.prepare(
            r#"
            SELECT b.value_amount
            FROM rto_selected_items s
            JOIN cost_breakdown_items b ON b.id = s.breakdown_item_id
            WHERE s.rto_id = ?1 AND s.included = 1
            "#,
        )?;
        let amounts = stmt
            .query_map(params![rto_id], |row| row.get::<_, Money>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let subtotal = Money::try_sum(amounts)?;
        self.tx.execute(
            "UPDATE requisitions_to_order SET subtotal_amount = ?2 WHERE id = ?1",
            params![rto_id, subtotal],
        )?;
        Ok(())
    }
}

fn variation_from_draft(id: String, draft: &VariationOrderDraft) -> VariationOrder {
    VariationOrder {
        id,
        vo_number: draft.vo_number.clone(),
        description: draft.description.clone(),
        value_amount: draft.value_amount,
        status: draft.status,
        date_raised: draft.date_raised,
        date_approved: draft.date_approved,
    }
}
