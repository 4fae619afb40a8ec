//! Saída colorida do wpcost no terminal.
//!
//! Usa a crate `console` para estilização. Os subcomandos de consulta
//! imprimem o cabeçalho e o resumo do contrato por aqui.

use console::Style;

use wpcost::model::{Header, Money};
use wpcost::summary::ContractSummary;

/// Estilos usados pela saída de terminal.
pub struct Report {
    // Estilo verde para registros destravados.
    green: Style,
    // Estilo vermelho para registros travados.
    red: Style,
    // Estilo amarelo para títulos.
    yellow: Style,
    dim: Style,
}

impl Default for Report {
    fn default() -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }
}

impl Report {
    /// Imprime o cabeçalho de custo de um pacote de trabalho.
    pub fn header(&self, work_package_id: &str, header: &Header) {
        println!("{}", self.yellow.apply_to(format!("─── {work_package_id} ───")));
        println!("  {:<12} {}", "RTO", optional(&header.rto_number, &self.dim));
        println!("  {:<12} {}", "PO", optional(&header.po_number, &self.dim));
        println!("  {:<12} {}", "Status", header.status);
        println!("  {:<12} {}", "Lock", self.lock_badge(header.locked));
    }

    /// Imprime o resumo do contrato com valores alinhados à direita.
    pub fn summary(&self, work_package_id: &str, summary: &ContractSummary) {
        println!("{}", self.yellow.apply_to(format!("─── {work_package_id} ───")));
        let rows: [(&str, Money); 6] = [
            ("Original contract price", summary.original_contract_price),
            ("Allowances", summary.allowances),
            ("Approved variations", summary.approved_variations),
            ("Pending variations", summary.pending_variations),
            ("Revised contract price", summary.revised_contract_price),
            ("Estimated final price", summary.estimate_final_contract_price),
        ];
        for (label, amount) in rows {
            println!("  {label:<26} {:>16}", amount.to_string());
        }
    }

    /// Confirma uma mudança de trava.
    pub fn lock_changed(&self, work_package_id: &str, locked: bool) {
        println!("  {work_package_id}: {}", self.lock_badge(locked));
    }

    fn lock_badge(&self, locked: bool) -> String {
        if locked {
            self.red.apply_to("🔒 locked").to_string()
        } else {
            self.green.apply_to("unlocked").to_string()
        }
    }
}

fn optional(value: &Option<String>, dim: &Style) -> String {
    match value {
        Some(v) => v.clone(),
        None => dim.apply_to("—").to_string(),
    }
}
