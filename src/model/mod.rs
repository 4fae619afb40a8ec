mod children;
mod money;
mod record;
mod status;

pub use children::{
    BreakdownDraft, BreakdownItem, BreakdownItemInput, RequisitionToOrder, RtoInput,
    RtoSelectedItem, RtoSelectionInput, VariationOrder, VariationOrderDraft, VariationOrderInput,
};
pub use money::{MONEY_SCALE, Money};
pub use record::{CostRecord, Header, HeaderPatch, SummaryPatch, validate_work_package_id};
pub use status::{VariationBucket, VariationOrderStatus, WorkPackageCostStatus};
