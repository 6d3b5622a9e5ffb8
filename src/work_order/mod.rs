// Work order model - records, statuses, roles and the error taxonomy

pub mod errors;
pub mod types;

pub use errors::{ValidationError, WorkOrderError, WorkOrderResult};
pub use types::{
    Admission, CreateWorkOrder, Role, WorkOrder, WorkOrderDraft, WorkOrderId, WorkOrderStatus,
};
