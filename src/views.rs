// Read-only projections for the three roles
//
// Views are recomputed from a list snapshot on every call and hold no state.

use serde::Serialize;

use crate::work_order::{WorkOrder, WorkOrderStatus};

/// Manager view: requests awaiting a decision, and those already decided.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalQueue {
    pub pending: Vec<WorkOrder>,
    pub processed: Vec<WorkOrder>,
}

/// Field technician view, each column oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldTechBoard {
    pub ready: Vec<WorkOrder>,
    pub active: Vec<WorkOrder>,
    pub done: Vec<WorkOrder>,
}

/// Every order, newest first.
pub fn calendar(orders: &[WorkOrder]) -> Vec<WorkOrder> {
    let mut all = orders.to_vec();
    all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    all
}

pub fn approval_queue(orders: &[WorkOrder]) -> ApprovalQueue {
    ApprovalQueue {
        pending: with_status(orders, &[WorkOrderStatus::PendingApproval]),
        processed: with_status(orders, &[WorkOrderStatus::Approved, WorkOrderStatus::Rejected]),
    }
}

pub fn field_tech_board(orders: &[WorkOrder]) -> FieldTechBoard {
    FieldTechBoard {
        ready: oldest_first(with_status(orders, &[WorkOrderStatus::Approved])),
        active: oldest_first(with_status(orders, &[WorkOrderStatus::InProgress])),
        done: oldest_first(with_status(orders, &[WorkOrderStatus::Completed])),
    }
}

fn with_status(orders: &[WorkOrder], statuses: &[WorkOrderStatus]) -> Vec<WorkOrder> {
    orders
        .iter()
        .filter(|order| statuses.contains(&order.status))
        .cloned()
        .collect()
}

fn oldest_first(mut orders: Vec<WorkOrder>) -> Vec<WorkOrder> {
    orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    orders
}
