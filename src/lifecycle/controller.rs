// Applies role-gated status changes to stored work orders
//
// Every change is validate-then-compare-and-set: the graph is checked against
// the status that was read, and the write only lands if that status is still
// current. A lost race surfaces as StaleStatus, never as an overwrite.

use std::sync::Arc;
use tracing::{info, warn};

use super::state_machine::is_legal;
use crate::conflict::ConflictEngine;
use crate::store::WorkOrderStore;
use crate::work_order::{Role, WorkOrder, WorkOrderError, WorkOrderId, WorkOrderResult, WorkOrderStatus};

pub struct LifecycleController {
    store: Arc<WorkOrderStore>,
    engine: Arc<ConflictEngine>,
}

impl LifecycleController {
    pub fn new(store: Arc<WorkOrderStore>, engine: Arc<ConflictEngine>) -> Self {
        Self { store, engine }
    }

    /// Fail with IllegalTransition unless `role` may move `current` to `requested`.
    pub fn check_transition(
        current: WorkOrderStatus,
        requested: WorkOrderStatus,
        role: Role,
    ) -> WorkOrderResult<()> {
        if is_legal(current, requested, role) {
            Ok(())
        } else {
            Err(WorkOrderError::IllegalTransition {
                current,
                requested,
                role,
            })
        }
    }

    /// Move an order to `requested`. A request for PENDING_APPROVAL is a
    /// re-evaluation and goes through the conflict engine again.
    pub fn transition(
        &self,
        id: WorkOrderId,
        requested: WorkOrderStatus,
        role: Role,
    ) -> WorkOrderResult<WorkOrder> {
        if requested == WorkOrderStatus::PendingApproval {
            return self.reevaluate(id, role);
        }

        let current = self.store.get(id)?;
        if let Err(e) = Self::check_transition(current.status, requested, role) {
            warn!(work_order_id = %id, error = %e, "Rejected status change");
            return Err(e);
        }

        let updated = self
            .store
            .compare_and_set_status(id, current.status, requested, None)?;
        info!(
            work_order_id = %id,
            from = %current.status,
            to = %updated.status,
            role = %role,
            "Work order status changed"
        );
        Ok(updated)
    }

    /// Re-run conflict detection for a CONFLICT_DETECTED order. Clear orders go
    /// back to PENDING_APPROVAL; still-conflicting ones keep their status with a
    /// refreshed reason.
    pub fn reevaluate(&self, id: WorkOrderId, role: Role) -> WorkOrderResult<WorkOrder> {
        let current = self.store.get(id)?;
        Self::check_transition(current.status, WorkOrderStatus::PendingApproval, role)?;

        let engine = &self.engine;
        let updated = self.store.reevaluate_with(id, current.status, |order, orders| {
            Ok(engine.evaluate_excluding(&order.zone(), orders, Some(order.id))?)
        })?;

        if updated.status == WorkOrderStatus::PendingApproval {
            info!(work_order_id = %id, role = %role, "Conflict cleared on re-evaluation");
        } else {
            warn!(
                work_order_id = %id,
                reason = ?updated.conflict_reason,
                "Work order still conflicts after re-evaluation"
            );
        }
        Ok(updated)
    }
}
