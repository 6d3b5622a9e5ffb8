// Work order service - the operations callers use
//
// Creation runs validation, then the conflict engine and the insert inside the
// store's writer section. Status updates go through the lifecycle controller.

use std::sync::Arc;
use tracing::{info, warn};

use crate::conflict::ConflictEngine;
use crate::lifecycle::LifecycleController;
use crate::observability::{EngineMetrics, OperationTimer};
use crate::store::WorkOrderStore;
use crate::telemetry::{create_work_order_span, generate_correlation_id};
use crate::views::{self, ApprovalQueue, FieldTechBoard};
use crate::work_order::{
    CreateWorkOrder, Role, WorkOrder, WorkOrderError, WorkOrderId, WorkOrderResult,
    WorkOrderStatus,
};

pub struct WorkOrderService {
    store: Arc<WorkOrderStore>,
    engine: Arc<ConflictEngine>,
    lifecycle: LifecycleController,
    metrics: Arc<EngineMetrics>,
}

impl WorkOrderService {
    pub fn new(store: Arc<WorkOrderStore>, engine: ConflictEngine) -> Self {
        let engine = Arc::new(engine);
        let lifecycle = LifecycleController::new(store.clone(), engine.clone());
        Self {
            store,
            engine,
            lifecycle,
            metrics: Arc::new(EngineMetrics::new()),
        }
    }

    /// Service over a fresh empty store with no protected assets
    pub fn in_memory() -> Self {
        Self::new(Arc::new(WorkOrderStore::new()), ConflictEngine::new())
    }

    pub fn store(&self) -> &Arc<WorkOrderStore> {
        &self.store
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Validate, check for conflicts and store a new work order. Only planners
    /// may request work.
    pub fn create_work_order(
        &self,
        role: Role,
        request: CreateWorkOrder,
    ) -> WorkOrderResult<WorkOrder> {
        let correlation_id = generate_correlation_id();
        let span = create_work_order_span("create_work_order", None, Some(role), &correlation_id);
        let _guard = span.enter();
        let timer = OperationTimer::new("create_work_order");

        if role != Role::Planner {
            warn!(role = %role, "Work order creation refused");
            return Err(WorkOrderError::RoleNotPermitted {
                role,
                action: "create work orders",
            });
        }

        let draft = request.to_draft()?;
        let engine = &self.engine;
        let order = self.store.insert_evaluated(draft, |draft, orders| {
            Ok(engine.evaluate(draft.zone(), orders)?)
        })?;

        self.metrics
            .record_created(order.status == WorkOrderStatus::ConflictDetected);
        info!(
            work_order_id = %order.id,
            status = %order.status,
            correlation_id = %correlation_id,
            "Work order created"
        );
        timer.finish();
        Ok(order)
    }

    pub fn get_work_order(&self, id: WorkOrderId) -> WorkOrderResult<WorkOrder> {
        self.store.get(id)
    }

    /// All orders in creation order
    pub fn list_work_orders(&self) -> Vec<WorkOrder> {
        self.store.list()
    }

    /// Apply a role's status change request
    pub fn update_status(
        &self,
        id: WorkOrderId,
        requested: WorkOrderStatus,
        role: Role,
    ) -> WorkOrderResult<WorkOrder> {
        let correlation_id = generate_correlation_id();
        let span = create_work_order_span("update_status", Some(id), Some(role), &correlation_id);
        let _guard = span.enter();

        let result = self.lifecycle.transition(id, requested, role);
        self.record_transition_outcome(&result);
        result
    }

    /// Re-run conflict detection for a blocked order
    pub fn reevaluate(&self, id: WorkOrderId, role: Role) -> WorkOrderResult<WorkOrder> {
        let correlation_id = generate_correlation_id();
        let span = create_work_order_span("reevaluate", Some(id), Some(role), &correlation_id);
        let _guard = span.enter();

        let result = self.lifecycle.reevaluate(id, role);
        self.record_transition_outcome(&result);
        result
    }

    pub fn calendar(&self) -> Vec<WorkOrder> {
        views::calendar(&self.store.list())
    }

    pub fn approval_queue(&self) -> ApprovalQueue {
        views::approval_queue(&self.store.list())
    }

    pub fn field_tech_board(&self) -> FieldTechBoard {
        views::field_tech_board(&self.store.list())
    }

    fn record_transition_outcome(&self, result: &WorkOrderResult<WorkOrder>) {
        match result {
            // Re-evaluation that kept the conflict changed nothing
            Ok(order) if order.status == WorkOrderStatus::ConflictDetected => {}
            Ok(_) => self.metrics.record_transition(),
            Err(WorkOrderError::StaleStatus { .. }) => self.metrics.record_stale_write(),
            Err(_) => self.metrics.record_rejected_transition(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_planners_create() {
        let service = WorkOrderService::in_memory();
        for role in [Role::Manager, Role::FieldTech] {
            let err = service
                .create_work_order(role, CreateWorkOrder::new("Dig", 40.0, -74.0, 5.0))
                .unwrap_err();
            assert!(matches!(err, WorkOrderError::RoleNotPermitted { .. }));
        }
        assert!(service.list_work_orders().is_empty());
    }

    #[test]
    fn test_invalid_request_is_not_stored() {
        let service = WorkOrderService::in_memory();
        let err = service
            .create_work_order(Role::Planner, CreateWorkOrder::new("", 40.0, -74.0, 5.0))
            .unwrap_err();
        assert!(matches!(err, WorkOrderError::Validation(_)));
        assert!(service.list_work_orders().is_empty());
    }

    #[test]
    fn test_metrics_follow_operations() {
        let service = WorkOrderService::in_memory();
        let first = service
            .create_work_order(Role::Planner, CreateWorkOrder::new("A", 40.7128, -74.0060, 10.0))
            .unwrap();
        service
            .create_work_order(Role::Planner, CreateWorkOrder::new("B", 40.7128, -74.0060, 10.0))
            .unwrap();

        service
            .update_status(first.id, WorkOrderStatus::Approved, Role::Manager)
            .unwrap();
        service
            .update_status(first.id, WorkOrderStatus::Completed, Role::FieldTech)
            .unwrap_err();

        let stats = service.metrics().get_stats();
        assert_eq!(stats.orders_created, 2);
        assert_eq!(stats.conflicts_detected, 1);
        assert_eq!(stats.transitions_applied, 1);
        assert_eq!(stats.transitions_rejected, 1);
    }

    #[test]
    fn test_reevaluation_counts_only_real_changes() {
        let service = WorkOrderService::in_memory();
        let blocker = service
            .create_work_order(Role::Planner, CreateWorkOrder::new("A", 40.7128, -74.0060, 10.0))
            .unwrap();
        let blocked = service
            .create_work_order(Role::Planner, CreateWorkOrder::new("B", 40.7128, -74.0060, 10.0))
            .unwrap();

        let still = service.reevaluate(blocked.id, Role::Manager).unwrap();
        assert_eq!(still.status, WorkOrderStatus::ConflictDetected);
        service
            .update_status(blocked.id, WorkOrderStatus::PendingApproval, Role::Manager)
            .unwrap();
        assert_eq!(service.metrics().get_stats().transitions_applied, 0);

        service
            .update_status(blocker.id, WorkOrderStatus::Rejected, Role::Manager)
            .unwrap();
        let cleared = service.reevaluate(blocked.id, Role::Manager).unwrap();
        assert_eq!(cleared.status, WorkOrderStatus::PendingApproval);
        assert_eq!(service.metrics().get_stats().transitions_applied, 2);
    }

    #[test]
    fn test_views_reflect_store() {
        let service = WorkOrderService::in_memory();
        let order = service
            .create_work_order(Role::Planner, CreateWorkOrder::new("A", 40.7128, -74.0060, 10.0))
            .unwrap();
        assert_eq!(service.approval_queue().pending.len(), 1);

        service
            .update_status(order.id, WorkOrderStatus::Approved, Role::Manager)
            .unwrap();
        let queue = service.approval_queue();
        assert!(queue.pending.is_empty());
        assert_eq!(queue.processed.len(), 1);
        assert_eq!(service.field_tech_board().ready.len(), 1);
        assert_eq!(service.calendar().len(), 1);
    }
}
