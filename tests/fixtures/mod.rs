//! Shared helpers for work order integration tests
#![allow(dead_code)]

use std::sync::Arc;
use utility_work_orders::{
    ConflictEngine, CreateWorkOrder, ProtectedAsset, Role, WorkOrder, WorkOrderService,
    WorkOrderStatus, WorkOrderStore,
};

/// Lower Manhattan, on top of the gas main fixture
pub const CITY_HALL: (f64, f64) = (40.7128, -74.0060);
/// ~168 m west of CITY_HALL
pub const CHAMBERS_ST: (f64, f64) = (40.7128, -74.0080);

pub fn service() -> WorkOrderService {
    WorkOrderService::in_memory()
}

pub fn service_with_assets(assets: Vec<ProtectedAsset>) -> WorkOrderService {
    let engine = ConflictEngine::with_protected_assets(assets).expect("valid assets");
    WorkOrderService::new(Arc::new(WorkOrderStore::new()), engine)
}

pub fn gas_main() -> ProtectedAsset {
    ProtectedAsset {
        asset_id: "GAS-99".to_string(),
        owner: "Gas Company".to_string(),
        description: "High pressure gas main".to_string(),
        latitude: CITY_HALL.0,
        longitude: CITY_HALL.1,
        buffer_meters: 50.0,
    }
}

pub fn request(description: &str, at: (f64, f64), radius: f64) -> CreateWorkOrder {
    CreateWorkOrder::new(description, at.0, at.1, radius)
}

pub fn create(service: &WorkOrderService, description: &str, at: (f64, f64), radius: f64) -> WorkOrder {
    service
        .create_work_order(Role::Planner, request(description, at, radius))
        .expect("create work order")
}

/// Drive an order from PENDING_APPROVAL to `target` along the legal path
pub fn advance_to(service: &WorkOrderService, order: &WorkOrder, target: WorkOrderStatus) -> WorkOrder {
    let path: &[(WorkOrderStatus, Role)] = match target {
        WorkOrderStatus::PendingApproval => &[],
        WorkOrderStatus::Approved => &[(WorkOrderStatus::Approved, Role::Manager)],
        WorkOrderStatus::Rejected => &[(WorkOrderStatus::Rejected, Role::Manager)],
        WorkOrderStatus::InProgress => &[
            (WorkOrderStatus::Approved, Role::Manager),
            (WorkOrderStatus::InProgress, Role::FieldTech),
        ],
        WorkOrderStatus::Completed => &[
            (WorkOrderStatus::Approved, Role::Manager),
            (WorkOrderStatus::InProgress, Role::FieldTech),
            (WorkOrderStatus::Completed, Role::FieldTech),
        ],
        WorkOrderStatus::ConflictDetected => panic!("CONFLICT_DETECTED is only reachable at creation"),
    };

    let mut current = order.clone();
    for (status, role) in path {
        current = service
            .update_status(current.id, *status, *role)
            .expect("legal transition");
    }
    current
}
