// Utility Work Orders - admission and lifecycle engine
// Exposes the engine components for the CLI, integration tests and embedding callers

pub mod config;
pub mod conflict;
pub mod geo;
pub mod lifecycle;
pub mod observability;
pub mod persistence;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod views;
pub mod work_order;

// Re-export key types for easy access
pub use config::WorkOrderEngineConfig;
pub use conflict::{ConflictEngine, ProtectedAsset};
pub use geo::{distance_meters, intersects, GeoPoint, WorkZone};
pub use lifecycle::LifecycleController;
pub use observability::{EngineMetrics, EngineStats, OperationTimer};
pub use persistence::{FileSnapshotPersistence, PersistenceError, SnapshotPersistence};
pub use service::WorkOrderService;
pub use store::{StoreSnapshot, WorkOrderStore};
pub use views::{ApprovalQueue, FieldTechBoard};
pub use work_order::{
    Admission, CreateWorkOrder, Role, ValidationError, WorkOrder, WorkOrderDraft, WorkOrderError,
    WorkOrderId, WorkOrderResult, WorkOrderStatus,
};
