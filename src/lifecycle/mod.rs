// Work Order Lifecycle - role-gated state machine and the controller that
// applies it to the store

pub mod controller;
pub mod state_machine;

pub use controller::LifecycleController;
pub use state_machine::{is_legal, LifecycleEvent, WorkOrderLifecycle};
