use serde::{Deserialize, Serialize};
use statig::prelude::*;

use crate::work_order::{Role, WorkOrderId, WorkOrderStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// Load the machine at the status currently stored for the order
    Restore { status: WorkOrderStatus },
    /// A role asks to move the order to `requested`
    Request {
        requested: WorkOrderStatus,
        role: Role,
    },
}

/// Role-gated transition graph for a single work order.
///
/// The machine starts `unloaded`; a `Restore` event places it at the stored
/// status, after which one `Request` either moves it along a legal edge or is
/// ignored.
#[derive(Debug, Default)]
pub struct WorkOrderLifecycle {
    pub work_order_id: Option<WorkOrderId>,
    restored: Option<WorkOrderStatus>,
    moved_to: Option<WorkOrderStatus>,
}

impl WorkOrderLifecycle {
    pub fn new(work_order_id: WorkOrderId) -> Self {
        Self {
            work_order_id: Some(work_order_id),
            ..Default::default()
        }
    }

    fn advance(&mut self, to: WorkOrderStatus, role: Role, next: State) -> Outcome<State> {
        tracing::debug!(
            work_order_id = ?self.work_order_id,
            from = ?self.restored,
            to = %to,
            role = %role,
            "Lifecycle edge accepted"
        );
        self.moved_to = Some(to);
        Transition(next)
    }
}

#[state_machine(initial = "State::unloaded()")]
impl WorkOrderLifecycle {
    #[state]
    fn unloaded(&mut self, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::Restore { status } => {
                self.restored = Some(*status);
                Transition(state_for(*status))
            }
            _ => Handled,
        }
    }

    #[state]
    fn pending_approval(&mut self, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::Request {
                requested: WorkOrderStatus::Approved,
                role: Role::Manager,
            } => self.advance(WorkOrderStatus::Approved, Role::Manager, State::approved()),
            LifecycleEvent::Request {
                requested: WorkOrderStatus::Rejected,
                role: Role::Manager,
            } => self.advance(WorkOrderStatus::Rejected, Role::Manager, State::rejected()),
            _ => Handled,
        }
    }

    #[state]
    fn conflict_detected(&mut self, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::Request {
                requested: WorkOrderStatus::Rejected,
                role: Role::Manager,
            } => self.advance(WorkOrderStatus::Rejected, Role::Manager, State::rejected()),
            // Only reachable through re-evaluation against the current orders
            LifecycleEvent::Request {
                requested: WorkOrderStatus::PendingApproval,
                role: Role::Manager,
            } => self.advance(
                WorkOrderStatus::PendingApproval,
                Role::Manager,
                State::pending_approval(),
            ),
            _ => Handled,
        }
    }

    #[state]
    fn approved(&mut self, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::Request {
                requested: WorkOrderStatus::InProgress,
                role: Role::FieldTech,
            } => self.advance(WorkOrderStatus::InProgress, Role::FieldTech, State::in_progress()),
            _ => Handled,
        }
    }

    #[state]
    fn in_progress(&mut self, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::Request {
                requested: WorkOrderStatus::Completed,
                role: Role::FieldTech,
            } => self.advance(WorkOrderStatus::Completed, Role::FieldTech, State::completed()),
            _ => Handled,
        }
    }

    #[state]
    fn rejected(&mut self) -> Outcome<State> {
        Handled
    }

    #[state]
    fn completed(&mut self) -> Outcome<State> {
        Handled
    }
}

fn state_for(status: WorkOrderStatus) -> State {
    match status {
        WorkOrderStatus::PendingApproval => State::pending_approval(),
        WorkOrderStatus::ConflictDetected => State::conflict_detected(),
        WorkOrderStatus::Approved => State::approved(),
        WorkOrderStatus::Rejected => State::rejected(),
        WorkOrderStatus::InProgress => State::in_progress(),
        WorkOrderStatus::Completed => State::completed(),
    }
}

impl WorkOrderLifecycle {
    pub fn restored_status(&self) -> Option<WorkOrderStatus> {
        self.restored
    }

    /// Status reached by the last accepted request, if any
    pub fn moved_to(&self) -> Option<WorkOrderStatus> {
        self.moved_to
    }
}

/// Run `requested` by `role` through the graph starting at `current`.
/// Returns true when the edge exists.
pub fn is_legal(current: WorkOrderStatus, requested: WorkOrderStatus, role: Role) -> bool {
    let mut machine = WorkOrderLifecycle::default().state_machine();
    machine.handle(&LifecycleEvent::Restore { status: current });
    machine.handle(&LifecycleEvent::Request { requested, role });
    machine.inner().moved_to() == Some(requested)
}
