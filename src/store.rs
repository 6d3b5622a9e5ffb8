//! Append-only work order store.
//!
//! All writes go through one `RwLock` writer section, which is the single
//! serialization point for admission (evaluate-then-insert) and for status
//! compare-and-set. Records are fully built before they are published, so a
//! reader never observes a half-written order. Readers hold the shared guard
//! only long enough to clone what they return.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::work_order::types::validate_reason;
use crate::work_order::{
    Admission, ValidationError, WorkOrder, WorkOrderDraft, WorkOrderError, WorkOrderId,
    WorkOrderResult, WorkOrderStatus,
};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable image of a store, including the id counter so ids are never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub version: u32,
    pub next_id: u64,
    pub orders: Vec<WorkOrder>,
}

#[derive(Debug)]
struct StoreInner {
    orders: Vec<WorkOrder>,
    index: HashMap<WorkOrderId, usize>,
    next_id: u64,
}

impl StoreInner {
    fn empty() -> Self {
        Self {
            orders: Vec::new(),
            index: HashMap::new(),
            next_id: 1,
        }
    }

    fn append(&mut self, draft: WorkOrderDraft, admission: Admission) -> WorkOrderResult<&WorkOrder> {
        admission.validate()?;

        let id = WorkOrderId(self.next_id);
        let next_id = self
            .next_id
            .checked_add(1)
            .ok_or(ValidationError::IdSpaceExhausted)?;
        let order = draft.into_work_order(id, admission, Utc::now());
        self.next_id = next_id;
        self.index.insert(id, self.orders.len());
        self.orders.push(order);
        Ok(&self.orders[self.orders.len() - 1])
    }

    fn position(&self, id: WorkOrderId) -> WorkOrderResult<usize> {
        self.index
            .get(&id)
            .copied()
            .ok_or(WorkOrderError::NotFound { id })
    }
}

/// Authoritative collection of work orders. Construct one per engine and share it
/// behind an `Arc`.
#[derive(Debug)]
pub struct WorkOrderStore {
    inner: RwLock<StoreInner>,
}

impl Default for WorkOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkOrderStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::empty()),
        }
    }

    /// Rebuild a store from a snapshot, validating every record.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, ValidationError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ValidationError::InconsistentSnapshot {
                reason: format!(
                    "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                    snapshot.version
                ),
            });
        }

        let mut inner = StoreInner::empty();
        let mut max_id = 0;
        for order in snapshot.orders {
            order.validate()?;
            if inner.index.contains_key(&order.id) {
                return Err(ValidationError::InconsistentSnapshot {
                    reason: format!("duplicate work order id {}", order.id),
                });
            }
            max_id = max_id.max(order.id.value());
            inner.index.insert(order.id, inner.orders.len());
            inner.orders.push(order);
        }

        if snapshot.next_id <= max_id {
            return Err(ValidationError::InconsistentSnapshot {
                reason: format!(
                    "next id {} would reuse existing id {max_id}",
                    snapshot.next_id
                ),
            });
        }
        if snapshot.next_id == u64::MAX {
            return Err(ValidationError::IdSpaceExhausted);
        }
        inner.next_id = snapshot.next_id;

        info!(orders = inner.orders.len(), next_id = inner.next_id, "Store restored from snapshot");
        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let inner = self.read();
        StoreSnapshot {
            version: SNAPSHOT_VERSION,
            next_id: inner.next_id,
            orders: inner.orders.clone(),
        }
    }

    /// Store a draft with an already decided admission and return its fresh id.
    pub fn insert(&self, draft: WorkOrderDraft, admission: Admission) -> WorkOrderResult<WorkOrderId> {
        let mut inner = self.write();
        let id = inner.append(draft, admission)?.id;
        debug!(work_order_id = %id, "Work order inserted");
        Ok(id)
    }

    /// Decide the admission against the current orders and append, as one
    /// indivisible step with respect to every other writer.
    pub fn insert_evaluated<F>(&self, draft: WorkOrderDraft, evaluate: F) -> WorkOrderResult<WorkOrder>
    where
        F: FnOnce(&WorkOrderDraft, &[WorkOrder]) -> WorkOrderResult<Admission>,
    {
        let mut inner = self.write();
        let admission = evaluate(&draft, &inner.orders)?;
        let order = inner.append(draft, admission)?.clone();
        debug!(
            work_order_id = %order.id,
            status = %order.status,
            "Work order admitted"
        );
        Ok(order)
    }

    pub fn get(&self, id: WorkOrderId) -> WorkOrderResult<WorkOrder> {
        let inner = self.read();
        let position = inner.position(id)?;
        Ok(inner.orders[position].clone())
    }

    /// All orders in insertion order.
    pub fn list(&self) -> Vec<WorkOrder> {
        self.read().orders.clone()
    }

    pub fn len(&self) -> usize {
        self.read().orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set a new status only if the current one is still `expected`.
    ///
    /// `reason` must be a non-empty text when `new_status` is CONFLICT_DETECTED
    /// and absent otherwise; leaving CONFLICT_DETECTED clears the old reason.
    pub fn compare_and_set_status(
        &self,
        id: WorkOrderId,
        expected: WorkOrderStatus,
        new_status: WorkOrderStatus,
        reason: Option<String>,
    ) -> WorkOrderResult<WorkOrder> {
        validate_reason(new_status, reason.as_deref())?;

        let mut inner = self.write();
        let position = inner.position(id)?;
        let order = &mut inner.orders[position];
        if order.status != expected {
            debug!(
                work_order_id = %id,
                expected = %expected,
                actual = %order.status,
                "Stale status on compare-and-set"
            );
            return Err(WorkOrderError::StaleStatus {
                id,
                expected,
                actual: order.status,
            });
        }

        order.status = new_status;
        order.conflict_reason = reason;
        Ok(order.clone())
    }

    /// Re-run an admission decision for an existing order inside the writer section.
    /// `evaluate` sees the order itself and the full list of orders.
    pub fn reevaluate_with<F>(
        &self,
        id: WorkOrderId,
        expected: WorkOrderStatus,
        evaluate: F,
    ) -> WorkOrderResult<WorkOrder>
    where
        F: FnOnce(&WorkOrder, &[WorkOrder]) -> WorkOrderResult<Admission>,
    {
        let mut inner = self.write();
        let position = inner.position(id)?;
        let current = &inner.orders[position];
        if current.status != expected {
            return Err(WorkOrderError::StaleStatus {
                id,
                expected,
                actual: current.status,
            });
        }

        let admission = evaluate(current, &inner.orders)?;
        admission.validate()?;

        let order = &mut inner.orders[position];
        order.status = admission.status;
        order.conflict_reason = admission.conflict_reason;
        Ok(order.clone())
    }

    // Every write builds the full record before assigning it, so a poisoned
    // guard still protects consistent data.
    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
