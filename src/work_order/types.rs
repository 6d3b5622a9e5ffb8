// Core types for work orders and the roles that act on them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::ValidationError;
use crate::geo::{GeoPoint, WorkZone};

/// Store-assigned identifier. Ids start at 1 and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkOrderId(pub u64);

impl WorkOrderId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WorkOrderId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('#');
        trimmed
            .parse::<u64>()
            .ok()
            .filter(|id| *id > 0)
            .map(WorkOrderId)
            .ok_or_else(|| ValidationError::UnknownValue {
                field: "id",
                value: s.to_string(),
            })
    }
}

/// Work order states in the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkOrderStatus {
    /// Waiting for a manager decision
    PendingApproval,
    /// Blocked at admission by overlapping work or a protected asset
    ConflictDetected,
    /// Ready for a field technician
    Approved,
    /// Manager denied the request (terminal)
    Rejected,
    /// Field technician is onsite
    InProgress,
    /// Field technician finished (terminal)
    Completed,
}

impl WorkOrderStatus {
    pub const ALL: [WorkOrderStatus; 6] = [
        WorkOrderStatus::PendingApproval,
        WorkOrderStatus::ConflictDetected,
        WorkOrderStatus::Approved,
        WorkOrderStatus::Rejected,
        WorkOrderStatus::InProgress,
        WorkOrderStatus::Completed,
    ];

    /// Orders in these states still occupy, or may occupy, their zone.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            WorkOrderStatus::PendingApproval
                | WorkOrderStatus::Approved
                | WorkOrderStatus::InProgress
        )
    }

    /// States that can only be assigned when an order is admitted.
    pub fn is_initial(self) -> bool {
        matches!(
            self,
            WorkOrderStatus::PendingApproval | WorkOrderStatus::ConflictDetected
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkOrderStatus::Rejected | WorkOrderStatus::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkOrderStatus::PendingApproval => "PENDING_APPROVAL",
            WorkOrderStatus::ConflictDetected => "CONFLICT_DETECTED",
            WorkOrderStatus::Approved => "APPROVED",
            WorkOrderStatus::Rejected => "REJECTED",
            WorkOrderStatus::InProgress => "IN_PROGRESS",
            WorkOrderStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkOrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_tag(s);
        WorkOrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ValidationError::UnknownValue {
                field: "status",
                value: s.to_string(),
            })
    }
}

/// Capability tag attached to every request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Planner,
    Manager,
    FieldTech,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Planner => "PLANNER",
            Role::Manager => "MANAGER",
            Role::FieldTech => "FIELD_TECH",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_tag(s).as_str() {
            "PLANNER" => Ok(Role::Planner),
            "MANAGER" => Ok(Role::Manager),
            "FIELD_TECH" | "FIELDTECH" | "TECH" => Ok(Role::FieldTech),
            _ => Err(ValidationError::UnknownValue {
                field: "role",
                value: s.to_string(),
            }),
        }
    }
}

fn normalize_tag(s: &str) -> String {
    s.trim().replace('-', "_").to_ascii_uppercase()
}

/// A stored work order. Field names serialize to the record shape other layers rely on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrder {
    pub id: WorkOrderId,
    pub description: String,
    #[serde(flatten)]
    pub location: GeoPoint,
    pub radius_meters: f64,
    pub status: WorkOrderStatus,
    pub conflict_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WorkOrder {
    pub fn zone(&self) -> WorkZone {
        WorkZone {
            center: self.location,
            radius_meters: self.radius_meters,
        }
    }

    /// Check the record-level invariants. Used when records enter the store from outside.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.0 == 0 {
            return Err(ValidationError::UnknownValue {
                field: "id",
                value: "0".to_string(),
            });
        }
        validate_description(&self.description)?;
        GeoPoint::new(self.location.latitude, self.location.longitude)?;
        WorkZone::new(self.location, self.radius_meters)?;
        validate_reason(self.status, self.conflict_reason.as_deref())
    }
}

/// Validated input for a new work order, before the store assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkOrderDraft {
    description: String,
    zone: WorkZone,
}

impl WorkOrderDraft {
    pub fn new(
        description: &str,
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
    ) -> Result<Self, ValidationError> {
        let description = validate_description(description)?;
        let center = GeoPoint::new(latitude, longitude)?;
        let zone = WorkZone::new(center, radius_meters)?;
        Ok(Self { description, zone })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn zone(&self) -> &WorkZone {
        &self.zone
    }

    pub(crate) fn into_work_order(
        self,
        id: WorkOrderId,
        admission: Admission,
        created_at: DateTime<Utc>,
    ) -> WorkOrder {
        WorkOrder {
            id,
            description: self.description,
            location: self.zone.center,
            radius_meters: self.zone.radius_meters,
            status: admission.status,
            conflict_reason: admission.conflict_reason,
            created_at,
        }
    }
}

/// The status an order is admitted with, and the reason when it is blocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub status: WorkOrderStatus,
    pub conflict_reason: Option<String>,
}

impl Admission {
    pub fn pending() -> Self {
        Self {
            status: WorkOrderStatus::PendingApproval,
            conflict_reason: None,
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self {
            status: WorkOrderStatus::ConflictDetected,
            conflict_reason: Some(reason.into()),
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status == WorkOrderStatus::ConflictDetected
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.status.is_initial() {
            return Err(ValidationError::NotAnInitialStatus {
                status: self.status,
            });
        }
        validate_reason(self.status, self.conflict_reason.as_deref())
    }
}

/// Caller-facing request for `create_work_order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkOrder {
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
}

impl CreateWorkOrder {
    pub fn new(description: impl Into<String>, latitude: f64, longitude: f64, radius_meters: f64) -> Self {
        Self {
            description: description.into(),
            latitude,
            longitude,
            radius_meters,
        }
    }

    pub fn to_draft(&self) -> Result<WorkOrderDraft, ValidationError> {
        WorkOrderDraft::new(
            &self.description,
            self.latitude,
            self.longitude,
            self.radius_meters,
        )
    }
}

fn validate_description(description: &str) -> Result<String, ValidationError> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyDescription);
    }
    Ok(trimmed.to_string())
}

/// `conflict_reason` must be non-empty exactly when the status is CONFLICT_DETECTED.
pub(crate) fn validate_reason(
    status: WorkOrderStatus,
    reason: Option<&str>,
) -> Result<(), ValidationError> {
    match (status == WorkOrderStatus::ConflictDetected, reason) {
        (true, Some(r)) if !r.trim().is_empty() => Ok(()),
        (true, _) => Err(ValidationError::MissingConflictReason),
        (false, None) => Ok(()),
        (false, Some(_)) => Err(ValidationError::UnexpectedConflictReason { status }),
    }
}
