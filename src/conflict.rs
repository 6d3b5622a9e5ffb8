// Conflict detection at admission time
//
// A candidate zone is checked against every active work order and every
// configured protected asset. Any overlap blocks the order with a reason that
// names the nearest offender.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, warn};

use crate::geo::{self, GeoPoint, WorkZone};
use crate::work_order::{Admission, ValidationError, WorkOrder, WorkOrderId};

/// Fixed infrastructure that no work zone may overlap, e.g. a high pressure gas main.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectedAsset {
    pub asset_id: String,
    pub owner: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub buffer_meters: f64,
}

impl ProtectedAsset {
    pub fn zone(&self) -> Result<WorkZone, ValidationError> {
        let center = GeoPoint::new(self.latitude, self.longitude)?;
        WorkZone::new(center, self.buffer_meters)
    }
}

/// What a candidate overlapped with
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictSource {
    WorkOrder { id: WorkOrderId, description: String },
    Asset { asset_id: String, owner: String, description: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConflictMatch {
    pub source: ConflictSource,
    pub distance_meters: f64,
}

impl ConflictMatch {
    pub fn reason(&self) -> String {
        match &self.source {
            ConflictSource::WorkOrder { id, description } => format!(
                "Overlaps active work order #{id} ({description:?}), {:.1} m away",
                self.distance_meters
            ),
            ConflictSource::Asset {
                asset_id,
                owner,
                description,
            } => format!(
                "Overlaps protected asset {asset_id} ({description}, owner: {owner}), {:.1} m away",
                self.distance_meters
            ),
        }
    }

    /// Nearest first; work orders before assets at equal distance; then lowest id.
    fn nearest_first(&self, other: &Self) -> Ordering {
        self.distance_meters
            .total_cmp(&other.distance_meters)
            .then_with(|| match (&self.source, &other.source) {
                (ConflictSource::WorkOrder { id: a, .. }, ConflictSource::WorkOrder { id: b, .. }) => {
                    a.cmp(b)
                }
                (ConflictSource::WorkOrder { .. }, ConflictSource::Asset { .. }) => Ordering::Less,
                (ConflictSource::Asset { .. }, ConflictSource::WorkOrder { .. }) => {
                    Ordering::Greater
                }
                (
                    ConflictSource::Asset { asset_id: a, .. },
                    ConflictSource::Asset { asset_id: b, .. },
                ) => a.cmp(b),
            })
    }
}

/// Decides the initial status of a candidate work order.
#[derive(Debug, Clone, Default)]
pub struct ConflictEngine {
    protected_assets: Vec<(ProtectedAsset, WorkZone)>,
}

impl ConflictEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_protected_assets(
        assets: impl IntoIterator<Item = ProtectedAsset>,
    ) -> Result<Self, ValidationError> {
        let protected_assets = assets
            .into_iter()
            .map(|asset| asset.zone().map(|zone| (asset, zone)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { protected_assets })
    }

    pub fn protected_assets(&self) -> impl Iterator<Item = &ProtectedAsset> {
        self.protected_assets.iter().map(|(asset, _)| asset)
    }

    /// Every overlap the candidate has with active orders and protected assets,
    /// nearest first. Orders whose id is `exclude` are skipped.
    pub fn find_conflicts<'a>(
        &self,
        candidate: &WorkZone,
        orders: impl IntoIterator<Item = &'a WorkOrder>,
        exclude: Option<WorkOrderId>,
    ) -> Result<Vec<ConflictMatch>, ValidationError> {
        let mut matches = Vec::new();

        for order in orders {
            if !order.status.is_active() || Some(order.id) == exclude {
                continue;
            }
            if let Some(distance_meters) = geo::overlap_distance(candidate, &order.zone())? {
                matches.push(ConflictMatch {
                    source: ConflictSource::WorkOrder {
                        id: order.id,
                        description: order.description.clone(),
                    },
                    distance_meters,
                });
            }
        }

        for (asset, zone) in &self.protected_assets {
            if let Some(distance_meters) = geo::overlap_distance(candidate, zone)? {
                matches.push(ConflictMatch {
                    source: ConflictSource::Asset {
                        asset_id: asset.asset_id.clone(),
                        owner: asset.owner.clone(),
                        description: asset.description.clone(),
                    },
                    distance_meters,
                });
            }
        }

        matches.sort_by(ConflictMatch::nearest_first);
        Ok(matches)
    }

    /// Initial status for a candidate given a snapshot of existing orders.
    pub fn evaluate<'a>(
        &self,
        candidate: &WorkZone,
        orders: impl IntoIterator<Item = &'a WorkOrder>,
    ) -> Result<Admission, ValidationError> {
        self.evaluate_excluding(candidate, orders, None)
    }

    /// Same as `evaluate`, ignoring the order being re-evaluated.
    pub fn evaluate_excluding<'a>(
        &self,
        candidate: &WorkZone,
        orders: impl IntoIterator<Item = &'a WorkOrder>,
        exclude: Option<WorkOrderId>,
    ) -> Result<Admission, ValidationError> {
        let conflicts = self.find_conflicts(candidate, orders, exclude)?;

        let Some(nearest) = conflicts.first() else {
            debug!(
                latitude = candidate.center.latitude,
                longitude = candidate.center.longitude,
                radius_meters = candidate.radius_meters,
                "No conflicts found"
            );
            return Ok(Admission::pending());
        };

        for conflict in &conflicts {
            if let ConflictSource::Asset { asset_id, owner, .. } = &conflict.source {
                warn!(
                    asset_id = %asset_id,
                    asset_owner = %owner,
                    distance_meters = conflict.distance_meters,
                    "Work zone overlaps protected asset"
                );
            }
        }
        warn!(
            conflict_count = conflicts.len(),
            nearest_distance_meters = nearest.distance_meters,
            "Conflict detected"
        );

        Ok(Admission::conflict(nearest.reason()))
    }
}
