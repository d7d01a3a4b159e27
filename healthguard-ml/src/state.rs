//! Health states and the cluster-to-severity mapping
//!
//! ## Overview
//!
//! Clustering produces anonymous ids `0..3`. A [`SeverityMapping`] turns those
//! ids into ordered [`HealthState`]s. The mapping is fixed when the clusterer
//! is fitted and stored with it, so a loaded model reports the same severities
//! it was trained with.
//!
//! ## Ordering Policies
//!
//! ```text
//! CentroidMagnitude:  ‖c_a‖ ≤ ‖c_b‖ ≤ ‖c_c‖  →  a=Normal, b=Moderate, c=Alert
//! ClusterId:          0=Normal, 1=Moderate, 2=Alert
//! ```
//!
//! Features are centred, so a calm machine sits near the origin and the
//! centroid farthest from it is the most unusual regime. `ClusterId` keeps
//! the raw cluster order for compatibility with models trained that way.

use std::fmt;

use serde::{Deserialize, Serialize};

use healthguard_core::constants::HEALTH_STATE_COUNT;

/// Ordered machine health category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HealthState {
    /// Nominal operation
    Normal = 0,
    /// Drifting from nominal
    Moderate = 1,
    /// Failure imminent or in progress
    Alert = 2,
}

impl HealthState {
    /// All states, least severe first
    pub const ALL: [HealthState; HEALTH_STATE_COUNT] =
        [HealthState::Normal, HealthState::Moderate, HealthState::Alert];

    /// Numeric id, also the classifier's class index
    pub fn id(self) -> usize {
        self as usize
    }

    /// State with numeric id `id`
    pub fn from_id(id: usize) -> Option<Self> {
        Self::ALL.get(id).copied()
    }

    /// Report name
    pub fn name(self) -> &'static str {
        match self {
            HealthState::Normal => "Normal",
            HealthState::Moderate => "Moderate",
            HealthState::Alert => "Alert",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How cluster ids are ranked into severities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SeverityOrder {
    /// Rank by centroid Euclidean norm, smallest is Normal
    #[default]
    CentroidMagnitude,
    /// Cluster id equals health state id
    ClusterId,
}

/// Cluster id → health state lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityMapping {
    states: [HealthState; HEALTH_STATE_COUNT],
}

impl Default for SeverityMapping {
    fn default() -> Self {
        Self::identity()
    }
}

impl SeverityMapping {
    /// Cluster `i` maps to state `i`
    pub fn identity() -> Self {
        Self {
            states: HealthState::ALL,
        }
    }

    /// Derive a mapping from fitted centroid norms.
    ///
    /// Equal norms keep cluster-id order.
    pub fn from_centroid_norms(norms: &[f32; HEALTH_STATE_COUNT]) -> Self {
        let mut order: [usize; HEALTH_STATE_COUNT] = [0, 1, 2];
        order.sort_by(|&a, &b| norms[a].total_cmp(&norms[b]).then(a.cmp(&b)));

        let mut states = HealthState::ALL;
        for (rank, &cluster) in order.iter().enumerate() {
            states[cluster] = HealthState::ALL[rank];
        }
        Self { states }
    }

    /// Build the mapping for `order`
    pub fn for_order(order: SeverityOrder, norms: &[f32; HEALTH_STATE_COUNT]) -> Self {
        match order {
            SeverityOrder::CentroidMagnitude => Self::from_centroid_norms(norms),
            SeverityOrder::ClusterId => Self::identity(),
        }
    }

    /// State for cluster `cluster`; out-of-range ids saturate to Alert
    pub fn state(&self, cluster: usize) -> HealthState {
        self.states
            .get(cluster)
            .copied()
            .unwrap_or(HealthState::Alert)
    }

    /// True when every cluster maps to the state with its own id
    pub fn is_identity(&self) -> bool {
        self.states == HealthState::ALL
    }

    /// States indexed by cluster id
    pub fn states(&self) -> &[HealthState; HEALTH_STATE_COUNT] {
        &self.states
    }
}
