//! Dashboard statistics

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::CmsError;
use crate::gateway::Gateway;
use crate::model::EntityKind;

/// Row counts shown on the dashboard cards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub faculty: u64,
    pub students: u64,
    pub activities: u64,
    pub achievements: u64,
    pub leadership: u64,
    /// Set when the counts could not be fetched and are all zero
    pub degraded: bool,
}

impl DashboardStats {
    fn zeroed() -> Self {
        Self {
            degraded: true,
            ..Default::default()
        }
    }
}

pub struct StatsService {
    gateway: Arc<dyn Gateway>,
}

impl StatsService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Fetch all counts concurrently. Any failure yields zeroed counts.
    pub async fn load(&self) -> DashboardStats {
        match self.try_load().await {
            Ok(stats) => {
                debug!("Dashboard stats loaded: {:?}", stats);
                stats
            }
            Err(e) => {
                warn!("Error loading dashboard stats: {}", e);
                DashboardStats::zeroed()
            }
        }
    }

    async fn try_load(&self) -> Result<DashboardStats, CmsError> {
        let count = |kind: EntityKind| async move {
            self.gateway
                .count(kind.collection())
                .await
                .map_err(CmsError::Fetch)
        };

        let (faculty, students, activities, achievements, leadership) = futures::try_join!(
            count(EntityKind::Faculty),
            count(EntityKind::Student),
            count(EntityKind::Activity),
            count(EntityKind::Achievement),
            count(EntityKind::Leadership),
        )?;

        Ok(DashboardStats {
            faculty,
            students,
            activities,
            achievements,
            leadership,
            degraded: false,
        })
    }
}
