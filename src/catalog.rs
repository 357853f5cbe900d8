//! Alleys, lanes and opening calendars. Read-only from the reservation side.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use tracing::info;

use crate::model::*;

/// Where lanes and alleys come from.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn lane_exists(&self, lane_id: LaneId) -> bool {
        self.lane(lane_id).await.is_some()
    }

    async fn lane(&self, lane_id: LaneId) -> Option<Lane>;

    async fn alley(&self, alley_id: AlleyId) -> Option<Alley>;

    /// Lanes of an alley in catalog order. Empty for an unknown alley.
    async fn lanes_in_alley(&self, alley_id: AlleyId) -> Vec<Lane>;
}

/// Catalog held in memory, usually seeded from a JSON file at startup.
#[derive(Default)]
pub struct InMemoryCatalog {
    alleys: DashMap<AlleyId, Alley>,
    lanes: DashMap<LaneId, Lane>,
    /// Children index: alley id → lane ids in insertion order.
    alley_lanes: DashMap<AlleyId, Vec<LaneId>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogSeed {
    alleys: Vec<AlleySeed>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlleySeed {
    id: AlleyId,
    name: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    opening_hours: OpeningHours,
    #[serde(default)]
    lanes: Vec<LaneSeed>,
}

#[derive(Deserialize)]
struct LaneSeed {
    id: LaneId,
    number: u32,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_alley(&self, alley: Alley) {
        self.alley_lanes.entry(alley.id).or_default();
        self.alleys.insert(alley.id, alley);
    }

    /// Add a lane under its alley. Re-inserting a lane id replaces its record
    /// but keeps its position.
    pub fn insert_lane(&self, lane: Lane) {
        let previous = self.lanes.insert(lane.id, lane.clone());
        if let Some(prev) = previous
            && prev.alley_id != lane.alley_id
            && let Some(mut siblings) = self.alley_lanes.get_mut(&prev.alley_id)
        {
            siblings.retain(|id| *id != lane.id);
        }
        let mut siblings = self.alley_lanes.entry(lane.alley_id).or_default();
        if !siblings.contains(&lane.id) {
            siblings.push(lane.id);
        }
    }

    pub fn from_json_str(json: &str) -> io::Result<Self> {
        let seed: CatalogSeed = serde_json::from_str(json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let catalog = Self::new();
        for alley in seed.alleys {
            let alley_id = alley.id;
            catalog.insert_alley(Alley {
                id: alley_id,
                name: alley.name,
                city: alley.city,
                address: alley.address,
                opening_hours: alley.opening_hours,
            });
            for lane in alley.lanes {
                catalog.insert_lane(Lane {
                    id: lane.id,
                    number: lane.number,
                    alley_id,
                });
            }
        }
        Ok(catalog)
    }

    pub fn from_json_file(path: &Path) -> io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&json)?;
        info!(
            "catalog loaded from {}: {} alleys, {} lanes",
            path.display(),
            catalog.alleys.len(),
            catalog.lanes.len()
        );
        Ok(catalog)
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn lane_exists(&self, lane_id: LaneId) -> bool {
        self.lanes.contains_key(&lane_id)
    }

    async fn lane(&self, lane_id: LaneId) -> Option<Lane> {
        self.lanes.get(&lane_id).map(|e| e.value().clone())
    }

    async fn alley(&self, alley_id: AlleyId) -> Option<Alley> {
        self.alleys.get(&alley_id).map(|e| e.value().clone())
    }

    async fn lanes_in_alley(&self, alley_id: AlleyId) -> Vec<Lane> {
        // Clone ids first so the children shard guard is gone before touching `lanes`.
        let ids = match self.alley_lanes.get(&alley_id) {
            Some(ids) => ids.value().clone(),
            None => return Vec::new(),
        };
        ids.iter()
            .filter_map(|id| self.lanes.get(id).map(|e| e.value().clone()))
            .collect()
    }
}
