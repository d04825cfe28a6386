//! Indexed campaign store: a primary map plus a state index and an
//! insertion-ordered set, mutated as a unit (spec.md §4.E, §9 Design
//! Notes). Callers needing concurrent access wrap a `CampaignStore` in a
//! single lock — the three indexes must never be mutated independently.

use crate::error::CampaignError;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;
use wyckoff_core::campaign::{Campaign, CampaignState};

#[derive(Default)]
pub struct CampaignStore {
    campaigns_by_id: HashMap<Uuid, Campaign>,
    campaigns_by_state: HashMap<CampaignState, HashSet<Uuid>>,
    insertion_order: Vec<Uuid>,
}

impl CampaignStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, campaign: Campaign) {
        let id = campaign.id;
        let state = campaign.state;
        self.insertion_order.push(id);
        self.campaigns_by_state.entry(state).or_default().insert(id);
        self.campaigns_by_id.insert(id, campaign);
    }

    pub fn get(&self, id: Uuid) -> Option<&Campaign> {
        self.campaigns_by_id.get(&id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Campaign> {
        self.campaigns_by_id.get_mut(&id)
    }

    /// Moves `id` from its current state bucket to `new_state`, updating
    /// the campaign's own `state` field too. Both index halves move
    /// together so they cannot drift.
    pub fn update_state(&mut self, id: Uuid, new_state: CampaignState) -> Result<(), CampaignError> {
        let campaign = self.campaigns_by_id.get_mut(&id).ok_or(CampaignError::NotFound(id))?;
        let old_state = campaign.state;
        campaign.state = new_state;
        if let Some(bucket) = self.campaigns_by_state.get_mut(&old_state) {
            bucket.remove(&id);
        }
        self.campaigns_by_state.entry(new_state).or_default().insert(id);
        Ok(())
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Campaign> {
        let campaign = self.campaigns_by_id.remove(&id)?;
        if let Some(bucket) = self.campaigns_by_state.get_mut(&campaign.state) {
            bucket.remove(&id);
        }
        self.insertion_order.retain(|existing| *existing != id);
        Some(campaign)
    }

    /// Campaigns in the Active state, in insertion order, read through the
    /// state index (spec.md §4.E, §5 ordering guarantees).
    pub fn get_active_campaigns(&self) -> Vec<&Campaign> {
        let active_ids = self.campaigns_by_state.get(&CampaignState::Active);
        self.insertion_order
            .iter()
            .filter(|id| active_ids.is_some_and(|set| set.contains(id)))
            .filter_map(|id| self.campaigns_by_id.get(id))
            .collect()
    }

    pub fn count_by_state(&self, state: CampaignState) -> usize {
        self.campaigns_by_state.get(&state).map(|s| s.len()).unwrap_or(0)
    }

    /// Every campaign regardless of state, in insertion order. Used by
    /// statistics/backtest aggregation, which needs completed and failed
    /// campaigns alongside active ones.
    pub fn all(&self) -> Vec<&Campaign> {
        self.insertion_order.iter().filter_map(|id| self.campaigns_by_id.get(id)).collect()
    }

    /// Recovery operation: rebuilds `campaigns_by_state` from the primary
    /// map, discarding whatever the index held (spec.md §4.E).
    pub fn rebuild_indexes(&mut self) {
        let mut rebuilt: HashMap<CampaignState, HashSet<Uuid>> = HashMap::new();
        for (id, campaign) in &self.campaigns_by_id {
            rebuilt.entry(campaign.state).or_default().insert(*id);
        }
        self.campaigns_by_state = rebuilt;
        self.insertion_order.retain(|id| self.campaigns_by_id.contains_key(id));
    }

    pub fn len(&self) -> usize {
        self.campaigns_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.campaigns_by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(id: Uuid) -> Campaign {
        Campaign::new(id, "TEST", Utc::now())
    }

    #[test]
    fn state_index_stays_in_bijection_with_primary_map() {
        let mut store = CampaignStore::new();
        let id = Uuid::new_v4();
        store.add(sample(id));
        store.update_state(id, CampaignState::Active).unwrap();
        assert_eq!(store.count_by_state(CampaignState::Active), 1);
        assert_eq!(store.count_by_state(CampaignState::Forming), 0);
        assert_eq!(store.get_active_campaigns().len(), 1);
    }

    #[test]
    fn rebuild_indexes_recovers_from_divergence() {
        let mut store = CampaignStore::new();
        let id = Uuid::new_v4();
        store.add(sample(id));
        // Simulate index drift by mutating the campaign directly without
        // going through update_state.
        store.get_mut(id).unwrap().state = CampaignState::Active;
        assert_eq!(store.count_by_state(CampaignState::Active), 0);
        store.rebuild_indexes();
        assert_eq!(store.count_by_state(CampaignState::Active), 1);
        assert_eq!(store.count_by_state(CampaignState::Forming), 0);
    }
}
