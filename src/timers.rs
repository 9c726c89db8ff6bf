//! Wall-clock timers that must survive a server reload.
//!
//! Respawn and cooldown times are keyed by spawn point, not by entity
//! instance; instances are destroyed and recreated across respawns.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::common::SpawnId;
use crate::persistence::{PersistenceStore, TimerKind};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RespawnTimer {
    /// Epoch seconds; 0 means "not scheduled".
    pub due_at: u64,
    pub default_delay_secs: u64,
    pub spawned_by_default: bool,
}

impl RespawnTimer {
    pub fn new(default_delay_secs: u64, spawned_by_default: bool) -> Self {
        Self {
            due_at: 0,
            default_delay_secs,
            spawned_by_default,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.due_at != 0
    }

    pub fn is_due(&self, now_secs: u64) -> bool {
        self.is_scheduled() && now_secs >= self.due_at
    }
}

/// The authoritative in-memory timer map, written through to the store on
/// every mutation. Store failures are logged; in-memory state wins.
#[derive(Default)]
pub struct PersistentTimers {
    respawn: HashMap<SpawnId, u64>,
    cooldown: HashMap<SpawnId, u64>,
}

impl PersistentTimers {
    pub fn load(store: &dyn PersistenceStore) -> Self {
        let mut timers = Self::default();

        match store.load_timers(TimerKind::Respawn) {
            Ok(entries) => timers.respawn = entries.into_iter().collect(),
            Err(err) => tracing::warn!("Failed to load respawn timers: {err}"),
        }
        match store.load_timers(TimerKind::Cooldown) {
            Ok(entries) => timers.cooldown = entries.into_iter().collect(),
            Err(err) => tracing::warn!("Failed to load cooldown timers: {err}"),
        }

        timers
    }

    pub fn schedule(
        &mut self,
        store: &dyn PersistenceStore,
        kind: TimerKind,
        spawn_id: SpawnId,
        due_at: u64,
    ) {
        self.map_mut(kind).insert(spawn_id, due_at);
        if let Err(err) = store.save_timer(kind, spawn_id, due_at) {
            tracing::warn!("Failed to persist {kind:?} timer for spawn {spawn_id}: {err}");
        }
    }

    pub fn clear(&mut self, store: &dyn PersistenceStore, kind: TimerKind, spawn_id: SpawnId) {
        if self.map_mut(kind).remove(&spawn_id).is_some()
            && let Err(err) = store.clear_timer(kind, spawn_id)
        {
            tracing::warn!("Failed to clear {kind:?} timer for spawn {spawn_id}: {err}");
        }
    }

    pub fn due_at(&self, kind: TimerKind, spawn_id: SpawnId) -> Option<u64> {
        match kind {
            TimerKind::Respawn => self.respawn.get(&spawn_id).copied(),
            TimerKind::Cooldown => self.cooldown.get(&spawn_id).copied(),
        }
    }

    fn map_mut(&mut self, kind: TimerKind) -> &mut HashMap<SpawnId, u64> {
        match kind {
            TimerKind::Respawn => &mut self.respawn,
            TimerKind::Cooldown => &mut self.cooldown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn respawn_timer_due() {
        let mut timer = RespawnTimer::new(300, true);
        assert!(!timer.is_scheduled());
        assert!(!timer.is_due(10_000));

        timer.due_at = 5_000;
        assert!(!timer.is_due(4_999));
        assert!(timer.is_due(5_000));
    }

    #[test]
    fn timers_survive_reload_through_store() {
        let store = MemoryStore::default();

        let mut timers = PersistentTimers::default();
        timers.schedule(&store, TimerKind::Respawn, SpawnId(7), 12_345);
        timers.schedule(&store, TimerKind::Cooldown, SpawnId(7), 99);

        // Simulated reload.
        let reloaded = PersistentTimers::load(&store);
        assert_eq!(reloaded.due_at(TimerKind::Respawn, SpawnId(7)), Some(12_345));
        assert_eq!(reloaded.due_at(TimerKind::Cooldown, SpawnId(7)), Some(99));

        let mut reloaded = reloaded;
        reloaded.clear(&store, TimerKind::Respawn, SpawnId(7));
        let again = PersistentTimers::load(&store);
        assert_eq!(again.due_at(TimerKind::Respawn, SpawnId(7)), None);
        assert_eq!(again.due_at(TimerKind::Cooldown, SpawnId(7)), Some(99));
    }
}
