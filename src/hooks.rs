//! Collaborator seams for scripting and spell resolution.
//!
//! The simulation core only decides *whether* and *with what parameters* to
//! invoke these; it must behave correctly when nothing is registered, so
//! every hook has a no-op default.

use crate::capture_point::CaptureState;
use crate::common::{ObjectGuid, SpellId};
use crate::entity::{DeathState, LootState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Loot(LootState),
    Death(DeathState),
}

/// Fire-and-forget notifications into the scripting layer.
pub trait ScriptHooks {
    fn on_state_changed(&mut self, _entity: ObjectGuid, _state: StateChange) {}

    /// Returns true if the script fully handled the interaction, in which
    /// case the built-in use behavior is skipped.
    fn on_use(&mut self, _entity: ObjectGuid, _actor: ObjectGuid) -> bool {
        false
    }

    fn on_capture_transition(&mut self, _entity: ObjectGuid, _state: CaptureState) {}

    fn on_gossip(&mut self, _entity: ObjectGuid, _actor: ObjectGuid, _gossip_id: u32) {}

    fn on_game_event(&mut self, _entity: ObjectGuid, _event_id: u32) {}
}

/// The default hook set: everything is ignored.
pub struct NoopHooks;

impl ScriptHooks for NoopHooks {}

/// Opaque spell resolution. Effects are resolved entirely on the other side
/// of this seam.
pub trait SpellExecutor {
    fn cast_spell(&mut self, caster: ObjectGuid, spell_id: SpellId, target: ObjectGuid, triggered: bool);
}

pub struct NoopExecutor;

impl SpellExecutor for NoopExecutor {
    fn cast_spell(&mut self, _caster: ObjectGuid, _spell_id: SpellId, _target: ObjectGuid, _triggered: bool) {}
}

#[cfg(test)]
pub mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Records every cast so scenario tests can assert on them.
    #[derive(Default)]
    pub struct RecordingExecutor {
        pub casts: Vec<(ObjectGuid, SpellId, ObjectGuid, bool)>,
    }

    impl SpellExecutor for RecordingExecutor {
        fn cast_spell(&mut self, caster: ObjectGuid, spell_id: SpellId, target: ObjectGuid, triggered: bool) {
            self.casts.push((caster, spell_id, target, triggered));
        }
    }

    #[derive(Default)]
    pub struct RecordingHooks {
        pub state_changes: Vec<(ObjectGuid, StateChange)>,
        pub capture_transitions: Vec<(ObjectGuid, CaptureState)>,
        pub game_events: Vec<(ObjectGuid, u32)>,
        pub gossips: Vec<(ObjectGuid, ObjectGuid)>,
        /// Entities whose `on_use` pretends to be script-handled.
        pub handles_use: Vec<ObjectGuid>,
    }

    impl ScriptHooks for RecordingHooks {
        fn on_state_changed(&mut self, entity: ObjectGuid, state: StateChange) {
            self.state_changes.push((entity, state));
        }

        fn on_use(&mut self, entity: ObjectGuid, _actor: ObjectGuid) -> bool {
            self.handles_use.contains(&entity)
        }

        fn on_capture_transition(&mut self, entity: ObjectGuid, state: CaptureState) {
            self.capture_transitions.push((entity, state));
        }

        fn on_gossip(&mut self, entity: ObjectGuid, actor: ObjectGuid, _gossip_id: u32) {
            self.gossips.push((entity, actor));
        }

        fn on_game_event(&mut self, entity: ObjectGuid, event_id: u32) {
            self.game_events.push((entity, event_id));
        }
    }

    /// Shareable wrapper so a test keeps a handle to the recordings after
    /// boxing the hooks into a world.
    #[derive(Default, Clone)]
    pub struct SharedHooks(pub Arc<Mutex<RecordingHooks>>);

    impl ScriptHooks for SharedHooks {
        fn on_state_changed(&mut self, entity: ObjectGuid, state: StateChange) {
            self.0.lock().unwrap().on_state_changed(entity, state);
        }

        fn on_use(&mut self, entity: ObjectGuid, actor: ObjectGuid) -> bool {
            self.0.lock().unwrap().on_use(entity, actor)
        }

        fn on_capture_transition(&mut self, entity: ObjectGuid, state: CaptureState) {
            self.0.lock().unwrap().on_capture_transition(entity, state);
        }

        fn on_gossip(&mut self, entity: ObjectGuid, actor: ObjectGuid, gossip_id: u32) {
            self.0.lock().unwrap().on_gossip(entity, actor, gossip_id);
        }

        fn on_game_event(&mut self, entity: ObjectGuid, event_id: u32) {
            self.0.lock().unwrap().on_game_event(entity, event_id);
        }
    }

    #[derive(Default, Clone)]
    pub struct SharedExecutor(pub Arc<Mutex<RecordingExecutor>>);

    impl SharedExecutor {
        pub fn casts(&self) -> Vec<(ObjectGuid, SpellId, ObjectGuid, bool)> {
            self.0.lock().unwrap().casts.clone()
        }
    }

    impl SpellExecutor for SharedExecutor {
        fn cast_spell(&mut self, caster: ObjectGuid, spell_id: SpellId, target: ObjectGuid, triggered: bool) {
            self.0.lock().unwrap().cast_spell(caster, spell_id, target, triggered);
        }
    }
}
