//! World entities with transient existence: game objects, pets and totems.
//!
//! The original class hierarchy is flattened into one [`Entity`] record with
//! a tagged [`EntityKind`]; behavior dispatch is an explicit match instead of
//! virtual overrides.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::common::{EntryId, ObjectGuid, PackedRotation, Position, SpawnId};
use crate::world::WorldCtx;

mod gameobject;
pub(crate) use gameobject::fire_trap;
pub use gameobject::GameObjectState;

mod pet;
pub use pet::{ActiveState, PetSpell, PetSpellState, PetState, propagate_owner_stat};

mod totem;
pub use totem::TotemState;

/// Interaction/despawn-cycle phase of a game object. Distinct from the
/// visual [`GoState`]; the two are combined by interaction behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LootState {
    NotReady,
    Ready,
    Activated,
    /// Transient; always resolved to `Ready` or deletion within one tick.
    JustDeactivated,
}

/// Visual/interactive pose: closed, open, or alternate open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoState {
    #[default]
    Ready,
    Active,
    ActiveAlternative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathState {
    Alive,
    Corpse,
    Dead,
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct GameObjectFlags: u32 {
        const IN_USE = 0x01;
        const LOCKED = 0x02;
        const INTERACT_CONDITION = 0x04;
        const TRANSPORT = 0x08;
        const NOT_SELECTABLE = 0x10;
        const NO_DESPAWN = 0x20;
    }
}

#[derive(Debug)]
pub enum EntityKind {
    GameObject(GameObjectState),
    Pet(PetState),
    Totem(TotemState),
}

#[derive(Debug)]
pub struct Entity {
    pub guid: ObjectGuid,
    pub entry: EntryId,
    /// None for ephemeral summons with no static spawn data.
    pub spawn_id: Option<SpawnId>,
    pub position: Position,
    pub rotation: PackedRotation,
    pub kind: EntityKind,
    /// Set during an update; the world sweeps flagged entities after the
    /// tick, never mid-iteration.
    pub pending_delete: bool,
}

impl Entity {
    /// Advances this entity's state machine by one world tick.
    pub fn update(&mut self, ctx: &mut WorldCtx) {
        match &self.kind {
            EntityKind::GameObject(_) => gameobject::update(self, ctx),
            EntityKind::Pet(_) => pet::update(self, ctx),
            EntityKind::Totem(_) => totem::update(self, ctx),
        }
    }

    pub fn as_gameobject(&self) -> Option<&GameObjectState> {
        match &self.kind {
            EntityKind::GameObject(go) => Some(go),
            _ => None,
        }
    }

    pub fn as_gameobject_mut(&mut self) -> Option<&mut GameObjectState> {
        match &mut self.kind {
            EntityKind::GameObject(go) => Some(go),
            _ => None,
        }
    }

    pub fn as_pet(&self) -> Option<&PetState> {
        match &self.kind {
            EntityKind::Pet(pet) => Some(pet),
            _ => None,
        }
    }

    pub fn as_pet_mut(&mut self) -> Option<&mut PetState> {
        match &mut self.kind {
            EntityKind::Pet(pet) => Some(pet),
            _ => None,
        }
    }
}
