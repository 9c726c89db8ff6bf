//! Totem lifecycle.
//!
//! Totems are duration-limited summons: no experience, no spellbook, no
//! persistence. They exist as long as their duration and their owner do.

use crate::common::{ObjectGuid, SpellId};
use crate::entity::{DeathState, Entity, EntityKind};
use crate::hooks::StateChange;
use crate::world::WorldCtx;

#[derive(Debug)]
pub struct TotemState {
    pub owner: ObjectGuid,
    /// Remaining lifetime.
    pub duration_millis: u64,
    /// The aura this totem maintains while it stands.
    pub spell: SpellId,
    owner_missing_ticks: u8,
}

impl TotemState {
    pub fn new(owner: ObjectGuid, duration_millis: u64, spell: SpellId) -> Self {
        Self {
            owner,
            duration_millis,
            spell,
            owner_missing_ticks: 0,
        }
    }
}

pub(super) fn update(ent: &mut Entity, ctx: &mut WorldCtx) {
    let EntityKind::Totem(totem) = &mut ent.kind else {
        return;
    };

    if ctx.players.get(&totem.owner).is_none() {
        totem.owner_missing_ticks += 1;
        if totem.owner_missing_ticks > 1 {
            unsummon(ent, ctx);
        }
        return;
    }
    totem.owner_missing_ticks = 0;

    if totem.duration_millis > ctx.dt_millis {
        totem.duration_millis -= ctx.dt_millis;
        return;
    }

    // Duration expired.
    unsummon(ent, ctx);
}

fn unsummon(ent: &mut Entity, ctx: &mut WorldCtx) {
    ctx.hooks
        .on_state_changed(ent.guid, StateChange::Death(DeathState::Dead));
    ent.pending_delete = true;
}
