//! Game object lifecycle.
//!
//! The per-tick state machine over [`LootState`]: arming, respawn handling,
//! trap sensing, auto-close timers, capture point contests and the one-shot
//! deactivation cleanup that decides between deletion and the next respawn.

use std::collections::HashSet;

use crate::capture_point::{CapturePoint, CaptureTuning};
use crate::common::{Faction, ObjectGuid, Position};
use crate::content::{GameObjectTemplate, GoData};
use crate::entity::{Entity, EntityKind, GameObjectFlags, GoState, LootState};
use crate::hooks::StateChange;
use crate::persistence::TimerKind;
use crate::timers::RespawnTimer;
use crate::world::WorldCtx;

/// Delay between a fishing bobber appearing and its splash arming it.
pub const BOBBER_SPLASH_DELAY_MILLIS: u64 = 5000;
/// How long an armed bobber stays fishable before despawning.
pub const BOBBER_LIFETIME_MILLIS: u64 = 20_000;

#[derive(Debug)]
pub struct GameObjectState {
    pub loot_state: LootState,
    pub go_state: GoState,
    pub flags: GameObjectFlags,
    pub respawn: RespawnTimer,
    /// False while despawned and waiting out the respawn timer.
    pub spawned: bool,
    /// Millisecond deadline for leaving `NotReady`.
    pub ready_at: u64,
    /// Millisecond deadline for auto-close (doors), cooldown end (traps) or
    /// despawn (bobbers). 0 = unset.
    pub close_at: u64,
    /// Second deadline for a chest restock. 0 = unset.
    pub restock_at: u64,
    /// Millisecond deadline before the next "use" is accepted.
    pub cooldown_until: u64,
    pub use_count: u32,
    /// Remaining charges for traps and spell casters; 0 with a charged
    /// template means exhausted.
    pub charges: u32,
    pub unique_users: HashSet<ObjectGuid>,
    /// Summoner, for traps and rituals. Weak: re-resolved on every access.
    pub owner: Option<ObjectGuid>,
    pub capture: Option<CapturePoint>,
    pub loot_available: bool,
}

impl GameObjectState {
    pub fn new(template: &GameObjectTemplate, now_millis: u64, respawn: RespawnTimer) -> Self {
        let mut state = Self {
            loot_state: LootState::Ready,
            go_state: GoState::Ready,
            flags: GameObjectFlags::default(),
            respawn,
            spawned: true,
            ready_at: 0,
            close_at: 0,
            restock_at: 0,
            cooldown_until: 0,
            use_count: 0,
            charges: 0,
            unique_users: HashSet::new(),
            owner: None,
            capture: None,
            loot_available: false,
        };

        match &template.data {
            GoData::Door { start_open, .. } | GoData::Button { start_open, .. } => {
                if *start_open {
                    state.go_state = GoState::Active;
                }
            }
            GoData::Trap {
                charges,
                start_delay_secs,
                ..
            } => {
                state.charges = *charges;
                state.loot_state = LootState::NotReady;
                state.ready_at = now_millis + start_delay_secs * 1000;
            }
            GoData::Chest { .. } => {
                state.loot_available = true;
            }
            GoData::SpellCaster { charges, .. } => {
                state.charges = *charges;
            }
            GoData::FishingNode {} => {
                state.loot_state = LootState::NotReady;
                state.ready_at = now_millis + BOBBER_SPLASH_DELAY_MILLIS;
            }
            GoData::CapturePoint { .. } => {
                state.loot_state = LootState::Activated;
                state.capture = Some(CapturePoint::default());
            }
            _ => {}
        }

        state
    }

    /// Whether a "use" is currently blocked by the per-entity cooldown.
    pub fn on_cooldown(&self, now_millis: u64) -> bool {
        self.cooldown_until > now_millis
    }
}

pub(super) fn update(ent: &mut Entity, ctx: &mut WorldCtx) {
    let content = ctx.content;
    let template = match content.gameobject(ent.entry) {
        Ok(template) => template,
        Err(err) => {
            tracing::warn!("Game object {} cannot update: {err}", ent.guid);
            return;
        }
    };

    let guid = ent.guid;
    let position = ent.position;
    let EntityKind::GameObject(go) = &mut ent.kind else {
        return;
    };

    match go.loot_state {
        LootState::NotReady => {
            // Owner-summoned traps arm early when their owner enters combat.
            if let GoData::Trap { .. } = &template.data
                && let Some(owner) = go.owner
            {
                let Some(owner) = ctx.players.get(&owner) else {
                    // The summoner is gone; the trap goes with them.
                    ent.pending_delete = true;
                    return;
                };
                if owner.in_combat {
                    go.ready_at = ctx.now_millis;
                }
            }

            if ctx.now_millis >= go.ready_at {
                go.loot_state = LootState::Ready;
                if matches!(template.data, GoData::FishingNode {}) {
                    go.close_at = ctx.now_millis + BOBBER_LIFETIME_MILLIS;
                }
            }
        }
        LootState::Ready => {
            if !go.spawned {
                if go.respawn.is_due(ctx.now_secs()) {
                    go.respawn.due_at = 0;
                    if let Some(spawn_id) = ent.spawn_id {
                        ctx.timers.clear(ctx.store, TimerKind::Respawn, spawn_id);
                    }

                    if !go.respawn.spawned_by_default {
                        // One-shot spawn; the expired timer deletes it.
                        ent.pending_delete = true;
                        return;
                    }

                    go.spawned = true;
                    go.use_count = 0;
                    go.unique_users.clear();
                    go.loot_available = matches!(template.data, GoData::Chest { .. });
                    if let GoData::Trap { charges, .. } = template.data {
                        go.charges = charges;
                    }
                    ctx.hooks.on_state_changed(guid, StateChange::Loot(LootState::Ready));
                }
                return;
            }

            match &template.data {
                GoData::Trap { radius, spell_id, cooldown_secs, charges, .. } => {
                    // Battleground traps only ever fire through their linked
                    // trigger, regardless of who stands on them. A charged
                    // trap with nothing left stays inert until a respawn
                    // restores its charges.
                    if *radius > 0.0
                        && !template.is_battleground_trap()
                        && (*charges == 0 || go.charges > 0)
                    {
                        let hostile_to = go
                            .owner
                            .and_then(|owner| ctx.players.get(&owner))
                            .map(|owner| owner.faction);
                        if let Some(victim) =
                            first_trap_victim(ctx, &position, *radius, hostile_to)
                        {
                            fire_trap(go, guid, *spell_id, *cooldown_secs, victim, ctx);
                        }
                    }
                }
                GoData::Chest { .. } => {
                    if go.restock_at != 0 && ctx.now_secs() >= go.restock_at {
                        go.restock_at = 0;
                        go.loot_available = true;
                    }
                }
                GoData::FishingNode {} => {
                    if go.close_at != 0 && ctx.now_millis >= go.close_at {
                        // Nobody hooked it in time.
                        go.loot_state = LootState::JustDeactivated;
                    }
                }
                _ => {}
            }
        }
        LootState::Activated => match &template.data {
            GoData::Door { .. } | GoData::Button { .. } | GoData::Goober { .. } => {
                if go.close_at != 0 && ctx.now_millis >= go.close_at {
                    go.loot_state = LootState::JustDeactivated;
                }
            }
            GoData::Trap { charges, .. } => {
                if go.close_at != 0 && ctx.now_millis >= go.close_at {
                    go.close_at = 0;
                    if *charges > 0 && go.charges == 0 {
                        go.loot_state = LootState::JustDeactivated;
                    } else {
                        // Cooled down, re-armed.
                        go.loot_state = LootState::Ready;
                    }
                }
            }
            GoData::Chest { .. } => {
                if go.close_at != 0 && ctx.now_millis >= go.close_at {
                    go.loot_state = LootState::JustDeactivated;
                }
            }
            GoData::CapturePoint {
                radius,
                capture_min_secs,
                capture_max_secs,
                max_superiority,
                neutral_percent,
            } => {
                let tuning = CaptureTuning {
                    radius: *radius,
                    min_capture_secs: *capture_min_secs,
                    max_capture_secs: *capture_max_secs,
                    max_superiority: *max_superiority,
                    neutral_percent: *neutral_percent,
                };
                let nearby = ctx.players_in_radius(&position, tuning.radius);
                if let Some(capture) = &mut go.capture
                    && let Some(new_state) = capture.advance(ctx.dt_millis, &tuning, &nearby)
                {
                    ctx.hooks.on_capture_transition(guid, new_state);
                }
            }
            _ => {}
        },
        LootState::JustDeactivated => {
            deactivate(ent, template, ctx);
        }
    }
}

/// One-shot cleanup after deactivation: post-use effects, state reset, then
/// deletion or the next respawn. Runs exactly once per activation cycle.
fn deactivate(ent: &mut Entity, template: &GameObjectTemplate, ctx: &mut WorldCtx) {
    let guid = ent.guid;
    let EntityKind::GameObject(go) = &mut ent.kind else {
        return;
    };

    // Goobers cast their spell on every unique user on the way out.
    if let GoData::Goober { spell_id, .. } = &template.data
        && *spell_id != 0
    {
        if ctx.content.spell(*spell_id).is_ok() {
            for user in &go.unique_users {
                if ctx.players.contains_key(user) {
                    ctx.spells.cast_spell(guid, *spell_id, *user, true);
                }
            }
        } else {
            tracing::warn!("Goober {} references unknown spell {spell_id}", template.entry);
        }
    }

    // A deactivating capture point releases its contest.
    if let Some(capture) = &mut go.capture {
        capture.contesters.clear();
    }

    go.go_state = GoState::Ready;
    go.flags.remove(GameObjectFlags::IN_USE);
    go.unique_users.clear();
    go.loot_available = false;
    go.close_at = 0;

    let Some(spawn_id) = ent.spawn_id else {
        // Ephemeral object with no spawn data; nothing will ever bring it
        // back, so it is deleted outright.
        ent.pending_delete = true;
        return;
    };

    go.loot_state = LootState::Ready;
    if go.respawn.default_delay_secs > 0 {
        let due_at = ctx.now_secs() + go.respawn.default_delay_secs;
        go.respawn.due_at = due_at;
        go.spawned = false;
        ctx.timers
            .schedule(ctx.store, TimerKind::Respawn, spawn_id, due_at);
    }
    ctx.hooks
        .on_state_changed(guid, StateChange::Loot(LootState::Ready));
}

fn first_trap_victim(
    ctx: &WorldCtx,
    center: &Position,
    radius: f32,
    hostile_to: Option<Faction>,
) -> Option<ObjectGuid> {
    ctx.players
        .values()
        .find(|player| {
            player.position.distance2d(center) <= radius
                && hostile_to.is_none_or(|faction| player.faction == faction.opposite())
        })
        .map(|player| player.guid)
}

/// Fires a trap at a victim: cast, cooldown, charge accounting. Shared by
/// the proximity scan and the explicit linked-trigger path.
pub(crate) fn fire_trap(
    go: &mut GameObjectState,
    guid: ObjectGuid,
    spell_id: u32,
    cooldown_secs: u64,
    victim: ObjectGuid,
    ctx: &mut WorldCtx,
) {
    if spell_id != 0 {
        if ctx.content.spell(spell_id).is_ok() {
            ctx.spells.cast_spell(guid, spell_id, victim, true);
        } else {
            tracing::warn!("Trap {guid} references unknown spell {spell_id}");
            return;
        }
    }

    if go.charges > 0 {
        go.charges -= 1;
    }
    go.unique_users.insert(victim);
    go.use_count += 1;
    go.loot_state = LootState::Activated;
    go.close_at = ctx.now_millis + cooldown_secs.max(1) * 1000;
    ctx.hooks
        .on_state_changed(guid, StateChange::Loot(LootState::Activated));
}
