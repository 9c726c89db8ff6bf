//! "Use" interaction dispatch.
//!
//! One entry point resolves a use action into exactly one type-specific
//! behavior, looked up by the template's game object type. Content problems
//! are warnings and abort the single interaction; nothing here unwinds the
//! tick loop.

use crate::common::{ObjectGuid, Position, SpellId};
use crate::entity::fire_trap;
use crate::entity::{Entity, EntityKind, GameObjectFlags, GoState, LootState};
use crate::hooks::StateChange;
use crate::persistence::TimerKind;
use crate::world::WorldCtx;

use crate::content::GoData;

/// How long a looted chest stays open before it deactivates.
const CHEST_CLOSE_MILLIS: u64 = 60_000;
/// Use cooldown applied to goobers and spell casters.
const USE_COOLDOWN_SECS: u64 = 3;

pub fn dispatch_use(ent: &mut Entity, actor: ObjectGuid, ctx: &mut WorldCtx) {
    let content = ctx.content;
    let template = match content.gameobject(ent.entry) {
        Ok(template) => template,
        Err(err) => {
            tracing::warn!("Use on {}: {err}", ent.guid);
            return;
        }
    };

    let guid = ent.guid;
    let position = ent.position;
    let spawn_id = ent.spawn_id;
    let EntityKind::GameObject(go) = &mut ent.kind else {
        // Pets and totems have no use behavior.
        return;
    };

    if !go.spawned || go.on_cooldown(ctx.now_millis) {
        return;
    }

    // Scripts get first refusal.
    if ctx.hooks.on_use(guid, actor) {
        return;
    }

    // Every behavior is player-only.
    let Some(player) = ctx.players.get(&actor) else {
        tracing::warn!("Use on {} by non-player actor {actor}", template.name);
        return;
    };
    let actor_group = player.group_id;
    let actor_level = player.sheet.level;
    let actor_position = player.position;

    match &template.data {
        GoData::Door {
            auto_close_millis,
            linked_trap,
            ..
        }
        | GoData::Button {
            auto_close_millis,
            linked_trap,
            ..
        } => {
            if go.loot_state != LootState::Ready {
                return;
            }
            go.loot_state = LootState::Activated;
            go.go_state = GoState::Active;
            go.use_count += 1;
            if *auto_close_millis > 0 {
                go.close_at = ctx.now_millis + auto_close_millis;
            }
            ctx.hooks
                .on_state_changed(guid, StateChange::Loot(LootState::Activated));
            trigger_linked_trap(ctx, *linked_trap, &position, actor);
        }
        GoData::QuestGiver { gossip_id } => {
            ctx.hooks.on_gossip(guid, actor, *gossip_id);
        }
        GoData::Chest {
            restock_secs,
            quest_id,
            linked_trap,
            ..
        } => {
            if go.loot_state != LootState::Ready || !go.loot_available {
                return;
            }
            go.loot_state = LootState::Activated;
            go.flags.insert(GameObjectFlags::IN_USE);
            go.unique_users.insert(actor);
            go.use_count += 1;
            go.loot_available = false;
            go.close_at = ctx.now_millis + CHEST_CLOSE_MILLIS;
            if *restock_secs > 0 {
                go.restock_at = ctx.now_secs() + restock_secs;
            }
            if *quest_id != 0 {
                // Quest credit is the scripting layer's concern.
                ctx.hooks.on_game_event(guid, *quest_id);
            }
            ctx.hooks
                .on_state_changed(guid, StateChange::Loot(LootState::Activated));
            trigger_linked_trap(ctx, *linked_trap, &position, actor);
        }
        GoData::Trap {
            spell_id,
            cooldown_secs,
            charges,
            ..
        } => {
            // The explicit trigger path; the only one battleground traps
            // ever take.
            if go.loot_state != LootState::Ready {
                return;
            }
            if *charges > 0 && go.charges == 0 {
                return;
            }
            fire_trap(go, guid, *spell_id, *cooldown_secs, actor, ctx);
        }
        GoData::Chair { height, .. } => {
            let seat = Position {
                z: position.z + *height as f32 * 0.5,
                ..position
            };
            if let Some(player) = ctx.players.get_mut(&actor) {
                player.position = seat;
            }
        }
        GoData::SpellFocus { .. } => {
            // Passive; it matters to spell casting checks, not to "use".
        }
        GoData::Text { page_id } => {
            ctx.hooks.on_gossip(guid, actor, *page_id);
        }
        GoData::Goober {
            spell_id,
            auto_close_millis,
            quest_id,
            event_id,
        } => {
            if go.loot_state != LootState::Ready {
                return;
            }
            if *spell_id != 0 && ctx.content.spell(*spell_id).is_err() {
                tracing::warn!("Goober {} references unknown spell {spell_id}", template.entry);
                return;
            }
            go.loot_state = LootState::Activated;
            go.go_state = GoState::Active;
            go.flags.insert(GameObjectFlags::IN_USE);
            go.unique_users.insert(actor);
            go.use_count += 1;
            go.close_at = ctx.now_millis + (*auto_close_millis).max(1000);
            set_cooldown(go, spawn_id, USE_COOLDOWN_SECS, ctx);
            if *event_id != 0 {
                ctx.hooks.on_game_event(guid, *event_id);
            }
            if *quest_id != 0 {
                ctx.hooks.on_game_event(guid, *quest_id);
            }
            ctx.hooks
                .on_state_changed(guid, StateChange::Loot(LootState::Activated));
        }
        GoData::Transport { .. } => {
            go.go_state = match go.go_state {
                GoState::Active => GoState::Ready,
                _ => GoState::ActiveAlternative,
            };
        }
        GoData::Camera { cinematic_id } => {
            if *cinematic_id != 0 {
                ctx.hooks.on_game_event(guid, *cinematic_id);
            }
        }
        GoData::FishingNode {} => match go.loot_state {
            // Hooked during the catch window.
            LootState::Ready => {
                go.loot_state = LootState::Activated;
                go.loot_available = true;
                go.unique_users.insert(actor);
                ctx.hooks
                    .on_state_changed(guid, StateChange::Loot(LootState::Activated));
            }
            // Pulled too early; the bobber is wasted.
            LootState::NotReady => {
                go.loot_state = LootState::JustDeactivated;
            }
            _ => {}
        },
        GoData::SummoningRitual {
            required_participants,
            spell_id,
        } => {
            let Some(owner_guid) = go.owner else {
                return;
            };
            let Some(owner) = ctx.players.get(&owner_guid) else {
                return;
            };
            // Only the summoner's group may channel.
            if owner_guid != actor && (actor_group.is_none() || actor_group != owner.group_id) {
                return;
            }
            go.unique_users.insert(actor);
            if go.unique_users.len() as u32 >= *required_participants {
                if ctx.content.spell(*spell_id).is_ok() {
                    ctx.spells.cast_spell(owner_guid, *spell_id, owner_guid, false);
                } else {
                    tracing::warn!(
                        "Summoning ritual {} references unknown spell {spell_id}",
                        template.entry
                    );
                }
                go.loot_state = LootState::JustDeactivated;
            }
        }
        GoData::Mailbox {} => {
            ctx.hooks.on_gossip(guid, actor, 0);
        }
        GoData::GuardPost {} => {}
        GoData::SpellCaster { spell_id, charges } => {
            if *charges > 0 && go.charges == 0 {
                return;
            }
            if cast_checked(ctx, guid, *spell_id, actor, false, template.entry) {
                if go.charges > 0 {
                    go.charges -= 1;
                }
                go.use_count += 1;
                set_cooldown(go, spawn_id, USE_COOLDOWN_SECS, ctx);
                if *charges > 0 && go.charges == 0 {
                    go.loot_state = LootState::JustDeactivated;
                }
            }
        }
        GoData::MeetingStone {
            min_level,
            max_level,
            spell_id,
        } => {
            if actor_level < *min_level || (*max_level > 0 && actor_level > *max_level) {
                return;
            }
            cast_checked(ctx, guid, *spell_id, actor, false, template.entry);
        }
        GoData::FlagStand {
            pickup_spell,
            event_id,
        } => {
            if cast_checked(ctx, guid, *pickup_spell, actor, true, template.entry) {
                go.unique_users.insert(actor);
                if *event_id != 0 {
                    ctx.hooks.on_game_event(guid, *event_id);
                }
            }
        }
        GoData::FishingHole {
            max_success_opens, ..
        } => {
            go.use_count += 1;
            go.unique_users.insert(actor);
            if *max_success_opens > 0 && go.use_count >= *max_success_opens {
                // Fished out.
                go.loot_state = LootState::JustDeactivated;
            }
        }
        GoData::FlagDrop { event_id } => {
            if *event_id != 0 {
                ctx.hooks.on_game_event(guid, *event_id);
            }
            // Picking up a dropped flag consumes it.
            go.loot_state = LootState::JustDeactivated;
        }
        GoData::CapturePoint { radius, .. } => {
            if actor_position.distance2d(&position) <= *radius
                && let Some(capture) = &mut go.capture
            {
                capture.contesters.insert(actor);
            }
        }
        GoData::AuraGenerator { aura_spell, .. } => {
            cast_checked(ctx, guid, *aura_spell, actor, true, template.entry);
        }
        GoData::Generic {} => {}
    }
}

/// Validates the spell against the content tables before handing it to the
/// executor. Returns whether the cast was issued.
fn cast_checked(
    ctx: &mut WorldCtx,
    caster: ObjectGuid,
    spell_id: SpellId,
    target: ObjectGuid,
    triggered: bool,
    entry: u32,
) -> bool {
    if spell_id == 0 {
        return false;
    }
    if ctx.content.spell(spell_id).is_err() {
        tracing::warn!("Game object {entry} references unknown spell {spell_id}");
        return false;
    }
    ctx.spells.cast_spell(caster, spell_id, target, triggered);
    true
}

fn set_cooldown(
    go: &mut crate::entity::GameObjectState,
    spawn_id: Option<crate::common::SpawnId>,
    cooldown_secs: u64,
    ctx: &mut WorldCtx,
) {
    go.cooldown_until = ctx.now_millis + cooldown_secs * 1000;
    if let Some(spawn_id) = spawn_id {
        let due_secs = ctx.now_secs() + cooldown_secs;
        ctx.timers
            .schedule(ctx.store, TimerKind::Cooldown, spawn_id, due_secs);
    }
}

/// Fires the trap linked to a door, button or chest at the actor who tripped
/// it. The trap is its own entity, found by template entry near the trigger.
fn trigger_linked_trap(ctx: &mut WorldCtx, entry: u32, center: &Position, actor: ObjectGuid) {
    if entry == 0 {
        return;
    }

    const LINKED_TRAP_RANGE: f32 = 10.0;

    let trap_guid = ctx
        .entities
        .iter()
        .find(|(_, ent)| {
            ent.entry == entry
                && matches!(ent.kind, EntityKind::GameObject(_))
                && ent.position.distance2d(center) <= LINKED_TRAP_RANGE
        })
        .map(|(guid, _)| *guid);

    let Some(trap_guid) = trap_guid else {
        return;
    };
    let Some(mut trap) = ctx.entities.remove(&trap_guid) else {
        return;
    };

    if let Ok(template) = ctx.content.gameobject(trap.entry)
        && let GoData::Trap {
            spell_id,
            cooldown_secs,
            charges,
            ..
        } = template.data
        && let EntityKind::GameObject(go) = &mut trap.kind
        && go.loot_state == LootState::Ready
        && (charges == 0 || go.charges > 0)
    {
        fire_trap(go, trap_guid, spell_id, cooldown_secs, actor, ctx);
    }

    ctx.entities.insert(trap_guid, trap);
}
