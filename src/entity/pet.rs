//! Pet lifecycle and spellbook bookkeeping.
//!
//! A pet's owner reference is weak: the owner is looked up fresh every tick
//! and an unresolvable owner is not an error, it is an unsummon condition.
//! The spellbook tracks per-spell database dirtiness so a save only has to
//! consider what actually changed.

use std::collections::HashMap;

use crate::common::{ObjectGuid, SpellId};
use crate::content::CreatureTemplate;
use crate::entity::{DeathState, Entity, EntityKind};
use crate::hooks::StateChange;
use crate::persistence::{PetRecord, PetSpellRecord};
use crate::stats::{PetKind, Stat, StatSheet, UnitKind};
use crate::world::WorldCtx;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveState {
    Enabled,
    Disabled,
}

/// Database dirtiness of one spellbook entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PetSpellState {
    Unchanged,
    Changed,
    New,
    Removed,
}

#[derive(Debug, Clone, Copy)]
pub struct PetSpell {
    pub active: ActiveState,
    pub state: PetSpellState,
}

#[derive(Debug)]
pub struct PetState {
    pub owner: ObjectGuid,
    /// Stable persistence key; survives the entity instance.
    pub pet_number: u32,
    pub death_state: DeathState,
    pub level: u32,
    pub experience: u32,
    pub loyalty: u32,
    pub health: f32,
    pub mana: f32,
    pub sheet: StatSheet,
    pub spells: HashMap<SpellId, PetSpell>,
    /// Consecutive ticks the owner failed to resolve. One tick of grace is
    /// allowed for cross-map transfers.
    owner_missing_ticks: u8,
    /// Millisecond deadline for corpse decay.
    corpse_until: u64,
}

impl PetState {
    pub fn new(
        owner: ObjectGuid,
        pet_number: u32,
        template: &CreatureTemplate,
        pet_kind: PetKind,
    ) -> Self {
        let mut sheet = StatSheet::new(UnitKind::Pet(pet_kind), template.level, template.base_stats);
        sheet.base_health = template.base_health;
        sheet.base_mana = template.base_mana;

        Self {
            owner,
            pet_number,
            death_state: DeathState::Alive,
            level: template.level,
            experience: 0,
            loyalty: 1,
            health: template.base_health,
            mana: template.base_mana,
            sheet,
            spells: HashMap::new(),
            owner_missing_ticks: 0,
            corpse_until: 0,
        }
    }

    pub fn from_record(
        record: &PetRecord,
        template: &CreatureTemplate,
        pet_kind: PetKind,
    ) -> Self {
        let mut pet = Self::new(ObjectGuid(record.owner), record.pet_number, template, pet_kind);
        pet.level = record.level;
        pet.experience = record.experience;
        pet.loyalty = record.loyalty;
        pet.health = record.health;
        pet.mana = record.mana;
        for spell in &record.spells {
            pet.spells.insert(
                spell.spell_id,
                PetSpell {
                    active: if spell.active {
                        ActiveState::Enabled
                    } else {
                        ActiveState::Disabled
                    },
                    state: PetSpellState::Unchanged,
                },
            );
        }
        pet
    }

    pub fn learn_spell(&mut self, spell_id: SpellId) {
        match self.spells.get_mut(&spell_id) {
            // Re-learning a spell that was pending removal just flips it
            // back to a plain update.
            Some(spell) if spell.state == PetSpellState::Removed => {
                spell.state = PetSpellState::Changed;
            }
            Some(_) => {}
            None => {
                self.spells.insert(
                    spell_id,
                    PetSpell {
                        active: ActiveState::Enabled,
                        state: PetSpellState::New,
                    },
                );
            }
        }
    }

    pub fn unlearn_spell(&mut self, spell_id: SpellId) {
        match self.spells.get_mut(&spell_id) {
            // Never persisted; forget it entirely.
            Some(spell) if spell.state == PetSpellState::New => {
                self.spells.remove(&spell_id);
            }
            Some(spell) => spell.state = PetSpellState::Removed,
            None => {}
        }
    }

    pub fn toggle_autocast(&mut self, spell_id: SpellId, enabled: bool) {
        if let Some(spell) = self.spells.get_mut(&spell_id) {
            let active = if enabled {
                ActiveState::Enabled
            } else {
                ActiveState::Disabled
            };
            if spell.active != active {
                spell.active = active;
                if spell.state == PetSpellState::Unchanged {
                    spell.state = PetSpellState::Changed;
                }
            }
        }
    }

    /// Snapshot for persistence. Spells pending removal are dropped from the
    /// record, everything else is written out.
    pub fn to_record(&self, entry: u32) -> PetRecord {
        let mut spells: Vec<PetSpellRecord> = self
            .spells
            .iter()
            .filter(|(_, spell)| spell.state != PetSpellState::Removed)
            .map(|(spell_id, spell)| PetSpellRecord {
                spell_id: *spell_id,
                active: spell.active == ActiveState::Enabled,
            })
            .collect();
        spells.sort_by_key(|spell| spell.spell_id);

        PetRecord {
            pet_number: self.pet_number,
            entry,
            owner: self.owner.0,
            level: self.level,
            experience: self.experience,
            loyalty: self.loyalty,
            health: self.health,
            mana: self.mana,
            spells,
        }
    }

    /// Settles spellbook dirtiness after a successful save.
    pub fn flush_spells(&mut self) {
        self.spells
            .retain(|_, spell| spell.state != PetSpellState::Removed);
        for spell in self.spells.values_mut() {
            spell.state = PetSpellState::Unchanged;
        }
    }

    pub fn give_experience(&mut self, amount: u32) {
        self.experience += amount;
        while self.experience >= self.next_level_experience() {
            self.experience -= self.next_level_experience();
            self.level += 1;
            self.sheet.level = self.level;
        }
    }

    fn next_level_experience(&self) -> u32 {
        self.level * self.level * 50
    }

    pub fn apply_damage(&mut self, amount: f32, attacker: ObjectGuid) {
        // Damage without a valid attacker is a caller bug, not a world
        // state; contain it to this entity in release builds.
        debug_assert!(attacker.is_valid(), "pet damaged without a valid attacker");
        if !attacker.is_valid() {
            return;
        }

        self.health -= amount;
        if self.health <= 0.0 {
            self.health = 0.0;
            self.death_state = DeathState::Corpse;
        }
    }
}

pub(super) fn update(ent: &mut Entity, ctx: &mut WorldCtx) {
    let guid = ent.guid;
    let position = ent.position;
    let EntityKind::Pet(pet) = &mut ent.kind else {
        return;
    };

    match pet.death_state {
        DeathState::Alive => {
            let Some(owner) = ctx.players.get(&pet.owner) else {
                pet.owner_missing_ticks += 1;
                if pet.owner_missing_ticks > 1 {
                    tracing::info!("Pet {guid} lost its owner, unsummoning");
                    unsummon(ent, ctx);
                }
                return;
            };
            pet.owner_missing_ticks = 0;

            if owner.pet != Some(guid) {
                // Ownership moved to another pet.
                unsummon(ent, ctx);
                return;
            }

            if owner.position.distance3d(&position) > ctx.config.pet_leash_yards {
                unsummon(ent, ctx);
            }
        }
        DeathState::Corpse => {
            if pet.corpse_until == 0 {
                pet.corpse_until = ctx.now_millis + ctx.config.corpse_decay_secs * 1000;
                ctx.hooks
                    .on_state_changed(guid, StateChange::Death(DeathState::Corpse));
            } else if ctx.now_millis >= pet.corpse_until {
                pet.death_state = DeathState::Dead;
            }
        }
        DeathState::Dead => {
            ctx.hooks
                .on_state_changed(guid, StateChange::Death(DeathState::Dead));
            unsummon(ent, ctx);
        }
    }
}

/// Graceful removal: persist the last-known record, detach from the owner,
/// flag for deletion. Never an error path.
pub(crate) fn unsummon(ent: &mut Entity, ctx: &mut WorldCtx) {
    let guid = ent.guid;
    let entry = ent.entry;
    let EntityKind::Pet(pet) = &mut ent.kind else {
        return;
    };

    match ctx.store.save_pet(&pet.to_record(entry)) {
        Ok(()) => pet.flush_spells(),
        Err(err) => tracing::warn!("Failed to persist pet {}: {err}", pet.pet_number),
    }

    if let Some(owner) = ctx.players.get_mut(&pet.owner)
        && owner.pet == Some(guid)
    {
        owner.pet = None;
    }

    ent.pending_delete = true;
}

/// Owner stat changes flow into the pet through this; stamina and intellect
/// are the propagating stats.
pub fn propagate_owner_stat(pet: &mut PetState, stat: Stat, owner_sheet: &StatSheet) {
    if stat.propagates_to_pet() {
        pet.sheet.update_stat(stat, Some(owner_sheet));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Faction, INVALID_GUID};

    fn wolf() -> CreatureTemplate {
        CreatureTemplate {
            entry: 200,
            name: "Timber Wolf".to_string(),
            level: 5,
            base_health: 100.0,
            base_mana: 0.0,
            faction: Faction::Alliance,
            base_stats: [10.0; 5],
        }
    }

    fn spell_state(pet: &PetState, spell_id: SpellId) -> PetSpellState {
        pet.spells[&spell_id].state
    }

    #[test]
    fn spellbook_tracks_database_dirtiness() {
        let mut pet = PetState::new(ObjectGuid(1), 1, &wolf(), PetKind::Hunter);

        pet.learn_spell(10);
        assert_eq!(spell_state(&pet, 10), PetSpellState::New);

        // Unlearning a never-persisted spell forgets it outright.
        pet.unlearn_spell(10);
        assert!(!pet.spells.contains_key(&10));

        pet.learn_spell(11);
        pet.flush_spells();
        assert_eq!(spell_state(&pet, 11), PetSpellState::Unchanged);

        pet.toggle_autocast(11, false);
        assert_eq!(spell_state(&pet, 11), PetSpellState::Changed);
        // Toggling to the current value is not a change.
        pet.flush_spells();
        pet.toggle_autocast(11, false);
        assert_eq!(spell_state(&pet, 11), PetSpellState::Unchanged);

        pet.unlearn_spell(11);
        assert_eq!(spell_state(&pet, 11), PetSpellState::Removed);

        // Re-learning a spell pending removal is just an update again.
        pet.learn_spell(11);
        assert_eq!(spell_state(&pet, 11), PetSpellState::Changed);
    }

    #[test]
    fn record_drops_removed_spells_and_flush_settles() {
        let mut pet = PetState::new(ObjectGuid(1), 1, &wolf(), PetKind::Hunter);
        pet.learn_spell(10);
        pet.learn_spell(11);
        pet.flush_spells();

        pet.toggle_autocast(11, false);
        pet.unlearn_spell(10);

        let record = pet.to_record(200);
        assert_eq!(
            record.spells,
            vec![PetSpellRecord {
                spell_id: 11,
                active: false,
            }]
        );

        pet.flush_spells();
        assert!(!pet.spells.contains_key(&10));
        assert_eq!(spell_state(&pet, 11), PetSpellState::Unchanged);
    }

    #[test]
    fn lethal_damage_leaves_a_corpse() {
        let mut pet = PetState::new(ObjectGuid(1), 1, &wolf(), PetKind::Hunter);

        pet.apply_damage(40.0, ObjectGuid(5));
        assert_eq!(pet.death_state, DeathState::Alive);

        pet.apply_damage(500.0, ObjectGuid(5));
        assert_eq!(pet.health, 0.0);
        assert_eq!(pet.death_state, DeathState::Corpse);
    }

    #[test]
    #[should_panic]
    fn damage_without_an_attacker_is_a_bug() {
        let mut pet = PetState::new(ObjectGuid(1), 1, &wolf(), PetKind::Hunter);
        pet.apply_damage(5.0, INVALID_GUID);
    }
}
