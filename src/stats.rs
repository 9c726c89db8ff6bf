//! Derived-stat recomputation.
//!
//! Nothing here caches a derived value across mutations: every recompute
//! starts from the base value and replays the modifier ledgers, so a derived
//! stat can never drift from its inputs. Callers mutate ledgers, then ask
//! for the dependent stats of whatever changed and recompute exactly those.

use serde::{Deserialize, Serialize};

use crate::common::ObjectGuid;

pub const STAT_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stat {
    Strength,
    Agility,
    Stamina,
    Intellect,
    Spirit,
}

impl Stat {
    pub const ALL: [Stat; STAT_COUNT] = [
        Stat::Strength,
        Stat::Agility,
        Stat::Stamina,
        Stat::Intellect,
        Stat::Spirit,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Stamina and intellect changes on an owner flow into the active pet.
    pub fn propagates_to_pet(&self) -> bool {
        matches!(self, Stat::Stamina | Stat::Intellect)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedStat {
    Armor,
    MaxHealth,
    MaxMana,
    CritChance,
    DodgeChance,
    SpellCritChance,
    MeleeAttackPower,
    RangedAttackPower,
    SpellBonus,
    ManaRegen,
}

/// Fixed dependency edges from a base stat to the derived stats that must be
/// recomputed when it changes. Attack power, spell bonus and mana regen are
/// recomputed on every stat change.
pub fn dependent_stats(stat: Stat) -> &'static [DerivedStat] {
    use DerivedStat::*;
    match stat {
        Stat::Strength => &[MeleeAttackPower, RangedAttackPower, SpellBonus, ManaRegen],
        Stat::Agility => &[
            Armor,
            CritChance,
            DodgeChance,
            MeleeAttackPower,
            RangedAttackPower,
            SpellBonus,
            ManaRegen,
        ],
        Stat::Stamina => &[
            MaxHealth,
            MeleeAttackPower,
            RangedAttackPower,
            SpellBonus,
            ManaRegen,
        ],
        Stat::Intellect => &[
            MaxMana,
            SpellCritChance,
            Armor,
            MeleeAttackPower,
            RangedAttackPower,
            SpellBonus,
            ManaRegen,
        ],
        Stat::Spirit => &[MeleeAttackPower, RangedAttackPower, SpellBonus, ManaRegen],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PetKind {
    Hunter,
    Warlock,
    Generic,
}

impl PetKind {
    /// Fraction of the owner's armor and resistances granted to the pet.
    fn owner_armor_scale(&self) -> f32 {
        match self {
            PetKind::Hunter => 0.35,
            PetKind::Warlock => 0.40,
            PetKind::Generic => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Player,
    Creature,
    Pet(PetKind),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModifierKind {
    BaseValue,
    BasePct,
    TotalValue,
    TotalPct,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatModifier {
    /// The aura or item the modifier came from, so it can be withdrawn.
    pub source: ObjectGuid,
    pub kind: ModifierKind,
    pub amount: f32,
}

/// Explicit list of (source, kind, amount) modifiers. Evaluated fresh on
/// every recompute; never collapsed into a cached field.
#[derive(Debug, Clone, Default)]
pub struct ModifierLedger {
    entries: Vec<StatModifier>,
}

impl ModifierLedger {
    pub fn add(&mut self, modifier: StatModifier) {
        self.entries.push(modifier);
    }

    pub fn remove_source(&mut self, source: ObjectGuid) {
        self.entries.retain(|entry| entry.source != source);
    }

    /// `((base * basePct) + totalValue) * totalPct`, with percentage
    /// modifiers stacking multiplicatively.
    pub fn value(&self, base: f32) -> f32 {
        let mut base_value = base;
        let mut base_pct = 1.0;
        let mut total_value = 0.0;
        let mut total_pct = 1.0;

        for entry in &self.entries {
            match entry.kind {
                ModifierKind::BaseValue => base_value += entry.amount,
                ModifierKind::BasePct => base_pct *= 1.0 + entry.amount / 100.0,
                ModifierKind::TotalValue => total_value += entry.amount,
                ModifierKind::TotalPct => total_pct *= 1.0 + entry.amount / 100.0,
            }
        }

        ((base_value * base_pct) + total_value) * total_pct
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedValues {
    pub armor: f32,
    pub max_health: f32,
    pub max_mana: f32,
    pub crit_chance: f32,
    pub dodge_chance: f32,
    pub spell_crit_chance: f32,
    pub melee_attack_power: f32,
    pub ranged_attack_power: f32,
    pub spell_bonus: f32,
    pub mana_regen: f32,
}

#[derive(Debug, Clone)]
pub struct StatSheet {
    pub kind: UnitKind,
    pub level: u32,
    pub base_stats: [f32; STAT_COUNT],
    pub stat_ledgers: [ModifierLedger; STAT_COUNT],
    pub base_health: f32,
    pub base_mana: f32,
    pub base_armor: f32,
    pub armor_ledger: ModifierLedger,
    pub health_ledger: ModifierLedger,
    pub mana_ledger: ModifierLedger,
    pub attack_power_ledger: ModifierLedger,
    pub spell_bonus_ledger: ModifierLedger,
    pub derived: DerivedValues,
}

impl StatSheet {
    pub fn new(kind: UnitKind, level: u32, base_stats: [f32; STAT_COUNT]) -> Self {
        Self {
            kind,
            level,
            base_stats,
            stat_ledgers: Default::default(),
            base_health: 0.0,
            base_mana: 0.0,
            base_armor: 0.0,
            armor_ledger: ModifierLedger::default(),
            health_ledger: ModifierLedger::default(),
            mana_ledger: ModifierLedger::default(),
            attack_power_ledger: ModifierLedger::default(),
            spell_bonus_ledger: ModifierLedger::default(),
            derived: DerivedValues::default(),
        }
    }

    /// Current total of a base stat: ledger over base, plus the owner
    /// contribution for pets (30% of owner stamina and intellect).
    pub fn stat(&self, stat: Stat, owner: Option<&StatSheet>) -> f32 {
        let mut total = self.stat_ledgers[stat.index()].value(self.base_stats[stat.index()]);

        if let (UnitKind::Pet(_), Some(owner)) = (self.kind, owner) {
            match stat {
                Stat::Stamina => total += 0.30 * owner.stat(Stat::Stamina, None),
                Stat::Intellect => total += 0.30 * owner.stat(Stat::Intellect, None),
                _ => {}
            }
        }

        total
    }

    /// Recomputes every derived stat that depends on `stat`.
    pub fn update_stat(&mut self, stat: Stat, owner: Option<&StatSheet>) {
        for derived in dependent_stats(stat) {
            self.update_derived(*derived, owner);
        }
    }

    pub fn update_all_stats(&mut self, owner: Option<&StatSheet>) {
        for stat in Stat::ALL {
            self.update_stat(stat, owner);
        }
    }

    fn update_derived(&mut self, derived: DerivedStat, owner: Option<&StatSheet>) {
        match derived {
            DerivedStat::Armor => {
                let mut base = self.base_armor + 2.0 * self.stat(Stat::Agility, owner);
                if let (UnitKind::Pet(pet_kind), Some(owner)) = (self.kind, owner) {
                    base += pet_kind.owner_armor_scale() * owner.derived.armor;
                }
                self.derived.armor = self.armor_ledger.value(base);
            }
            DerivedStat::MaxHealth => {
                let stamina = self.stat(Stat::Stamina, owner);
                // The first 20 points of stamina grant one health each, the
                // rest ten.
                let from_stamina = stamina.min(20.0) + (stamina - 20.0).max(0.0) * 10.0;
                self.derived.max_health = self.health_ledger.value(self.base_health + from_stamina);
            }
            DerivedStat::MaxMana => {
                let intellect = self.stat(Stat::Intellect, owner);
                let from_intellect = intellect.min(20.0) + (intellect - 20.0).max(0.0) * 15.0;
                self.derived.max_mana = self.mana_ledger.value(self.base_mana + from_intellect);
            }
            DerivedStat::CritChance => {
                self.derived.crit_chance = 5.0 + self.stat(Stat::Agility, owner) / 20.0;
            }
            DerivedStat::DodgeChance => {
                self.derived.dodge_chance = 5.0 + self.stat(Stat::Agility, owner) / 20.0;
            }
            DerivedStat::SpellCritChance => {
                self.derived.spell_crit_chance = 3.0 + self.stat(Stat::Intellect, owner) / 80.0;
            }
            DerivedStat::MeleeAttackPower => {
                let base = 2.0 * self.stat(Stat::Strength, owner);
                self.derived.melee_attack_power = self.attack_power_ledger.value(base);
            }
            DerivedStat::RangedAttackPower => {
                let base = 2.0 * self.stat(Stat::Agility, owner);
                self.derived.ranged_attack_power = self.attack_power_ledger.value(base);
            }
            DerivedStat::SpellBonus => {
                self.derived.spell_bonus = self.spell_bonus_ledger.value(0.0);
            }
            DerivedStat::ManaRegen => {
                self.derived.mana_regen = 5.0 + self.stat(Stat::Spirit, owner) / 4.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_sheet() -> StatSheet {
        let mut sheet = StatSheet::new(UnitKind::Player, 60, [100.0, 80.0, 90.0, 70.0, 60.0]);
        sheet.base_health = 1000.0;
        sheet.base_mana = 800.0;
        sheet.base_armor = 50.0;
        sheet.update_all_stats(None);
        sheet
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut sheet = player_sheet();
        let first = sheet.derived.clone();

        sheet.update_all_stats(None);
        assert_eq!(sheet.derived, first);

        sheet.update_stat(Stat::Intellect, None);
        assert_eq!(sheet.derived, first);
    }

    #[test]
    fn agility_feeds_armor_crit_and_dodge() {
        let mut sheet = player_sheet();
        let before = sheet.derived.clone();

        sheet.stat_ledgers[Stat::Agility.index()].add(StatModifier {
            source: ObjectGuid(1),
            kind: ModifierKind::TotalValue,
            amount: 40.0,
        });
        sheet.update_stat(Stat::Agility, None);

        assert_eq!(sheet.derived.armor, before.armor + 80.0);
        assert_eq!(sheet.derived.crit_chance, before.crit_chance + 2.0);
        assert_eq!(sheet.derived.dodge_chance, before.dodge_chance + 2.0);
        assert_eq!(sheet.derived.ranged_attack_power, before.ranged_attack_power + 80.0);
        // Untouched edges stay put.
        assert_eq!(sheet.derived.max_health, before.max_health);
        assert_eq!(sheet.derived.max_mana, before.max_mana);
    }

    #[test]
    fn ledger_applies_base_and_total_percentages() {
        let mut ledger = ModifierLedger::default();
        ledger.add(StatModifier {
            source: ObjectGuid(1),
            kind: ModifierKind::BaseValue,
            amount: 10.0,
        });
        ledger.add(StatModifier {
            source: ObjectGuid(2),
            kind: ModifierKind::BasePct,
            amount: 50.0,
        });
        ledger.add(StatModifier {
            source: ObjectGuid(3),
            kind: ModifierKind::TotalValue,
            amount: 5.0,
        });
        ledger.add(StatModifier {
            source: ObjectGuid(4),
            kind: ModifierKind::TotalPct,
            amount: 100.0,
        });

        // ((90 + 10) * 1.5 + 5) * 2
        assert_eq!(ledger.value(90.0), 310.0);

        ledger.remove_source(ObjectGuid(4));
        assert_eq!(ledger.value(90.0), 155.0);
    }

    #[test]
    fn pet_gains_owner_stamina_and_armor_share() {
        let owner = player_sheet();

        let mut pet = StatSheet::new(UnitKind::Pet(PetKind::Hunter), 60, [50.0, 40.0, 50.0, 30.0, 35.0]);
        pet.base_health = 500.0;
        pet.base_armor = 50.0;
        pet.update_all_stats(Some(&owner));

        let owner_stamina = owner.stat(Stat::Stamina, None);
        assert_eq!(pet.stat(Stat::Stamina, Some(&owner)), 50.0 + 0.30 * owner_stamina);

        let expected_armor = 50.0 + 2.0 * 40.0 + 0.35 * owner.derived.armor;
        assert_eq!(pet.derived.armor, expected_armor);

        // Warlock pets take a larger armor share.
        let mut imp = StatSheet::new(UnitKind::Pet(PetKind::Warlock), 60, [50.0, 40.0, 50.0, 30.0, 35.0]);
        imp.update_all_stats(Some(&owner));
        assert!(imp.derived.armor > 2.0 * 40.0);
    }

    #[test]
    fn dependency_edges_match_the_graph() {
        use DerivedStat::*;

        assert!(dependent_stats(Stat::Stamina).contains(&MaxHealth));
        assert!(!dependent_stats(Stat::Stamina).contains(&Armor));
        assert!(dependent_stats(Stat::Intellect).contains(&Armor));
        assert!(dependent_stats(Stat::Intellect).contains(&SpellCritChance));
        // Attack power and regen are recomputed for every stat.
        for stat in Stat::ALL {
            assert!(dependent_stats(stat).contains(&MeleeAttackPower));
            assert!(dependent_stats(stat).contains(&ManaRegen));
        }

        assert!(Stat::Stamina.propagates_to_pet());
        assert!(Stat::Intellect.propagates_to_pet());
        assert!(!Stat::Strength.propagates_to_pet());
    }
}
