//! The world container: entity registry, player registry and the tick loop.
//!
//! Entities are exclusively owned by the world. Cross-entity references are
//! guids resolved per access through the registry; nothing holds a live
//! handle across ticks. One `update` advances every entity sequentially —
//! nothing blocks, and per-entity failures never unwind the loop.

use std::collections::{HashMap, VecDeque};

use crate::common::{EntryId, Faction, ObjectGuid, PackedRotation, Position, SpawnId};
use crate::config::WorldConfig;
use crate::content::{ContentError, ContentTables};
use crate::entity::{Entity, EntityKind, GameObjectState, PetState, TotemState, propagate_owner_stat};
use crate::hooks::{ScriptHooks, SpellExecutor};
use crate::interaction;
use crate::persistence::{GameObjectRecord, PersistenceStore, TimerKind};
use crate::stats::{PetKind, Stat, StatModifier, StatSheet, UnitKind};
use crate::timers::{PersistentTimers, RespawnTimer};

/// A connected player character. Players are world-owned like entities but
/// live in their own registry; they have no transient-lifecycle state
/// machine.
#[derive(Debug)]
pub struct Player {
    pub guid: ObjectGuid,
    pub position: Position,
    pub faction: Faction,
    pub in_combat: bool,
    pub group_id: Option<u32>,
    pub sheet: StatSheet,
    pub pet: Option<ObjectGuid>,
}

impl Player {
    pub fn new(guid: ObjectGuid, position: Position, faction: Faction) -> Self {
        let mut sheet = StatSheet::new(UnitKind::Player, 1, [20.0; 5]);
        sheet.base_health = 100.0;
        sheet.base_mana = 100.0;
        sheet.update_all_stats(None);

        Self {
            guid,
            position,
            faction,
            in_combat: false,
            group_id: None,
            sheet,
            pet: None,
        }
    }
}

/// Everything an entity update is allowed to touch, with the entity itself
/// taken out of the registry for the duration of its update.
pub struct WorldCtx<'a> {
    pub now_millis: u64,
    pub dt_millis: u64,
    pub config: &'a WorldConfig,
    pub content: &'a ContentTables,
    pub players: &'a mut HashMap<ObjectGuid, Player>,
    pub entities: &'a mut HashMap<ObjectGuid, Entity>,
    pub timers: &'a mut PersistentTimers,
    pub store: &'a dyn PersistenceStore,
    pub hooks: &'a mut dyn ScriptHooks,
    pub spells: &'a mut dyn SpellExecutor,
}

impl WorldCtx<'_> {
    pub fn now_secs(&self) -> u64 {
        self.now_millis / 1000
    }

    pub fn players_in_radius(&self, center: &Position, radius: f32) -> Vec<(ObjectGuid, Faction)> {
        self.players
            .values()
            .filter(|player| player.position.distance2d(center) <= radius)
            .map(|player| (player.guid, player.faction))
            .collect()
    }
}

pub struct World {
    pub config: WorldConfig,
    content: ContentTables,
    entities: HashMap<ObjectGuid, Entity>,
    players: HashMap<ObjectGuid, Player>,
    timers: PersistentTimers,
    store: Box<dyn PersistenceStore>,
    hooks: Box<dyn ScriptHooks>,
    spells: Box<dyn SpellExecutor>,
    pending_use: VecDeque<(ObjectGuid, ObjectGuid)>,
    time_millis: u64,
}

impl World {
    pub fn new(
        config: WorldConfig,
        content: ContentTables,
        store: Box<dyn PersistenceStore>,
        hooks: Box<dyn ScriptHooks>,
        spells: Box<dyn SpellExecutor>,
    ) -> Self {
        let timers = PersistentTimers::load(store.as_ref());

        Self {
            config,
            content,
            entities: HashMap::new(),
            players: HashMap::new(),
            timers,
            store,
            hooks,
            spells,
            pending_use: VecDeque::new(),
            time_millis: 0,
        }
    }

    pub fn content(&self) -> &ContentTables {
        &self.content
    }

    pub fn find_entity(&self, guid: ObjectGuid) -> Option<&Entity> {
        self.entities.get(&guid)
    }

    pub fn find_entity_mut(&mut self, guid: ObjectGuid) -> Option<&mut Entity> {
        self.entities.get_mut(&guid)
    }

    pub fn add_entity(&mut self, entity: Entity) -> ObjectGuid {
        let guid = entity.guid;
        self.entities.insert(guid, entity);
        guid
    }

    pub fn remove_entity(&mut self, guid: ObjectGuid) -> Option<Entity> {
        self.entities.remove(&guid)
    }

    pub fn find_player(&self, guid: ObjectGuid) -> Option<&Player> {
        self.players.get(&guid)
    }

    pub fn find_player_mut(&mut self, guid: ObjectGuid) -> Option<&mut Player> {
        self.players.get_mut(&guid)
    }

    pub fn add_player(&mut self, player: Player) -> ObjectGuid {
        let guid = player.guid;
        self.players.insert(guid, player);
        guid
    }

    pub fn remove_player(&mut self, guid: ObjectGuid) -> Option<Player> {
        self.players.remove(&guid)
    }

    /// Units — players and owned creatures — within `radius`, filtered by
    /// `predicate`.
    pub fn find_units_in_radius(
        &self,
        center: &Position,
        radius: f32,
        predicate: impl Fn(ObjectGuid) -> bool,
    ) -> Vec<ObjectGuid> {
        let players = self
            .players
            .values()
            .filter(|p| p.position.distance2d(center) <= radius)
            .map(|p| p.guid);
        let creatures = self
            .entities
            .values()
            .filter(|e| matches!(e.kind, EntityKind::Pet(_) | EntityKind::Totem(_)))
            .filter(|e| e.position.distance2d(center) <= radius)
            .map(|e| e.guid);

        players.chain(creatures).filter(|guid| predicate(*guid)).collect()
    }

    /// Spawns a game object from its template. A `spawn_id` marks a static
    /// spawn point that respawns and persists; `None` is an ephemeral summon
    /// that deletes itself after one cycle.
    pub fn spawn_gameobject(
        &mut self,
        spawn_id: Option<SpawnId>,
        entry: EntryId,
        position: Position,
        rotation: PackedRotation,
        respawn_delay_secs: u64,
        spawned_by_default: bool,
    ) -> Result<ObjectGuid, ContentError> {
        let template = self.content.gameobject(entry)?;

        let respawn = RespawnTimer::new(respawn_delay_secs, spawned_by_default);
        let mut go = GameObjectState::new(template, self.time_millis, respawn);

        if let Some(spawn_id) = spawn_id {
            // Resume timers that survived a reload.
            if let Some(due_at) = self.timers.due_at(TimerKind::Respawn, spawn_id) {
                go.respawn.due_at = due_at;
                go.spawned = false;
            }
            if let Some(due_at) = self.timers.due_at(TimerKind::Cooldown, spawn_id) {
                go.cooldown_until = due_at * 1000;
            }

            let record = GameObjectRecord {
                spawn_id,
                entry,
                position,
                rotation,
                go_state: go.go_state,
                spawned_by_default,
                respawn_delay_secs,
            };
            if let Err(err) = self.store.save_gameobject(&record) {
                tracing::warn!("Failed to persist game object spawn {spawn_id}: {err}");
            }
        }

        let guid = ObjectGuid::generate();
        Ok(self.add_entity(Entity {
            guid,
            entry,
            spawn_id,
            position,
            rotation,
            kind: EntityKind::GameObject(go),
            pending_delete: false,
        }))
    }

    /// Respawns a persisted spawn point, typically at world start.
    pub fn spawn_gameobject_from_store(
        &mut self,
        spawn_id: SpawnId,
    ) -> Result<Option<ObjectGuid>, ContentError> {
        let record = match self.store.load_gameobject(spawn_id) {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(None),
            Err(err) => {
                tracing::warn!("Failed to load game object spawn {spawn_id}: {err}");
                return Ok(None);
            }
        };

        self.spawn_gameobject(
            Some(spawn_id),
            record.entry,
            record.position,
            record.rotation,
            record.respawn_delay_secs,
            record.spawned_by_default,
        )
        .map(Some)
    }

    /// Summons a pet for `owner`, resuming the persisted record for
    /// `pet_number` when one exists.
    pub fn summon_pet(
        &mut self,
        owner: ObjectGuid,
        entry: EntryId,
        pet_kind: PetKind,
        pet_number: u32,
    ) -> Result<ObjectGuid, ContentError> {
        let template = self.content.creature(entry)?;

        let mut pet = match self.store.load_pet(pet_number) {
            Ok(Some(record)) => {
                let mut pet = PetState::from_record(&record, template, pet_kind);
                pet.owner = owner;
                pet
            }
            Ok(None) => PetState::new(owner, pet_number, template, pet_kind),
            Err(err) => {
                tracing::warn!("Failed to load pet {pet_number}, starting fresh: {err}");
                PetState::new(owner, pet_number, template, pet_kind)
            }
        };

        let guid = ObjectGuid::generate();
        let position = match self.players.get_mut(&owner) {
            Some(player) => {
                player.pet = Some(guid);
                pet.sheet.update_all_stats(Some(&player.sheet));
                player.position
            }
            None => {
                // Summoning without a present owner is tolerated; the first
                // ticks of grace will resolve it one way or the other.
                pet.sheet.update_all_stats(None);
                Position::default()
            }
        };

        Ok(self.add_entity(Entity {
            guid,
            entry,
            spawn_id: None,
            position,
            rotation: PackedRotation::default(),
            kind: EntityKind::Pet(pet),
            pending_delete: false,
        }))
    }

    pub fn summon_totem(
        &mut self,
        owner: ObjectGuid,
        entry: EntryId,
        duration_millis: u64,
        spell: u32,
    ) -> Result<ObjectGuid, ContentError> {
        self.content.creature(entry)?;
        self.content.spell(spell)?;

        let position = self
            .players
            .get(&owner)
            .map(|player| player.position)
            .unwrap_or_default();

        let guid = ObjectGuid::generate();
        self.spells.cast_spell(guid, spell, owner, true);

        Ok(self.add_entity(Entity {
            guid,
            entry,
            spawn_id: None,
            position,
            rotation: PackedRotation::default(),
            kind: EntityKind::Totem(TotemState::new(owner, duration_millis, spell)),
            pending_delete: false,
        }))
    }

    /// Queues a "use" interaction for the next tick.
    pub fn queue_use(&mut self, target: ObjectGuid, actor: ObjectGuid) {
        self.pending_use.push_back((target, actor));
    }

    /// Dispatches a "use" immediately, outside the tick loop.
    pub fn use_entity(&mut self, target: ObjectGuid, actor: ObjectGuid) {
        self.dispatch_now(target, actor, self.time_millis, 0);
    }

    /// Adds a stat modifier to a player and recomputes exactly the derived
    /// stats that depend on it, propagating stamina/intellect to the pet.
    pub fn apply_stat_modifier(&mut self, player: ObjectGuid, stat: Stat, modifier: StatModifier) {
        let Some(player) = self.players.get_mut(&player) else {
            tracing::warn!("Stat modifier for unknown player {player}");
            return;
        };

        player.sheet.stat_ledgers[stat.index()].add(modifier);
        player.sheet.update_stat(stat, None);

        if stat.propagates_to_pet()
            && let Some(pet_guid) = player.pet
        {
            let owner_sheet = player.sheet.clone();
            if let Some(pet) = self
                .entities
                .get_mut(&pet_guid)
                .and_then(|ent| ent.as_pet_mut())
            {
                propagate_owner_stat(pet, stat, &owner_sheet);
            }
        }
    }

    /// One world tick: drain queued interactions, then advance every entity.
    /// Entities flagged for deletion are dropped after their own update.
    pub fn update(&mut self, now_millis: u64) {
        let dt_millis = now_millis.saturating_sub(self.time_millis);
        self.time_millis = now_millis;

        while let Some((target, actor)) = self.pending_use.pop_front() {
            self.dispatch_now(target, actor, now_millis, dt_millis);
        }

        let guids: Vec<ObjectGuid> = self.entities.keys().copied().collect();
        for guid in guids {
            let Some(mut entity) = self.entities.remove(&guid) else {
                continue;
            };

            {
                let mut ctx = self.make_ctx(now_millis, dt_millis);
                entity.update(&mut ctx);
            }

            if entity.pending_delete {
                tracing::debug!("Entity {guid} removed from world");
            } else {
                self.entities.insert(guid, entity);
            }
        }
    }

    fn dispatch_now(&mut self, target: ObjectGuid, actor: ObjectGuid, now_millis: u64, dt_millis: u64) {
        let Some(mut entity) = self.entities.remove(&target) else {
            tracing::warn!("Use on unknown entity {target}");
            return;
        };

        {
            let mut ctx = self.make_ctx(now_millis, dt_millis);
            interaction::dispatch_use(&mut entity, actor, &mut ctx);
        }

        if !entity.pending_delete {
            self.entities.insert(target, entity);
        }
    }

    fn make_ctx(&mut self, now_millis: u64, dt_millis: u64) -> WorldCtx<'_> {
        WorldCtx {
            now_millis,
            dt_millis,
            config: &self.config,
            content: &self.content,
            players: &mut self.players,
            entities: &mut self.entities,
            timers: &mut self.timers,
            store: self.store.as_ref(),
            hooks: self.hooks.as_mut(),
            spells: self.spells.as_mut(),
        }
    }
}
