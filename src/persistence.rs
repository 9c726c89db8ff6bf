//! Opaque persistence for entity records and wall-clock timers.
//!
//! In-memory state is authoritative; everything here is best-effort
//! write-through. The world never reads back through the store mid-run,
//! only at load.

use std::collections::HashMap;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::{EntryId, PackedRotation, Position, SpawnId, SpellId};
use crate::entity::GoState;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("malformed record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Saved state of a game object spawn point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameObjectRecord {
    pub spawn_id: SpawnId,
    pub entry: EntryId,
    pub position: Position,
    pub rotation: PackedRotation,
    pub go_state: GoState,
    pub spawned_by_default: bool,
    pub respawn_delay_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetSpellRecord {
    pub spell_id: SpellId,
    pub active: bool,
}

/// Last-known state of a pet, keyed by its stable pet number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetRecord {
    pub pet_number: u32,
    pub entry: EntryId,
    pub owner: u64,
    pub level: u32,
    pub experience: u32,
    pub loyalty: u32,
    pub health: f32,
    pub mana: f32,
    pub spells: Vec<PetSpellRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Respawn,
    Cooldown,
}

impl TimerKind {
    fn as_i64(&self) -> i64 {
        match self {
            TimerKind::Respawn => 0,
            TimerKind::Cooldown => 1,
        }
    }
}

pub trait PersistenceStore {
    fn load_gameobject(&self, spawn_id: SpawnId) -> Result<Option<GameObjectRecord>, StoreError>;
    fn save_gameobject(&self, record: &GameObjectRecord) -> Result<(), StoreError>;
    fn delete_gameobject(&self, spawn_id: SpawnId) -> Result<(), StoreError>;

    fn load_pet(&self, pet_number: u32) -> Result<Option<PetRecord>, StoreError>;
    fn save_pet(&self, record: &PetRecord) -> Result<(), StoreError>;
    fn delete_pet(&self, pet_number: u32) -> Result<(), StoreError>;

    fn load_timers(&self, kind: TimerKind) -> Result<Vec<(SpawnId, u64)>, StoreError>;
    fn save_timer(&self, kind: TimerKind, spawn_id: SpawnId, due_at: u64) -> Result<(), StoreError>;
    fn clear_timer(&self, kind: TimerKind, spawn_id: SpawnId) -> Result<(), StoreError>;
}

// Lets callers keep a handle to a store they hand off to the world.
impl<S: PersistenceStore + ?Sized> PersistenceStore for std::sync::Arc<S> {
    fn load_gameobject(&self, spawn_id: SpawnId) -> Result<Option<GameObjectRecord>, StoreError> {
        (**self).load_gameobject(spawn_id)
    }

    fn save_gameobject(&self, record: &GameObjectRecord) -> Result<(), StoreError> {
        (**self).save_gameobject(record)
    }

    fn delete_gameobject(&self, spawn_id: SpawnId) -> Result<(), StoreError> {
        (**self).delete_gameobject(spawn_id)
    }

    fn load_pet(&self, pet_number: u32) -> Result<Option<PetRecord>, StoreError> {
        (**self).load_pet(pet_number)
    }

    fn save_pet(&self, record: &PetRecord) -> Result<(), StoreError> {
        (**self).save_pet(record)
    }

    fn delete_pet(&self, pet_number: u32) -> Result<(), StoreError> {
        (**self).delete_pet(pet_number)
    }

    fn load_timers(&self, kind: TimerKind) -> Result<Vec<(SpawnId, u64)>, StoreError> {
        (**self).load_timers(kind)
    }

    fn save_timer(&self, kind: TimerKind, spawn_id: SpawnId, due_at: u64) -> Result<(), StoreError> {
        (**self).save_timer(kind, spawn_id, due_at)
    }

    fn clear_timer(&self, kind: TimerKind, spawn_id: SpawnId) -> Result<(), StoreError> {
        (**self).clear_timer(kind, spawn_id)
    }
}

pub struct SqliteStore {
    connection: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let connection = Connection::open(path)?;

        // Create game object spawn table
        {
            let query = "CREATE TABLE IF NOT EXISTS gameobjects (spawn_id INTEGER PRIMARY KEY, record STRING);";
            connection.execute(query, ())?;
        }

        // Create pets table
        {
            let query =
                "CREATE TABLE IF NOT EXISTS pets (pet_number INTEGER PRIMARY KEY, record STRING);";
            connection.execute(query, ())?;
        }

        // Create timers table
        {
            let query = "CREATE TABLE IF NOT EXISTS timers (kind INTEGER, spawn_id INTEGER, due_at INTEGER, PRIMARY KEY(kind, spawn_id));";
            connection.execute(query, ())?;
        }

        Ok(Self {
            connection: Mutex::new(connection),
        })
    }
}

impl PersistenceStore for SqliteStore {
    fn load_gameobject(&self, spawn_id: SpawnId) -> Result<Option<GameObjectRecord>, StoreError> {
        let connection = self.connection.lock().unwrap();

        let json: Option<String> = connection
            .query_row(
                "SELECT record FROM gameobjects WHERE spawn_id = ?1",
                (spawn_id.0,),
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save_gameobject(&self, record: &GameObjectRecord) -> Result<(), StoreError> {
        let connection = self.connection.lock().unwrap();

        connection.execute(
            "INSERT OR REPLACE INTO gameobjects (spawn_id, record) VALUES (?1, ?2)",
            (record.spawn_id.0, serde_json::to_string(record)?),
        )?;
        Ok(())
    }

    fn delete_gameobject(&self, spawn_id: SpawnId) -> Result<(), StoreError> {
        let connection = self.connection.lock().unwrap();

        connection.execute("DELETE FROM gameobjects WHERE spawn_id = ?1", (spawn_id.0,))?;
        Ok(())
    }

    fn load_pet(&self, pet_number: u32) -> Result<Option<PetRecord>, StoreError> {
        let connection = self.connection.lock().unwrap();

        let json: Option<String> = connection
            .query_row(
                "SELECT record FROM pets WHERE pet_number = ?1",
                (pet_number,),
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save_pet(&self, record: &PetRecord) -> Result<(), StoreError> {
        let connection = self.connection.lock().unwrap();

        connection.execute(
            "INSERT OR REPLACE INTO pets (pet_number, record) VALUES (?1, ?2)",
            (record.pet_number, serde_json::to_string(record)?),
        )?;
        Ok(())
    }

    fn delete_pet(&self, pet_number: u32) -> Result<(), StoreError> {
        let connection = self.connection.lock().unwrap();

        connection.execute("DELETE FROM pets WHERE pet_number = ?1", (pet_number,))?;
        Ok(())
    }

    fn load_timers(&self, kind: TimerKind) -> Result<Vec<(SpawnId, u64)>, StoreError> {
        let connection = self.connection.lock().unwrap();

        let mut stmt = connection.prepare("SELECT spawn_id, due_at FROM timers WHERE kind = ?1")?;
        let rows = stmt.query_map((kind.as_i64(),), |row| {
            Ok((SpawnId(row.get(0)?), row.get::<_, i64>(1)? as u64))
        })?;

        let mut timers = Vec::new();
        for row in rows {
            timers.push(row?);
        }
        Ok(timers)
    }

    fn save_timer(&self, kind: TimerKind, spawn_id: SpawnId, due_at: u64) -> Result<(), StoreError> {
        let connection = self.connection.lock().unwrap();

        connection.execute(
            "INSERT OR REPLACE INTO timers (kind, spawn_id, due_at) VALUES (?1, ?2, ?3)",
            (kind.as_i64(), spawn_id.0, due_at as i64),
        )?;
        Ok(())
    }

    fn clear_timer(&self, kind: TimerKind, spawn_id: SpawnId) -> Result<(), StoreError> {
        let connection = self.connection.lock().unwrap();

        connection.execute(
            "DELETE FROM timers WHERE kind = ?1 AND spawn_id = ?2",
            (kind.as_i64(), spawn_id.0),
        )?;
        Ok(())
    }
}

/// In-memory store, used by tests and tools that don't want a database on
/// disk.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    gameobjects: HashMap<SpawnId, GameObjectRecord>,
    pets: HashMap<u32, PetRecord>,
    timers: HashMap<(TimerKind, SpawnId), u64>,
}

impl MemoryStore {
    pub fn saved_pet(&self, pet_number: u32) -> Option<PetRecord> {
        self.inner.lock().unwrap().pets.get(&pet_number).cloned()
    }

    pub fn timer(&self, kind: TimerKind, spawn_id: SpawnId) -> Option<u64> {
        self.inner
            .lock()
            .unwrap()
            .timers
            .get(&(kind, spawn_id))
            .copied()
    }
}

impl PersistenceStore for MemoryStore {
    fn load_gameobject(&self, spawn_id: SpawnId) -> Result<Option<GameObjectRecord>, StoreError> {
        Ok(self.inner.lock().unwrap().gameobjects.get(&spawn_id).cloned())
    }

    fn save_gameobject(&self, record: &GameObjectRecord) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .gameobjects
            .insert(record.spawn_id, record.clone());
        Ok(())
    }

    fn delete_gameobject(&self, spawn_id: SpawnId) -> Result<(), StoreError> {
        self.inner.lock().unwrap().gameobjects.remove(&spawn_id);
        Ok(())
    }

    fn load_pet(&self, pet_number: u32) -> Result<Option<PetRecord>, StoreError> {
        Ok(self.inner.lock().unwrap().pets.get(&pet_number).cloned())
    }

    fn save_pet(&self, record: &PetRecord) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .pets
            .insert(record.pet_number, record.clone());
        Ok(())
    }

    fn delete_pet(&self, pet_number: u32) -> Result<(), StoreError> {
        self.inner.lock().unwrap().pets.remove(&pet_number);
        Ok(())
    }

    fn load_timers(&self, kind: TimerKind) -> Result<Vec<(SpawnId, u64)>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .timers
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|((_, spawn_id), due_at)| (*spawn_id, *due_at))
            .collect())
    }

    fn save_timer(&self, kind: TimerKind, spawn_id: SpawnId, due_at: u64) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .timers
            .insert((kind, spawn_id), due_at);
        Ok(())
    }

    fn clear_timer(&self, kind: TimerKind, spawn_id: SpawnId) -> Result<(), StoreError> {
        self.inner.lock().unwrap().timers.remove(&(kind, spawn_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::GoState;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::default();

        let record = GameObjectRecord {
            spawn_id: SpawnId(12),
            entry: 2050,
            position: Position::new(1.0, 2.0, 3.0),
            rotation: PackedRotation::default(),
            go_state: GoState::Ready,
            spawned_by_default: true,
            respawn_delay_secs: 300,
        };
        store.save_gameobject(&record).unwrap();

        let loaded = store.load_gameobject(SpawnId(12)).unwrap().unwrap();
        assert_eq!(loaded.entry, 2050);
        assert_eq!(loaded.respawn_delay_secs, 300);

        store.delete_gameobject(SpawnId(12)).unwrap();
        assert!(store.load_gameobject(SpawnId(12)).unwrap().is_none());
    }

    #[test]
    fn timers_are_partitioned_by_kind() {
        let store = MemoryStore::default();
        store.save_timer(TimerKind::Respawn, SpawnId(1), 100).unwrap();
        store.save_timer(TimerKind::Cooldown, SpawnId(1), 55).unwrap();

        let respawns = store.load_timers(TimerKind::Respawn).unwrap();
        assert_eq!(respawns, vec![(SpawnId(1), 100)]);

        store.clear_timer(TimerKind::Respawn, SpawnId(1)).unwrap();
        assert!(store.load_timers(TimerKind::Respawn).unwrap().is_empty());
        assert_eq!(store.timer(TimerKind::Cooldown, SpawnId(1)), Some(55));
    }
}
