use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

mod position;
pub use position::Position;

mod rotation;
pub use rotation::PackedRotation;

/// World-unique id of a live entity instance. Instances are destroyed and
/// recreated across respawns, so nothing durable may be keyed by this.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectGuid(pub u64);

pub const INVALID_GUID: ObjectGuid = ObjectGuid(0);

impl ObjectGuid {
    /// Returns true if it points to a *valid-looking* guid.
    pub fn is_valid(&self) -> bool {
        *self != INVALID_GUID
    }

    pub fn generate() -> Self {
        // TODO: ensure we don't collide with another live entity
        ObjectGuid(fastrand::u64(1..))
    }
}

impl Default for ObjectGuid {
    fn default() -> Self {
        INVALID_GUID
    }
}

impl std::fmt::Display for ObjectGuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "INVALID_GUID")
        }
    }
}

impl std::fmt::Debug for ObjectGuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectGuid ({})", self)
    }
}

/// Stable id of a spawn point. Respawn timers are keyed by this, not by
/// [`ObjectGuid`], because they must survive the entity instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpawnId(pub u32);

impl std::fmt::Display for SpawnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content/template id shared by every instance spawned from one template.
pub type EntryId = u32;

pub type SpellId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    Alliance,
    Horde,
}

impl Faction {
    pub fn opposite(&self) -> Faction {
        match self {
            Faction::Alliance => Faction::Horde,
            Faction::Horde => Faction::Alliance,
        }
    }
}

pub fn timestamp_msecs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Failed to get UNIX timestamp!")
        .as_millis()
        .try_into()
        .unwrap()
}
