use serde::{Deserialize, Serialize};

/// Configuration for the world simulation.
#[derive(Serialize, Deserialize)]
pub struct WorldConfig {
    /// Length of one world tick in milliseconds.
    #[serde(default = "WorldConfig::default_tick_millis")]
    pub tick_millis: u64,

    /// How long a pet corpse lingers before the pet is removed.
    #[serde(default = "WorldConfig::default_corpse_decay_secs")]
    pub corpse_decay_secs: u64,

    /// Distance at which a pet is unsummoned from its owner.
    #[serde(default = "WorldConfig::default_pet_leash_yards")]
    pub pet_leash_yards: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tick_millis: Self::default_tick_millis(),
            corpse_decay_secs: Self::default_corpse_decay_secs(),
            pet_leash_yards: Self::default_pet_leash_yards(),
        }
    }
}

impl WorldConfig {
    fn default_tick_millis() -> u64 {
        100
    }

    fn default_corpse_decay_secs() -> u64 {
        60
    }

    fn default_pet_leash_yards() -> f32 {
        100.0
    }
}

/// Configuration for file locations.
#[derive(Serialize, Deserialize)]
pub struct FilesystemConfig {
    /// Location of the persistence database.
    #[serde(default = "FilesystemConfig::default_database_path")]
    pub database_path: String,

    /// Location of the content table directory.
    #[serde(default = "FilesystemConfig::default_content_path")]
    pub content_path: String,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            database_path: Self::default_database_path(),
            content_path: Self::default_content_path(),
        }
    }
}

impl FilesystemConfig {
    fn default_database_path() -> String {
        "world.db".to_string()
    }

    fn default_content_path() -> String {
        "resources/content".to_string()
    }
}

#[derive(Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub world: WorldConfig,

    #[serde(default)]
    pub filesystem: FilesystemConfig,
}

pub fn get_config() -> Config {
    if let Ok(data) = std::fs::read_to_string("config.json") {
        serde_json::from_str(&data).expect("Failed to parse")
    } else {
        Config::default()
    }
}
