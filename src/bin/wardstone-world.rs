use std::time::Duration;

use wardstone::common::timestamp_msecs;
use wardstone::config::get_config;
use wardstone::content::ContentTables;
use wardstone::hooks::{NoopExecutor, NoopHooks};
use wardstone::persistence::SqliteStore;
use wardstone::world::World;

fn main() {
    tracing_subscriber::fmt::init();

    let config = get_config();

    let content = ContentTables::load(&config.filesystem.content_path)
        .expect("Failed to load content tables!");
    let store =
        SqliteStore::new(&config.filesystem.database_path).expect("Failed to open database!");

    let tick_millis = config.world.tick_millis;
    let mut world = World::new(
        config.world,
        content,
        Box::new(store),
        Box::new(NoopHooks),
        Box::new(NoopExecutor),
    );

    tracing::info!("World simulation started");

    loop {
        world.update(timestamp_msecs());
        std::thread::sleep(Duration::from_millis(tick_millis));
    }
}
