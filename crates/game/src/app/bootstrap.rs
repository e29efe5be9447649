use std::path::PathBuf;

use engine::{LevelDatabase, LoopConfig, Scene};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::sim::{build_scene, SimContext};

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
    pub(crate) asset_root: PathBuf,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Skulk Startup ===");

    let (level_db, save_dir, asset_root) = match engine::resolve_app_paths() {
        Ok(paths) => {
            let level_db = match engine::load_level_database(&paths) {
                Ok(db) => db,
                Err(error) => {
                    warn!(error = %error, "level_compile_failed_using_fallback");
                    LevelDatabase::default()
                }
            };
            (level_db, Some(paths.cache_dir), paths.assets_dir)
        }
        Err(error) => {
            warn!(error = %error, "app_paths_unresolved_running_without_persistence");
            (LevelDatabase::default(), None, PathBuf::from("assets"))
        }
    };

    let scene = build_scene(SimContext { level_db, save_dir });

    AppWiring {
        config: LoopConfig::default(),
        scene: Box::new(scene),
        asset_root,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
