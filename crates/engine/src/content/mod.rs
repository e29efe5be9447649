mod database;
mod level_xml;
mod types;

pub use database::{
    CameraDef, CameraFacingDef, DoorDef, GuardDef, InfoDef, InfoKindDef, ItemKindDef, LadderDef,
    LevelDatabase, LevelDef, LevelId, PickupDef, PictureDef, PuzzleDef, Tuning,
};
pub use level_xml::load_level_database;
pub use types::{LevelCompileError, LevelErrorCode, SourceLocation};
