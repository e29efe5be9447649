use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::info;

use crate::app::{Rect, Vec2};
use crate::AppPaths;

use super::database::{
    CameraDef, CameraFacingDef, DoorDef, GuardDef, InfoDef, InfoKindDef, ItemKindDef, LadderDef,
    LevelDatabase, LevelDef, LevelId, PickupDef, PictureDef, PuzzleDef, Tuning,
};
use super::types::{LevelCompileError, LevelErrorCode, SourceLocation};

/// Compiles every `assets/levels/*.xml` into a [`LevelDatabase`]. A missing
/// levels directory yields an empty database; the caller decides whether to
/// fall back to the built-in level.
pub fn load_level_database(app_paths: &AppPaths) -> Result<LevelDatabase, LevelCompileError> {
    if !app_paths.levels_dir.is_dir() {
        return Ok(LevelDatabase::from_levels(Vec::new()));
    }

    let xml_files = collect_level_files_sorted(&app_paths.levels_dir)?;
    let mut levels = Vec::<LevelDef>::new();
    let mut seen_names = HashSet::<String>::new();

    for xml_file in xml_files {
        let raw = fs::read_to_string(&xml_file).map_err(|source| LevelCompileError {
            code: LevelErrorCode::ReadFile,
            message: format!("failed to read level file: {source}"),
            file_path: xml_file.clone(),
            location: None,
        })?;
        let level = parse_level_document(&xml_file, &raw)?;
        if !seen_names.insert(level.name.clone()) {
            return Err(LevelCompileError {
                code: LevelErrorCode::DuplicateLevel,
                message: format!("duplicate level name '{}'", level.name),
                file_path: xml_file,
                location: None,
            });
        }
        levels.push(level);
    }

    let database = LevelDatabase::from_levels(levels);
    info!(level_count = database.levels().len(), "levels_compiled");
    Ok(database)
}

fn collect_level_files_sorted(levels_dir: &Path) -> Result<Vec<PathBuf>, LevelCompileError> {
    let entries = fs::read_dir(levels_dir).map_err(|source| LevelCompileError {
        code: LevelErrorCode::Discovery,
        message: format!("failed to read levels directory: {source}"),
        file_path: levels_dir.to_path_buf(),
        location: None,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LevelCompileError {
            code: LevelErrorCode::Discovery,
            message: format!("failed to read directory entry: {source}"),
            file_path: levels_dir.to_path_buf(),
            location: None,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "xml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn parse_level_document(file_path: &Path, raw: &str) -> Result<LevelDef, LevelCompileError> {
    let doc = Document::parse(raw).map_err(|error| LevelCompileError {
        code: LevelErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "Level" {
        return Err(error_at_node(
            LevelErrorCode::InvalidRoot,
            "root element must be <Level>".to_string(),
            file_path,
            &doc,
            root,
        ));
    }

    let mut name: Option<String> = None;
    let mut label: Option<String> = None;
    let mut bounds: Option<Rect> = None;
    let mut exit: Option<Rect> = None;
    let mut player_spawn: Option<Vec2> = None;
    let mut detection_limit: Option<u32> = None;
    let mut tuning = Tuning::default();
    let mut walls = Vec::new();
    let mut guards = Vec::new();
    let mut cameras = Vec::new();
    let mut doors = Vec::new();
    let mut ladders = Vec::new();
    let mut pictures = Vec::new();
    let mut infos = Vec::new();
    let mut pickups = Vec::new();
    let mut seen_singleton_fields = HashSet::<String>::new();

    for child in root.children().filter(|node| node.is_element()) {
        let field_name = child.tag_name().name().to_string();
        let singleton = matches!(
            field_name.as_str(),
            "name" | "label" | "bounds" | "exit" | "playerSpawn" | "detectionLimit" | "tuning"
        );
        if singleton && !seen_singleton_fields.insert(field_name.clone()) {
            return Err(error_at_node(
                LevelErrorCode::DuplicateField,
                format!("duplicate field <{field_name}> in <Level>"),
                file_path,
                &doc,
                child,
            ));
        }

        match field_name.as_str() {
            "name" => name = Some(required_text(file_path, &doc, child, "name")?),
            "label" => label = Some(required_text(file_path, &doc, child, "label")?),
            "bounds" => bounds = Some(parse_rect_attrs(file_path, &doc, child)?),
            "exit" => exit = Some(parse_rect_attrs(file_path, &doc, child)?),
            "playerSpawn" => player_spawn = Some(parse_point_attrs(file_path, &doc, child)?),
            "detectionLimit" => {
                let value = required_text(file_path, &doc, child, "detectionLimit")?;
                let parsed = value.parse::<u32>().map_err(|_| {
                    error_at_node(
                        LevelErrorCode::InvalidValue,
                        format!("detectionLimit '{value}' is not a valid count"),
                        file_path,
                        &doc,
                        child,
                    )
                })?;
                if parsed == 0 {
                    return Err(error_at_node(
                        LevelErrorCode::InvalidValue,
                        "detectionLimit must be >= 1".to_string(),
                        file_path,
                        &doc,
                        child,
                    ));
                }
                detection_limit = Some(parsed);
            }
            "tuning" => tuning = parse_tuning_attrs(file_path, &doc, child)?,
            "wall" => walls.push(parse_rect_attrs(file_path, &doc, child)?),
            "guard" => guards.push(parse_guard(file_path, &doc, child)?),
            "camera" => cameras.push(parse_camera(file_path, &doc, child)?),
            "door" => doors.push(parse_door(file_path, &doc, child)?),
            "ladder" => ladders.push(parse_ladder(file_path, &doc, child)?),
            "picture" => pictures.push(PictureDef {
                position: parse_point_attrs(file_path, &doc, child)?,
                text: required_text(file_path, &doc, child, "picture")?,
            }),
            "note" => infos.push(InfoDef {
                position: parse_point_attrs(file_path, &doc, child)?,
                kind: InfoKindDef::Note,
                text: required_text(file_path, &doc, child, "note")?,
                objective: parse_bool_attr(file_path, &doc, child, "objective")?.unwrap_or(false),
            }),
            "computer" => infos.push(InfoDef {
                position: parse_point_attrs(file_path, &doc, child)?,
                kind: InfoKindDef::Computer,
                text: required_text(file_path, &doc, child, "computer")?,
                objective: parse_bool_attr(file_path, &doc, child, "objective")?.unwrap_or(false),
            }),
            "pickup" => pickups.push(parse_pickup(file_path, &doc, child)?),
            _ => {
                return Err(error_at_node(
                    LevelErrorCode::UnknownField,
                    format!("unknown field <{field_name}> in <Level>"),
                    file_path,
                    &doc,
                    child,
                ))
            }
        }
    }

    let Some(name) = name else {
        return Err(missing_field(file_path, &doc, root, "name"));
    };
    let Some(label) = label else {
        return Err(missing_field(file_path, &doc, root, "label"));
    };
    let Some(bounds) = bounds else {
        return Err(missing_field(file_path, &doc, root, "bounds"));
    };
    let Some(player_spawn) = player_spawn else {
        return Err(missing_field(file_path, &doc, root, "playerSpawn"));
    };

    Ok(LevelDef {
        id: LevelId(0),
        name,
        label,
        bounds,
        exit: exit.unwrap_or(Rect {
            min: bounds.min,
            max: Vec2 {
                x: bounds.min.x + 1.0,
                y: bounds.min.y + 1.0,
            },
        }),
        player_spawn,
        detection_limit: detection_limit.unwrap_or(3),
        tuning,
        walls,
        guards,
        cameras,
        doors,
        ladders,
        pictures,
        infos,
        pickups,
    })
}

fn parse_guard(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<GuardDef, LevelCompileError> {
    let position = parse_point_attrs(file_path, doc, node)?;
    let mut patrol = Vec::new();
    for child in node.children().filter(|child| child.is_element()) {
        if child.tag_name().name() != "waypoint" {
            return Err(error_at_node(
                LevelErrorCode::UnknownField,
                format!(
                    "unknown field <{}> in <guard>; expected <waypoint>",
                    child.tag_name().name()
                ),
                file_path,
                doc,
                child,
            ));
        }
        patrol.push(parse_point_attrs(file_path, doc, child)?);
    }
    if patrol.is_empty() {
        patrol.push(position);
    }
    Ok(GuardDef { position, patrol })
}

fn parse_camera(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<CameraDef, LevelCompileError> {
    let position = parse_point_attrs(file_path, doc, node)?;
    let facing_raw = required_attr(file_path, doc, node, "facing")?;
    let facing = match facing_raw.as_str() {
        "Left" => CameraFacingDef::Left,
        "Right" => CameraFacingDef::Right,
        "Down" => CameraFacingDef::Down,
        _ => {
            return Err(error_at_node(
                LevelErrorCode::InvalidValue,
                format!("invalid camera facing '{facing_raw}'; allowed values: Left, Right, Down"),
                file_path,
                doc,
                node,
            ))
        }
    };
    Ok(CameraDef { position, facing })
}

fn parse_door(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<DoorDef, LevelCompileError> {
    let position = parse_point_attrs(file_path, doc, node)?;
    let open = parse_bool_attr(file_path, doc, node, "open")?.unwrap_or(false);
    let locked = parse_bool_attr(file_path, doc, node, "locked")?.unwrap_or(false);

    let mut puzzle: Option<PuzzleDef> = None;
    for child in node.children().filter(|child| child.is_element()) {
        if puzzle.is_some() {
            return Err(error_at_node(
                LevelErrorCode::DuplicateField,
                "a <door> may carry at most one puzzle".to_string(),
                file_path,
                doc,
                child,
            ));
        }
        puzzle = Some(parse_puzzle(file_path, doc, child)?);
    }

    if puzzle.is_some() && !locked {
        return Err(error_at_node(
            LevelErrorCode::InvalidValue,
            "a door carrying a puzzle must be locked".to_string(),
            file_path,
            doc,
            node,
        ));
    }

    Ok(DoorDef {
        position,
        open,
        locked,
        puzzle,
    })
}

fn parse_puzzle(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<PuzzleDef, LevelCompileError> {
    match node.tag_name().name() {
        "codeLock" => {
            let code = required_attr(file_path, doc, node, "code")?;
            Ok(PuzzleDef::CodeLock { code })
        }
        "laserLock" => {
            let wire_count = parse_u32_attr(file_path, doc, node, "wires")?;
            let live_wire = parse_u32_attr(file_path, doc, node, "liveWire")?;
            if wire_count == 0 || live_wire >= wire_count {
                return Err(error_at_node(
                    LevelErrorCode::InvalidValue,
                    format!("liveWire {live_wire} out of range for {wire_count} wires"),
                    file_path,
                    doc,
                    node,
                ));
            }
            Ok(PuzzleDef::LaserLock {
                wire_count,
                live_wire,
            })
        }
        "lockPick" => {
            let window_start = parse_f32_attr(file_path, doc, node, "windowStart")?;
            let window_width = parse_f32_attr(file_path, doc, node, "windowWidth")?;
            if !(0.0..=1.0).contains(&window_start)
                || window_width <= 0.0
                || window_start + window_width > 1.0
            {
                return Err(error_at_node(
                    LevelErrorCode::InvalidValue,
                    "lockPick window must lie within [0, 1]".to_string(),
                    file_path,
                    doc,
                    node,
                ));
            }
            Ok(PuzzleDef::LockPick {
                window_start,
                window_width,
            })
        }
        other => Err(error_at_node(
            LevelErrorCode::UnknownField,
            format!("unknown puzzle <{other}>; allowed: codeLock, laserLock, lockPick"),
            file_path,
            doc,
            node,
        )),
    }
}

fn parse_ladder(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<LadderDef, LevelCompileError> {
    let x = parse_f32_attr(file_path, doc, node, "x")?;
    let bottom_y = parse_f32_attr(file_path, doc, node, "bottomY")?;
    let top_y = parse_f32_attr(file_path, doc, node, "topY")?;
    if top_y <= bottom_y {
        return Err(error_at_node(
            LevelErrorCode::InvalidValue,
            "ladder topY must be greater than bottomY".to_string(),
            file_path,
            doc,
            node,
        ));
    }
    Ok(LadderDef { x, bottom_y, top_y })
}

fn parse_pickup(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<PickupDef, LevelCompileError> {
    let position = parse_point_attrs(file_path, doc, node)?;
    let item_raw = required_attr(file_path, doc, node, "item")?;
    let item = match item_raw.as_str() {
        "Cloak" => ItemKindDef::Cloak,
        _ => {
            return Err(error_at_node(
                LevelErrorCode::InvalidValue,
                format!("invalid pickup item '{item_raw}'; allowed values: Cloak"),
                file_path,
                doc,
                node,
            ))
        }
    };
    Ok(PickupDef { position, item })
}

fn parse_tuning_attrs(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<Tuning, LevelCompileError> {
    let mut tuning = Tuning::default();
    for attribute in node.attributes() {
        let value = attribute.value().parse::<f32>().map_err(|_| {
            error_at_node(
                LevelErrorCode::InvalidValue,
                format!(
                    "tuning attribute {}='{}' is not a valid number",
                    attribute.name(),
                    attribute.value()
                ),
                file_path,
                doc,
                node,
            )
        })?;
        if !value.is_finite() || value < 0.0 {
            return Err(error_at_node(
                LevelErrorCode::InvalidValue,
                format!("tuning attribute {} must be finite and >= 0", attribute.name()),
                file_path,
                doc,
                node,
            ));
        }
        let slot = match attribute.name() {
            "playerSpeed" => &mut tuning.player_speed,
            "climbSpeed" => &mut tuning.climb_speed,
            "patrolSpeed" => &mut tuning.patrol_speed,
            "chaseSpeed" => &mut tuning.chase_speed,
            "guardViewRange" => &mut tuning.guard_view_range,
            "guardViewHalfAngle" => &mut tuning.guard_view_half_angle_degrees,
            "cameraViewRange" => &mut tuning.camera_view_range,
            "cameraViewHalfWidth" => &mut tuning.camera_view_half_width,
            "alertSeconds" => &mut tuning.alert_seconds,
            "chaseBreakDistance" => &mut tuning.chase_break_distance,
            "chaseTimeoutSeconds" => &mut tuning.chase_timeout_seconds,
            "stunSeconds" => &mut tuning.stun_seconds,
            "alertRadius" => &mut tuning.alert_radius,
            "globalAlertSeconds" => &mut tuning.global_alert_seconds,
            "invisibilitySeconds" => &mut tuning.invisibility_seconds,
            "hitRecoverSeconds" => &mut tuning.hit_recover_seconds,
            "meleeRange" => &mut tuning.melee_range,
            "rangedRange" => &mut tuning.ranged_range,
            other => {
                return Err(error_at_node(
                    LevelErrorCode::UnknownField,
                    format!("unknown tuning attribute '{other}'"),
                    file_path,
                    doc,
                    node,
                ))
            }
        };
        *slot = value;
    }
    Ok(tuning)
}

fn parse_point_attrs(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<Vec2, LevelCompileError> {
    Ok(Vec2 {
        x: parse_f32_attr(file_path, doc, node, "x")?,
        y: parse_f32_attr(file_path, doc, node, "y")?,
    })
}

fn parse_rect_attrs(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<Rect, LevelCompileError> {
    let rect = Rect {
        min: Vec2 {
            x: parse_f32_attr(file_path, doc, node, "minX")?,
            y: parse_f32_attr(file_path, doc, node, "minY")?,
        },
        max: Vec2 {
            x: parse_f32_attr(file_path, doc, node, "maxX")?,
            y: parse_f32_attr(file_path, doc, node, "maxY")?,
        },
    };
    if rect.max.x <= rect.min.x || rect.max.y <= rect.min.y {
        return Err(error_at_node(
            LevelErrorCode::InvalidValue,
            "rect max must be strictly greater than min on both axes".to_string(),
            file_path,
            doc,
            node,
        ));
    }
    Ok(rect)
}

fn parse_f32_attr(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    name: &str,
) -> Result<f32, LevelCompileError> {
    let raw = required_attr(file_path, doc, node, name)?;
    let parsed = raw.parse::<f32>().map_err(|_| {
        error_at_node(
            LevelErrorCode::InvalidValue,
            format!("attribute {name}='{raw}' is not a valid number"),
            file_path,
            doc,
            node,
        )
    })?;
    if !parsed.is_finite() {
        return Err(error_at_node(
            LevelErrorCode::InvalidValue,
            format!("attribute {name} must be finite"),
            file_path,
            doc,
            node,
        ));
    }
    Ok(parsed)
}

fn parse_u32_attr(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    name: &str,
) -> Result<u32, LevelCompileError> {
    let raw = required_attr(file_path, doc, node, name)?;
    raw.parse::<u32>().map_err(|_| {
        error_at_node(
            LevelErrorCode::InvalidValue,
            format!("attribute {name}='{raw}' is not a valid count"),
            file_path,
            doc,
            node,
        )
    })
}

fn parse_bool_attr(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    name: &str,
) -> Result<Option<bool>, LevelCompileError> {
    let Some(raw) = node.attribute(name) else {
        return Ok(None);
    };
    match raw {
        "true" => Ok(Some(true)),
        "false" => Ok(Some(false)),
        _ => Err(error_at_node(
            LevelErrorCode::InvalidValue,
            format!("attribute {name}='{raw}' must be 'true' or 'false'"),
            file_path,
            doc,
            node,
        )),
    }
}

fn required_attr(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    name: &str,
) -> Result<String, LevelCompileError> {
    match node.attribute(name) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(error_at_node(
            LevelErrorCode::MissingField,
            format!("missing required attribute '{name}' on <{}>", node.tag_name().name()),
            file_path,
            doc,
            node,
        )),
    }
}

fn required_text(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<String, LevelCompileError> {
    let value = node.text().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(error_at_node(
            LevelErrorCode::MissingField,
            format!("field <{field_name}> must not be empty"),
            file_path,
            doc,
            node,
        ));
    }
    Ok(value)
}

fn missing_field(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> LevelCompileError {
    error_at_node(
        LevelErrorCode::MissingField,
        format!("missing required field <{field_name}> in <Level>"),
        file_path,
        doc,
        node,
    )
}

fn error_at_node(
    code: LevelErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> LevelCompileError {
    let pos = doc.text_pos_at(node.range().start);
    LevelCompileError {
        code,
        message,
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}
