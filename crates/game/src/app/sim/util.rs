fn movement_dir(input: &InputSnapshot) -> Vec2 {
    let mut x = 0.0f32;
    let mut y = 0.0f32;

    if input.is_down(InputAction::MoveRight) {
        x += 1.0;
    }
    if input.is_down(InputAction::MoveLeft) {
        x -= 1.0;
    }
    if input.is_down(InputAction::MoveUp) {
        y += 1.0;
    }
    if input.is_down(InputAction::MoveDown) {
        y -= 1.0;
    }

    let len_sq = x * x + y * y;
    if len_sq > 0.0 {
        let inv_len = len_sq.sqrt().recip();
        x *= inv_len;
        y *= inv_len;
    }

    Vec2 { x, y }
}

fn step_toward(
    current: Vec2,
    target: Vec2,
    speed: f32,
    dt_seconds: f32,
    arrival_threshold: f32,
) -> (Vec2, bool) {
    let dx = target.x - current.x;
    let dy = target.y - current.y;
    let distance_sq = dx * dx + dy * dy;
    let threshold_sq = arrival_threshold * arrival_threshold;
    if distance_sq <= threshold_sq {
        return (target, true);
    }

    let distance = distance_sq.sqrt();
    let max_step = speed * dt_seconds;
    if max_step >= distance {
        return (target, true);
    }

    let inv_distance = distance.recip();
    (
        Vec2 {
            x: current.x + dx * inv_distance * max_step,
            y: current.y + dy * inv_distance * max_step,
        },
        false,
    )
}

fn point_in_triangle(point: Vec2, triangle: &[Vec2; 3]) -> bool {
    fn edge_sign(a: Vec2, b: Vec2, p: Vec2) -> f32 {
        (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
    }

    let d0 = edge_sign(triangle[0], triangle[1], point);
    let d1 = edge_sign(triangle[1], triangle[2], point);
    let d2 = edge_sign(triangle[2], triangle[0], point);

    let has_negative = d0 < 0.0 || d1 < 0.0 || d2 < 0.0;
    let has_positive = d0 > 0.0 || d1 > 0.0 || d2 > 0.0;
    !(has_negative && has_positive)
}

/// Segment/rect intersection via per-axis slab clipping. Used for wall
/// occlusion of sight lines and ranged attacks.
fn segment_intersects_rect(from: Vec2, to: Vec2, rect: &Rect) -> bool {
    if rect.contains(from) || rect.contains(to) {
        return true;
    }

    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let mut t_min = 0.0f32;
    let mut t_max = 1.0f32;

    for (delta, start, min, max) in [
        (dx, from.x, rect.min.x, rect.max.x),
        (dy, from.y, rect.min.y, rect.max.y),
    ] {
        if delta.abs() < f32::EPSILON {
            if start < min || start > max {
                return false;
            }
            continue;
        }
        let inv = delta.recip();
        let mut t0 = (min - start) * inv;
        let mut t1 = (max - start) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return false;
        }
    }

    true
}

fn line_of_sight_clear(from: Vec2, to: Vec2, walls: &[Rect]) -> bool {
    walls
        .iter()
        .all(|wall| !segment_intersects_rect(from, to, wall))
}

/// Distance from a point to the nearest point of a vertical segment at `x`
/// spanning `[bottom_y, top_y]`. Ladders are interacted with anywhere along
/// their column.
fn distance_to_vertical_segment(point: Vec2, x: f32, bottom_y: f32, top_y: f32) -> f32 {
    let clamped_y = point.y.clamp(bottom_y, top_y);
    point.distance_to(Vec2 { x, y: clamped_y })
}

fn facing_unit_lr(facing: FacingLr) -> Vec2 {
    Vec2 {
        x: facing.sign(),
        y: 0.0,
    }
}

/// Guard vision test: inside `view_range` and within the facing cone given by
/// `half_angle_degrees`.
fn within_view_cone(
    guard_position: Vec2,
    facing: FacingLr,
    target: Vec2,
    view_range: f32,
    half_angle_degrees: f32,
) -> bool {
    let distance_sq = guard_position.distance_sq_to(target);
    if distance_sq > view_range * view_range {
        return false;
    }
    if distance_sq <= f32::EPSILON {
        return true;
    }

    let distance = distance_sq.sqrt();
    let to_target = Vec2 {
        x: (target.x - guard_position.x) / distance,
        y: (target.y - guard_position.y) / distance,
    };
    let forward = facing_unit_lr(facing);
    let dot = forward.x * to_target.x + forward.y * to_target.y;
    dot >= half_angle_degrees.to_radians().cos()
}
