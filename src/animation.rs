use crate::tilemap::AnimationFrame;
use glam::Vec2;

/// Selects the active animation frame for an elapsed wall-clock time.
///
/// Returns `None` when the frame list has zero total duration, meaning "no
/// change": the caller keeps whatever tile it already resolved. Otherwise the
/// elapsed time wraps modulo the total duration and frame `k` owns the
/// half-open interval `[cum_{k-1}, cum_k)`. Because the result depends only on
/// elapsed time, replaying the same elapsed value from a cold start lands on
/// the same frame.
pub fn sample(frames: &[AnimationFrame], elapsed_ms: u64) -> Option<u32> {
    let total: u64 = frames.iter().map(|frame| u64::from(frame.duration_ms)).sum();
    if total == 0 {
        return None;
    }
    let mut t = elapsed_ms % total;
    for frame in frames {
        let duration = u64::from(frame.duration_ms);
        if t < duration {
            return Some(frame.tile_id);
        }
        t -= duration;
    }
    None
}

/// Facing derived from the dominant velocity axis, in y-down authoring space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    North,
    South,
    East,
    West,
}

impl Facing {
    pub fn letter(self) -> char {
        match self {
            Facing::North => 'n',
            Facing::South => 's',
            Facing::East => 'e',
            Facing::West => 'w',
        }
    }

    /// Dominant-axis facing; `None` for zero velocity (facing is retained).
    /// Ties go to the horizontal axis.
    pub fn from_velocity(velocity: Vec2) -> Option<Self> {
        if velocity == Vec2::ZERO {
            return None;
        }
        if velocity.x.abs() >= velocity.y.abs() {
            Some(if velocity.x >= 0.0 { Facing::East } else { Facing::West })
        } else {
            Some(if velocity.y >= 0.0 { Facing::South } else { Facing::North })
        }
    }
}

impl Default for Facing {
    fn default() -> Self {
        Facing::South
    }
}

/// Semantic class string for a movement-animated entity: "idle", "walk" or
/// "run" by speed, suffixed with the facing letter.
pub fn motion_class(speed: f32, facing: Facing, idle_epsilon: f32, run_threshold: f32) -> String {
    let base = if speed <= idle_epsilon {
        "idle"
    } else if speed > run_threshold {
        "run"
    } else {
        "walk"
    };
    format!("{base}_{}", facing.letter())
}
