use serde::{Deserialize, Serialize};

/// Discrete zoom steps. Zooming never interpolates between them.
pub const SCALE_LADDER: [f32; 8] = [1.0, 1.2, 1.3, 1.5, 1.7, 2.0, 2.5, 3.0];

const SCALE_EPSILON: f32 = 0.0005;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Accepts any multiple of 90, including negative ones.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        match degrees.rem_euclid(360) {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    pub fn rotated_by(self, delta_degrees: i32) -> Self {
        let total = i32::from(self.degrees()) + delta_degrees.rem_euclid(360);
        Self::from_degrees(total - total % 90).unwrap_or(self)
    }

    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollMode {
    #[default]
    Vertical,
    Horizontal,
    Wrapped,
}

impl ScrollMode {
    pub fn id(self) -> &'static str {
        match self {
            Self::Vertical => "vertical",
            Self::Horizontal => "horizontal",
            Self::Wrapped => "wrapped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "vertical" => Some(Self::Vertical),
            "horizontal" => Some(Self::Horizontal),
            "wrapped" => Some(Self::Wrapped),
            _ => None,
        }
    }
}

/// Scale, rotation and scroll mode of the whole document view.
///
/// Scale is stored as a ladder position so that stepping in and back out is
/// exact. Every setter returns whether the value actually changed; requests
/// that fall outside the legal range are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewTransform {
    scale_step: usize,
    rotation: Rotation,
    scroll_mode: ScrollMode,
}

impl ViewTransform {
    pub fn scale(&self) -> f32 {
        SCALE_LADDER[self.scale_step]
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn scroll_mode(&self) -> ScrollMode {
        self.scroll_mode
    }

    pub fn zoom_in(&mut self) -> bool {
        if self.scale_step + 1 >= SCALE_LADDER.len() {
            return false;
        }
        self.scale_step += 1;
        true
    }

    pub fn zoom_out(&mut self) -> bool {
        if self.scale_step == 0 {
            return false;
        }
        self.scale_step -= 1;
        true
    }

    /// Snaps `value` to the nearest ladder step. Non-finite values and values
    /// outside the ladder's range are ignored.
    pub fn set_scale(&mut self, value: f32) -> bool {
        let Some(step) = nearest_step(value) else {
            return false;
        };
        if step == self.scale_step {
            return false;
        }
        self.scale_step = step;
        true
    }

    pub fn rotate_clockwise(&mut self) -> bool {
        self.rotation = self.rotation.rotated_by(90);
        true
    }

    pub fn rotate_counterclockwise(&mut self) -> bool {
        self.rotation = self.rotation.rotated_by(-90);
        true
    }

    pub fn set_rotation(&mut self, degrees: i32) -> bool {
        let Some(rotation) = Rotation::from_degrees(degrees) else {
            return false;
        };
        if rotation == self.rotation {
            return false;
        }
        self.rotation = rotation;
        true
    }

    pub fn set_scroll_mode(&mut self, mode: ScrollMode) -> bool {
        if mode == self.scroll_mode {
            return false;
        }
        self.scroll_mode = mode;
        true
    }

    pub fn reset(&mut self) {
        self.scale_step = 0;
        self.rotation = Rotation::Deg0;
    }
}

fn nearest_step(value: f32) -> Option<usize> {
    let first = SCALE_LADDER[0];
    let last = SCALE_LADDER[SCALE_LADDER.len() - 1];
    if !value.is_finite() || value < first - SCALE_EPSILON || value > last + SCALE_EPSILON {
        return None;
    }

    SCALE_LADDER
        .iter()
        .enumerate()
        .min_by(|(_, left), (_, right)| {
            (*left - value)
                .abs()
                .total_cmp(&(*right - value).abs())
        })
        .map(|(step, _)| step)
}

#[cfg(test)]
mod tests {
    use super::{Rotation, SCALE_LADDER, ScrollMode, ViewTransform};

    fn at_step(step: usize) -> ViewTransform {
        let mut transform = ViewTransform::default();
        for _ in 0..step {
            transform.zoom_in();
        }
        transform
    }

    #[test]
    fn zoom_in_then_out_returns_to_original_scale() {
        for step in 0..SCALE_LADDER.len() - 1 {
            let mut transform = at_step(step);
            let before = transform.scale();
            assert!(transform.zoom_in());
            assert!(transform.zoom_out());
            assert_eq!(transform.scale(), before);
        }
    }

    #[test]
    fn zoom_is_a_noop_at_ladder_ends() {
        let mut transform = ViewTransform::default();
        assert!(!transform.zoom_out());
        assert_eq!(transform.scale(), 1.0);

        let mut transform = at_step(SCALE_LADDER.len() - 1);
        assert!(!transform.zoom_in());
        assert_eq!(transform.scale(), 3.0);
    }

    #[test]
    fn set_scale_snaps_and_ignores_out_of_range() {
        let mut transform = ViewTransform::default();
        assert!(transform.set_scale(1.49));
        assert_eq!(transform.scale(), 1.5);
        assert!(!transform.set_scale(3.5));
        assert!(!transform.set_scale(0.5));
        assert!(!transform.set_scale(f32::NAN));
        assert_eq!(transform.scale(), 1.5);
    }

    #[test]
    fn rotation_is_sum_of_deltas_mod_360() {
        let deltas = [90, 90, -90, 90, 90, 90, -90, -90, -90, -90, -90];
        let mut transform = ViewTransform::default();
        let mut sum = 0_i32;
        for delta in deltas {
            if delta > 0 {
                transform.rotate_clockwise();
            } else {
                transform.rotate_counterclockwise();
            }
            sum += delta;
            let expected = sum.rem_euclid(360);
            assert_eq!(i32::from(transform.rotation().degrees()), expected);
            assert!([0, 90, 180, 270].contains(&transform.rotation().degrees()));
        }
    }

    #[test]
    fn set_rotation_accepts_multiples_of_ninety_only() {
        let mut transform = ViewTransform::default();
        assert!(transform.set_rotation(-90));
        assert_eq!(transform.rotation(), Rotation::Deg270);
        assert!(!transform.set_rotation(45));
        assert!(transform.set_rotation(720));
        assert_eq!(transform.rotation(), Rotation::Deg0);
    }

    #[test]
    fn scroll_mode_round_trips_through_ids() {
        for mode in [ScrollMode::Vertical, ScrollMode::Horizontal, ScrollMode::Wrapped] {
            assert_eq!(ScrollMode::parse(mode.id()), Some(mode));
        }
        let mut transform = ViewTransform::default();
        assert!(!transform.set_scroll_mode(ScrollMode::Vertical));
        assert!(transform.set_scroll_mode(ScrollMode::Wrapped));
    }
}
