//! Parametric track curves
//!
//! Every path is either a straight line (two points) or a cubic Bezier curve
//! (four control points). Queries are parameterized by `progress`, the Bezier
//! parameter in [0, 1]. Callers treat progress as if it were distance along
//! the curve; the chosen curves are close enough to uniform that this holds
//! for gameplay, but it is not exact.
//!
//! Local coordinates: the owning cell is the unit square centred on the origin.
//! All path endpoints lie on its corners, except the inner ends of `Half` and
//! `HalfLeft`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{normalize_angle, normalize_rotation_quarters, quarters_to_radians, rotate_quarters};

/// Control-point offset that makes a cubic Bezier approximate a quarter circle
const QUARTER_CIRCLE_KAPPA: f32 = 0.552_284_8;

/// Discrete curve shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum PathShape {
    #[default]
    None,
    /// Along the bottom edge, left corner to right corner
    Straight,
    /// Quarter circle, bottom-left corner to top-right corner, turning left
    Curve,
    /// S-bend, bottom-left to top-right, leaving and arriving horizontally
    JogLeft,
    /// S-bend, top-left to bottom-right, leaving and arriving horizontally
    JogRight,
    /// Along the bottom edge, from its midpoint to the right corner
    Half,
    /// Mirror image of `Half`: from the bottom midpoint to the left corner
    HalfLeft,
}

impl PathShape {
    pub const COUNT: usize = 7;

    pub const ALL: [PathShape; Self::COUNT] = [
        PathShape::None,
        PathShape::Straight,
        PathShape::Curve,
        PathShape::JogLeft,
        PathShape::JogRight,
        PathShape::Half,
        PathShape::HalfLeft,
    ];

    /// Design arc length in cell units (independent of rotation)
    pub fn length(self) -> f32 {
        match self {
            PathShape::None => 0.0,
            PathShape::Straight => 1.0,
            PathShape::Curve => 1.571,
            PathShape::JogLeft | PathShape::JogRight => 1.495,
            PathShape::Half | PathShape::HalfLeft => 0.5,
        }
    }

    /// Whether the shape is a straight line
    pub fn is_linear(self) -> bool {
        matches!(self, PathShape::Straight | PathShape::Half | PathShape::HalfLeft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Form {
    Empty,
    Linear {
        points: [Vec2; 2],
    },
    /// Polynomial form: B(t) = ((a·t + b)·t + c)·t + p0, stored per axis as [a, b, c]
    Cubic {
        points: [Vec2; 4],
        coefficients_x: [f32; 3],
        coefficients_y: [f32; 3],
    },
}

impl Form {
    fn for_shape(shape: PathShape) -> Self {
        let k = QUARTER_CIRCLE_KAPPA;
        match shape {
            PathShape::None => Form::Empty,
            PathShape::Straight => Form::Linear {
                points: [Vec2::new(-0.5, -0.5), Vec2::new(0.5, -0.5)],
            },
            PathShape::Half => Form::Linear {
                points: [Vec2::new(0.0, -0.5), Vec2::new(0.5, -0.5)],
            },
            PathShape::HalfLeft => Form::Linear {
                points: [Vec2::new(0.0, -0.5), Vec2::new(-0.5, -0.5)],
            },
            PathShape::Curve => Form::cubic([
                Vec2::new(-0.5, -0.5),
                Vec2::new(-0.5 + k, -0.5),
                Vec2::new(0.5, 0.5 - k),
                Vec2::new(0.5, 0.5),
            ]),
            PathShape::JogLeft => Form::cubic([
                Vec2::new(-0.5, -0.5),
                Vec2::new(0.0, -0.5),
                Vec2::new(0.0, 0.5),
                Vec2::new(0.5, 0.5),
            ]),
            PathShape::JogRight => Form::cubic([
                Vec2::new(-0.5, 0.5),
                Vec2::new(0.0, 0.5),
                Vec2::new(0.0, -0.5),
                Vec2::new(0.5, -0.5),
            ]),
        }
    }

    fn cubic(points: [Vec2; 4]) -> Self {
        let c = 3.0 * (points[1] - points[0]);
        let b = 3.0 * (points[2] - points[1]) - c;
        let a = points[3] - points[0] - c - b;
        Form::Cubic {
            points,
            coefficients_x: [a.x, b.x, c.x],
            coefficients_y: [a.y, b.y, c.y],
        }
    }
}

/// Result of a nearest-point search along a path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    pub progress: f32,
    pub point: Vec2,
    pub distance: f32,
}

/// One curve shape at one quarter-turn rotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Path {
    shape: PathShape,
    /// Counter-clockwise quarter turns, normalized to [0, 3]
    rotation_quarters: i32,
    form: Form,
}

impl Default for Path {
    fn default() -> Self {
        Self::new(PathShape::None, 0)
    }
}

impl Path {
    pub fn new(shape: PathShape, rotation_quarters: i32) -> Self {
        Self {
            shape,
            rotation_quarters: normalize_rotation_quarters(rotation_quarters),
            form: Form::for_shape(shape),
        }
    }

    #[inline]
    pub fn shape(&self) -> PathShape {
        self.shape
    }

    #[inline]
    pub fn rotation_quarters(&self) -> i32 {
        self.rotation_quarters
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.shape.length()
    }

    /// Point at `progress`, rotated into place
    ///
    /// Progress is not clamped.
    pub fn point(&self, progress: f32) -> Vec2 {
        let local = match self.form {
            Form::Empty => Vec2::ZERO,
            Form::Linear { points } => points[0].lerp(points[1], progress),
            Form::Cubic {
                points,
                coefficients_x: cx,
                coefficients_y: cy,
            } => {
                let t = progress;
                Vec2::new(
                    ((cx[0] * t + cx[1]) * t + cx[2]) * t + points[0].x,
                    ((cy[0] * t + cy[1]) * t + cy[2]) * t + points[0].y,
                )
            }
        };
        rotate_quarters(local, self.rotation_quarters)
    }

    /// Direction of increasing progress at `progress`, as an angle in (-π, π]
    pub fn tangent(&self, progress: f32) -> f32 {
        let direction = match self.form {
            Form::Empty => return 0.0,
            Form::Linear { points } => points[1] - points[0],
            Form::Cubic {
                coefficients_x: cx,
                coefficients_y: cy,
                ..
            } => {
                let t = progress;
                Vec2::new(
                    (3.0 * cx[0] * t + 2.0 * cx[1]) * t + cx[2],
                    (3.0 * cy[0] * t + 2.0 * cy[1]) * t + cy[2],
                )
            }
        };
        normalize_angle(direction.y.atan2(direction.x) + quarters_to_radians(self.rotation_quarters))
    }

    /// Approximate nearest point to `target` by sampling every `precision` of progress
    ///
    /// Both endpoints are always sampled. Panics if `precision` is not positive.
    pub fn closest_point(&self, target: Vec2, precision: f32) -> ClosestPoint {
        assert!(precision > 0.0, "progress precision must be positive");
        let steps = (1.0 / precision).ceil() as usize;

        let mut best = ClosestPoint {
            progress: 0.0,
            point: self.point(0.0),
            distance: self.point(0.0).distance(target),
        };
        for i in 1..=steps {
            let progress = (i as f32 * precision).min(1.0);
            let point = self.point(progress);
            let distance = point.distance(target);
            if distance < best.distance {
                best = ClosestPoint {
                    progress,
                    point,
                    distance,
                };
            }
        }
        best
    }
}
