//! Spline and profile-curve services.
//!
//! The deformation core only needs a curve that can report a location and an
//! orientation frame at a normalized position, plus optional scalar profile
//! curves. [`PolylineSpline`] and [`LinearFloatCurve`] are self-contained
//! implementations for hosts without their own spline system.

use super::core::{Point3, Tolerance, Vec3};
use super::error::{DeformError, DeformResult};

/// Location and orientation of a spline at one normalized position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplineSample {
    pub location: Point3,
    /// Direction of travel. Need not be unit length.
    pub tangent: Vec3,
    /// Up vector; should be roughly orthogonal to `tangent`.
    pub up: Vec3,
}

/// A curve evaluated by normalized position in `[0, 1]`, in world space.
pub trait SplineEvaluator {
    fn evaluate(&self, position: f64) -> SplineSample;

    /// Arc length of the whole curve.
    fn length(&self) -> f64;
}

/// Scalar curve keyed by position.
pub trait FloatCurve {
    fn value_at(&self, position: f64) -> f64;
}

impl<F> FloatCurve for F
where
    F: Fn(f64) -> f64,
{
    fn value_at(&self, position: f64) -> f64 {
        self(position)
    }
}

/// Arc-length parameterized polyline with a reference-up frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PolylineSpline {
    points: Vec<Point3>,
    /// Arc length at each point; same length as `points`, strictly increasing.
    cumulative: Vec<f64>,
    reference_up: Vec3,
}

impl PolylineSpline {
    /// Builds a polyline through `points`; consecutive duplicates are dropped.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] for non-finite points or fewer than two
    /// distinct points.
    pub fn new(points: impl IntoIterator<Item = Point3>) -> DeformResult<Self> {
        let tol = Tolerance::ZERO_LENGTH;
        let mut kept: Vec<Point3> = Vec::new();
        let mut cumulative: Vec<f64> = Vec::new();

        for p in points {
            if !p.is_finite() {
                return Err(DeformError::invalid("spline point is not finite"));
            }
            match kept.last() {
                None => {
                    kept.push(p);
                    cumulative.push(0.0);
                }
                Some(&last) => {
                    let d = last.distance_to(p);
                    if d > tol.eps {
                        let total = cumulative.last().copied().unwrap_or(0.0);
                        kept.push(p);
                        cumulative.push(total + d);
                    }
                }
            }
        }

        if kept.len() < 2 {
            return Err(DeformError::invalid(
                "spline needs at least two distinct points",
            ));
        }

        Ok(Self {
            points: kept,
            cumulative,
            reference_up: Vec3::Z,
        })
    }

    /// Up direction the frame is built against (default +Z).
    #[must_use]
    pub fn with_reference_up(mut self, up: Vec3) -> Self {
        self.reference_up = up.normalized().unwrap_or(Vec3::Z);
        self
    }

    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    fn total_length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }
}

impl SplineEvaluator for PolylineSpline {
    fn evaluate(&self, position: f64) -> SplineSample {
        let target = position.clamp(0.0, 1.0) * self.total_length();

        // First segment whose end reaches the target distance.
        let end = self
            .cumulative
            .partition_point(|&d| d < target)
            .clamp(1, self.points.len() - 1);
        let start = end - 1;

        let seg_len = self.cumulative[end] - self.cumulative[start];
        let t = ((target - self.cumulative[start]) / seg_len).clamp(0.0, 1.0);
        let a = self.points[start];
        let b = self.points[end];
        let tangent = b.sub_point(a).normalized().unwrap_or(Vec3::X);

        SplineSample {
            location: a.lerp(b, t),
            tangent,
            up: frame_up(tangent, self.reference_up),
        }
    }

    fn length(&self) -> f64 {
        self.total_length()
    }
}

/// `reference_up` with its tangent component removed.
fn frame_up(tangent: Vec3, reference_up: Vec3) -> Vec3 {
    let lateral = reference_up - tangent * reference_up.dot(tangent);
    lateral
        .normalized()
        .unwrap_or_else(|| orthogonal_unit_vector(tangent))
}

/// Some unit vector orthogonal to `v`.
pub(crate) fn orthogonal_unit_vector(v: Vec3) -> Vec3 {
    let (ax, ay, az) = (v.x.abs(), v.y.abs(), v.z.abs());
    let pick = if ax <= ay && ax <= az {
        Vec3::X
    } else if ay <= az {
        Vec3::Y
    } else {
        Vec3::Z
    };
    v.cross(pick).normalized().unwrap_or(Vec3::Z)
}

/// Piecewise-linear float curve; constant beyond the first and last keys.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFloatCurve {
    keys: Vec<(f64, f64)>,
}

impl LinearFloatCurve {
    /// # Errors
    /// [`DeformError::InvalidRange`] if `keys` is empty or holds non-finite values.
    pub fn new(keys: impl IntoIterator<Item = (f64, f64)>) -> DeformResult<Self> {
        let mut keys: Vec<(f64, f64)> = keys.into_iter().collect();
        if keys.is_empty() {
            return Err(DeformError::invalid("float curve needs at least one key"));
        }
        if keys.iter().any(|(t, v)| !t.is_finite() || !v.is_finite()) {
            return Err(DeformError::invalid("float curve key is not finite"));
        }
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self { keys })
    }

    /// Curve that always returns `value`.
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self {
            keys: vec![(0.0, value)],
        }
    }

    #[must_use]
    pub fn keys(&self) -> &[(f64, f64)] {
        &self.keys
    }
}

impl FloatCurve for LinearFloatCurve {
    fn value_at(&self, position: f64) -> f64 {
        let idx = self.keys.partition_point(|&(t, _)| t <= position);
        match (idx.checked_sub(1).and_then(|i| self.keys.get(i)), self.keys.get(idx)) {
            (Some(&(_, v)), None) | (None, Some(&(_, v))) => v,
            (Some(&(t0, v0)), Some(&(t1, v1))) => {
                let span = t1 - t0;
                if span <= Tolerance::ZERO_LENGTH.eps {
                    v1
                } else {
                    v0 + (v1 - v0) * ((position - t0) / span)
                }
            }
            (None, None) => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polyline_rejects_single_point() {
        let err = PolylineSpline::new([Point3::ORIGIN, Point3::ORIGIN]);
        assert!(matches!(err, Err(DeformError::InvalidRange(_))));
    }

    #[test]
    fn test_polyline_arc_length_parameterization() {
        let spline = PolylineSpline::new([
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.0, 30.0, 0.0),
        ])
        .unwrap();
        assert!((spline.length() - 40.0).abs() < 1e-12);

        let quarter = spline.evaluate(0.25);
        assert!(Tolerance::DEFAULT.approx_eq_point3(quarter.location, Point3::new(10.0, 0.0, 0.0)));

        let half = spline.evaluate(0.5);
        assert!(Tolerance::DEFAULT.approx_eq_point3(half.location, Point3::new(10.0, 10.0, 0.0)));
        assert!((half.tangent.y - 1.0).abs() < 1e-12);
        assert!((half.up.z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_vertical_polyline_up_is_orthogonal() {
        let spline = PolylineSpline::new([Point3::ORIGIN, Point3::new(0.0, 0.0, 5.0)]).unwrap();
        let s = spline.evaluate(0.5);
        assert!(s.up.dot(s.tangent).abs() < 1e-12);
        assert!((s.up.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_float_curve_clamps_outside_keys() {
        let curve = LinearFloatCurve::new([(1.0, 3.0), (0.0, 1.0)]).unwrap();
        assert_eq!(curve.value_at(-1.0), 1.0);
        assert_eq!(curve.value_at(2.0), 3.0);
        assert!((curve.value_at(0.25) - 1.5).abs() < 1e-12);
        assert_eq!(LinearFloatCurve::constant(4.0).value_at(100.0), 4.0);
    }
}
