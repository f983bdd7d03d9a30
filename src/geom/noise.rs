//! Coherent 3D noise fields used by noise-driven selection.
//!
//! All samplers are deterministic lattice noises driven by an integer hash,
//! so the same seed and position always produce the same value on every
//! platform. Output is in `[-1, 1]`.

use serde::{Deserialize, Serialize};

use super::core::Point3;
use super::error::{DeformError, DeformResult};

/// Base noise family. The `*Fractal` variants sum several octaves of their
/// base noise according to [`FractalType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NoiseType {
    Value,
    ValueFractal,
    Perlin,
    PerlinFractal,
    #[default]
    Simplex,
    SimplexFractal,
    Cellular,
    WhiteNoise,
}

/// Lattice interpolation curve for value and Perlin noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NoiseInterpolation {
    Linear,
    Hermite,
    #[default]
    Quintic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FractalType {
    #[default]
    Fbm,
    Billow,
    RigidMulti,
}

/// Distance metric between a sample and cellular feature points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CellularDistance {
    #[default]
    Euclidean,
    Manhattan,
    /// Euclidean plus Manhattan; rounder cells than Manhattan alone.
    Natural,
}

/// What a cellular sample reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CellularReturn {
    /// Random per-cell constant of the nearest feature point.
    #[default]
    CellValue,
    /// Distance to the nearest feature point.
    Distance,
}

/// Parameters of a noise field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseOptions {
    pub seed: i32,
    pub frequency: f64,
    pub interpolation: NoiseInterpolation,
    pub noise: NoiseType,
    pub octaves: u32,
    pub lacunarity: f64,
    pub gain: f64,
    pub fractal: FractalType,
    pub cellular_distance: CellularDistance,
    pub cellular_return: CellularReturn,
}

impl Default for NoiseOptions {
    fn default() -> Self {
        Self {
            seed: 1337,
            frequency: 0.01,
            interpolation: NoiseInterpolation::Quintic,
            noise: NoiseType::Simplex,
            octaves: 3,
            lacunarity: 2.0,
            gain: 0.5,
            fractal: FractalType::Fbm,
            cellular_distance: CellularDistance::Euclidean,
            cellular_return: CellularReturn::CellValue,
        }
    }
}

impl NoiseOptions {
    #[must_use]
    pub fn new(noise: NoiseType, seed: i32, frequency: f64) -> Self {
        Self {
            noise,
            seed,
            frequency,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: i32) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub const fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    #[must_use]
    pub const fn with_noise(mut self, noise: NoiseType) -> Self {
        self.noise = noise;
        self
    }

    #[must_use]
    pub const fn with_interpolation(mut self, interpolation: NoiseInterpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    #[must_use]
    pub const fn with_fractal(mut self, fractal: FractalType, octaves: u32, lacunarity: f64, gain: f64) -> Self {
        self.fractal = fractal;
        self.octaves = octaves;
        self.lacunarity = lacunarity;
        self.gain = gain;
        self
    }

    #[must_use]
    pub const fn with_cellular(mut self, distance: CellularDistance, ret: CellularReturn) -> Self {
        self.cellular_distance = distance;
        self.cellular_return = ret;
        self
    }

    /// # Errors
    /// [`DeformError::InvalidRange`] for non-finite parameters or zero octaves.
    pub fn validate(&self) -> DeformResult<()> {
        if !self.frequency.is_finite() {
            return Err(DeformError::invalid(format!(
                "noise frequency must be finite, got {}",
                self.frequency
            )));
        }
        if !self.lacunarity.is_finite() || !self.gain.is_finite() {
            return Err(DeformError::invalid("noise lacunarity and gain must be finite"));
        }
        if self.octaves == 0 {
            return Err(DeformError::invalid("noise octaves must be at least 1"));
        }
        Ok(())
    }

    /// Samples the field at `p` (frequency applied here). Result is in `[-1, 1]`.
    #[must_use]
    pub fn sample(&self, p: Point3) -> f64 {
        let x = p.x * self.frequency;
        let y = p.y * self.frequency;
        let z = p.z * self.frequency;

        let value = match self.noise {
            NoiseType::Value => value_noise(self.seed, x, y, z, self.interpolation),
            NoiseType::Perlin => perlin_noise(self.seed, x, y, z, self.interpolation),
            NoiseType::Simplex => simplex_noise(self.seed, x, y, z),
            NoiseType::ValueFractal => {
                self.fractal_sum(x, y, z, |s, x, y, z| value_noise(s, x, y, z, self.interpolation))
            }
            NoiseType::PerlinFractal => {
                self.fractal_sum(x, y, z, |s, x, y, z| perlin_noise(s, x, y, z, self.interpolation))
            }
            NoiseType::SimplexFractal => self.fractal_sum(x, y, z, simplex_noise),
            NoiseType::Cellular => {
                cellular_noise(self.seed, x, y, z, self.cellular_distance, self.cellular_return)
            }
            NoiseType::WhiteNoise => white_noise(self.seed, x, y, z),
        };

        value.clamp(-1.0, 1.0)
    }

    /// Octave sum normalized by total amplitude; each octave bumps the seed.
    fn fractal_sum(&self, x: f64, y: f64, z: f64, base: impl Fn(i32, f64, f64, f64) -> f64) -> f64 {
        let mut seed = self.seed;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut sum = 0.0;
        let mut amplitude_sum = 0.0;

        for _ in 0..self.octaves.max(1) {
            let n = base(seed, x * frequency, y * frequency, z * frequency);
            let shaped = match self.fractal {
                FractalType::Fbm => n,
                FractalType::Billow => n.abs() * 2.0 - 1.0,
                FractalType::RigidMulti => (1.0 - n.abs()) * 2.0 - 1.0,
            };
            sum += shaped * amplitude;
            amplitude_sum += amplitude.abs();

            seed = seed.wrapping_add(1);
            amplitude *= self.gain;
            frequency *= self.lacunarity;
        }

        if amplitude_sum > 0.0 { sum / amplitude_sum } else { 0.0 }
    }
}

const PRIME_X: i32 = 374_761_393;
const PRIME_Y: i32 = 668_265_263;
const PRIME_Z: i32 = 1_274_126_177;

fn hash3(seed: i32, x: i32, y: i32, z: i32) -> i32 {
    let mut n = x
        .wrapping_mul(PRIME_X)
        .wrapping_add(y.wrapping_mul(PRIME_Y))
        .wrapping_add(z.wrapping_mul(PRIME_Z))
        .wrapping_add(seed);
    n ^= n >> 13;
    n.wrapping_mul(
        n.wrapping_mul(n.wrapping_mul(60_493).wrapping_add(19_990_303))
            .wrapping_add(1_376_312_589),
    )
}

/// Hash mapped to `[-1, 1]`.
fn value_coord(seed: i32, x: i32, y: i32, z: i32) -> f64 {
    (hash3(seed, x, y, z) as u32) as f64 / u32::MAX as f64 * 2.0 - 1.0
}

/// Hash mapped to `[0, 1)`.
fn unit_coord(seed: i32, x: i32, y: i32, z: i32) -> f64 {
    (hash3(seed, x, y, z) as u32) as f64 / (u32::MAX as f64 + 1.0)
}

const GRAD3: [[f64; 3]; 12] = [
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [1.0, 0.0, 1.0],
    [-1.0, 0.0, 1.0],
    [1.0, 0.0, -1.0],
    [-1.0, 0.0, -1.0],
    [0.0, 1.0, 1.0],
    [0.0, -1.0, 1.0],
    [0.0, 1.0, -1.0],
    [0.0, -1.0, -1.0],
];

fn grad_dot(seed: i32, xi: i32, yi: i32, zi: i32, dx: f64, dy: f64, dz: f64) -> f64 {
    let g = GRAD3[(hash3(seed, xi, yi, zi) as u32 % 12) as usize];
    g[0] * dx + g[1] * dy + g[2] * dz
}

fn fade(t: f64, interpolation: NoiseInterpolation) -> f64 {
    match interpolation {
        NoiseInterpolation::Linear => t,
        NoiseInterpolation::Hermite => t * t * (3.0 - 2.0 * t),
        NoiseInterpolation::Quintic => t * t * t * (t * (t * 6.0 - 15.0) + 10.0),
    }
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lattice(x: f64, y: f64, z: f64) -> ([i32; 3], [f64; 3]) {
    let (fx, fy, fz) = (x.floor(), y.floor(), z.floor());
    ([fx as i32, fy as i32, fz as i32], [x - fx, y - fy, z - fz])
}

fn value_noise(seed: i32, x: f64, y: f64, z: f64, interpolation: NoiseInterpolation) -> f64 {
    let ([xi, yi, zi], [xf, yf, zf]) = lattice(x, y, z);
    let (u, v, w) = (fade(xf, interpolation), fade(yf, interpolation), fade(zf, interpolation));
    let (x1, y1, z1) = (xi.wrapping_add(1), yi.wrapping_add(1), zi.wrapping_add(1));

    let n00 = lerp(value_coord(seed, xi, yi, zi), value_coord(seed, x1, yi, zi), u);
    let n10 = lerp(value_coord(seed, xi, y1, zi), value_coord(seed, x1, y1, zi), u);
    let n01 = lerp(value_coord(seed, xi, yi, z1), value_coord(seed, x1, yi, z1), u);
    let n11 = lerp(value_coord(seed, xi, y1, z1), value_coord(seed, x1, y1, z1), u);

    lerp(lerp(n00, n10, v), lerp(n01, n11, v), w)
}

fn perlin_noise(seed: i32, x: f64, y: f64, z: f64, interpolation: NoiseInterpolation) -> f64 {
    let ([xi, yi, zi], [xf, yf, zf]) = lattice(x, y, z);
    let (u, v, w) = (fade(xf, interpolation), fade(yf, interpolation), fade(zf, interpolation));
    let (x1, y1, z1) = (xi.wrapping_add(1), yi.wrapping_add(1), zi.wrapping_add(1));
    let (xb, yb, zb) = (xf - 1.0, yf - 1.0, zf - 1.0);

    let n00 = lerp(
        grad_dot(seed, xi, yi, zi, xf, yf, zf),
        grad_dot(seed, x1, yi, zi, xb, yf, zf),
        u,
    );
    let n10 = lerp(
        grad_dot(seed, xi, y1, zi, xf, yb, zf),
        grad_dot(seed, x1, y1, zi, xb, yb, zf),
        u,
    );
    let n01 = lerp(
        grad_dot(seed, xi, yi, z1, xf, yf, zb),
        grad_dot(seed, x1, yi, z1, xb, yf, zb),
        u,
    );
    let n11 = lerp(
        grad_dot(seed, xi, y1, z1, xf, yb, zb),
        grad_dot(seed, x1, y1, z1, xb, yb, zb),
        u,
    );

    lerp(lerp(n00, n10, v), lerp(n01, n11, v), w)
}

fn simplex_noise(seed: i32, x: f64, y: f64, z: f64) -> f64 {
    const F3: f64 = 1.0 / 3.0;
    const G3: f64 = 1.0 / 6.0;

    let s = (x + y + z) * F3;
    let (i, j, k) = ((x + s).floor(), (y + s).floor(), (z + s).floor());
    let t = (i + j + k) * G3;
    let x0 = x - (i - t);
    let y0 = y - (j - t);
    let z0 = z - (k - t);

    // Simplex corner offsets from the ordering of the in-cell coordinates.
    let (o1, o2): ([i32; 3], [i32; 3]) = if x0 >= y0 {
        if y0 >= z0 {
            ([1, 0, 0], [1, 1, 0])
        } else if x0 >= z0 {
            ([1, 0, 0], [1, 0, 1])
        } else {
            ([0, 0, 1], [1, 0, 1])
        }
    } else if y0 < z0 {
        ([0, 0, 1], [0, 1, 1])
    } else if x0 < z0 {
        ([0, 1, 0], [0, 1, 1])
    } else {
        ([0, 1, 0], [1, 1, 0])
    };

    let (ii, jj, kk) = (i as i32, j as i32, k as i32);
    let corners = [
        ([0, 0, 0], [x0, y0, z0]),
        (
            o1,
            [
                x0 - f64::from(o1[0]) + G3,
                y0 - f64::from(o1[1]) + G3,
                z0 - f64::from(o1[2]) + G3,
            ],
        ),
        (
            o2,
            [
                x0 - f64::from(o2[0]) + 2.0 * G3,
                y0 - f64::from(o2[1]) + 2.0 * G3,
                z0 - f64::from(o2[2]) + 2.0 * G3,
            ],
        ),
        ([1, 1, 1], [x0 - 1.0 + 3.0 * G3, y0 - 1.0 + 3.0 * G3, z0 - 1.0 + 3.0 * G3]),
    ];

    let sum: f64 = corners
        .iter()
        .map(|(o, [dx, dy, dz])| {
            let t = 0.6 - dx * dx - dy * dy - dz * dz;
            if t <= 0.0 {
                return 0.0;
            }
            let t2 = t * t;
            t2 * t2
                * grad_dot(
                    seed,
                    ii.wrapping_add(o[0]),
                    jj.wrapping_add(o[1]),
                    kk.wrapping_add(o[2]),
                    *dx,
                    *dy,
                    *dz,
                )
        })
        .sum();

    32.0 * sum
}

fn cellular_noise(
    seed: i32,
    x: f64,
    y: f64,
    z: f64,
    metric: CellularDistance,
    ret: CellularReturn,
) -> f64 {
    let ([xi, yi, zi], _) = lattice(x, y, z);
    let mut best_distance = f64::INFINITY;
    let mut best_cell = [xi, yi, zi];

    for cx in xi.wrapping_sub(1)..=xi.wrapping_add(1) {
        for cy in yi.wrapping_sub(1)..=yi.wrapping_add(1) {
            for cz in zi.wrapping_sub(1)..=zi.wrapping_add(1) {
                // One jittered feature point per cell.
                let fx = f64::from(cx) + unit_coord(seed, cx, cy, cz);
                let fy = f64::from(cy) + unit_coord(seed.wrapping_add(1), cx, cy, cz);
                let fz = f64::from(cz) + unit_coord(seed.wrapping_add(2), cx, cy, cz);
                let (dx, dy, dz) = (fx - x, fy - y, fz - z);

                let d = match metric {
                    CellularDistance::Euclidean => (dx * dx + dy * dy + dz * dz).sqrt(),
                    CellularDistance::Manhattan => dx.abs() + dy.abs() + dz.abs(),
                    CellularDistance::Natural => {
                        (dx.abs() + dy.abs() + dz.abs()) + (dx * dx + dy * dy + dz * dz)
                    }
                };
                if d < best_distance {
                    best_distance = d;
                    best_cell = [cx, cy, cz];
                }
            }
        }
    }

    match ret {
        CellularReturn::CellValue => {
            value_coord(seed.wrapping_add(3), best_cell[0], best_cell[1], best_cell[2])
        }
        CellularReturn::Distance => best_distance * 2.0 - 1.0,
    }
}

fn white_noise(seed: i32, x: f64, y: f64, z: f64) -> f64 {
    let fold = |v: f64| {
        let bits = v.to_bits();
        (bits ^ (bits >> 32)) as i32
    };
    value_coord(seed, fold(x), fold(y), fold(z))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid(options: &NoiseOptions) -> Vec<f64> {
        (0..200)
            .map(|i| {
                let t = i as f64;
                options.sample(Point3::new(t * 3.1, t * 1.7 - 50.0, t * 0.9 + 12.0))
            })
            .collect()
    }

    #[test]
    fn test_every_noise_type_stays_in_range() {
        let types = [
            NoiseType::Value,
            NoiseType::ValueFractal,
            NoiseType::Perlin,
            NoiseType::PerlinFractal,
            NoiseType::Simplex,
            NoiseType::SimplexFractal,
            NoiseType::Cellular,
            NoiseType::WhiteNoise,
        ];
        for noise in types {
            let options = NoiseOptions::default().with_noise(noise).with_frequency(0.137);
            for v in sample_grid(&options) {
                assert!((-1.0..=1.0).contains(&v), "{noise:?} produced {v}");
            }
        }
    }

    #[test]
    fn test_deterministic_per_seed() {
        let a = NoiseOptions::default().with_frequency(0.05);
        assert_eq!(sample_grid(&a), sample_grid(&a));

        let b = a.with_seed(7);
        assert_ne!(sample_grid(&a), sample_grid(&b));
    }

    #[test]
    fn test_value_noise_is_continuous() {
        let options = NoiseOptions::new(NoiseType::Value, 42, 1.0);
        let a = options.sample(Point3::new(0.5, 0.5, 0.5));
        let b = options.sample(Point3::new(0.5001, 0.5, 0.5));
        assert!((a - b).abs() < 1e-3);
    }

    #[test]
    fn test_zero_octaves_rejected() {
        let options = NoiseOptions::default().with_fractal(FractalType::Fbm, 0, 2.0, 0.5);
        assert!(options.validate().is_err());
        assert!(NoiseOptions::default().validate().is_ok());
    }
}
