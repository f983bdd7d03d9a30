//! Texture sampling service used by texture-driven selection.

use serde::{Deserialize, Serialize};

use super::error::{DeformError, DeformResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextureChannel {
    #[default]
    Red,
    Green,
    Blue,
    Alpha,
}

impl TextureChannel {
    const fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
            Self::Alpha => 3,
        }
    }
}

/// Anything that can report a channel value at a UV coordinate.
///
/// Values are expected in `[0, 1]`; callers clamp what they get back.
pub trait TextureSampler {
    fn sample(&self, uv: [f64; 2], channel: TextureChannel) -> f64;
}

/// Row-major RGBA grid with bilinear filtering and clamped UVs.
///
/// `uv = (0, 0)` maps to texel `(0, 0)` and `uv = (1, 1)` to the last texel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridTextureData")]
pub struct GridTexture {
    width: usize,
    height: usize,
    texels: Vec<[f64; 4]>,
}

#[derive(Deserialize)]
struct GridTextureData {
    width: usize,
    height: usize,
    texels: Vec<[f64; 4]>,
}

impl TryFrom<GridTextureData> for GridTexture {
    type Error = DeformError;

    fn try_from(data: GridTextureData) -> DeformResult<Self> {
        Self::new(data.width, data.height, data.texels)
    }
}

impl GridTexture {
    /// # Errors
    /// [`DeformError::InvalidRange`] when the dimensions are zero or disagree
    /// with the texel count, or a texel is not finite.
    pub fn new(width: usize, height: usize, texels: Vec<[f64; 4]>) -> DeformResult<Self> {
        if width == 0 || height == 0 || texels.len() != width * height {
            return Err(DeformError::invalid(format!(
                "texture {width}x{height} needs {} texels, got {}",
                width.saturating_mul(height),
                texels.len()
            )));
        }
        if texels.iter().flatten().any(|v| !v.is_finite()) {
            return Err(DeformError::invalid("texture contains non-finite texels"));
        }
        Ok(Self {
            width,
            height,
            texels,
        })
    }

    /// Single-channel grid; the value is written to every channel.
    ///
    /// # Errors
    /// Same as [`GridTexture::new`].
    pub fn from_luminance(width: usize, height: usize, values: &[f64]) -> DeformResult<Self> {
        Self::new(width, height, values.iter().map(|&v| [v; 4]).collect())
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    fn texel(&self, x: usize, y: usize, channel: usize) -> f64 {
        self.texels[y * self.width + x][channel]
    }
}

impl TextureSampler for GridTexture {
    fn sample(&self, uv: [f64; 2], channel: TextureChannel) -> f64 {
        let c = channel.index();
        let u = if uv[0].is_finite() { uv[0].clamp(0.0, 1.0) } else { 0.0 };
        let v = if uv[1].is_finite() { uv[1].clamp(0.0, 1.0) } else { 0.0 };

        let x = u * (self.width - 1) as f64;
        let y = v * (self.height - 1) as f64;
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x - x0 as f64;
        let fy = y - y0 as f64;

        self.texel(x0, y0, c) * (1.0 - fx) * (1.0 - fy)
            + self.texel(x1, y0, c) * fx * (1.0 - fy)
            + self.texel(x0, y1, c) * (1.0 - fx) * fy
            + self.texel(x1, y1, c) * fx * fy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bilinear_center() {
        let tex = GridTexture::from_luminance(2, 2, &[0.0, 1.0, 0.0, 1.0]).unwrap();
        assert!((tex.sample([0.5, 0.5], TextureChannel::Red) - 0.5).abs() < 1e-12);
        assert_eq!(tex.sample([1.0, 0.0], TextureChannel::Alpha), 1.0);
    }

    #[test]
    fn test_uv_clamped() {
        let tex = GridTexture::from_luminance(2, 1, &[0.25, 0.75]).unwrap();
        assert_eq!(tex.sample([-3.0, 0.0], TextureChannel::Green), 0.25);
        assert_eq!(tex.sample([9.0, 9.0], TextureChannel::Blue), 0.75);
    }

    #[test]
    fn test_channels_are_separate() {
        let tex = GridTexture::new(1, 1, vec![[0.1, 0.2, 0.3, 0.4]]).unwrap();
        assert_eq!(tex.sample([0.3, 0.3], TextureChannel::Blue), 0.3);
    }

    #[test]
    fn test_dimension_mismatch() {
        assert!(GridTexture::new(2, 2, vec![[0.0; 4]; 3]).is_err());
    }

    #[test]
    fn test_deserialize_goes_through_validation() {
        let empty = r#"{"width":0,"height":1,"texels":[]}"#;
        assert!(serde_json::from_str::<GridTexture>(empty).is_err());

        let tex = GridTexture::from_luminance(2, 1, &[0.25, 0.75]).unwrap();
        let json = serde_json::to_string(&tex).unwrap();
        let back: GridTexture = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tex);
    }
}
