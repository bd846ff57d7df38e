//! Heightmap loading: decode a grayscale image into per-pixel intensities.
//!
//! Intensities are stored as `f32` on a 0..=255 scale regardless of the
//! source bit depth. Only the first channel of each pixel is read, so an RGB
//! image is treated as a heightmap of its red channel.
//!
//! # Invariants
//! - Both dimensions are at least 2, so the grid has at least one strip.
//! - `width * height` fits a `u32` vertex index.

mod generate;

pub use generate::HeightmapKind;

use image::{DynamicImage, GenericImageView, ImageBuffer, ImageFormat, Pixel};
use std::path::{Path, PathBuf};

/// Errors from heightmap operations.
#[derive(Debug, thiserror::Error)]
pub enum HeightmapError {
    #[error("heightmap not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode heightmap: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode heightmap: {0}")]
    Encode(#[source] image::ImageError),
    #[error("heightmap is {width}x{height}, need at least 2x2")]
    TooSmall { width: u32, height: u32 },
    #[error("heightmap is {width}x{height}, too many vertices for 32-bit indices")]
    TooLarge { width: u32, height: u32 },
    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(u8),
    #[error("expected {expected} samples, got {actual}")]
    SampleCount { expected: usize, actual: usize },
}

/// A validated grid of height samples in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightmap {
    width: u32,
    height: u32,
    channels: u8,
    samples: Vec<f32>,
}

impl Heightmap {
    /// Load and decode a heightmap image from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HeightmapError> {
        let path = path.as_ref();
        let reader = image::ImageReader::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => HeightmapError::NotFound(path.to_path_buf()),
            _ => HeightmapError::Io(e),
        })?;
        let image = reader
            .with_guessed_format()?
            .decode()
            .map_err(HeightmapError::Decode)?;

        let heightmap = Self::from_image(&image)?;
        tracing::info!(
            "loaded heightmap {}: {}x{}, {} channel(s)",
            path.display(),
            heightmap.width,
            heightmap.height,
            heightmap.channels
        );
        Ok(heightmap)
    }

    /// Build a heightmap from an already decoded image, reading its first channel.
    pub fn from_image(image: &DynamicImage) -> Result<Self, HeightmapError> {
        let channels = image.color().channel_count();
        if !(1..=4).contains(&channels) {
            return Err(HeightmapError::UnsupportedChannels(channels));
        }
        let (width, height) = image.dimensions();
        check_dimensions(width, height)?;

        let samples = match image {
            DynamicImage::ImageLuma8(buf) => first_channel(buf, f32::from),
            DynamicImage::ImageLumaA8(buf) => first_channel(buf, f32::from),
            DynamicImage::ImageRgb8(buf) => first_channel(buf, f32::from),
            DynamicImage::ImageRgba8(buf) => first_channel(buf, f32::from),
            DynamicImage::ImageLuma16(buf) => first_channel(buf, from_u16),
            DynamicImage::ImageLumaA16(buf) => first_channel(buf, from_u16),
            DynamicImage::ImageRgb16(buf) => first_channel(buf, from_u16),
            DynamicImage::ImageRgba16(buf) => first_channel(buf, from_u16),
            DynamicImage::ImageRgb32F(buf) => first_channel(buf, |v| v * 255.0),
            DynamicImage::ImageRgba32F(buf) => first_channel(buf, |v| v * 255.0),
            other => first_channel(&other.to_rgba8(), f32::from),
        };

        Ok(Self {
            width,
            height,
            channels,
            samples,
        })
    }

    /// Build a single-channel heightmap from raw row-major samples.
    pub fn from_samples(width: u32, height: u32, samples: Vec<f32>) -> Result<Self, HeightmapError> {
        check_dimensions(width, height)?;
        let expected = width as usize * height as usize;
        if samples.len() != expected {
            return Err(HeightmapError::SampleCount {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels: 1,
            samples,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channel count of the source image.
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Intensity at `(row, col)`.
    ///
    /// Panics if the coordinate is outside the grid.
    pub fn sample(&self, row: u32, col: u32) -> f32 {
        assert!(
            row < self.height && col < self.width,
            "sample ({row}, {col}) out of bounds for {}x{}",
            self.width,
            self.height
        );
        self.samples[(row * self.width + col) as usize]
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Lowest and highest intensity in the grid.
    pub fn min_max(&self) -> (f32, f32) {
        self.samples
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| {
                (lo.min(s), hi.max(s))
            })
    }

    /// Write the heightmap as an 8-bit grayscale PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), HeightmapError> {
        let bytes: Vec<u8> = self
            .samples
            .iter()
            .map(|s| s.round().clamp(0.0, 255.0) as u8)
            .collect();
        let image = image::GrayImage::from_raw(self.width, self.height, bytes).ok_or(
            HeightmapError::SampleCount {
                expected: self.width as usize * self.height as usize,
                actual: self.samples.len(),
            },
        )?;
        image
            .save_with_format(path.as_ref(), ImageFormat::Png)
            .map_err(HeightmapError::Encode)?;
        tracing::debug!("wrote heightmap to {}", path.as_ref().display());
        Ok(())
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), HeightmapError> {
    if width < 2 || height < 2 {
        return Err(HeightmapError::TooSmall { width, height });
    }
    // Vertices and strip indices are both addressed with u32.
    let vertices = u64::from(width) * u64::from(height);
    let indices = 2 * u64::from(width) * (u64::from(height) - 1);
    if vertices.max(indices) > u64::from(u32::MAX) {
        return Err(HeightmapError::TooLarge { width, height });
    }
    Ok(())
}

fn from_u16(v: u16) -> f32 {
    f32::from(v) / 257.0
}

fn first_channel<P, F>(buf: &ImageBuffer<P, Vec<P::Subpixel>>, convert: F) -> Vec<f32>
where
    P: Pixel,
    F: Fn(P::Subpixel) -> f32,
{
    buf.pixels().map(|p| convert(p.channels()[0])).collect()
}

pub fn crate_info() -> &'static str {
    "heightfield-heightmap v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{
        GrayAlphaImage, GrayImage, ImageBuffer, Luma, LumaA, Rgb, Rgb32FImage, RgbImage, Rgba,
        Rgba32FImage, RgbaImage,
    };

    fn gradient(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([(x + y * width) as u8]))
    }

    #[test]
    fn luma8_samples_are_exact() {
        let hm = Heightmap::from_image(&DynamicImage::ImageLuma8(gradient(4, 3))).unwrap();
        assert_eq!(hm.width(), 4);
        assert_eq!(hm.height(), 3);
        assert_eq!(hm.channels(), 1);
        assert_eq!(hm.sample(0, 0), 0.0);
        assert_eq!(hm.sample(1, 2), 6.0);
        assert_eq!(hm.sample(2, 3), 11.0);
    }

    #[test]
    fn rgb_reads_first_channel() {
        let img = RgbImage::from_pixel(2, 2, Rgb([200, 10, 20]));
        let hm = Heightmap::from_image(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(hm.channels(), 3);
        assert!(hm.samples().iter().all(|&s| s == 200.0));
    }

    #[test]
    fn alpha_formats_read_first_channel() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([90, 1, 2, 255]));
        let hm = Heightmap::from_image(&DynamicImage::ImageRgba8(rgba)).unwrap();
        assert_eq!(hm.channels(), 4);
        assert!(hm.samples().iter().all(|&s| s == 90.0));

        let luma_a = GrayAlphaImage::from_pixel(3, 2, LumaA([33, 0]));
        let hm = Heightmap::from_image(&DynamicImage::ImageLumaA8(luma_a)).unwrap();
        assert_eq!(hm.channels(), 2);
        assert_eq!(hm.samples().len(), 6);
        assert!(hm.samples().iter().all(|&s| s == 33.0));
    }

    #[test]
    fn float_images_are_scaled_to_byte_range() {
        let rgb = Rgb32FImage::from_pixel(2, 2, Rgb([0.5, 0.0, 1.0]));
        let hm = Heightmap::from_image(&DynamicImage::ImageRgb32F(rgb)).unwrap();
        assert_eq!(hm.channels(), 3);
        assert!(hm.samples().iter().all(|&s| (s - 127.5).abs() < 1e-4));

        let rgba = Rgba32FImage::from_pixel(2, 2, Rgba([1.0, 0.25, 0.0, 1.0]));
        let hm = Heightmap::from_image(&DynamicImage::ImageRgba32F(rgba)).unwrap();
        assert_eq!(hm.channels(), 4);
        assert!(hm.samples().iter().all(|&s| (s - 255.0).abs() < 1e-4));
    }

    #[test]
    fn sixteen_bit_is_rescaled() {
        let img: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_raw(2, 2, vec![0, 257, 65535, 32896]).unwrap();
        let hm = Heightmap::from_image(&DynamicImage::ImageLuma16(img)).unwrap();
        assert_eq!(hm.sample(0, 0), 0.0);
        assert_eq!(hm.sample(0, 1), 1.0);
        assert_eq!(hm.sample(1, 0), 255.0);
        assert_eq!(hm.sample(1, 1), 128.0);
    }

    #[test]
    fn rejects_degenerate_dimensions() {
        let err = Heightmap::from_image(&DynamicImage::ImageLuma8(gradient(1, 5))).unwrap_err();
        assert!(matches!(err, HeightmapError::TooSmall { width: 1, height: 5 }));

        let err = Heightmap::from_samples(3, 1, vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, HeightmapError::TooSmall { .. }));
    }

    #[test]
    fn rejects_oversized_grid() {
        let err = check_dimensions(70_000, 70_000).unwrap_err();
        assert!(matches!(err, HeightmapError::TooLarge { .. }));
    }

    #[test]
    fn rejects_grid_whose_strip_indices_overflow() {
        // 2.4e9 vertices fit a u32, 4.8e9 strip indices do not.
        let err = check_dimensions(40_000, 60_000).unwrap_err();
        assert!(matches!(
            err,
            HeightmapError::TooLarge {
                width: 40_000,
                height: 60_000
            }
        ));
        assert!(check_dimensions(4096, 4096).is_ok());
    }

    #[test]
    fn from_samples_checks_length() {
        let err = Heightmap::from_samples(2, 2, vec![1.0; 3]).unwrap_err();
        assert!(matches!(
            err,
            HeightmapError::SampleCount {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn min_max() {
        let hm = Heightmap::from_samples(2, 2, vec![5.0, -1.0, 9.0, 3.0]).unwrap();
        assert_eq!(hm.min_max(), (-1.0, 9.0));
    }

    #[test]
    fn load_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Heightmap::load(tmp.path().join("missing.png")).unwrap_err();
        assert!(matches!(err, HeightmapError::NotFound(_)));
    }

    #[test]
    fn load_garbage_fails_to_decode() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("garbage.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let err = Heightmap::load(&path).unwrap_err();
        assert!(matches!(err, HeightmapError::Decode(_)));
    }

    #[test]
    fn save_and_load_png() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hm.png");
        let hm = Heightmap::from_samples(3, 2, vec![0.0, 64.0, 128.0, 192.0, 255.0, 17.0]).unwrap();
        hm.save_png(&path).unwrap();

        let loaded = Heightmap::load(&path).unwrap();
        assert_eq!(loaded, hm);
    }
}
