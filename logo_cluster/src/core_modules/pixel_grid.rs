// THEORY:
// The `PixelGrid` is the hand-off point between the outside world and the
// fingerprinting core. Whatever produced the logo (an HTTP response, a file on
// disk, a synthetic test buffer) ends up here as a decoded bitmap with a width,
// a height and per-pixel color values.
//
// Like the rest of the low-level containers, it is deliberately "dumb": it knows
// how to be built from raw bytes or an encoded image and how to hand its pixels
// over, but it knows nothing about hashing or similarity. A grid lives only for
// the duration of one fingerprint computation and is dropped right after.

pub mod pixel_grid {
    use crate::error::Result;
    use image::error::{ParameterError, ParameterErrorKind};
    use image::{DynamicImage, ImageError, RgbImage, RgbaImage};
    use std::path::Path;

    const CHANNELS: usize = 4;

    /// A decoded bitmap of arbitrary size and color depth.
    #[derive(Debug, Clone)]
    pub struct PixelGrid {
        image: DynamicImage,
    }

    impl PixelGrid {
        /// Builds a grid from a flattened RGBA buffer (`width * height * 4` bytes).
        pub fn from_rgba(width: u32, height: u32, buffer: Vec<u8>) -> Result<Self> {
            let expected = width as usize * height as usize * CHANNELS;
            if buffer.len() != expected {
                return Err(dimension_mismatch());
            }
            let image = RgbaImage::from_raw(width, height, buffer).ok_or_else(dimension_mismatch)?;
            Ok(Self::from_image(DynamicImage::ImageRgba8(image)))
        }

        pub fn from_image(image: DynamicImage) -> Self {
            Self { image }
        }

        /// Decodes an encoded image (PNG, JPEG, ICO, ...) from memory.
        pub fn decode(bytes: &[u8]) -> Result<Self> {
            let image = image::load_from_memory(bytes)?;
            Ok(Self::from_image(image))
        }

        /// Opens and decodes an image file.
        pub fn open(path: impl AsRef<Path>) -> Result<Self> {
            let image = image::open(path)?;
            Ok(Self::from_image(image))
        }

        pub fn width(&self) -> u32 {
            self.image.width()
        }

        pub fn height(&self) -> u32 {
            self.image.height()
        }

        /// A grid with no pixels cannot be resampled.
        pub fn is_empty(&self) -> bool {
            self.width() == 0 || self.height() == 0
        }

        pub fn as_image(&self) -> &DynamicImage {
            &self.image
        }

        /// The color channels with alpha dropped.
        pub fn to_rgb(&self) -> RgbImage {
            self.image.to_rgb8()
        }
    }

    impl From<DynamicImage> for PixelGrid {
        fn from(image: DynamicImage) -> Self {
            Self::from_image(image)
        }
    }

    fn dimension_mismatch() -> crate::error::Error {
        ImageError::Parameter(ParameterError::from_kind(ParameterErrorKind::DimensionMismatch)).into()
    }
}

#[cfg(test)]
mod tests {
    use super::pixel_grid::*;

    #[test]
    fn from_rgba_accepts_matching_buffer() {
        let grid = PixelGrid::from_rgba(3, 2, vec![255u8; 3 * 2 * 4]).expect("valid buffer");
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert!(!grid.is_empty());
    }

    #[test]
    fn from_rgba_rejects_short_buffer() {
        assert!(PixelGrid::from_rgba(4, 4, vec![0u8; 10]).is_err());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(PixelGrid::decode(b"definitely not an image").is_err());
    }

    #[test]
    fn zero_sized_grid_is_empty() {
        let grid = PixelGrid::from_rgba(0, 5, Vec::new()).expect("empty buffer matches");
        assert!(grid.is_empty());
    }

    #[test]
    fn to_rgb_drops_alpha() {
        let grid = PixelGrid::from_rgba(1, 1, vec![10, 20, 30, 0]).expect("valid buffer");
        let rgb = grid.to_rgb();
        assert_eq!(rgb.get_pixel(0, 0).0, [10, 20, 30]);
    }
}
