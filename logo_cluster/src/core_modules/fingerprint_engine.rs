// THEORY:
// The `FingerprintEngine` reduces an arbitrary logo bitmap to a 64-bit perceptual
// hash. Visually similar logos (the same mark re-encoded, rescaled, slightly
// recolored) land a few bits apart; unrelated logos land roughly half the word
// apart.
//
// The reduction runs in fixed stages:
// 1.  **Normalize**: drop alpha and resample to a canonical square (128x128) with
//     a Lanczos filter. This removes scale and aspect differences without the
//     aliasing nearest-neighbor sampling would introduce.
// 2.  **Reduce**: convert to luma and resample again to the transform block
//     (twice the hash side, 16x16). Color is discarded; shape and contrast carry
//     the identity of a logo.
// 3.  **Transform**: run a 2D DCT-II and keep only the 8x8 lowest-frequency
//     corner, which describes the coarse structure of the image.
// 4.  **Threshold**: compare every kept coefficient with the median of all kept
//     coefficients and pack one bit per coefficient.
//
// Stages 2 to 4 are `image_hasher`'s DCT-preprocessed median hash. The 8 hash
// bytes are read big-endian into the `u64`.
//
// The engine is a pure function of its input and owns no mutable state, so one
// instance can be shared across any number of hashing workers.

use crate::core_modules::fingerprint::{FINGERPRINT_BITS, Fingerprint};
use crate::core_modules::pixel_grid::pixel_grid::PixelGrid;
use crate::error::{Error, Result};
use image::DynamicImage;
use image::imageops::{self, FilterType};
use image_hasher::{HashAlg, Hasher, HasherConfig};
use std::fmt;
use std::sync::Arc;

const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// Tunable sizes of the fingerprint transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintConfig {
    /// Side of the square every input is first resampled to.
    pub canonical_size: u32,
    /// Side of the low-frequency block kept from the DCT.
    pub hash_size: u32,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            canonical_size: 128,
            hash_size: 8,
        }
    }
}

impl FingerprintConfig {
    /// Length of the produced fingerprint in bits.
    pub fn fingerprint_bits(&self) -> u32 {
        self.hash_size * self.hash_size
    }

    /// Side of the luma block fed into the DCT.
    pub fn transform_size(&self) -> u32 {
        self.hash_size * 2
    }

    pub fn validate(&self) -> Result<()> {
        if self.fingerprint_bits() != FINGERPRINT_BITS {
            return Err(Error::InvalidConfig {
                name: "hash_size",
                message: format!(
                    "hash_size {} gives {} bits, fingerprints are {} bits",
                    self.hash_size,
                    self.fingerprint_bits(),
                    FINGERPRINT_BITS
                ),
            });
        }
        if self.canonical_size < self.transform_size() {
            return Err(Error::InvalidConfig {
                name: "canonical_size",
                message: format!("must be at least the transform block ({})", self.transform_size()),
            });
        }
        Ok(())
    }
}

/// Why a grid could not be hashed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FingerprintError {
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

/// Turns decoded pixel grids into perceptual fingerprints.
#[derive(Clone)]
pub struct FingerprintEngine {
    config: FingerprintConfig,
    hasher: Arc<Hasher>,
}

impl fmt::Debug for FingerprintEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FingerprintEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FingerprintEngine {
    pub fn new(config: FingerprintConfig) -> Result<Self> {
        config.validate()?;
        let hasher = HasherConfig::new()
            .hash_size(config.hash_size, config.hash_size)
            .resize_filter(RESAMPLE_FILTER)
            .preproc_dct()
            .hash_alg(HashAlg::Median)
            .to_hasher();
        Ok(Self {
            config,
            hasher: Arc::new(hasher),
        })
    }

    pub fn config(&self) -> &FingerprintConfig {
        &self.config
    }

    /// Computes the fingerprint of a grid.
    pub fn fingerprint(&self, grid: &PixelGrid) -> std::result::Result<Fingerprint, FingerprintError> {
        if grid.is_empty() {
            return Err(FingerprintError::EmptyImage {
                width: grid.width(),
                height: grid.height(),
            });
        }

        // Stage 1: Normalize
        let canonical = imageops::resize(
            &grid.to_rgb(),
            self.config.canonical_size,
            self.config.canonical_size,
            RESAMPLE_FILTER,
        );

        // Stages 2-4: Reduce, Transform, Threshold
        let hash = self.hasher.hash_image(&DynamicImage::ImageRgb8(canonical));
        Ok(pack_bits(hash.as_bytes()))
    }
}

/// Packs hash bytes into a fingerprint, first byte in the most significant
/// position.
fn pack_bits(bytes: &[u8]) -> Fingerprint {
    Fingerprint::from_bits(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}
