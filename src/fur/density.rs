//! Procedural hair density field.
//!
//! The field is an RGBA8 grid scattered with small filled rectangles, one per
//! "strand clump":
//!
//! - R: always 255 where painted
//! - G: maximum length fraction of the strand
//! - B: darkness
//! - A: presence (255 painted, 0 background)
//!
//! Sampling is nearest-texel with repeat addressing on both axes, matching
//! the GPU sampler the renderer creates for the same data.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use rand::{rngs::StdRng, Rng, SeedableRng};
use rustc_hash::FxHashMap;

/// Seed used when no explicit seed is configured.
pub const DEFAULT_SEED: u64 = 0x00f0_75ee_d5ee_d000;

/// Largest grid side a field is generated at. Larger configured
/// resolutions are clamped; 2048 is the 2D texture limit every wgpu
/// backend guarantees.
pub const MAX_DENSITY_RESOLUTION: u32 = 2048;

/// One sample of the density field. All fields are in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DensityFieldSample {
    /// Non-zero where a strand exists.
    pub presence: f32,
    /// Fraction of the max fur length this strand reaches.
    pub length_fraction: f32,
    /// Shading multiplier.
    pub darkness: f32,
}

/// A hair density field a material can draw with.
///
/// The CPU path calls [`DensitySource::sample`]; the GPU path uploads
/// [`DensitySource::texels`] as a square RGBA8 texture and samples it
/// nearest/repeat, so both must describe the same field.
pub trait DensitySource: Send + Sync + std::fmt::Debug {
    /// Sample at `(u, v)`. Coordinates outside `[0, 1)` wrap.
    fn sample(&self, u: f32, v: f32) -> DensityFieldSample;

    /// Grid width/height in texels, at least 1.
    fn resolution(&self) -> u32;

    /// Row-major RGBA8 texels, `resolution²` entries (alpha = presence,
    /// green = length fraction, blue = darkness).
    fn texels(&self) -> &[[u8; 4]];
}

/// Generation parameters for a [`DensityField`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityFieldConfig {
    /// Width and height of the square grid in texels.
    pub resolution: u32,
    /// Number of rectangles scattered onto the grid.
    pub strand_count: u32,
    /// Upper bound on each rectangle side, in texels.
    pub max_strand_size: f32,
    /// Range the per-strand length fraction is drawn from.
    pub length_range: [f32; 2],
    /// RNG seed; equal seeds produce identical fields.
    pub seed: u64,
}

impl Default for DensityFieldConfig {
    fn default() -> Self {
        Self {
            resolution: 256,
            strand_count: 15_000,
            max_strand_size: 2.0,
            length_range: [0.5, 1.0],
            seed: DEFAULT_SEED,
        }
    }
}

impl DensityFieldConfig {
    /// Same configuration with lengths drawn from the full `[0, 1]` range,
    /// which yields sparser outer shells.
    #[must_use]
    pub fn with_full_length_range(self) -> Self {
        Self {
            length_range: [0.0, 1.0],
            ..self
        }
    }

    fn key(&self) -> FieldKey {
        FieldKey {
            resolution: self.resolution,
            strand_count: self.strand_count,
            max_strand_size: self.max_strand_size.to_bits(),
            length_range: [
                self.length_range[0].to_bits(),
                self.length_range[1].to_bits(),
            ],
            seed: self.seed,
        }
    }
}

/// Bitwise cache key so float fields hash consistently with equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FieldKey {
    resolution: u32,
    strand_count: u32,
    max_strand_size: u32,
    length_range: [u32; 2],
    seed: u64,
}

type FieldCache = Mutex<FxHashMap<FieldKey, Arc<DensityField>>>;

static SHARED_FIELDS: OnceLock<FieldCache> = OnceLock::new();

/// A generated, immutable density grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityField {
    resolution: u32,
    texels: Vec<[u8; 4]>,
}

impl DensityField {
    /// Generate a field from `config`. Deterministic for a given seed.
    ///
    /// The resolution is clamped to `1..=MAX_DENSITY_RESOLUTION`.
    #[must_use]
    pub fn generate(config: &DensityFieldConfig) -> Self {
        let resolution = config.resolution.clamp(1, MAX_DENSITY_RESOLUTION);
        if resolution != config.resolution {
            log::warn!(
                "density field resolution {} clamped to {resolution}",
                config.resolution
            );
        }
        let side = resolution as usize;
        let mut field = Self {
            resolution,
            texels: vec![[0; 4]; side * side],
        };

        let (lo, hi) = normalized_range(config.length_range);
        let max_size = config.max_strand_size.max(0.0);
        let extent = resolution as f32;
        let mut rng = StdRng::seed_from_u64(config.seed);

        for _ in 0..config.strand_count {
            let length = lo + rng.random::<f32>() * (hi - lo);
            let darkness = rng.random::<f32>();
            let x = rng.random::<f32>() * extent;
            let y = rng.random::<f32>() * extent;
            let w = rng.random::<f32>() * max_size;
            let h = rng.random::<f32>() * max_size;
            field.paint_rect(
                (x, y),
                (w, h),
                [255, unorm8(length), unorm8(darkness), 255],
            );
        }

        field
    }

    /// Process-wide shared field for `config`, generated on first request.
    ///
    /// Every later call with an equal configuration returns the same `Arc`.
    #[must_use]
    pub fn shared(config: &DensityFieldConfig) -> Arc<Self> {
        let cache =
            SHARED_FIELDS.get_or_init(|| Mutex::new(FxHashMap::default()));
        let mut fields = cache.lock().unwrap_or_else(PoisonError::into_inner);
        let field = fields.entry(config.key()).or_insert_with(|| {
            log::info!(
                "generating {res}x{res} density field ({} strands, seed {:#x})",
                config.strand_count,
                config.seed,
                res = config.resolution,
            );
            Arc::new(Self::generate(config))
        });
        Arc::clone(field)
    }

    /// Grid width/height in texels.
    #[must_use]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Row-major RGBA8 texels.
    #[must_use]
    pub fn texels(&self) -> &[[u8; 4]] {
        &self.texels
    }

    /// Texel data as raw bytes for texture upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    /// Fraction of texels that carry a strand.
    #[must_use]
    pub fn coverage(&self) -> f32 {
        let painted = self.texels.iter().filter(|t| t[3] > 0).count();
        painted as f32 / self.texels.len() as f32
    }

    /// Nearest-texel sample with repeat addressing.
    #[must_use]
    pub fn sample(&self, u: f32, v: f32) -> DensityFieldSample {
        let col = self.wrap_index(u);
        let row = self.wrap_index(v);
        let texel = self.texels[row * self.resolution as usize + col];
        DensityFieldSample {
            presence: f32::from(texel[3]) / 255.0,
            length_fraction: f32::from(texel[1]) / 255.0,
            darkness: f32::from(texel[2]) / 255.0,
        }
    }

    fn wrap_index(&self, coord: f32) -> usize {
        let res = self.resolution as usize;
        // NaN and infinities saturate to texel 0.
        let scaled = coord.rem_euclid(1.0) * self.resolution as f32;
        (scaled as usize).min(res - 1)
    }

    /// Fill every texel the rectangle touches, wrapping across edges so the
    /// field tiles without seams.
    fn paint_rect(&mut self, origin: (f32, f32), size: (f32, f32), texel: [u8; 4]) {
        if size.0 <= 0.0 || size.1 <= 0.0 {
            return;
        }
        let res = i64::from(self.resolution);
        let x0 = origin.0.floor() as i64;
        let y0 = origin.1.floor() as i64;
        let x1 = (origin.0 + size.0).ceil() as i64;
        let y1 = (origin.1 + size.1).ceil() as i64;
        for y in y0..y1 {
            let row = y.rem_euclid(res);
            for x in x0..x1 {
                let col = x.rem_euclid(res);
                self.texels[(row * res + col) as usize] = texel;
            }
        }
    }
}

impl DensitySource for DensityField {
    fn sample(&self, u: f32, v: f32) -> DensityFieldSample {
        Self::sample(self, u, v)
    }

    fn resolution(&self) -> u32 {
        self.resolution
    }

    fn texels(&self) -> &[[u8; 4]] {
        &self.texels
    }
}

/// Drop every cached field. Materials holding an `Arc` keep theirs alive.
pub fn clear_shared_fields() {
    if let Some(cache) = SHARED_FIELDS.get() {
        let mut fields = cache.lock().unwrap_or_else(PoisonError::into_inner);
        log::debug!("clearing {} shared density fields", fields.len());
        fields.clear();
    }
}

fn normalized_range(range: [f32; 2]) -> (f32, f32) {
    let a = range[0].clamp(0.0, 1.0);
    let b = range[1].clamp(0.0, 1.0);
    (a.min(b), a.max(b))
}

fn unorm8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
