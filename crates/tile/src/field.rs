use noise::{NoiseFn, Simplex};

/// Largest `f64` strictly below 1.0.
const BELOW_ONE: f64 = 1.0 - f64::EPSILON / 2.0;

/// Deterministic 2D scalar field. Raw samples lie roughly in `[-1, 1]`.
pub trait NoiseField {
    fn sample(&self, x: f64, y: f64) -> f64;

    /// Sample mapped into `[0, 1)`.
    fn normalized(&self, x: f64, y: f64) -> f64 {
        normalize_noise(self.sample(x, y))
    }
}

impl<F> NoiseField for F
where
    F: Fn(f64, f64) -> f64,
{
    fn sample(&self, x: f64, y: f64) -> f64 {
        self(x, y)
    }
}

/// Map a raw `[-1, 1]` sample into `[0, 1)`.
pub fn normalize_noise(raw: f64) -> f64 {
    ((raw + 1.0) / 2.0).clamp(0.0, BELOW_ONE)
}

/// Simplex noise keyed by the world seed.
#[derive(Clone)]
pub struct SimplexField {
    noise: Simplex,
    seed: u32,
}

impl SimplexField {
    /// The simplex permutation is keyed by 32 bits; both halves of the
    /// world seed are folded in.
    pub fn new(seed: u64) -> Self {
        let seed = (seed ^ (seed >> 32)) as u32;
        Self {
            noise: Simplex::new(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }
}

impl std::fmt::Debug for SimplexField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimplexField").field("seed", &self.seed).finish()
    }
}

impl NoiseField for SimplexField {
    fn sample(&self, x: f64, y: f64) -> f64 {
        self.noise.get([x, y])
    }
}
