use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of chance for scoring and treatment outcomes.
///
/// Production wires a [`SeededRandom`] seeded from entropy; tests pin a seed or
/// script the draws so every outcome is reproducible.
pub trait RandomSource: Send {
    /// Uniform draw in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform integer in `[low, high]`.
    fn between(&mut self, low: u16, high: u16) -> u16;
}

#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn between(&mut self, low: u16, high: u16) -> u16 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}
