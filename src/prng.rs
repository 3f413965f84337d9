//! Seed-locked pseudo-random values for glitch geometry.
//!
//! The generator is a pure function of its seed with no state between calls.
//! Consecutive seeds give the sequence used by the glitch pass.

/// Map a seed to a reproducible value in `[0, 1)`.
///
/// `frac(sin(seed) * 10000)`. Non-finite seeds collapse to `0.0`.
#[inline(always)]
pub fn seeded_random(seed: f64) -> f64 {
    let x = seed.sin() * 10_000.0;
    let value = x - x.floor();
    if value.is_finite() {
        // `x - floor(x)` can round up to exactly 1.0 for tiny negative x.
        value.min(1.0 - f64::EPSILON).max(0.0)
    } else {
        0.0
    }
}

/// Running seed counter: every draw consumes the current seed and advances it by one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeedSequence {
    seed: f64,
}

impl SeedSequence {
    pub const fn new(seed: f64) -> Self {
        Self { seed }
    }

    /// Seed that the next draw will consume.
    pub fn position(&self) -> f64 {
        self.seed
    }

    #[inline(always)]
    pub fn next_unit(&mut self) -> f64 {
        let value = seeded_random(self.seed);
        self.seed += 1.0;
        value
    }
}
