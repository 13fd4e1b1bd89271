use rand::{Rng, SeedableRng, rngs::StdRng};

/// Source of the bytes consumed by `CXNN`.
pub trait RandomSource: Send {
    fn next_byte(&mut self) -> u8;
}

impl RandomSource for StdRng {
    fn next_byte(&mut self) -> u8 {
        self.random()
    }
}

/// A generator seeded from the operating system.
pub fn os_seeded() -> Box<dyn RandomSource> {
    Box::new(StdRng::from_os_rng())
}

/// A reproducible generator.
pub fn seeded(seed: u64) -> Box<dyn RandomSource> {
    Box::new(StdRng::seed_from_u64(seed))
}

/// Always yields the same byte.
#[cfg(test)]
pub(crate) struct FixedRandom(pub u8);

#[cfg(test)]
impl RandomSource for FixedRandom {
    fn next_byte(&mut self) -> u8 {
        self.0
    }
}
