//! Filler data for device preparation
//!
//! Before a discard run the addressed region is overwritten so that the device
//! holds live data again. Zeros or constant patterns can be short-circuited by
//! deduplicating or compressing firmware, so the default filler is random.

use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Size of one filler chunk written per syscall
pub const FILLER_SIZE: usize = 4096;

/// Fill pattern for preparation writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillPattern {
    /// All zeros
    Zeros,
    /// All ones (0xFF)
    Ones,
    /// Pseudo-random bytes
    Random,
    /// Sequential bytes (0x00, 0x01, 0x02, ..., 0xFF, 0x00, ...)
    Sequential,
}

impl Default for FillPattern {
    fn default() -> Self {
        Self::Random
    }
}

/// One chunk of filler bytes, reused for every write of a preparation pass
#[derive(Debug, Clone)]
pub struct FillerBuffer {
    data: Vec<u8>,
}

impl FillerBuffer {
    /// Create a buffer of `size` bytes filled with `pattern`
    ///
    /// `seed` only matters for [`FillPattern::Random`]; without one the
    /// generator is seeded from OS entropy.
    pub fn new(size: usize, pattern: FillPattern, seed: Option<u64>) -> Self {
        let mut data = vec![0u8; size];

        match pattern {
            FillPattern::Zeros => {}
            FillPattern::Ones => data.fill(0xFF),
            FillPattern::Random => {
                let mut rng = match seed {
                    Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
                    None => Xoshiro256PlusPlus::from_entropy(),
                };
                rng.fill_bytes(&mut data);
            }
            FillPattern::Sequential => {
                for (i, byte) in data.iter_mut().enumerate() {
                    *byte = (i % 256) as u8;
                }
            }
        }

        Self { data }
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for FillerBuffer {
    fn default() -> Self {
        Self::new(FILLER_SIZE, FillPattern::default(), None)
    }
}
