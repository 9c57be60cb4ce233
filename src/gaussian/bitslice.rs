//! Bit-sliced half-Gaussian sampling.
//!
//! Evaluates 64 independent samples of D_{Z,σ,≥0} per refill by holding the
//! draw bits as bit-slices in 64-bit words: input slice word b carries bit b
//! of every lane's 64-bit uniform draw. For each table entry the circuit
//! computes a strict less-than vote across all lanes with masked boolean
//! operations only, then ripples the votes into a bit-sliced counter of
//! `bits_per_sample` slices. There is no branch on any lane's value.

use super::tables::HalfGaussTable;
use crate::rand::AesCtrRng;
use rand::RngCore;

// CONSTANTS
// ================================================================================================

/// Number of parallel lanes, one sample each per refill.
pub const NSAMPLES: usize = 64;

/// Input bits consumed per lane per refill.
const N_IN: usize = 64;

// BIT-SLICED CORE
// ================================================================================================

/// Sampler state without a generator handle, so it can be embedded in
/// composite samplers that own the handle themselves.
pub(super) struct HalfGaussCore {
    table: &'static HalfGaussTable,
    samples: [i32; NSAMPLES],
    cursor: usize,
}

impl HalfGaussCore {
    pub(super) fn new(table: &'static HalfGaussTable, rng: &mut AesCtrRng) -> Self {
        let mut core = Self { table, samples: [0; NSAMPLES], cursor: 0 };
        core.fill(rng);
        core
    }

    pub(super) fn fill(&mut self, rng: &mut AesCtrRng) {
        let mut raw = [0_u8; N_IN * 8];
        rng.fill_bytes(&mut raw);
        let mut slices = [0_u64; N_IN];
        for (word, chunk) in slices.iter_mut().zip(raw.chunks_exact(8)) {
            *word = u64::from_le_bytes(chunk.try_into().expect("8-byte word"));
        }

        let n_out = self.table.bits_per_sample as usize;
        let mut out = [0_u64; 16];
        for &entry in self.table.rcdt {
            // strict less-than against the constant, MSB to LSB
            let mut lt = 0_u64;
            let mut eq = !0_u64;
            for b in (0..N_IN).rev() {
                let r = slices[b];
                if (entry >> b) & 1 == 1 {
                    lt |= eq & !r;
                    eq &= r;
                } else {
                    eq &= !r;
                }
            }
            // ripple the votes into the bit-sliced counter
            let mut carry = lt;
            for slice in out[..n_out].iter_mut() {
                let t = *slice;
                *slice = t ^ carry;
                carry = t & carry;
            }
        }

        for (lane, sample) in self.samples.iter_mut().enumerate() {
            let mut v = 0_i32;
            for (j, &slice) in out[..n_out].iter().enumerate() {
                v |= (((slice >> lane) & 1) as i32) << j;
            }
            *sample = v;
        }
        self.cursor = 0;
    }

    pub(super) fn next(&mut self, rng: &mut AesCtrRng) -> i32 {
        let v = self.samples[self.cursor];
        self.cursor += 1;
        if self.cursor == NSAMPLES {
            self.fill(rng);
        }
        v
    }
}

// PUBLIC SAMPLER
// ================================================================================================

/// Half-Gaussian sampler over a pre-generated table.
pub struct BitSlicedHalfGaussian<'a> {
    core: HalfGaussCore,
    rng: &'a mut AesCtrRng,
}

impl<'a> BitSlicedHalfGaussian<'a> {
    pub fn new(table: &'static HalfGaussTable, rng: &'a mut AesCtrRng) -> Self {
        let core = HalfGaussCore::new(table, rng);
        Self { core, rng }
    }

    /// Standard deviation of the sampled distribution.
    pub fn sigma(&self) -> f64 {
        self.core.table.sigma
    }

    /// Output width in bits.
    pub fn bits_per_sample(&self) -> u32 {
        self.core.table.bits_per_sample
    }

    /// Returns the next sample of D_{Z,σ,≥0}.
    pub fn sample(&mut self) -> i32 {
        self.core.next(self.rng)
    }
}

// TESTS
// ================================================================================================
