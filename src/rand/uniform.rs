//! Typed uniform samplers over the CTR generator.
//!
//! Each sampler buffers one 16-byte key-stream block as two little-endian
//! 64-bit limbs and slices values out of it least-significant-bit first, so
//! the emitted sequence depends only on the seed, never on how the consumers
//! interleave their draws within a block.

use super::{AesCtrRng, BLOCK_LEN};

// VALUE SAMPLER
// ================================================================================================

/// A stream of integer values backed by the CTR generator.
///
/// Values are returned as `i64` with their raw bits; consumers truncate to
/// their element width, which is the wrap-around semantics the matrix layer
/// uses everywhere.
pub trait ValueSampler {
    /// Returns the next value of the stream.
    fn next_value(&mut self) -> i64;
}

// BLOCK BUFFER
// ================================================================================================

#[derive(Clone, Copy)]
struct Limbs([u64; 2]);

impl Limbs {
    fn refill(rng: &mut AesCtrRng) -> Self {
        let mut block = [0_u8; BLOCK_LEN];
        rng.random_block(&mut block);
        Self([
            u64::from_le_bytes(block[..8].try_into().expect("8 bytes")),
            u64::from_le_bytes(block[8..].try_into().expect("8 bytes")),
        ])
    }

    /// Returns `width` bits starting at bit `pos`; `width` must not cross a
    /// limb boundary unless it divides 64.
    #[inline]
    fn bits(&self, pos: usize, width: usize) -> u64 {
        let limb = self.0[pos >> 6] >> (pos & 63);
        if width == 64 { limb } else { limb & ((1_u64 << width) - 1) }
    }
}

// FIXED-WIDTH UNIFORM SAMPLER
// ================================================================================================

/// Uniform sampler of `WIDTH`-byte unsigned integers, `WIDTH` ∈ {1, 2, 4, 8}.
pub struct UIntSampler<'a, const WIDTH: usize> {
    limbs: Limbs,
    cursor: usize,
    rng: &'a mut AesCtrRng,
}

pub type U8Sampler<'a> = UIntSampler<'a, 1>;
pub type U16Sampler<'a> = UIntSampler<'a, 2>;
pub type U32Sampler<'a> = UIntSampler<'a, 4>;
pub type U64Sampler<'a> = UIntSampler<'a, 8>;

impl<'a, const WIDTH: usize> UIntSampler<'a, WIDTH> {
    const VALUES_PER_BLOCK: usize = BLOCK_LEN / WIDTH;

    pub fn new(rng: &'a mut AesCtrRng) -> Self {
        const { assert!(WIDTH == 1 || WIDTH == 2 || WIDTH == 4 || WIDTH == 8) };
        let limbs = Limbs::refill(rng);
        Self { limbs, cursor: 0, rng }
    }

    /// Returns the next uniform value in `[0, 2^(8·WIDTH))`.
    #[inline]
    pub fn next(&mut self) -> u64 {
        let v = self.limbs.bits(self.cursor * WIDTH * 8, WIDTH * 8);
        self.cursor += 1;
        if self.cursor == Self::VALUES_PER_BLOCK {
            self.limbs = Limbs::refill(self.rng);
            self.cursor = 0;
        }
        v
    }
}

impl<const WIDTH: usize> ValueSampler for UIntSampler<'_, WIDTH> {
    fn next_value(&mut self) -> i64 {
        self.next() as i64
    }
}

// BIT SAMPLER
// ================================================================================================

/// Uniform sampler of single bits.
pub struct BitSampler<'a> {
    limbs: Limbs,
    cursor: usize,
    rng: &'a mut AesCtrRng,
}

impl<'a> BitSampler<'a> {
    pub fn new(rng: &'a mut AesCtrRng) -> Self {
        let limbs = Limbs::refill(rng);
        Self { limbs, cursor: 0, rng }
    }

    /// Returns the next bit of the stream.
    #[inline]
    pub fn next(&mut self) -> u64 {
        let v = self.limbs.bits(self.cursor, 1);
        self.cursor += 1;
        if self.cursor == 8 * BLOCK_LEN {
            self.limbs = Limbs::refill(self.rng);
            self.cursor = 0;
        }
        v
    }
}

impl ValueSampler for BitSampler<'_> {
    fn next_value(&mut self) -> i64 {
        self.next() as i64
    }
}

// K-BIT SAMPLER
// ================================================================================================

/// Uniform sampler of `n_bits`-wide values, sign-extended to `i64`.
///
/// `n_bits` is a runtime parameter in `[1, 63]`. Draws may straddle the
/// 128-bit buffer; the pieces are shifted into place so every draw is a
/// uniform `n_bits`-bit value regardless of the cursor position.
pub struct BitsSampler<'a> {
    limbs: Limbs,
    cursor: usize,
    n_bits: usize,
    rng: &'a mut AesCtrRng,
}

impl<'a> BitsSampler<'a> {
    pub fn new(rng: &'a mut AesCtrRng, n_bits: usize) -> Self {
        assert!((1..=63).contains(&n_bits), "n_bits must be in [1, 63]");
        let limbs = Limbs::refill(rng);
        Self { limbs, cursor: 0, n_bits, rng }
    }

    /// Returns the next value, sign-extended from `n_bits` bits.
    pub fn next(&mut self) -> i64 {
        let mut r = 0_u64;
        let mut got = 0;
        let mut remaining = self.n_bits;
        while remaining > 0 {
            let n = remaining.min(64 - (self.cursor & 63));
            r |= self.limbs.bits(self.cursor, n) << got;
            got += n;
            remaining -= n;
            self.cursor += n;
            if self.cursor == 8 * BLOCK_LEN {
                self.limbs = Limbs::refill(self.rng);
                self.cursor = 0;
            }
        }
        // sign-extend from n_bits
        ((r << (64 - self.n_bits)) as i64) >> (64 - self.n_bits)
    }
}

impl ValueSampler for BitsSampler<'_> {
    fn next_value(&mut self) -> i64 {
        self.next()
    }
}

// TESTS
// ================================================================================================
