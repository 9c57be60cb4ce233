//! Deterministic pseudo-random generation.
//!
//! Everything in this crate that needs randomness draws it from [`AesCtrRng`],
//! a 128-bit block cipher in counter mode. The generator is deterministic and
//! seekable given its 16-byte seed, which is what makes the Fiat–Shamir
//! challenge derivation reproducible across prover and verifier.

use aes::{
    Aes128,
    cipher::{BlockEncrypt, KeyInit, generic_array::GenericArray},
};
use rand::{CryptoRng, RngCore};

mod uniform;
pub use uniform::{
    BitSampler, BitsSampler, U8Sampler, U16Sampler, U32Sampler, U64Sampler, UIntSampler,
    ValueSampler,
};

// CONSTANTS
// ================================================================================================

/// Size of one cipher block in bytes.
pub const BLOCK_LEN: usize = 16;

/// Size of a generator seed in bytes.
pub const SEED_LEN: usize = 16;

// ENTROPY SOURCE
// ================================================================================================

/// A source of raw entropy bytes for batch samplers.
///
/// The CTR generator never fails; a pre-generated finite buffer (the contract
/// an accelerator backend supplies) reports exhaustion instead, and batch
/// samplers then return the prefix of samples they could produce.
pub trait EntropySource {
    /// Fills `dest` with entropy. Returns false if the source is exhausted,
    /// in which case the contents of `dest` are unspecified.
    fn try_fill(&mut self, dest: &mut [u8]) -> bool;
}

impl EntropySource for AesCtrRng {
    fn try_fill(&mut self, dest: &mut [u8]) -> bool {
        self.fill_bytes(dest);
        true
    }
}

/// A finite entropy pool over a pre-generated byte buffer.
pub struct EntropyBuffer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> EntropyBuffer<'a> {
    /// Returns a pool serving entropy from `data` front to back.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl EntropySource for EntropyBuffer<'_> {
    fn try_fill(&mut self, dest: &mut [u8]) -> bool {
        if self.remaining() < dest.len() {
            return false;
        }
        dest.copy_from_slice(&self.data[self.pos..self.pos + dest.len()]);
        self.pos += dest.len();
        true
    }
}

// AES-CTR GENERATOR
// ================================================================================================

/// AES-128 in counter mode.
///
/// After a reseed the counter is zero; every 16-byte request increments the
/// counter by one and emits `Enc(key, ctr)` with the counter serialized
/// little-endian, so seeded streams are identical across platforms.
#[derive(Clone)]
pub struct AesCtrRng {
    cipher: Aes128,
    ctr: u128,
}

impl AesCtrRng {
    /// Returns a generator seeded with `seed`.
    pub fn new(seed: [u8; SEED_LEN]) -> Self {
        Self {
            cipher: Aes128::new(&GenericArray::from(seed)),
            ctr: 0,
        }
    }

    /// Returns a generator seeded from the operating system.
    pub fn from_entropy() -> Self {
        let mut rng = Self::new([0_u8; SEED_LEN]);
        rng.reseed_from_entropy();
        rng
    }

    /// Re-keys the cipher with `seed` and resets the counter to zero.
    pub fn reseed(&mut self, seed: [u8; SEED_LEN]) {
        self.cipher = Aes128::new(&GenericArray::from(seed));
        self.ctr = 0;
    }

    /// Reseeds from the operating system's randomness facility.
    pub fn reseed_from_entropy(&mut self) {
        let mut seed = [0_u8; SEED_LEN];
        rand::rng().fill_bytes(&mut seed);
        self.reseed(seed);
    }

    /// Writes the next 16-byte block of the key stream into `out`.
    pub fn random_block(&mut self, out: &mut [u8; BLOCK_LEN]) {
        self.ctr = self.ctr.wrapping_add(1);
        out.copy_from_slice(&self.ctr.to_le_bytes());
        self.cipher.encrypt_block(GenericArray::from_mut_slice(out));
    }
}

impl RngCore for AesCtrRng {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0_u8; 4];
        self.fill_bytes(&mut buf);
        u32::from_le_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0_u8; 8];
        self.fill_bytes(&mut buf);
        u64::from_le_bytes(buf)
    }

    /// Fills `dest` by concatenating key-stream blocks; the final partial
    /// block is truncated.
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut chunks = dest.chunks_exact_mut(BLOCK_LEN);
        for chunk in chunks.by_ref() {
            let block: &mut [u8; BLOCK_LEN] = chunk.try_into().expect("chunk is 16 bytes");
            self.random_block(block);
        }
        let rest = chunks.into_remainder();
        if !rest.is_empty() {
            let mut block = [0_u8; BLOCK_LEN];
            self.random_block(&mut block);
            rest.copy_from_slice(&block[..rest.len()]);
        }
    }
}

impl CryptoRng for AesCtrRng {}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_seed_key_stream() {
        let mut rng = AesCtrRng::new([0_u8; 16]);
        let mut block = [0_u8; 16];
        rng.random_block(&mut block);
        assert_eq!(
            block,
            [
                0x47, 0x71, 0x18, 0x16, 0xe9, 0x1d, 0x6f, 0xf0, 0x59, 0xbb, 0xbf, 0x2b, 0xf5,
                0x8e, 0x0f, 0xd3
            ]
        );
        rng.random_block(&mut block);
        assert_eq!(
            block,
            [
                0xbc, 0xf1, 0x76, 0xa7, 0xea, 0xad, 0x80, 0x85, 0xeb, 0xac, 0xea, 0x36, 0x24,
                0x62, 0xa2, 0x81
            ]
        );
    }

    #[test]
    fn fill_truncates_partial_block() {
        let mut rng = AesCtrRng::new([0_u8; 16]);
        let mut out = [0_u8; 24];
        rng.fill_bytes(&mut out);
        let mut expected = [0_u8; 32];
        let mut rng2 = AesCtrRng::new([0_u8; 16]);
        rng2.fill_bytes(&mut expected);
        assert_eq!(out, expected[..24]);
    }

    #[test]
    fn reseed_restarts_the_stream() {
        let mut rng = AesCtrRng::from_entropy();
        let mut first = [0_u8; 48];
        rng.fill_bytes(&mut first);

        rng.reseed([7_u8; 16]);
        let mut a = [0_u8; 48];
        rng.fill_bytes(&mut a);

        rng.reseed([7_u8; 16]);
        let mut b = [0_u8; 48];
        rng.fill_bytes(&mut b);

        assert_eq!(a, b);
        assert_ne!(a, first);
    }

    #[test]
    fn entropy_buffer_reports_exhaustion() {
        let pool = [5_u8; 20];
        let mut src = EntropyBuffer::new(&pool);
        let mut out = [0_u8; 16];
        assert!(src.try_fill(&mut out));
        assert_eq!(out, [5_u8; 16]);
        assert_eq!(src.remaining(), 4);
        assert!(!src.try_fill(&mut out));
    }
}
