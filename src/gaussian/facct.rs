//! Constant-time FACCT discrete Gaussian sampler.
//!
//! Samples D_{Z,σ} by combining a CDT base sampler for
//! D_{Z,σ₀,[0,∞)} with σ₀ = √(1/(2·ln 2)), a Barrett-reduced uniform draw
//! over [0, k) with k = ⌈σ/σ₀⌉, and a Bernoulli acceptance with probability
//! exp(−y·(y+2kx)/(2σ₀²)) = 2^(−y·(y+2kx)/k²) evaluated through a
//! ten-term polynomial assembled directly into IEEE-754 bit patterns.
//! Eight candidates are produced per round, in two groups of four lanes.
//!
//! The table constants are frozen: changing any of them changes the
//! sampled distribution.

use super::INV_SIGMA_0;
use crate::rand::{AesCtrRng, EntropySource, ValueSampler};

// CONSTANTS
// ================================================================================================

/// Number of buffered samples served between refills.
pub const BATCH_SAMPLES: usize = 256;

const CDT_LENGTH: usize = 9;
const CDT_LOW_MASK: u64 = 0x7fff_ffff_ffff_ffff;

/// (low, high) 63-bit limb pairs of the base-distribution CDT.
#[rustfmt::skip]
const CDT: [(u64, u64); CDT_LENGTH] = [
    (2200310400551559144, 3327841033070651387),
    (7912151619254726620, 380075531178589176),
    (5167367257772081627, 11604843442081400),
    (5081592746475748971, 90134450315532),
    (6522074513864805092, 175786317361),
    (2579734681240182346, 85801740),
    (8175784047440310133, 10472),
    (2947787991558061753, 0),
    (22489665999543, 0),
];

/// IEEE-754 bit patterns of the 2^a evaluation polynomial, highest degree
/// first.
#[rustfmt::skip]
const EXP_COFF: [u64; 10] = [
    0x3e833b70ffa2c5d4,
    0x3eb4a480fda7e6e1,
    0x3ef01b254493363f,
    0x3f242e0e0aa273cc,
    0x3f55d8a2334ed31b,
    0x3f83b2aa56db0f1a,
    0x3fac6b08e11fc57e,
    0x3fcebfbdff556072,
    0x3fe62e42fefa7fe6,
    0x3ff0000000000000,
];

const EXP_MANTISSA_PRECISION: u32 = 52;
const EXP_MANTISSA_MASK: u64 = (1 << EXP_MANTISSA_PRECISION) - 1;
const R_MANTISSA_PRECISION: u32 = EXP_MANTISSA_PRECISION + 1;
const R_MANTISSA_MASK: u64 = (1 << R_MANTISSA_PRECISION) - 1;
/// 72 bits of Bernoulli randomness split into 53 mantissa + 19 exponent bits.
const R_EXPONENT_L: i64 = 8 * BERNOULLI_ENTRY_BYTES as i64 - R_MANTISSA_PRECISION as i64;
const DOUBLE_ONE: u64 = 1023 << 52;

/// 2^52 and 2^52 + 2^51 with their bit patterns; the int-to-double packing
/// tricks below rely on both.
const F64_SHIFT: f64 = 4503599627370496.0;
const F64_SHIFT_BITS: u64 = 0x4330_0000_0000_0000;
const F64_ROUND: f64 = 6755399441055744.0;
const F64_ROUND_BITS: u64 = 0x4338_0000_0000_0000;

const CDT_ENTRY_BYTES: usize = 16;
const BERNOULLI_ENTRY_BYTES: usize = 9;
const BASE_TABLE_BYTES: usize = 4 * CDT_ENTRY_BYTES;
const BERNOULLI_TABLE_BYTES: usize = 4 * BERNOULLI_ENTRY_BYTES;
const GROUP_BYTES: usize = BASE_TABLE_BYTES + BERNOULLI_TABLE_BYTES;
const TABLES_BYTES: usize = 2 * GROUP_BYTES;
const EXTRA_BYTES: usize = 1;

// DERIVED CONSTANTS
// ================================================================================================

/// k = ⌈σ/σ₀⌉. Only σ with k < 2^32 are supported; wider values would
/// overflow the Bernoulli exponent arithmetic in several places.
const fn binary_sampler_k(sigma: u32) -> u64 {
    let x = sigma as f64 * INV_SIGMA_0;
    let t = x as u64;
    let k = if (t as f64) < x { t + 1 } else { t };
    assert!(k > 0 && k < 1 << 32, "sigma is outside the supported range");
    k
}

/// Width in bytes of one uniform draw for y ∈ [0, k).
const fn uniform_entry_bytes(k: u64) -> usize {
    if k < 1 << 8 {
        1
    } else if k < 1 << 16 {
        2
    } else {
        4
    }
}

/// Smallest t with p_rej^t ≤ 2^-64, evaluated in 96-bit fixed point; the
/// per-round uniform pool holds this many entries.
const fn uniform_rej(k: u64, entry_bytes: usize) -> usize {
    let choices: u128 = 1 << (8 * entry_bytes);
    let q = k as u128 * (choices / k as u128);
    let p_rej_num = choices - q;
    let mut x: u128 = 1 << 96;
    let mut t = 0;
    while x > 1 << 32 {
        x = x * p_rej_num / choices;
        t += 1;
    }
    t
}

// FACCT SAMPLER
// ================================================================================================

/// Discrete Gaussian sampler for D_{Z,σ}, σ given as a const generic.
///
/// Serves single samples out of a 256-entry buffer; a refill that ends
/// mid-round discards the round's remaining candidates. The entropy scratch
/// is allocated once at construction; no allocation happens per call.
pub struct FacctGaussianSampler<'a, const SIGMA: u32, E: EntropySource = AesCtrRng> {
    source: &'a mut E,
    entropy: Vec<u8>,
    samples: [i64; BATCH_SAMPLES],
    len: usize,
    cursor: usize,
}

impl<'a, const SIGMA: u32, E: EntropySource> FacctGaussianSampler<'a, SIGMA, E> {
    const K: u64 = binary_sampler_k(SIGMA);
    const K_2_INV: f64 = (-1.0 / Self::K as f64) / Self::K as f64;
    const ENTRY_BYTES: usize = uniform_entry_bytes(Self::K);
    const BARRETT_SHIFT: u32 = 8 * Self::ENTRY_BYTES as u32;
    const BARRETT_FACTOR: u64 = (1 << Self::BARRETT_SHIFT) / Self::K;
    const UNIFORM_Q: u64 = Self::K * Self::BARRETT_FACTOR;
    const UNIFORM_REJ: usize = uniform_rej(Self::K, Self::ENTRY_BYTES);
    const UNIFORM_BYTES: usize = Self::UNIFORM_REJ * Self::ENTRY_BYTES;

    /// Entropy bytes consumed per round of eight candidates.
    pub const ROUND_BYTES: usize = TABLES_BYTES + Self::UNIFORM_BYTES + EXTRA_BYTES;

    pub fn new(source: &'a mut E) -> Self {
        Self {
            source,
            entropy: vec![0; Self::ROUND_BYTES],
            samples: [0; BATCH_SAMPLES],
            len: 0,
            cursor: 0,
        }
    }

    /// Standard deviation of the sampled distribution.
    pub fn sigma(&self) -> f64 {
        SIGMA as f64
    }

    /// Fills `out` with samples, returning how many were produced. The count
    /// falls short of `out.len()` only when the entropy source is exhausted.
    pub fn sample_into(&mut self, out: &mut [i64]) -> usize {
        Self::batch(self.source, &mut self.entropy, out)
    }

    /// One round of eight candidates: z = k·x + y with their Bernoulli masks
    /// and the shared sign byte. None when the source is exhausted.
    fn round(source: &mut E, entropy: &mut [u8]) -> Option<([u64; 8], [u64; 8], u8)> {
        if !source.try_fill(entropy) {
            return None;
        }
        let mut y = [0_u64; 8];
        Self::uniform_sampler(&entropy[TABLES_BYTES..TABLES_BYTES + Self::UNIFORM_BYTES], &mut y);

        let mut z = [0_u64; 8];
        let mut b = [0_u64; 8];
        for g in 0..2 {
            let group = &entropy[g * GROUP_BYTES..(g + 1) * GROUP_BYTES];
            let x = cdt_sampler(&group[..BASE_TABLE_BYTES]);
            let mut b_in = [0_u64; 4];
            for lane in 0..4 {
                // the lane multiplies take the low 32 bits of each operand
                let xk = (x[lane] & 0xffff_ffff) * (Self::K & 0xffff_ffff);
                let zi = xk.wrapping_add(y[4 * g + lane]);
                z[4 * g + lane] = zi;
                b_in[lane] = (zi.wrapping_add(xk) & 0xffff_ffff) * (y[4 * g + lane] & 0xffff_ffff);
            }
            bernoulli_sampler(
                &b_in,
                &group[BASE_TABLE_BYTES..],
                Self::K_2_INV,
                &mut b[4 * g..4 * (g + 1)],
            );
        }
        Some((z, b, entropy[entropy.len() - 1]))
    }

    fn batch(source: &mut E, entropy: &mut [u8], out: &mut [i64]) -> usize {
        let (mut z, mut b, mut sign) = ([0_u64; 8], [0_u64; 8], 0_u8);
        let mut i = 8;
        let mut j = 0;
        while j < out.len() {
            let kbit = loop {
                if i == 8 {
                    match Self::round(source, entropy) {
                        Some(round) => (z, b, sign) = round,
                        None => return j,
                    }
                    i = 0;
                }
                let kbit = ((sign >> i) & 1) as u64;
                i += 1;
                let zi = z[i - 1];
                // keep unless b = 0, or z = 0 drawn with a positive sign
                let keep =
                    (b[i - 1] & ((zi | zi.wrapping_neg()) | (kbit | kbit.wrapping_neg()))) >> 63;
                if keep == 1 {
                    break kbit;
                }
            };
            // sample = z·(-1)^kbit
            let mult = 1_u64 ^ (kbit.wrapping_neg() & 0xffff_ffff_ffff_fffe);
            out[j] = z[i - 1].wrapping_mul(mult) as i64;
            j += 1;
        }
        j
    }

    /// Draws y uniform in [0, k) by Barrett rejection over the round's pool.
    /// An exhausted pool (probability < 2^-40 per round) yields zero entries,
    /// which are always accepted.
    fn uniform_sampler(pool: &[u8], y: &mut [u64; 8]) {
        let mut i = 0;
        for slot in y.iter_mut() {
            let x = loop {
                let end = (i + 1) * Self::ENTRY_BYTES;
                let v = if end <= pool.len() {
                    let mut buf = [0_u8; 8];
                    buf[..Self::ENTRY_BYTES].copy_from_slice(&pool[i * Self::ENTRY_BYTES..end]);
                    u64::from_le_bytes(buf)
                } else {
                    0
                };
                i += 1;
                if v < Self::UNIFORM_Q {
                    break v;
                }
            };
            // multiply-high Barrett reduction x mod k, with a masked
            // correction for the off-by-one of the rounded quotient
            let reduced = x.wrapping_sub(
                ((x.wrapping_mul(Self::BARRETT_FACTOR) >> Self::BARRETT_SHIFT) + 1)
                    .wrapping_mul(Self::K),
            );
            *slot = reduced.wrapping_add((reduced >> 63) * Self::K);
        }
    }
}

impl<'a, const SIGMA: u32> FacctGaussianSampler<'a, SIGMA, AesCtrRng> {
    /// Returns the next sample; the CTR generator never exhausts.
    pub fn sample(&mut self) -> i64 {
        if self.cursor == self.len {
            let Self { source, entropy, samples, len, cursor } = self;
            *len = Self::batch(source, entropy, &mut samples[..]);
            *cursor = 0;
        }
        let v = self.samples[self.cursor];
        self.cursor += 1;
        v
    }
}

impl<const SIGMA: u32> ValueSampler for FacctGaussianSampler<'_, SIGMA, AesCtrRng> {
    fn next_value(&mut self) -> i64 {
        self.sample()
    }
}

// KERNELS
// ================================================================================================

/// Constant-time CDT sampler over four lanes; each lane consumes 16 bytes
/// split into a low and a high 63-bit limb, and counts the table entries
/// lexicographically above the draw.
fn cdt_sampler(bytes: &[u8]) -> [u64; 4] {
    let mut x = [0_u64; 4];
    for (lane, out) in x.iter_mut().enumerate() {
        let lo = u64::from_le_bytes(
            bytes[8 * lane..8 * lane + 8].try_into().expect("lane low limb"),
        ) & CDT_LOW_MASK;
        let hi = u64::from_le_bytes(
            bytes[32 + 8 * lane..32 + 8 * lane + 8].try_into().expect("lane high limb"),
        ) & CDT_LOW_MASK;
        let mut count = 0_u64;
        for &(c_lo, c_hi) in CDT.iter() {
            let lt_lo = lo.wrapping_sub(c_lo);
            let lt_hi = hi.wrapping_sub(c_hi);
            let eq_hi = ((hi == c_hi) as u64).wrapping_neg();
            count += ((lt_lo & eq_hi) | lt_hi) >> 63;
        }
        *out = count;
    }
    x
}

/// Constant-time Bernoulli sampler over four lanes.
///
/// Evaluates 2^t for t = −b_in/k² by splitting t = ⌊t⌋ + a, computing 2^a
/// with the polynomial and packing ⌊t⌋ straight into the exponent field,
/// then compares mantissa and exponent against 72 bits of randomness per
/// lane (8 bytes plus one shared-exponent byte). Bit 63 of each output word
/// is the acceptance vote.
fn bernoulli_sampler(b_in: &[u64; 4], rnd: &[u8], k_2_inv: f64, b: &mut [u64]) {
    const V_RES_EXPONENT: i64 = R_EXPONENT_L - 1023 + 1;
    for lane in 0..4 {
        // int64 -> double without a cast: valid while b_in < 2^52
        let vx = (f64::from_bits(b_in[lane] | F64_SHIFT_BITS) - F64_SHIFT) * k_2_inv;
        let vx_1 = vx.floor();
        let vt = (vx_1 + F64_ROUND).to_bits().wrapping_sub(F64_ROUND_BITS)
            << EXP_MANTISSA_PRECISION;

        // evaluate 2^a on a = vx - floor(vx) in [0, 1)
        let a = vx - vx_1;
        let mut vsum = f64::from_bits(EXP_COFF[0]);
        for &c in &EXP_COFF[1..] {
            vsum = vsum.mul_add(a, f64::from_bits(c));
        }
        let vres = vt.wrapping_add(vsum.to_bits());

        let res_mantissa = (vres & EXP_MANTISSA_MASK) | (1 << EXP_MANTISSA_PRECISION);
        let shift = (vres >> EXP_MANTISSA_PRECISION).wrapping_add(V_RES_EXPONENT as u64);
        let in_range = ((shift < 64) as u64).wrapping_neg();
        let res_exponent = (1_u64 << (shift & 63)) & in_range;

        let r_raw = u64::from_le_bytes(
            rnd[8 * lane..8 * lane + 8].try_into().expect("lane mantissa"),
        );
        let r_mantissa = r_raw & R_MANTISSA_MASK;
        let r_exponent = (r_raw >> R_MANTISSA_PRECISION)
            | ((rnd[32 + lane] as u64) << (64 - R_MANTISSA_PRECISION));

        // accept when res == 1.0, or mantissa and exponent both compare below
        let res_eq_one = ((vres == DOUBLE_ONE) as u64).wrapping_neg();
        b[lane] = (r_mantissa.wrapping_sub(res_mantissa) & r_exponent.wrapping_sub(res_exponent))
            | res_eq_one;
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rand::EntropyBuffer;
    use rand::RngCore;

    type Facct215<'a> = FacctGaussianSampler<'a, 215>;
    type Facct2<'a> = FacctGaussianSampler<'a, 2>;
    type Facct4000<'a> = FacctGaussianSampler<'a, 4000>;
    type FacctDefault<'a> = FacctGaussianSampler<'a, 2_000_000_000>;

    fn zero_rng() -> AesCtrRng {
        AesCtrRng::new([0_u8; 16])
    }

    #[test]
    fn derived_constants() {
        assert_eq!(Facct2::<'static>::K, 3);
        assert_eq!(Facct2::<'static>::BARRETT_FACTOR, 85);
        assert_eq!(Facct2::<'static>::UNIFORM_REJ, 8);
        assert_eq!(Facct2::<'static>::ROUND_BYTES, 209);

        assert_eq!(Facct215::<'static>::K, 254);
        assert_eq!(Facct215::<'static>::ENTRY_BYTES, 1);
        assert_eq!(Facct215::<'static>::UNIFORM_Q, 254);
        assert_eq!(Facct215::<'static>::UNIFORM_REJ, 10);
        assert_eq!(Facct215::<'static>::ROUND_BYTES, 211);

        assert_eq!(Facct4000::<'static>::K, 4710);
        assert_eq!(Facct4000::<'static>::ENTRY_BYTES, 2);
        assert_eq!(Facct4000::<'static>::UNIFORM_REJ, 17);
        assert_eq!(Facct4000::<'static>::ROUND_BYTES, 235);

        assert_eq!(FacctDefault::<'static>::K, 2354820046);
        assert_eq!(FacctDefault::<'static>::ENTRY_BYTES, 4);
        assert_eq!(FacctDefault::<'static>::UNIFORM_REJ, 56);
        assert_eq!(FacctDefault::<'static>::ROUND_BYTES, 425);
    }

    #[test]
    fn sigma_215_known_answers() {
        let mut rng = zero_rng();
        let mut sampler = Facct215::new(&mut rng);
        let got: Vec<i64> = (0..16).map(|_| sampler.sample()).collect();
        assert_eq!(
            got,
            [
                95, -217, -205, 37, 168, -264, -147, 277, -97, 120, -78, -87, -604, -202, 122,
                302
            ]
        );
    }

    #[test]
    fn sigma_2_known_answers() {
        let mut rng = zero_rng();
        let mut sampler = Facct2::new(&mut rng);
        let got: Vec<i64> = (0..16).map(|_| sampler.sample()).collect();
        assert_eq!(got, [-2, -3, 1, 1, -1, -4, 0, 5, 1, 0, 0, 3, 0, 6, 1, 2]);
    }

    #[test]
    fn sigma_4000_known_answers() {
        let mut rng = zero_rng();
        let mut sampler = Facct4000::new(&mut rng);
        let got: Vec<i64> = (0..8).map(|_| sampler.sample()).collect();
        assert_eq!(got, [4349, -5597, -655, -4672, 1903, 1232, -5066, -86]);
    }

    #[test]
    fn deterministic_for_default_sigma() {
        let mut rng = AesCtrRng::new([3_u8; 16]);
        let mut sampler = FacctDefault::new(&mut rng);
        let a: Vec<i64> = (0..64).map(|_| sampler.sample()).collect();

        let mut rng = AesCtrRng::new([3_u8; 16]);
        let mut sampler = FacctDefault::new(&mut rng);
        let b: Vec<i64> = (0..64).map(|_| sampler.sample()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn finite_entropy_returns_prefix() {
        // two rounds of entropy, drawn from the same stream the CTR-backed
        // sampler would consume, yield the first 13 samples and then stop
        let mut rng = zero_rng();
        let mut pool = vec![0_u8; 2 * Facct215::<'static>::ROUND_BYTES];
        let (a, b) = pool.split_at_mut(Facct215::<'static>::ROUND_BYTES);
        rng.fill_bytes(a);
        rng.fill_bytes(b);

        let mut source = EntropyBuffer::new(&pool);
        let mut sampler = FacctGaussianSampler::<215, _>::new(&mut source);
        let mut out = [0_i64; 256];
        let n = sampler.sample_into(&mut out);
        assert_eq!(n, 13);
        assert_eq!(
            out[..n],
            [95, -217, -205, 37, 168, -264, -147, 277, -97, 120, -78, -87, -604]
        );
    }

    #[test]
    fn barrett_edge_reduces_to_k_minus_one() {
        // the largest accepted draw, UNIFORM_Q - 1, must reduce to k - 1
        let pool = [253_u8; 10];
        let mut y = [0_u64; 8];
        Facct215::<'static>::uniform_sampler(&pool, &mut y);
        assert_eq!(y, [253_u64; 8]);

        let mut pool = [0_u8; 34];
        for entry in pool.chunks_exact_mut(2) {
            entry.copy_from_slice(&61229_u16.to_le_bytes());
        }
        let mut y = [0_u64; 8];
        Facct4000::<'static>::uniform_sampler(&pool, &mut y);
        assert_eq!(y, [4709_u64; 8]);
    }

    #[test]
    fn sigma_215_moments() {
        const N: usize = 1 << 20;
        let mut rng = zero_rng();
        let mut sampler = Facct215::new(&mut rng);
        let mut sum = 0.0_f64;
        let mut sum_sq = 0.0_f64;
        for _ in 0..N {
            let v = sampler.sample() as f64;
            sum += v;
            sum_sq += v * v;
        }
        let mean = sum / N as f64;
        let var = sum_sq / N as f64 - mean * mean;
        assert!(mean.abs() <= 0.05, "mean {mean} drifted");
        let sigma_sq = 215.0 * 215.0;
        assert!((var - sigma_sq).abs() <= 0.05 * sigma_sq, "variance {var} drifted");
    }
}
