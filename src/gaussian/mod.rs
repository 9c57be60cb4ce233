//! Discrete Gaussian samplers.
//!
//! Three samplers live here, all constant-time with respect to the values
//! they produce:
//!
//! - [`FacctGaussianSampler`]: the FACCT construction
//!   (<https://eprint.iacr.org/2018/1234>) for D_{Z,σ} with σ a compile-time
//!   parameter up to 32 bits wide. This is what the prover's commitments use.
//! - [`BitSlicedHalfGaussian`]: pre-generated table-driven samplers for
//!   D_{Z,σ,≥0} with small σ ∈ {2, 215}, evaluating 64 lanes at a time as
//!   bit-slices in 64-bit words.
//! - [`AdjustedGaussianSampler`]: a Falcon-style sampler for arbitrary
//!   center μ and spread σ < σ₀, built from a bit-sliced base sampler and
//!   BerExp rejection.

mod bitslice;
mod facct;
mod samplerz;
mod tables;

pub use bitslice::{BitSlicedHalfGaussian, NSAMPLES};
pub use facct::FacctGaussianSampler;
pub use samplerz::{AdjustedGaussianSampler, ber_exp};
pub use tables::{HALF_GAUSS_2, HALF_GAUSS_215, HalfGaussTable};

// CONSTANTS
// ================================================================================================

/// Standard deviation of the FACCT base distribution, √(1/(2·ln 2)).
pub const SIGMA_0: f64 = 0.8493218002880191;

/// 1/σ₀.
pub(crate) const INV_SIGMA_0: f64 = 1.1774100225154747;
