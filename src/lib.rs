//! Lattice-based sub-linear zero-knowledge arguments for the statement
//! "I know a short integer matrix S such that A·S = T", following
//! Baum et al., "Sub-Linear Lattice-Based Zero-Knowledge Arguments for
//! Arithmetic Circuits" (<https://eprint.iacr.org/2018/560>), made
//! non-interactive through the Fiat–Shamir transform.
//!
//! The crate is organized around four layers:
//!
//! - [`rand`](crate::rand): a deterministic AES-128-CTR generator and the typed uniform
//!   samplers (bytes, fixed-width integers, single bits, k-bit values) that
//!   every other component draws from.
//! - [`gaussian`]: discrete Gaussian samplers: the constant-time FACCT
//!   sampler used by the prover's commitments, bit-sliced half-Gaussian
//!   samplers for small σ, and a Falcon-style arbitrary-center sampler
//!   built on top of them.
//! - [`matrix`]: dense matrices over `i32`/`i64` with wrap-around modular
//!   arithmetic, row-major and column-major orders encoded in the type
//!   system, and the `(RMO × CMO) → CMO` multiplication the protocol is
//!   shaped around.
//! - [`protocol`]: the three-move prover, the verifier, the Fiat–Shamir
//!   matrix hasher and the parameter-validating driver.

pub mod gaussian;
pub mod matrix;
pub mod protocol;
pub mod rand;

// RE-EXPORTS
// ================================================================================================

pub use self::rand::AesCtrRng;
pub use gaussian::FacctGaussianSampler;
pub use matrix::{ColMajorMatrix, Element, Matrix, RowMajorMatrix};
pub use protocol::{Proof, ProtocolParams, Prover, Verifier, run_protocol};
