//! The non-interactive argument: prover, verifier and driver.
//!
//! The statement is "I know S with A·S = T and S short". One execution
//! samples a Gaussian mask Y and commits to W = A·Y, derives the challenge
//! bits C from SHA-256(A ‖ T ‖ W), responds with Z = S·C + Y, and repeats
//! the whole draw until rejection sampling accepts; the verifier re-derives
//! C and checks A·Z = T·C + W together with per-column norm bounds on Z.

use thiserror::Error;
use tracing::info;

mod hasher;
mod proof;
mod prover;
mod verifier;

pub use hasher::MatrixHasher;
pub use proof::{Proof, ProofDecodeError};
pub use prover::{Prover, ProverError};
pub use verifier::Verifier;

#[cfg(test)]
mod tests;

use crate::matrix::{ColMajorMatrix, Element, MatOps, Matrix, RowMajorMatrix, StorageOrder};
use crate::rand::{AesCtrRng, BitsSampler, U32Sampler, U64Sampler, ValueSampler};

// ERRORS
// ================================================================================================

/// Failures of a protocol run that are not parameter violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("rejection sampling did not accept within {max_draws} draws")]
    DrawsExhausted { max_draws: u64 },
}

// MATRIX SAMPLING
// ================================================================================================

/// Populates `mat` in storage order from `sampler`, truncating each value
/// into the element type.
pub fn fill_matrix<T, O, S>(sampler: &mut S, mat: &mut Matrix<T, O>)
where
    T: Element,
    O: StorageOrder,
    S: ValueSampler,
{
    for cell in mat.data_mut() {
        *cell = T::from_bits(sampler.next_value());
    }
}

/// Checks that `mat` equals, cell for cell in storage order, what `sampler`
/// would produce.
pub fn check_matrix<T, O, S>(sampler: &mut S, mat: &Matrix<T, O>) -> bool
where
    T: Element,
    O: StorageOrder,
    S: ValueSampler,
{
    mat.data().iter().all(|&cell| cell == T::from_bits(sampler.next_value()))
}

/// Elements that know their full-width uniform sampler.
pub trait UniformElement: Element {
    fn uniform_sampler(rng: &mut AesCtrRng) -> impl ValueSampler + '_;
}

impl UniformElement for i32 {
    fn uniform_sampler(rng: &mut AesCtrRng) -> impl ValueSampler + '_ {
        U32Sampler::new(rng)
    }
}

impl UniformElement for i64 {
    fn uniform_sampler(rng: &mut AesCtrRng) -> impl ValueSampler + '_ {
        U64Sampler::new(rng)
    }
}

// DRIVER
// ================================================================================================

/// Protocol parameters in the notation of the paper: A is r×v, S is v×l,
/// the challenge matrix is l×n.
#[derive(Clone, Copy, Debug)]
pub struct ProtocolParams {
    /// Bit width of the sampled secret entries.
    pub s_bits: usize,
    /// Security parameter.
    pub lambda: u32,
    /// Number of challenge columns.
    pub n: usize,
    /// Rejection-sampling parameter, > 1.
    pub rho: f64,
    pub r: usize,
    pub v: usize,
    pub l: usize,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self { s_bits: 7, lambda: 80, n: 100, rho: 2.0, r: 100, v: 3000, l: 3000 }
    }
}

/// Result of one driver run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolOutcome {
    /// Draws the prover needed before rejection sampling accepted.
    pub draws: u64,
    /// Whether the verifier accepted the proof.
    pub verified: bool,
}

/// Samples a public A uniformly and a secret S with `s_bits`-bit entries,
/// proves knowledge of S, and verifies the resulting proof.
pub fn run_protocol<T, M, const SIGMA: u32>(
    matops: M,
    rng: &mut AesCtrRng,
    params: &ProtocolParams,
) -> Result<ProtocolOutcome, ProverError>
where
    T: UniformElement,
    M: MatOps<T>,
{
    let s = params.l as f64 * (1_u64 << (params.s_bits - 1)) as f64;

    let mut mat_a = RowMajorMatrix::<T>::new(params.r, params.v);
    {
        let mut sampler = T::uniform_sampler(rng);
        fill_matrix(&mut sampler, &mut mat_a);
    }
    let mut mat_s = ColMajorMatrix::<T>::new(params.v, params.l);
    {
        let mut sampler = BitsSampler::new(rng, params.s_bits);
        fill_matrix(&mut sampler, &mut mat_s);
    }

    let mut prover = Prover::<T, M, SIGMA>::create(
        matops.clone(),
        &mat_a,
        &mat_s,
        params.lambda,
        s,
        params.n,
        params.rho,
    )?;
    let mut proof = Proof::new(params.r, params.v, params.l, params.n, prover.norm_bound());
    let draws = prover.prove(rng, &mut proof);

    let mut verifier = Verifier::new(matops, params.r, params.v, params.l, params.n, proof.bound);
    let verified = verifier.verify(&mut proof);
    info!(draws, verified, "protocol run finished");
    Ok(ProtocolOutcome { draws, verified })
}
