//! The prover side of the argument.

use rand::Rng;
use thiserror::Error;
use tracing::debug;

use super::proof::Proof;
use super::{ProtocolError, fill_matrix};
use crate::gaussian::FacctGaussianSampler;
use crate::matrix::{
    ColMajorMatrix, Element, MatOps, RowMajorMatrix, add, frobenius_inner_product, to_row_major,
};
use crate::rand::{AesCtrRng, BitSampler};

// ERRORS
// ================================================================================================

/// A parameter set rejected by [`Prover::create`]; each variant names the
/// violated inequality.
#[derive(Debug, Error, PartialEq)]
pub enum ProverError {
    #[error("A has {a_cols} columns but S has {s_rows} rows")]
    DimensionMismatch { a_cols: usize, s_rows: usize },
    #[error("challenge width n = {n} is below lambda + 2 = {min}")]
    ChallengeWidthTooSmall { n: usize, min: usize },
    #[error("rejection parameter rho = {rho} does not exceed 1")]
    RhoTooSmall { rho: f64 },
    #[error("operator norm bound s = {s} is not positive")]
    NormBoundNotPositive { s: f64 },
    #[error("operator norm of S ({actual}) exceeds the bound s = {s}")]
    OperatorNormExceeded { actual: f64, s: f64 },
    #[error("sigma = {sigma} is below the soundness requirement {required}")]
    SigmaTooSmall { sigma: f64, required: f64 },
    #[error("matrix backend failed while building the prover")]
    BackendFailure,
}

// PROVER
// ================================================================================================

/// Holds the witness S and runs the commit → challenge → response loop with
/// rejection sampling until the response leaks nothing about S.
///
/// All scratch matrices are allocated at construction; the rejection loop
/// itself performs no allocation. The commitment deviation σ is the FACCT
/// sampler's compile-time parameter.
pub struct Prover<T: Element, M: MatOps<T>, const SIGMA: u32> {
    matops: M,
    n: usize,
    sigma: f64,
    rho: f64,
    bound: f64,
    mat_a: RowMajorMatrix<T>,
    mat_s: ColMajorMatrix<T>,
    // row-major copies of S and T for the left-multiplications S·C and the
    // proof's T field
    lmat_s: RowMajorMatrix<T>,
    lmat_t: RowMajorMatrix<T>,
    mat_t: ColMajorMatrix<T>,
    mat_y: ColMajorMatrix<T>,
    mat_w: ColMajorMatrix<T>,
    mat_c: ColMajorMatrix<T>,
    mat_b: ColMajorMatrix<T>,
    mat_z: ColMajorMatrix<T>,
}

impl<T: Element, M: MatOps<T>, const SIGMA: u32> Prover<T, M, SIGMA> {
    /// Validates the protocol parameters and builds a prover for the witness
    /// `mat_s` with public matrix `mat_a`.
    ///
    /// The preconditions, in the order they are checked:
    ///
    /// 1. `A.cols == S.rows`;
    /// 2. `n ≥ lambda + 2`;
    /// 3. `rho > 1`;
    /// 4. `s > 0` and the operator-norm upper bound of S is at most `s`;
    /// 5. `σ ≥ 12/ln(rho) · s · √(l·n)`.
    pub fn create(
        matops: M,
        mat_a: &RowMajorMatrix<T>,
        mat_s: &ColMajorMatrix<T>,
        lambda: u32,
        s: f64,
        n: usize,
        rho: f64,
    ) -> Result<Self, ProverError> {
        if mat_a.num_cols() != mat_s.num_rows() {
            return Err(ProverError::DimensionMismatch {
                a_cols: mat_a.num_cols(),
                s_rows: mat_s.num_rows(),
            });
        }
        let min_n = lambda as usize + 2;
        if n < min_n {
            return Err(ProverError::ChallengeWidthTooSmall { n, min: min_n });
        }
        if rho <= 1.0 {
            return Err(ProverError::RhoTooSmall { rho });
        }
        if s <= 0.0 {
            return Err(ProverError::NormBoundNotPositive { s });
        }
        let s1 = mat_s.upper_bound_on_operator_norm();
        debug!(operator_norm_bound = s1, s, "validating the witness norm");
        if s1 > s {
            return Err(ProverError::OperatorNormExceeded { actual: s1, s });
        }
        let sigma = SIGMA as f64;
        let l = mat_s.num_cols();
        let required = 12.0 / rho.ln() * s * ((l * n) as f64).sqrt();
        debug!(sigma, required, "validating the commitment deviation");
        if sigma < required {
            return Err(ProverError::SigmaTooSmall { sigma, required });
        }

        let (r, v) = (mat_a.num_rows(), mat_a.num_cols());
        let bound = (2.0 * v as f64).sqrt() * sigma;
        let mut prover = Self {
            matops,
            n,
            sigma,
            rho,
            bound,
            mat_a: RowMajorMatrix::new(r, v),
            mat_s: ColMajorMatrix::new(v, l),
            lmat_s: RowMajorMatrix::new(v, l),
            lmat_t: RowMajorMatrix::new(r, l),
            mat_t: ColMajorMatrix::new(r, l),
            mat_y: ColMajorMatrix::new(v, n),
            mat_w: ColMajorMatrix::new(r, n),
            mat_c: ColMajorMatrix::new(l, n),
            mat_b: ColMajorMatrix::new(v, n),
            mat_z: ColMajorMatrix::new(v, n),
        };

        let ops = &prover.matops;
        let ok = ops.copy(&mut prover.mat_a, mat_a)
            && ops.copy(&mut prover.mat_s, mat_s)
            && ops.sync(&mut prover.mat_a)
            && ops.sync(&mut prover.mat_s)
            && ops.multiply(&prover.mat_a, &prover.mat_s, &mut prover.mat_t)
            && to_row_major(&prover.mat_s, &mut prover.lmat_s)
            && ops.sync(&mut prover.lmat_s)
            && to_row_major(&prover.mat_t, &mut prover.lmat_t)
            && ops.sync(&mut prover.lmat_t);
        if !ok {
            return Err(ProverError::BackendFailure);
        }
        Ok(prover)
    }

    /// The norm bound B = √(2v)·σ the verifier will enforce on Z.
    pub fn norm_bound(&self) -> f64 {
        self.bound
    }

    /// Runs the protocol until the rejection test accepts, filling `proof`.
    /// Returns the number of draws taken.
    pub fn prove(&mut self, rng: &mut AesCtrRng, proof: &mut Proof<T>) -> u64 {
        let mut draws = 0;
        loop {
            draws += 1;
            debug!(draws, "drawing");
            self.attempt(rng, proof);
            if !self.rejected(rng) {
                return draws;
            }
        }
    }

    /// As [`Self::prove`], but gives up after `max_draws` rejected draws
    /// instead of looping indefinitely.
    pub fn prove_with_limit(
        &mut self,
        rng: &mut AesCtrRng,
        proof: &mut Proof<T>,
        max_draws: u64,
    ) -> Result<u64, ProtocolError> {
        let mut draws = 0;
        while draws < max_draws {
            draws += 1;
            self.attempt(rng, proof);
            if !self.rejected(rng) {
                return Ok(draws);
            }
        }
        Err(ProtocolError::DrawsExhausted { max_draws })
    }

    /// One commit → challenge → response pass. Every scratch matrix is
    /// overwritten wholesale, so nothing from a rejected draw can bias the
    /// next one.
    fn attempt(&mut self, rng: &mut AesCtrRng, proof: &mut Proof<T>) {
        self.commit(rng, proof);
        self.challenge(proof);
        self.response(proof);
    }

    /// Samples Y from D_{Z,σ}^{v×n} and commits to W = A·Y.
    fn commit(&mut self, rng: &mut AesCtrRng, proof: &mut Proof<T>) {
        {
            let mut gaussian = FacctGaussianSampler::<SIGMA>::new(rng);
            fill_matrix(&mut gaussian, &mut self.mat_y);
        }
        self.matops.sync(&mut self.mat_y);
        self.matops.multiply(&self.mat_a, &self.mat_y, &mut self.mat_w);
        self.matops.copy(&mut proof.mat_a, &self.mat_a);
        self.matops.copy(&mut proof.mat_t, &self.lmat_t);
        self.matops.copy(&mut proof.mat_w, &self.mat_w);
    }

    /// Derives C from the proof's (A, T, W) by Fiat–Shamir.
    fn challenge(&mut self, proof: &mut Proof<T>) {
        let mut challenge_rng = proof.challenge_rng();
        {
            let mut bits = BitSampler::new(&mut challenge_rng);
            fill_matrix(&mut bits, &mut self.mat_c);
        }
        self.matops.sync(&mut self.mat_c);
        self.matops.copy(&mut proof.mat_c, &self.mat_c);
    }

    /// Computes the response Z = S·C + Y.
    fn response(&mut self, proof: &mut Proof<T>) {
        self.matops.multiply(&self.lmat_s, &self.mat_c, &mut self.mat_b);
        add(&self.mat_b, &self.mat_y, &mut self.mat_z);
        self.matops.copy(&mut proof.mat_z, &self.mat_z);
    }

    /// The Lyubashevsky rejection test: with u uniform in [0, 1), the draw
    /// is kept iff u ≤ (1/ρ)·exp((−2·⟨Z,B⟩ + ‖B‖²)/(2σ²)), which makes the
    /// accepted Z independent of S up to statistical distance 1/ρ.
    fn rejected(&self, rng: &mut AesCtrRng) -> bool {
        let u: f64 = rng.random();
        let zb = frobenius_inner_product(&self.mat_z, &self.mat_b).expect("Z and B share shape");
        let bb = frobenius_inner_product(&self.mat_b, &self.mat_b).expect("B matches itself");
        let accept =
            u <= ((-2.0 * zb + bb) / (2.0 * self.sigma * self.sigma)).exp() / self.rho;
        !accept
    }
}
