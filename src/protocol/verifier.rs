//! The verifier side of the argument.

use tracing::warn;

use super::proof::Proof;
use super::check_matrix;
use crate::matrix::{ColMajorMatrix, Element, MatOps, add};
use crate::rand::BitSampler;

// VERIFIER
// ================================================================================================

/// Checks a [`Proof`] against the declared dimensions and norm bound.
///
/// Scratch matrices for the algebraic re-computation are allocated once at
/// construction and reused across calls.
pub struct Verifier<T: Element, M: MatOps<T>> {
    matops: M,
    r: usize,
    v: usize,
    l: usize,
    n: usize,
    bound: f64,
    mat_az: ColMajorMatrix<T>,
    mat_tc: ColMajorMatrix<T>,
    mat_tcw: ColMajorMatrix<T>,
    z_col_norms: Vec<f64>,
}

impl<T: Element, M: MatOps<T>> Verifier<T, M> {
    pub fn new(matops: M, r: usize, v: usize, l: usize, n: usize, bound: f64) -> Self {
        Self {
            matops,
            r,
            v,
            l,
            n,
            bound,
            mat_az: ColMajorMatrix::new(r, n),
            mat_tc: ColMajorMatrix::new(r, n),
            mat_tcw: ColMajorMatrix::new(r, n),
            z_col_norms: vec![0.0; n],
        }
    }

    /// Verifies `proof`. The checks run in order (claimed bound, shapes,
    /// challenge re-derivation, the identity A·Z = T·C + W, per-column norm
    /// bound on Z) and the first failure decides.
    ///
    /// The proof is mutable so its matrices can be synced to the backend
    /// before the multiplications.
    pub fn verify(&mut self, proof: &mut Proof<T>) -> bool {
        if self.bound < proof.bound {
            warn!(claimed = proof.bound, bound = self.bound, "claimed norm bound too large");
            return false;
        }
        let shapes_ok = proof.mat_a.num_rows() == self.r
            && proof.mat_a.num_cols() == self.v
            && proof.mat_z.num_rows() == self.v
            && proof.mat_z.num_cols() == self.n
            && proof.mat_w.num_rows() == self.r
            && proof.mat_w.num_cols() == self.n
            && proof.mat_t.num_rows() == self.r
            && proof.mat_t.num_cols() == self.l
            && proof.mat_c.num_rows() == self.l
            && proof.mat_c.num_cols() == self.n;
        if !shapes_ok {
            warn!("mismatching proof dimensions");
            return false;
        }

        // everything from here on operates on public data only, so an early
        // return leaks nothing
        let mut challenge_rng = proof.challenge_rng();
        let mut bits = BitSampler::new(&mut challenge_rng);
        if !check_matrix(&mut bits, &proof.mat_c) {
            warn!("mismatching challenge matrix");
            return false;
        }

        let synced = self.matops.sync(&mut proof.mat_a)
            && self.matops.sync(&mut proof.mat_z)
            && self.matops.sync(&mut proof.mat_t)
            && self.matops.sync(&mut proof.mat_c);
        if !synced
            || !self.matops.multiply(&proof.mat_a, &proof.mat_z, &mut self.mat_az)
            || !self.matops.multiply(&proof.mat_t, &proof.mat_c, &mut self.mat_tc)
            || !add(&self.mat_tc, &proof.mat_w, &mut self.mat_tcw)
        {
            warn!("failed to recompute the verification matrices");
            return false;
        }
        if self.mat_az != self.mat_tcw {
            warn!("A*Z = T*C + W does not hold");
            return false;
        }

        self.z_col_norms.fill(0.0);
        for j in 0..self.n {
            for &cell in proof.mat_z.col(j) {
                let z = cell.to_f64();
                self.z_col_norms[j] += z * z;
            }
        }
        let bound_sq = self.bound * self.bound;
        for (j, &norm_sq) in self.z_col_norms.iter().enumerate() {
            if norm_sq > bound_sq {
                warn!(column = j, norm_sq, bound_sq, "norm bound exceeded");
                return false;
            }
        }
        true
    }
}
