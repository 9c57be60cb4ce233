//! Backend-neutral matrix operation dispatch.
//!
//! The prover and verifier are parameterized on a [`MatOps`] capability
//! instead of a concrete backend. A CPU implementation is provided here; an
//! accelerator backend supplies the same contract, with `sync` flushing
//! host-side modifications to the device before its kernels run.

use super::{ColMajorMatrix, Element, Matrix, RowMajorMatrix, StorageOrder};

#[cfg(feature = "concurrent")]
use super::PAR_THRESHOLD;
#[cfg(feature = "concurrent")]
use rayon::prelude::*;

// MATOPS
// ================================================================================================

/// The matrix operations the protocol delegates to a backend.
///
/// All operations report success as a boolean; on failure outputs are left
/// untouched.
pub trait MatOps<T: Element>: Clone {
    /// Copies `src` into `dst`; both share the storage order.
    fn copy<O: StorageOrder>(&self, dst: &mut Matrix<T, O>, src: &Matrix<T, O>) -> bool;

    /// Flushes host-side modifications of `mat` to the backend.
    fn sync<O: StorageOrder>(&self, mat: &mut Matrix<T, O>) -> bool;

    /// C := A·B in the `(RMO, CMO) → CMO` shape.
    fn multiply(
        &self,
        a: &RowMajorMatrix<T>,
        b: &ColMajorMatrix<T>,
        c: &mut ColMajorMatrix<T>,
    ) -> bool;
}

// CPU BACKEND
// ================================================================================================

/// Matrix operations executed on the host.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuMatOps;

impl<T: Element> MatOps<T> for CpuMatOps {
    fn copy<O: StorageOrder>(&self, dst: &mut Matrix<T, O>, src: &Matrix<T, O>) -> bool {
        if src.num_rows() != dst.num_rows() || src.num_cols() != dst.num_cols() {
            return false;
        }
        #[cfg(feature = "concurrent")]
        if dst.num_cells() >= PAR_THRESHOLD {
            dst.data_mut()
                .par_chunks_mut(PAR_THRESHOLD)
                .zip(src.data().par_chunks(PAR_THRESHOLD))
                .for_each(|(d, s)| d.copy_from_slice(s));
            return true;
        }
        dst.data_mut().copy_from_slice(src.data());
        true
    }

    fn sync<O: StorageOrder>(&self, _mat: &mut Matrix<T, O>) -> bool {
        true
    }

    fn multiply(
        &self,
        a: &RowMajorMatrix<T>,
        b: &ColMajorMatrix<T>,
        c: &mut ColMajorMatrix<T>,
    ) -> bool {
        super::multiply(a, b, c)
    }
}

// TESTS
// ================================================================================================
