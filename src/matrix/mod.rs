//! Dense integer matrices with wrap-around modular arithmetic.
//!
//! All arithmetic is carried out in the machine integer type of the matrix
//! (mod 2^32 or mod 2^64 with silent wraparound), which is the ring the
//! protocol works over. Row-major and column-major storage are distinct
//! types so that the multiplication signature `(RMO, CMO) → CMO`, the only
//! shape the kernels implement, is checked at compile time and an
//! accidental transpose cannot slip through as a runtime flag.
//!
//! Operations that touch at least [`PAR_THRESHOLD`] cells may fan out over
//! the outer index when the `concurrent` feature is enabled; partitioning is
//! fixed, so results never depend on the thread count.

use core::fmt::Debug;
use core::marker::PhantomData;

#[cfg(feature = "concurrent")]
use rayon::prelude::*;

mod ops;
pub use ops::{CpuMatOps, MatOps};

// CONSTANTS
// ================================================================================================

/// Cell-count threshold below which operations always run sequentially.
pub const PAR_THRESHOLD: usize = 1 << 14;

/// Fixed chunk length for floating-point reductions; summing per-chunk
/// partials in index order keeps the result independent of the thread count.
const FIP_CHUNK: usize = 1 << 10;

// ELEMENT
// ================================================================================================

mod private {
    pub trait Sealed {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
    impl Sealed for super::RowMajor {}
    impl Sealed for super::ColMajor {}
}

/// Machine integer types a matrix can hold.
pub trait Element:
    Copy + Default + PartialEq + Eq + Debug + Send + Sync + private::Sealed + 'static
{
    /// Element width in bytes.
    const BYTES: usize;

    fn wrapping_add(self, rhs: Self) -> Self;
    fn wrapping_mul(self, rhs: Self) -> Self;

    /// Truncates the low bits of `bits` into an element.
    fn from_bits(bits: i64) -> Self;

    /// Widens the element into an `f64` (exact for `i32`, nearest for `i64`).
    fn to_f64(self) -> f64;

    /// Appends the element to `out` in little-endian byte order.
    fn write_le(self, out: &mut Vec<u8>);

    /// Reads an element from `bytes`, which holds exactly [`Self::BYTES`]
    /// little-endian bytes.
    fn read_le(bytes: &[u8]) -> Self;
}

impl Element for i32 {
    const BYTES: usize = 4;

    #[inline(always)]
    fn wrapping_add(self, rhs: Self) -> Self {
        i32::wrapping_add(self, rhs)
    }

    #[inline(always)]
    fn wrapping_mul(self, rhs: Self) -> Self {
        i32::wrapping_mul(self, rhs)
    }

    #[inline(always)]
    fn from_bits(bits: i64) -> Self {
        bits as i32
    }

    #[inline(always)]
    fn to_f64(self) -> f64 {
        self as f64
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Self {
        i32::from_le_bytes(bytes.try_into().expect("4-byte element"))
    }
}

impl Element for i64 {
    const BYTES: usize = 8;

    #[inline(always)]
    fn wrapping_add(self, rhs: Self) -> Self {
        i64::wrapping_add(self, rhs)
    }

    #[inline(always)]
    fn wrapping_mul(self, rhs: Self) -> Self {
        i64::wrapping_mul(self, rhs)
    }

    #[inline(always)]
    fn from_bits(bits: i64) -> Self {
        bits
    }

    #[inline(always)]
    fn to_f64(self) -> f64 {
        self as f64
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Self {
        i64::from_le_bytes(bytes.try_into().expect("8-byte element"))
    }
}

// STORAGE ORDERS
// ================================================================================================

/// Maps `(i, j)` coordinates to an offset into the backing buffer.
pub trait StorageOrder:
    Copy + Clone + Debug + Default + Send + Sync + private::Sealed + 'static
{
    fn offset(n_rows: usize, n_cols: usize, i: usize, j: usize) -> usize;
}

/// Row-major storage: rows are contiguous.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RowMajor;

/// Column-major storage: columns are contiguous.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColMajor;

impl StorageOrder for RowMajor {
    #[inline(always)]
    fn offset(_n_rows: usize, n_cols: usize, i: usize, j: usize) -> usize {
        i * n_cols + j
    }
}

impl StorageOrder for ColMajor {
    #[inline(always)]
    fn offset(n_rows: usize, _n_cols: usize, i: usize, j: usize) -> usize {
        j * n_rows + i
    }
}

pub type RowMajorMatrix<T> = Matrix<T, RowMajor>;
pub type ColMajorMatrix<T> = Matrix<T, ColMajor>;

// MATRIX
// ================================================================================================

/// A dense `n_rows × n_cols` matrix with storage order `O`.
///
/// The backing buffer is a single contiguous allocation made at construction;
/// dimensions and order are fixed for the lifetime of the matrix.
#[derive(Clone, Debug)]
pub struct Matrix<T: Element, O: StorageOrder> {
    n_rows: usize,
    n_cols: usize,
    data: Vec<T>,
    _order: PhantomData<O>,
}

impl<T: Element, O: StorageOrder> Matrix<T, O> {
    /// Returns a zeroed matrix of the given dimensions.
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            data: vec![T::default(); n_rows * n_cols],
            _order: PhantomData,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.n_rows
    }

    pub fn num_cols(&self) -> usize {
        self.n_cols
    }

    pub fn num_cells(&self) -> usize {
        self.n_rows * self.n_cols
    }

    /// The backing buffer in storage order.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// The backing buffer as raw little-endian bytes (on little-endian
    /// targets), the form the Fiat–Shamir hasher absorbs.
    pub fn as_bytes(&self) -> &[u8] {
        let p = self.data.as_ptr();
        let len = self.data.len() * T::BYTES;
        // safety: T is a plain machine integer and the buffer is contiguous
        unsafe { core::slice::from_raw_parts(p as *const u8, len) }
    }

    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.data[O::offset(self.n_rows, self.n_cols, i, j)]
    }

    #[inline(always)]
    pub fn set(&mut self, i: usize, j: usize, value: T) {
        self.data[O::offset(self.n_rows, self.n_cols, i, j)] = value;
    }

    /// Resets every cell to zero.
    pub fn zero(&mut self) {
        self.data.fill(T::default());
    }

    /// Max over rows of the absolute row sum, the ℓ∞-induced operator norm.
    /// Upper-bounds the spectral norm; used as a cheap pre-check on S.
    pub fn upper_bound_on_operator_norm(&self) -> f64 {
        let row_sum = |i: usize| -> f64 {
            let mut s = 0.0;
            for j in 0..self.n_cols {
                s += self.get(i, j).to_f64().abs();
            }
            s
        };
        #[cfg(feature = "concurrent")]
        if self.num_cells() >= PAR_THRESHOLD {
            return (0..self.n_rows)
                .into_par_iter()
                .map(row_sum)
                .reduce(|| 0.0, f64::max);
        }
        (0..self.n_rows).map(row_sum).fold(0.0, f64::max)
    }
}

impl<T: Element, O: StorageOrder> PartialEq for Matrix<T, O> {
    /// Cell-wise identity given matching dimensions.
    fn eq(&self, other: &Self) -> bool {
        self.n_rows == other.n_rows && self.n_cols == other.n_cols && self.data == other.data
    }
}

impl<T: Element, O: StorageOrder> Eq for Matrix<T, O> {}

impl<T: Element> Matrix<T, RowMajor> {
    /// Row `i` as a contiguous slice.
    #[inline]
    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }
}

impl<T: Element> Matrix<T, ColMajor> {
    /// Column `j` as a contiguous slice.
    #[inline]
    pub fn col(&self, j: usize) -> &[T] {
        &self.data[j * self.n_rows..(j + 1) * self.n_rows]
    }
}

// ORDER CONVERSION
// ================================================================================================

/// Transposes the storage of `src` into row-major `dst`.
/// Returns false if the dimensions disagree.
pub fn to_row_major<T: Element>(src: &ColMajorMatrix<T>, dst: &mut RowMajorMatrix<T>) -> bool {
    if src.n_rows != dst.n_rows || src.n_cols != dst.n_cols {
        return false;
    }
    for i in 0..src.n_rows {
        for j in 0..src.n_cols {
            dst.set(i, j, src.get(i, j));
        }
    }
    true
}

/// Transposes the storage of `src` into column-major `dst`.
/// Returns false if the dimensions disagree.
pub fn to_column_major<T: Element>(src: &RowMajorMatrix<T>, dst: &mut ColMajorMatrix<T>) -> bool {
    if src.n_rows != dst.n_rows || src.n_cols != dst.n_cols {
        return false;
    }
    for j in 0..src.n_cols {
        for i in 0..src.n_rows {
            dst.set(i, j, src.get(i, j));
        }
    }
    true
}

// KERNELS
// ================================================================================================

/// C := A·B with wrap-around arithmetic in `T`.
///
/// Each output column is a run of contiguous dot products between a row of
/// `A` and a column of `B`; the loop order is (j outer, i middle, k inner).
/// Returns false if the shapes disagree.
pub fn multiply<T: Element>(
    a: &RowMajorMatrix<T>,
    b: &ColMajorMatrix<T>,
    c: &mut ColMajorMatrix<T>,
) -> bool {
    if a.n_rows != c.n_rows || b.n_cols != c.n_cols || a.n_cols != b.n_rows {
        return false;
    }
    if c.num_cells() == 0 {
        return true;
    }
    let n_rows = c.n_rows;
    let column = |j: usize, out: &mut [T]| {
        let b_col = b.col(j);
        for (i, cell) in out.iter_mut().enumerate() {
            let mut s = T::default();
            for (&x, &y) in a.row(i).iter().zip(b_col) {
                s = s.wrapping_add(x.wrapping_mul(y));
            }
            *cell = s;
        }
    };
    #[cfg(feature = "concurrent")]
    if c.num_cells() >= PAR_THRESHOLD {
        c.data_mut()
            .par_chunks_exact_mut(n_rows)
            .enumerate()
            .for_each(|(j, out)| column(j, out));
        return true;
    }
    for (j, out) in c.data_mut().chunks_exact_mut(n_rows).enumerate() {
        column(j, out);
    }
    true
}

/// C := A + B element-wise; all three must share dimensions and order.
pub fn add<T: Element, O: StorageOrder>(
    a: &Matrix<T, O>,
    b: &Matrix<T, O>,
    c: &mut Matrix<T, O>,
) -> bool {
    if a.n_rows != b.n_rows
        || a.n_rows != c.n_rows
        || a.n_cols != b.n_cols
        || a.n_cols != c.n_cols
    {
        return false;
    }
    for ((cell, &x), &y) in c.data.iter_mut().zip(&a.data).zip(&b.data) {
        *cell = x.wrapping_add(y);
    }
    true
}

/// Σ A(i,j)·B(i,j) accumulated in `f64`; `None` if the dimensions disagree.
///
/// The sum is formed over fixed-length chunks whose partials are combined in
/// index order, so the value is identical with and without `concurrent`.
pub fn frobenius_inner_product<T: Element, O: StorageOrder>(
    a: &Matrix<T, O>,
    b: &Matrix<T, O>,
) -> Option<f64> {
    if a.n_rows != b.n_rows || a.n_cols != b.n_cols {
        return None;
    }
    let chunk_sum = |(xs, ys): (&[T], &[T])| -> f64 {
        xs.iter().zip(ys).map(|(&x, &y)| x.to_f64() * y.to_f64()).sum()
    };
    #[cfg(feature = "concurrent")]
    if a.num_cells() >= PAR_THRESHOLD {
        let partials: Vec<f64> = a
            .data
            .par_chunks(FIP_CHUNK)
            .zip(b.data.par_chunks(FIP_CHUNK))
            .map(chunk_sum)
            .collect();
        return Some(partials.iter().sum());
    }
    Some(a.data.chunks(FIP_CHUNK).zip(b.data.chunks(FIP_CHUNK)).map(chunk_sum).sum())
}

/// √⟨A, A⟩; `None` if the dimensions disagree (they cannot here).
pub fn frobenius_norm<T: Element, O: StorageOrder>(a: &Matrix<T, O>) -> Option<f64> {
    frobenius_inner_product(a, a).map(f64::sqrt)
}

// TESTS
// ================================================================================================
