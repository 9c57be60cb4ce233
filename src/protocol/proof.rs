//! The verifier's view of one protocol execution.

use thiserror::Error;

use super::hasher::MatrixHasher;
use crate::matrix::{ColMajorMatrix, Element, RowMajorMatrix};
use crate::rand::AesCtrRng;

// PROOF
// ================================================================================================

/// A non-interactive proof for A·S = T with S short.
///
/// A and T are row-major, W, C and Z column-major; the orders are fixed by
/// the multiplication shapes the verifier re-runs and are not transmitted.
#[derive(Clone, Debug)]
pub struct Proof<T: Element> {
    pub r: usize,
    pub v: usize,
    pub l: usize,
    pub n: usize,
    /// The claimed per-column Euclidean bound on Z, √(2v)·σ.
    pub bound: f64,
    /// Public r×v matrix.
    pub mat_a: RowMajorMatrix<T>,
    /// Image T = A·S, r×l.
    pub mat_t: RowMajorMatrix<T>,
    /// Commitment W = A·Y, r×n.
    pub mat_w: ColMajorMatrix<T>,
    /// Fiat–Shamir challenge bits, l×n.
    pub mat_c: ColMajorMatrix<T>,
    /// Response Z = S·C + Y, v×n.
    pub mat_z: ColMajorMatrix<T>,
}

impl<T: Element> Proof<T> {
    /// Returns a proof shell with zeroed matrices of the declared shapes.
    pub fn new(r: usize, v: usize, l: usize, n: usize, bound: f64) -> Self {
        Self {
            r,
            v,
            l,
            n,
            bound,
            mat_a: RowMajorMatrix::new(r, v),
            mat_t: RowMajorMatrix::new(r, l),
            mat_w: ColMajorMatrix::new(r, n),
            mat_c: ColMajorMatrix::new(l, n),
            mat_z: ColMajorMatrix::new(v, n),
        }
    }

    /// Derives the challenge generator by hashing A ‖ T ‖ W, in exactly that
    /// order, and seeding a fresh generator with the folded digest.
    pub fn challenge_rng(&self) -> AesCtrRng {
        let mut hasher = MatrixHasher::new();
        hasher.update(&self.mat_a);
        hasher.update(&self.mat_t);
        hasher.update(&self.mat_w);
        AesCtrRng::new(hasher.fold())
    }

    // SERIALIZATION
    // --------------------------------------------------------------------------------------------

    /// Wire format: r, v, l, n as `i32` little-endian, the bound as an
    /// IEEE-754 double, then A, T, W, C, Z cell-by-cell in storage order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let cells = self.r * self.v + self.r * self.l + self.n * (self.r + self.l + self.v);
        let mut out = Vec::with_capacity(4 * 4 + 8 + cells * T::BYTES);
        for dim in [self.r, self.v, self.l, self.n] {
            out.extend_from_slice(&(dim as i32).to_le_bytes());
        }
        out.extend_from_slice(&self.bound.to_le_bytes());
        for &cell in self.mat_a.data() {
            cell.write_le(&mut out);
        }
        for &cell in self.mat_t.data() {
            cell.write_le(&mut out);
        }
        for &cell in self.mat_w.data() {
            cell.write_le(&mut out);
        }
        for &cell in self.mat_c.data() {
            cell.write_le(&mut out);
        }
        for &cell in self.mat_z.data() {
            cell.write_le(&mut out);
        }
        out
    }

    /// Decodes a proof previously produced by [`Self::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProofDecodeError> {
        const HEADER_LEN: usize = 4 * 4 + 8;
        if bytes.len() < HEADER_LEN {
            return Err(ProofDecodeError::TooShort {
                expected: HEADER_LEN,
                actual: bytes.len(),
            });
        }
        let mut dims = [0_usize; 4];
        for (i, dim) in dims.iter_mut().enumerate() {
            let raw = i32::from_le_bytes(bytes[4 * i..4 * (i + 1)].try_into().expect("4 bytes"));
            *dim = usize::try_from(raw).map_err(|_| ProofDecodeError::NegativeDimension(raw))?;
        }
        let [r, v, l, n] = dims;
        let bound = f64::from_le_bytes(bytes[16..24].try_into().expect("8 bytes"));

        let cells = r * v + r * l + r * n + l * n + v * n;
        let expected = HEADER_LEN + cells * T::BYTES;
        if bytes.len() != expected {
            return Err(ProofDecodeError::TooShort { expected, actual: bytes.len() });
        }

        let mut proof = Self::new(r, v, l, n, bound);
        let mut chunks = bytes[HEADER_LEN..].chunks_exact(T::BYTES);
        for mat in [&mut proof.mat_a, &mut proof.mat_t] {
            for cell in mat.data_mut() {
                *cell = T::read_le(chunks.next().expect("length checked above"));
            }
        }
        for mat in [&mut proof.mat_w, &mut proof.mat_c, &mut proof.mat_z] {
            for cell in mat.data_mut() {
                *cell = T::read_le(chunks.next().expect("length checked above"));
            }
        }
        Ok(proof)
    }
}

// ERRORS
// ================================================================================================

/// A proof byte string that does not match the wire format.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProofDecodeError {
    #[error("proof encoding needs {expected} bytes, found {actual}")]
    TooShort { expected: usize, actual: usize },
    #[error("proof header carries a negative dimension ({0})")]
    NegativeDimension(i32),
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_proof() -> Proof<i32> {
        let mut proof = Proof::<i32>::new(2, 3, 2, 2, 123.5);
        for (i, cell) in proof.mat_a.data_mut().iter_mut().enumerate() {
            *cell = i as i32 - 3;
        }
        for (i, cell) in proof.mat_z.data_mut().iter_mut().enumerate() {
            *cell = (i as i32) * 17 - 40;
        }
        proof.mat_c.set(1, 0, 1);
        proof.mat_w.set(0, 1, -9);
        proof.mat_t.set(1, 1, 7);
        proof
    }

    #[test]
    fn wire_round_trip() {
        let proof = sample_proof();
        let bytes = proof.to_bytes();
        let back = Proof::<i32>::from_bytes(&bytes).unwrap();
        assert_eq!(back.r, proof.r);
        assert_eq!(back.bound, proof.bound);
        assert_eq!(back.mat_a, proof.mat_a);
        assert_eq!(back.mat_t, proof.mat_t);
        assert_eq!(back.mat_w, proof.mat_w);
        assert_eq!(back.mat_c, proof.mat_c);
        assert_eq!(back.mat_z, proof.mat_z);
    }

    #[test]
    fn wire_layout_is_fixed() {
        let proof = sample_proof();
        let bytes = proof.to_bytes();
        assert_eq!(bytes[0..4], 2_i32.to_le_bytes());
        assert_eq!(bytes[4..8], 3_i32.to_le_bytes());
        assert_eq!(bytes[8..12], 2_i32.to_le_bytes());
        assert_eq!(bytes[12..16], 2_i32.to_le_bytes());
        assert_eq!(bytes[16..24], 123.5_f64.to_le_bytes());
        // first cell of A follows the header
        assert_eq!(bytes[24..28], (-3_i32).to_le_bytes());
    }

    #[test]
    fn truncated_encoding_is_rejected() {
        let bytes = sample_proof().to_bytes();
        let err = Proof::<i32>::from_bytes(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, ProofDecodeError::TooShort { .. }));

        let err = Proof::<i32>::from_bytes(&bytes[..10]).unwrap_err();
        assert!(matches!(err, ProofDecodeError::TooShort { .. }));
    }

    #[test]
    fn negative_dimension_is_rejected() {
        let mut bytes = sample_proof().to_bytes();
        bytes[3] = 0x80;
        let err = Proof::<i32>::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ProofDecodeError::NegativeDimension(_)));
    }

    #[test]
    fn challenge_rng_binds_the_commitment() {
        let proof = sample_proof();
        let mut rng1 = proof.challenge_rng();
        let mut tampered = proof.clone();
        tampered.mat_w.set(0, 0, 1);
        let mut rng2 = tampered.challenge_rng();

        use rand::RngCore;
        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }
}
