//! Seeded end-to-end scenarios.
//!
//! Every test reseeds the generator with a fixed value, so outcomes are
//! exact, including the number of rejection-sampling draws. The
//! commitment deviation is σ = 4000, the smallest round value satisfying
//! the σ ≥ 12/ln(ρ)·s·√(l·n) precondition for the test dimensions.

use super::*;
use crate::matrix::CpuMatOps;

const SIGMA: u32 = 4000;

fn zero_rng() -> AesCtrRng {
    AesCtrRng::new([0_u8; 16])
}

fn small_params() -> ProtocolParams {
    ProtocolParams { s_bits: 3, lambda: 4, n: 6, rho: 2.0, r: 4, v: 8, l: 8 }
}

/// Replays the driver's sampling steps and returns the proof alongside the
/// draw count, for the tamper scenarios.
fn honest_proof() -> (Proof<i32>, u64) {
    let params = small_params();
    let mut rng = zero_rng();
    let s = params.l as f64 * (1_u64 << (params.s_bits - 1)) as f64;

    let mut mat_a = RowMajorMatrix::<i32>::new(params.r, params.v);
    {
        let mut sampler = i32::uniform_sampler(&mut rng);
        fill_matrix(&mut sampler, &mut mat_a);
    }
    let mut mat_s = ColMajorMatrix::<i32>::new(params.v, params.l);
    {
        let mut sampler = BitsSampler::new(&mut rng, params.s_bits);
        fill_matrix(&mut sampler, &mut mat_s);
    }

    let mut prover = Prover::<i32, CpuMatOps, SIGMA>::create(
        CpuMatOps,
        &mat_a,
        &mat_s,
        params.lambda,
        s,
        params.n,
        params.rho,
    )
    .expect("parameters satisfy the preconditions");
    let mut proof = Proof::new(params.r, params.v, params.l, params.n, prover.norm_bound());
    let draws = prover.prove(&mut rng, &mut proof);
    (proof, draws)
}

fn verify(proof: &mut Proof<i32>, bound: f64) -> bool {
    let params = small_params();
    let mut verifier =
        Verifier::new(CpuMatOps, params.r, params.v, params.l, params.n, bound);
    verifier.verify(proof)
}

#[test]
fn honest_run_verifies() {
    let (mut proof, draws) = honest_proof();
    assert_eq!(draws, 1);
    assert!((1..=32).contains(&draws));
    assert_eq!(proof.bound, 16000.0);
    let bound = proof.bound;
    assert!(verify(&mut proof, bound));
}

#[test]
fn driver_matches_the_manual_run() {
    let mut rng = zero_rng();
    let outcome = run_protocol::<i32, _, SIGMA>(CpuMatOps, &mut rng, &small_params())
        .expect("parameters satisfy the preconditions");
    assert_eq!(outcome, ProtocolOutcome { draws: 1, verified: true });
}

#[test]
fn driver_runs_with_i64_elements() {
    let mut rng = zero_rng();
    let outcome = run_protocol::<i64, _, SIGMA>(CpuMatOps, &mut rng, &small_params())
        .expect("parameters satisfy the preconditions");
    assert_eq!(outcome, ProtocolOutcome { draws: 1, verified: true });
}

#[test]
fn tampered_response_is_rejected() {
    let (mut proof, _) = honest_proof();
    let z00 = proof.mat_z.get(0, 0);
    proof.mat_z.set(0, 0, z00 ^ 1);
    let bound = proof.bound;
    assert!(!verify(&mut proof, bound));
}

#[test]
fn replaced_challenge_is_rejected() {
    let (mut proof, _) = honest_proof();
    for cell in proof.mat_c.data_mut() {
        *cell = 1;
    }
    let bound = proof.bound;
    assert!(!verify(&mut proof, bound));
}

#[test]
fn commitment_bytes_bind_the_challenge() {
    // flipping any byte of A, T or W without re-deriving C must fail
    let bound = honest_proof().0.bound;

    let (mut proof, _) = honest_proof();
    let a01 = proof.mat_a.get(0, 1);
    proof.mat_a.set(0, 1, a01 ^ (1 << 9));
    assert!(!verify(&mut proof, bound));

    let (mut proof, _) = honest_proof();
    let t02 = proof.mat_t.get(0, 2);
    proof.mat_t.set(0, 2, t02 ^ 1);
    assert!(!verify(&mut proof, bound));

    let (mut proof, _) = honest_proof();
    let w10 = proof.mat_w.get(1, 0);
    proof.mat_w.set(1, 0, w10 ^ (1 << 7));
    assert!(!verify(&mut proof, bound));
}

#[test]
fn larger_claimed_bound_is_rejected() {
    let (mut proof, _) = honest_proof();
    let bound = proof.bound;
    assert!(!verify(&mut proof, bound - 1.0));
}

#[test]
fn wire_round_trip_still_verifies() {
    let (proof, _) = honest_proof();
    let mut decoded = Proof::<i32>::from_bytes(&proof.to_bytes()).expect("valid encoding");
    let bound = decoded.bound;
    assert!(verify(&mut decoded, bound));
}

#[test]
fn sigma_below_the_soundness_bound_is_rejected() {
    // with these dimensions the requirement is 12/ln(2)·32·√48 ≈ 3839
    let params = small_params();
    let mut rng = zero_rng();
    let outcome = run_protocol::<i32, _, 215>(CpuMatOps, &mut rng, &params);
    assert!(matches!(outcome, Err(ProverError::SigmaTooSmall { .. })));
}

#[test]
fn oversized_witness_is_rejected() {
    // entries beyond the s_bits range push the row sums over s = l·2^(s_bits-1)
    let mat_a = RowMajorMatrix::<i32>::new(2, 3);
    let mut mat_s = ColMajorMatrix::<i32>::new(3, 3);
    for cell in mat_s.data_mut() {
        *cell = 100;
    }
    let s = 3.0 * 4.0;
    let result = Prover::<i32, CpuMatOps, SIGMA>::create(CpuMatOps, &mat_a, &mat_s, 2, s, 4, 2.0);
    assert!(matches!(result, Err(ProverError::OperatorNormExceeded { .. })));
}

#[test]
fn remaining_preconditions_are_enforced() {
    let mat_a = RowMajorMatrix::<i32>::new(2, 3);
    let mat_s = ColMajorMatrix::<i32>::new(3, 3);

    let result = Prover::<i32, CpuMatOps, SIGMA>::create(
        CpuMatOps,
        &mat_a,
        &ColMajorMatrix::<i32>::new(4, 3),
        2,
        12.0,
        4,
        2.0,
    );
    assert!(matches!(result, Err(ProverError::DimensionMismatch { .. })));

    let result =
        Prover::<i32, CpuMatOps, SIGMA>::create(CpuMatOps, &mat_a, &mat_s, 8, 12.0, 4, 2.0);
    assert!(matches!(result, Err(ProverError::ChallengeWidthTooSmall { .. })));

    let result =
        Prover::<i32, CpuMatOps, SIGMA>::create(CpuMatOps, &mat_a, &mat_s, 2, 12.0, 4, 1.0);
    assert!(matches!(result, Err(ProverError::RhoTooSmall { .. })));

    let result =
        Prover::<i32, CpuMatOps, SIGMA>::create(CpuMatOps, &mat_a, &mat_s, 2, 0.0, 4, 2.0);
    assert!(matches!(result, Err(ProverError::NormBoundNotPositive { .. })));
}

#[test]
fn draw_limit_is_surfaced() {
    let params = small_params();
    let mut rng = zero_rng();
    let s = params.l as f64 * (1_u64 << (params.s_bits - 1)) as f64;
    let mut mat_a = RowMajorMatrix::<i32>::new(params.r, params.v);
    {
        let mut sampler = i32::uniform_sampler(&mut rng);
        fill_matrix(&mut sampler, &mut mat_a);
    }
    let mat_s = ColMajorMatrix::<i32>::new(params.v, params.l);
    let mut prover = Prover::<i32, CpuMatOps, SIGMA>::create(
        CpuMatOps,
        &mat_a,
        &mat_s,
        params.lambda,
        s,
        params.n,
        params.rho,
    )
    .expect("zero witness is within every bound");
    let mut proof = Proof::new(params.r, params.v, params.l, params.n, prover.norm_bound());
    // a zero-draw limit can never accept
    let result = prover.prove_with_limit(&mut rng, &mut proof, 0);
    assert_eq!(result, Err(ProtocolError::DrawsExhausted { max_draws: 0 }));
}
