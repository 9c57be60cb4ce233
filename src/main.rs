use anyhow::Context;
use clap::Parser;
use tracing::info;

use lattirs::matrix::CpuMatOps;
use lattirs::protocol::ProtocolParams;
use lattirs::{AesCtrRng, run_protocol};

/// Commitment deviation of the production parameter set. The sampler takes
/// σ at compile time, so changing it means rebuilding.
const SIGMA: u32 = 2_000_000_000;

/// Proves and verifies knowledge of a short S with A·S = T over random
/// instances of the given shape.
#[derive(Parser, Debug)]
#[command(name = "lattirs", version, about)]
struct Args {
    /// Bit width of the secret entries
    #[arg(long, default_value_t = 7)]
    s_bits: usize,

    /// Security parameter
    #[arg(long, default_value_t = 80)]
    lambda: u32,

    /// Number of challenge columns
    #[arg(long, default_value_t = 100)]
    n: usize,

    /// Rejection-sampling parameter, must exceed 1
    #[arg(long, default_value_t = 2.0)]
    rho: f64,

    /// Rows of the public matrix A
    #[arg(long, default_value_t = 100)]
    r: usize,

    /// Columns of A (rows of the secret S)
    #[arg(long, default_value_t = 3000)]
    v: usize,

    /// Columns of the secret S
    #[arg(long, default_value_t = 3000)]
    l: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();

    let params = ProtocolParams {
        s_bits: args.s_bits,
        lambda: args.lambda,
        n: args.n,
        rho: args.rho,
        r: args.r,
        v: args.v,
        l: args.l,
    };
    info!(?params, sigma = SIGMA, "running the protocol");

    let mut rng = AesCtrRng::from_entropy();
    let outcome = run_protocol::<i64, _, SIGMA>(CpuMatOps, &mut rng, &params)
        .context("parameter validation failed")?;
    info!(draws = outcome.draws, verified = outcome.verified, "done");
    anyhow::ensure!(outcome.verified, "proof did not verify");
    Ok(())
}
