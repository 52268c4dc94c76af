//! `bmm` - run one blocked multiply, time its compute phase and verify the
//! result against a sequential reference.

mod config;

use std::process::ExitCode;
use std::sync::Arc;

use bmm_matrix::{
    BlockedMultiplier, Executor, MatmulError, Matrix, RayonExecutor, ScopedExecutor,
    SequentialExecutor,
};
use bmm_verify::{inputs, Verifier};
use log::info;

use config::{ExecutorKind, InputKind, RunConfig, USAGE};

fn build_executor(cfg: &RunConfig) -> Result<Arc<dyn Executor>, MatmulError> {
    Ok(match cfg.executor {
        ExecutorKind::Sequential => Arc::new(SequentialExecutor::new()),
        ExecutorKind::Rayon => Arc::new(RayonExecutor::new(cfg.workers)?),
        ExecutorKind::Scoped => Arc::new(ScopedExecutor::new(cfg.workers)),
    })
}

fn build_inputs(cfg: &RunConfig) -> (Matrix, Matrix) {
    match cfg.input {
        InputKind::Sequence => (
            inputs::ones(cfg.rows, cfg.depth),
            inputs::column_sequence(cfg.depth, cfg.cols),
        ),
        InputKind::Random => (
            inputs::random(cfg.rows, cfg.depth, cfg.seed),
            inputs::random(cfg.depth, cfg.cols, cfg.seed.wrapping_add(1)),
        ),
    }
}

fn print_matrix(m: &Matrix) {
    for i in 0..m.rows() {
        let line: Vec<String> = m.row(i).iter().map(|v| format!("{:.2}", v)).collect();
        println!("{}", line.join(" "));
    }
}

const EXIT_MISMATCH: u8 = 1;
const EXIT_ERROR: u8 = 2;

/// Process exit status for the outcome of `run`.
fn exit_status(outcome: &Result<bool, MatmulError>) -> u8 {
    match outcome {
        Ok(true) => 0,
        Ok(false) => EXIT_MISMATCH,
        Err(_) => EXIT_ERROR,
    }
}

/// Returns whether verification passed.
fn run(cfg: &RunConfig) -> Result<bool, MatmulError> {
    let multiplier = BlockedMultiplier::new(cfg.block)?
        .with_executor(build_executor(cfg)?)
        .with_partition(cfg.partition);
    let (a, b) = build_inputs(cfg);

    info!(
        "multiplying [{} x {}] @ [{} x {}] with block {}, {} executor ({} workers), {} partition",
        cfg.rows,
        cfg.depth,
        cfg.depth,
        cfg.cols,
        cfg.block,
        multiplier.executor().name(),
        multiplier.executor().parallelism(),
        cfg.partition
    );

    let product = multiplier.multiply_timed(&a, &b)?;
    println!(
        "Elapsed time: {:.6} s ({:.3} GFLOP/s)",
        product.elapsed.as_secs_f64(),
        product.gflops(cfg.depth)
    );
    if cfg.print {
        print_matrix(&product.matrix);
    }

    let report = Verifier::new()
        .with_tolerance(cfg.effective_tolerance())
        .verify(&a, &b, &product.matrix)?;
    println!("{}", report);
    Ok(report.passed())
}

fn main() -> ExitCode {
    env_logger::init();

    let cfg = match RunConfig::from_args(std::env::args().skip(1)) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("error: {}\n\n{}", e, USAGE);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    if cfg.help {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    let outcome = run(&cfg);
    if let Err(e) = &outcome {
        eprintln!("error: {}", e);
    }
    ExitCode::from(exit_status(&outcome))
}
