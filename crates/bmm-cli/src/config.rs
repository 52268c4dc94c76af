use std::fmt;
use std::str::FromStr;

use bmm_matrix::Partition;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("unknown option '{0}'")]
    UnknownOption(String),

    #[error("option '{0}' needs a value")]
    MissingValue(String),

    #[error("invalid value '{value}' for '{option}': {reason}")]
    InvalidValue {
        option: String,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Which executor runs the block jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorKind {
    Sequential,
    #[default]
    Rayon,
    Scoped,
}

impl ExecutorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ExecutorKind::Sequential => "sequential",
            ExecutorKind::Rayon => "rayon",
            ExecutorKind::Scoped => "scoped",
        }
    }
}

impl FromStr for ExecutorKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "sequential" => Ok(ExecutorKind::Sequential),
            "rayon" => Ok(ExecutorKind::Rayon),
            "scoped" => Ok(ExecutorKind::Scoped),
            _ => Err("expected sequential, rayon or scoped".to_string()),
        }
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the operands are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputKind {
    /// A all ones, every column of B is `1..=depth`.
    #[default]
    Sequence,
    /// Seeded uniform values in `[-1, 1)`.
    Random,
}

impl FromStr for InputKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "sequence" => Ok(InputKind::Sequence),
            "random" => Ok(InputKind::Random),
            _ => Err("expected sequence or random".to_string()),
        }
    }
}

fn parse_partition(s: &str) -> std::result::Result<Partition, String> {
    Partition::ALL
        .into_iter()
        .find(|p| p.name() == s)
        .ok_or_else(|| "expected rows, tiles or split-depth".to_string())
}

/// Settings for one CLI run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Rows of A and C.
    pub rows: usize,
    /// Columns of A, rows of B.
    pub depth: usize,
    /// Columns of B and C.
    pub cols: usize,
    pub block: usize,
    /// 0 uses every available core.
    pub workers: usize,
    pub executor: ExecutorKind,
    pub partition: Partition,
    pub input: InputKind,
    pub seed: u64,
    /// Absolute verification tolerance. `None` picks one from the input.
    pub tolerance: Option<f32>,
    pub print: bool,
    pub help: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            rows: 100,
            depth: 100,
            cols: 100,
            block: 10,
            workers: 0,
            executor: ExecutorKind::default(),
            partition: Partition::default(),
            input: InputKind::default(),
            seed: 0,
            tolerance: None,
            print: false,
            help: false,
        }
    }
}

pub const USAGE: &str = "\
usage: bmm [options]

  --rows M          rows of A and C (default 100)
  --depth N         columns of A, rows of B (default 100)
  --cols P          columns of B and C (default 100)
  --block B         block edge length, at least 1 (default 10)
  --workers W       worker threads, 0 = all cores (default 0)
  --executor E      sequential | rayon | scoped (default rayon)
  --partition S     rows | tiles | split-depth (default rows)
  --input I         sequence | random (default sequence)
  --seed S          seed for random input (default 0)
  --tolerance E     absolute verification tolerance
  --print           print C
  --help            show this message";

/// Largest integer below which every f32 integer is representable.
const F32_EXACT_INT: usize = 1 << 24;

/// Whether every partial sum of `1 + 2 + ... + depth` is an exact f32.
fn sequence_sums_exact(depth: usize) -> bool {
    depth
        .checked_mul(depth.saturating_add(1))
        .is_some_and(|twice| twice / 2 < F32_EXACT_INT)
}

fn value<T, E, F>(option: &str, raw: Option<String>, parse: F) -> Result<T>
where
    F: FnOnce(&str) -> std::result::Result<T, E>,
    E: fmt::Display,
{
    let raw = raw.ok_or_else(|| ConfigError::MissingValue(option.to_string()))?;
    parse(&raw).map_err(|e| ConfigError::InvalidValue {
        option: option.to_string(),
        value: raw.clone(),
        reason: e.to_string(),
    })
}

impl RunConfig {
    /// Parse `--key value` arguments, program name excluded.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut cfg = RunConfig::default();
        let mut args = args.into_iter();
        while let Some(opt) = args.next() {
            match opt.as_str() {
                "--rows" => cfg.rows = value(&opt, args.next(), usize::from_str)?,
                "--depth" => cfg.depth = value(&opt, args.next(), usize::from_str)?,
                "--cols" => cfg.cols = value(&opt, args.next(), usize::from_str)?,
                "--block" => cfg.block = value(&opt, args.next(), usize::from_str)?,
                "--workers" => cfg.workers = value(&opt, args.next(), usize::from_str)?,
                "--executor" => cfg.executor = value(&opt, args.next(), ExecutorKind::from_str)?,
                "--partition" => cfg.partition = value(&opt, args.next(), parse_partition)?,
                "--input" => cfg.input = value(&opt, args.next(), InputKind::from_str)?,
                "--seed" => cfg.seed = value(&opt, args.next(), u64::from_str)?,
                "--tolerance" => {
                    cfg.tolerance = Some(value(&opt, args.next(), f32::from_str)?);
                }
                "--print" => cfg.print = true,
                "--help" | "-h" => cfg.help = true,
                other => return Err(ConfigError::UnknownOption(other.to_string())),
            }
        }
        Ok(cfg)
    }

    /// Tolerance for verification.
    ///
    /// Partitions that keep the summation order match the reference bit for
    /// bit, so `f32::EPSILON` holds. Split-depth regroups the sums: sequence
    /// inputs stay exact while `depth * (depth + 1) / 2 < 2^24`, beyond that
    /// the bound grows with `depth * EPSILON * sum`. Random inputs scale
    /// with the depth.
    pub fn effective_tolerance(&self) -> f32 {
        if let Some(tol) = self.tolerance {
            return tol;
        }
        if self.partition.preserves_summation_order() {
            return f32::EPSILON;
        }
        match self.input {
            InputKind::Sequence if sequence_sums_exact(self.depth) => f32::EPSILON,
            InputKind::Sequence => {
                let sum = bmm_verify::closed_form_sum(self.depth);
                self.depth as f32 * f32::EPSILON * sum
            }
            InputKind::Random => 1e-5 * self.depth.max(1) as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<RunConfig> {
        RunConfig::from_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_defaults() {
        let cfg = parse(&[]).unwrap();
        assert_eq!(cfg, RunConfig::default());
        assert_eq!((cfg.rows, cfg.depth, cfg.cols, cfg.block), (100, 100, 100, 10));
        assert_eq!(cfg.input, InputKind::Sequence);
        assert_eq!(cfg.partition, Partition::RowStrips);
        assert_eq!(cfg.effective_tolerance(), f32::EPSILON);
    }

    #[test]
    fn test_all_options() {
        let cfg = parse(&[
            "--rows", "7", "--depth", "5", "--cols", "3", "--block", "2", "--workers", "4",
            "--executor", "scoped", "--partition", "split-depth", "--input", "random", "--seed",
            "9", "--tolerance", "0.5", "--print",
        ])
        .unwrap();
        assert_eq!((cfg.rows, cfg.depth, cfg.cols), (7, 5, 3));
        assert_eq!(cfg.block, 2);
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.executor, ExecutorKind::Scoped);
        assert_eq!(cfg.partition, Partition::TilesSplitDepth);
        assert_eq!(cfg.input, InputKind::Random);
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.effective_tolerance(), 0.5);
        assert!(cfg.print);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse(&["--bogus"]),
            Err(ConfigError::UnknownOption("--bogus".to_string()))
        );
        assert_eq!(
            parse(&["--rows"]),
            Err(ConfigError::MissingValue("--rows".to_string()))
        );
        let err = parse(&["--executor", "gpu"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref value, .. } if value == "gpu"));
        assert!(parse(&["--block", "-3"]).is_err());
    }

    #[test]
    fn test_sequence_split_depth_tolerance_past_exact_range() {
        let small = parse(&["--partition", "split-depth", "--depth", "5000"]).unwrap();
        assert_eq!(small.effective_tolerance(), f32::EPSILON);

        // 8000 * 8001 / 2 = 32004000 > 2^24.
        let large = parse(&["--partition", "split-depth", "--depth", "8000"]).unwrap();
        assert!(large.effective_tolerance() > 1000.0);

        let rows = parse(&["--depth", "8000"]).unwrap();
        assert_eq!(rows.effective_tolerance(), f32::EPSILON);

        assert!(sequence_sums_exact(5792));
        assert!(!sequence_sums_exact(5793));
        assert!(!sequence_sums_exact(usize::MAX));
    }

    #[test]
    fn test_random_split_depth_tolerance_scales() {
        let cfg = parse(&["--input", "random", "--partition", "split-depth", "--depth", "1000"])
            .unwrap();
        assert!(cfg.effective_tolerance() > f32::EPSILON);

        let rows = parse(&["--input", "random"]).unwrap();
        assert_eq!(rows.effective_tolerance(), f32::EPSILON);
    }
}
