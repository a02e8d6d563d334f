// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line front end for the Lockstep engine.
//!
//! Wires the pieces together: parse the positional arguments, read the
//! computation tree from the input file, run it on a worker pool, and write
//! the resolved matrix back out as JSON. A computation that fails for any
//! reason (malformed tree, shape mismatch, unresolvable node) is not a
//! process failure: the error message is written to the output path as an
//! `{"error": ...}` payload and the process still exits cleanly. Only bad
//! arguments or an unwritable output file abort the run.
//!
//! The worker report is printed to stdout after every run, successful or
//! not, so the load distribution is always visible.

use std::path::PathBuf;

use thiserror::Error;

use compute_tree::TreeError;
use lockstep_engine::{EngineError, LockstepEngine};

/// Convenience alias for CLI results.
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that abort the process instead of landing in the output payload.
#[derive(Debug, Error)]
pub enum CliError {
    /// The command line could not be understood.
    #[error("{0}")]
    Usage(String),

    /// The output file itself could not be written. There is nowhere left
    /// to report the failure, so it propagates.
    #[error("failed to write output: {0}")]
    Output(#[source] TreeError),

    /// The engine could not be constructed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// A failure that belongs in the output payload rather than on stderr.
#[derive(Debug, Error)]
enum ComputeFailure {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Parsed positional arguments: `<workers> <input.json> <output.json>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    /// Number of pool workers. Always positive.
    pub workers: usize,
    /// Path of the JSON computation tree to evaluate.
    pub input: PathBuf,
    /// Path the result (or error payload) is written to.
    pub output: PathBuf,
}

impl CliArgs {
    /// Parses the positional arguments, program name already stripped.
    /// Anything past the third argument is ignored.
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let (Some(workers), Some(input), Some(output)) = (args.next(), args.next(), args.next())
        else {
            return Err(CliError::Usage(
                "expected <workers> <input.json> <output.json>".to_string(),
            ));
        };

        let workers: usize = workers.parse().map_err(|_| {
            CliError::Usage(format!(
                "worker count must be a positive integer, got {workers:?}"
            ))
        })?;
        if workers == 0 {
            return Err(CliError::Usage(
                "worker count must be a positive integer, got 0".to_string(),
            ));
        }

        Ok(Self {
            workers,
            input: PathBuf::from(input),
            output: PathBuf::from(output),
        })
    }
}

/// Runs the computation end to end and prints the worker report.
///
/// Returns `Err` only when the output file cannot be written or the engine
/// cannot be built; every other failure is serialized into the output file.
pub fn run(args: &CliArgs) -> Result<()> {
    let mut engine = LockstepEngine::new(args.workers)?;

    match compute(&mut engine, args) {
        Ok(matrix) => {
            compute_tree::write_matrix(&args.output, &matrix).map_err(CliError::Output)?;
            tracing::info!(path = %args.output.display(), "computation completed");
        },
        Err(failure) => {
            tracing::warn!(error = %failure, "computation failed");
            compute_tree::write_error(&args.output, &failure.to_string())
                .map_err(CliError::Output)?;
        },
    }

    println!("{}", engine.worker_report());
    Ok(())
}

fn compute(
    engine: &mut LockstepEngine,
    args: &CliArgs,
) -> std::result::Result<Vec<Vec<f64>>, ComputeFailure> {
    let root = compute_tree::read_tree(&args.input)?;
    let resolved = engine.run(root)?;
    Ok(resolved.matrix()?.to_vec())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;

    fn args_of(workers: &str, input: &str, output: &str) -> Result<CliArgs> {
        CliArgs::parse(
            [workers, input, output]
                .into_iter()
                .map(String::from),
        )
    }

    fn write_input(path: &Path, json: &str) {
        fs::write(path, json).unwrap();
    }

    fn read_output(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_parse_valid_args() {
        let args = args_of("4", "in.json", "out.json").unwrap();
        assert_eq!(args.workers, 4);
        assert_eq!(args.input, PathBuf::from("in.json"));
        assert_eq!(args.output, PathBuf::from("out.json"));
    }

    #[test]
    fn test_parse_ignores_extra_args() {
        let args = CliArgs::parse(
            ["2", "a.json", "b.json", "--verbose"]
                .into_iter()
                .map(String::from),
        )
        .unwrap();
        assert_eq!(args.workers, 2);
    }

    #[test]
    fn test_parse_rejects_missing_args() {
        let err = CliArgs::parse(["3".to_string(), "in.json".to_string()]).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn test_parse_rejects_non_numeric_worker_count() {
        let err = args_of("many", "in.json", "out.json").unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
        assert!(err.to_string().contains("many"));
    }

    #[test]
    fn test_parse_rejects_zero_workers() {
        let err = args_of("0", "in.json", "out.json").unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn test_run_writes_result_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tree.json");
        let output = dir.path().join("result.json");
        write_input(
            &input,
            r#"{"op": "+", "children": [
                {"matrix": [[1.0, 2.0]]},
                {"matrix": [[3.0, 4.0]]}
            ]}"#,
        );

        let args = CliArgs {
            workers: 2,
            input,
            output: output.clone(),
        };
        run(&args).unwrap();

        assert_eq!(read_output(&output), serde_json::json!([[4.0, 6.0]]));
    }

    #[test]
    fn test_run_writes_error_payload_on_shape_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tree.json");
        let output = dir.path().join("result.json");
        write_input(
            &input,
            r#"{"op": "+", "children": [
                {"matrix": [[1.0, 2.0]]},
                {"matrix": [[3.0]]}
            ]}"#,
        );

        let args = CliArgs {
            workers: 2,
            input,
            output: output.clone(),
        };
        run(&args).unwrap();

        let payload = read_output(&output);
        assert!(payload["error"].as_str().unwrap().contains("width"));
    }

    #[test]
    fn test_run_writes_error_payload_on_malformed_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tree.json");
        let output = dir.path().join("result.json");
        write_input(&input, "{ not json");

        let args = CliArgs {
            workers: 1,
            input,
            output: output.clone(),
        };
        run(&args).unwrap();

        assert!(read_output(&output)["error"].is_string());
    }

    #[test]
    fn test_run_writes_error_payload_on_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let args = CliArgs {
            workers: 1,
            input: dir.path().join("absent.json"),
            output: dir.path().join("result.json"),
        };
        run(&args).unwrap();

        assert!(read_output(&args.output)["error"].is_string());
    }

    #[test]
    fn test_run_propagates_unwritable_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tree.json");
        write_input(&input, r#"{"matrix": [[1.0]]}"#);

        let args = CliArgs {
            workers: 1,
            input,
            output: dir.path().join("no_such_dir").join("result.json"),
        };
        let err = run(&args).unwrap_err();
        assert!(matches!(err, CliError::Output(_)));
    }
}
