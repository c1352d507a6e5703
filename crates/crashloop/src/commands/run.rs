//! Run command
//!
//! Supervises an external program: every non-zero exit or spawn error is a
//! failed attempt, and the program is started again after the configured
//! delay until it exits cleanly or the policy runs out.

use std::process::{ExitCode, ExitStatus};
use std::time::Duration;

use anyhow::{Context, Result};
use camino::Utf8Path;
use crashloop_core::restart::TracingSink;
use crashloop_core::{ConfigLoader, InvokerBuilder, Outcome, RestartConfig, RetryPolicy};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::cli::RunArgs;
use crate::output;

/// Exit code when every permitted attempt failed
const EXIT_EXHAUSTED: u8 = 1;

/// Exit code when interrupted, following the shell's 128 + SIGINT convention
const EXIT_CANCELLED: u8 = 130;

/// Why a single run of the supervised program counts as failed
#[derive(Debug, Error)]
pub enum CommandFailure {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    ExitStatus { program: String, status: ExitStatus },
}

pub async fn run(args: RunArgs, config_path: Option<&Utf8Path>) -> Result<ExitCode> {
    let config = ConfigLoader::new()?
        .load_with_file(config_path)
        .context("Failed to load configuration")?;

    let (program, program_args) = args.program();
    let name = args.name.clone().unwrap_or_else(|| default_name(program));
    let policy = resolve_policy(&config, &args, &name);

    tracing::debug!(
        operation = %name,
        delay_ms = policy.delay().as_millis() as u64,
        max_attempts = policy.max_attempts(),
        cooperative = args.cooperative,
        "resolved restart policy"
    );

    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());

    let program = program.to_string();
    let program_args = program_args.to_vec();

    let outcome = if args.cooperative {
        supervise_cooperative(&name, policy, program, program_args, &shutdown).await
    } else {
        supervise_blocking(name.clone(), policy, program, program_args, shutdown).await?
    };

    report(&name, &outcome);
    Ok(ExitCode::from(exit_status(&outcome)))
}

/// Label derived from the program path, e.g. `/usr/bin/worker` becomes `worker`
fn default_name(program: &str) -> String {
    Utf8Path::new(program)
        .file_name()
        .unwrap_or(program)
        .to_string()
}

/// Pick the named policy, then apply flag overrides on top
fn resolve_policy(config: &RestartConfig, args: &RunArgs, name: &str) -> RetryPolicy {
    let operation = args.operation.as_deref().unwrap_or(name);
    if args.operation.is_some() && !config.operations.contains_key(operation) {
        tracing::warn!(
            operation = %operation,
            "no policy configured for operation, using default"
        );
    }

    let mut policy = config.policy_for(operation).clone();
    if let Some(delay_ms) = args.delay_ms {
        policy = policy.with_delay(Duration::from_millis(delay_ms));
    }
    if let Some(max_attempts) = args.max_attempts {
        policy = policy.with_max_attempts(max_attempts);
    }
    policy
}

fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                output::warning("Interrupt received, stopping restarts");
                token.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "failed to listen for interrupt signal"),
        }
    });
}

/// Restart loop on a blocking-pool thread using `std::process`
async fn supervise_blocking(
    name: String,
    policy: RetryPolicy,
    program: String,
    program_args: Vec<String>,
    shutdown: CancellationToken,
) -> Result<Outcome<()>> {
    tokio::task::spawn_blocking(move || {
        let invoker = InvokerBuilder::new(name)
            .with_policy(policy)
            .with_sink(TracingSink::new())
            .wrap_sync(move || run_blocking(&program, &program_args));
        invoker.invoke_with_cancel(&shutdown)
    })
    .await
    .context("Restart loop terminated unexpectedly")
}

/// Restart loop on the async runtime using `tokio::process`
async fn supervise_cooperative(
    name: &str,
    policy: RetryPolicy,
    program: String,
    program_args: Vec<String>,
    shutdown: &CancellationToken,
) -> Outcome<()> {
    let invoker = InvokerBuilder::new(name)
        .with_policy(policy)
        .with_sink(TracingSink::new())
        .wrap_cooperative(move || {
            let program = program.clone();
            let program_args = program_args.clone();
            async move { run_child(&program, &program_args).await }
        });

    invoker.invoke_with_cancel(shutdown).await
}

fn run_blocking(program: &str, args: &[String]) -> Result<(), CommandFailure> {
    let status = std::process::Command::new(program)
        .args(args)
        .status()
        .map_err(|source| CommandFailure::Spawn {
            program: program.to_string(),
            source,
        })?;
    check_status(program, status)
}

async fn run_child(program: &str, args: &[String]) -> Result<(), CommandFailure> {
    let status = tokio::process::Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|source| CommandFailure::Spawn {
            program: program.to_string(),
            source,
        })?;
    check_status(program, status)
}

fn check_status(program: &str, status: ExitStatus) -> Result<(), CommandFailure> {
    if status.success() {
        Ok(())
    } else {
        Err(CommandFailure::ExitStatus {
            program: program.to_string(),
            status,
        })
    }
}

fn report(name: &str, outcome: &Outcome<()>) {
    let attempts = outcome.attempts();
    let plural = if attempts == 1 { "" } else { "s" };
    match outcome {
        Outcome::Succeeded { .. } => output::success(&format!(
            "{} completed after {} attempt{}",
            name, attempts, plural
        )),
        Outcome::Exhausted { .. } => output::error(&format!(
            "{} failed {} attempt{}, giving up",
            name, attempts, plural
        )),
        Outcome::Cancelled { .. } => output::warning(&format!(
            "{} cancelled after {} attempt{}",
            name, attempts, plural
        )),
    }
}

fn exit_status<T>(outcome: &Outcome<T>) -> u8 {
    match outcome {
        Outcome::Succeeded { .. } => 0,
        Outcome::Exhausted { .. } => EXIT_EXHAUSTED,
        Outcome::Cancelled { .. } => EXIT_CANCELLED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(
        operation: Option<&str>,
        delay_ms: Option<u64>,
        max_attempts: Option<i64>,
    ) -> RunArgs {
        RunArgs {
            name: None,
            operation: operation.map(str::to_string),
            delay_ms,
            max_attempts,
            cooperative: false,
            command: vec!["worker".to_string()],
        }
    }

    fn config_with_operation() -> RestartConfig {
        let mut config = RestartConfig::default();
        config.operations.insert(
            "nightly-sync".to_string(),
            RetryPolicy::bounded(Duration::from_secs(5), 3),
        );
        config
    }

    #[test]
    fn test_default_name_strips_directories() {
        assert_eq!(default_name("/usr/local/bin/worker"), "worker");
        assert_eq!(default_name("worker"), "worker");
    }

    #[test]
    fn test_resolve_policy_by_name() {
        let config = config_with_operation();
        let policy = resolve_policy(&config, &run_args(None, None, None), "nightly-sync");
        assert_eq!(policy, RetryPolicy::bounded(Duration::from_secs(5), 3));
    }

    #[test]
    fn test_resolve_policy_operation_overrides_name() {
        let config = config_with_operation();
        let policy = resolve_policy(
            &config,
            &run_args(Some("nightly-sync"), None, None),
            "worker",
        );
        assert_eq!(policy.max_attempts(), 3);
    }

    #[test]
    fn test_resolve_policy_unknown_operation_uses_default() {
        let config = config_with_operation();
        let policy = resolve_policy(&config, &run_args(Some("missing"), None, None), "worker");
        assert_eq!(policy, RetryPolicy::default());
    }

    #[test]
    fn test_resolve_policy_flags_win() {
        let config = config_with_operation();
        let policy = resolve_policy(
            &config,
            &run_args(Some("nightly-sync"), Some(10), Some(-1)),
            "worker",
        );
        assert_eq!(policy.delay(), Duration::from_millis(10));
        assert!(policy.limit().is_unbounded());
    }

    #[test]
    fn test_exit_status_mapping() {
        assert_eq!(
            exit_status(&Outcome::Succeeded {
                value: (),
                attempts: 1
            }),
            0
        );
        assert_eq!(exit_status(&Outcome::<()>::Exhausted { attempts: 3 }), 1);
        assert_eq!(exit_status(&Outcome::<()>::Cancelled { attempts: 2 }), 130);
    }

    #[test]
    fn test_spawn_failure_is_reported() {
        let err = run_blocking("crashloop-test-no-such-program", &[]).unwrap_err();
        assert!(matches!(err, CommandFailure::Spawn { .. }));
        assert!(err
            .to_string()
            .starts_with("failed to start crashloop-test-no-such-program"));
    }

    #[cfg(unix)]
    #[test]
    fn test_blocking_exit_status() {
        assert!(run_blocking("true", &[]).is_ok());
        let err = run_blocking("sh", &["-c".to_string(), "exit 3".to_string()]).unwrap_err();
        assert!(matches!(err, CommandFailure::ExitStatus { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_supervise_blocking_exhausts() {
        let outcome = supervise_blocking(
            "false".to_string(),
            RetryPolicy::bounded(Duration::from_millis(1), 2),
            "false".to_string(),
            Vec::new(),
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::Exhausted { attempts: 2 });
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_supervise_cooperative_succeeds() {
        let outcome = supervise_cooperative(
            "true",
            RetryPolicy::bounded(Duration::from_millis(1), 2),
            "true".to_string(),
            Vec::new(),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(
            outcome,
            Outcome::Succeeded {
                value: (),
                attempts: 1
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_supervise_cooperative_cancelled() {
        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let outcome = supervise_cooperative(
            "false",
            RetryPolicy::unbounded(Duration::from_secs(30)),
            "false".to_string(),
            Vec::new(),
            &shutdown,
        )
        .await;
        assert!(outcome.is_cancelled());
        assert_eq!(exit_status(&outcome), EXIT_CANCELLED);
    }
}
