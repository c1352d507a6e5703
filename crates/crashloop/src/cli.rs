//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// crashloop - Restart a command whenever it fails
#[derive(Parser, Debug)]
#[command(name = "crashloop")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a crashloop.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a command, restarting it on failure
    Run(RunArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

// Run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Label used in lifecycle messages (default: program name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Named policy from the config file (default: the label)
    #[arg(long)]
    pub operation: Option<String>,

    /// Delay between attempts in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Maximum attempts (negative retries forever, 0 never runs)
    #[arg(long, allow_negative_numbers = true)]
    pub max_attempts: Option<i64>,

    /// Drive the command from the async runtime instead of a blocking thread
    #[arg(long)]
    pub cooperative: bool,

    /// Program to run followed by its arguments, passed unchanged on every attempt
    #[arg(
        value_name = "PROGRAM",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

impl RunArgs {
    /// Program name and its arguments
    pub fn program(&self) -> (&str, &[String]) {
        match self.command.split_first() {
            Some((program, args)) => (program.as_str(), args),
            None => ("", &[]),
        }
    }
}

// Config commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration
    Show(ConfigShowArgs),
}

#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_trailing_args() {
        let cli = Cli::try_parse_from([
            "crashloop",
            "run",
            "--max-attempts",
            "3",
            "--delay-ms",
            "250",
            "--",
            "worker",
            "--port",
            "8080",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        let (program, program_args) = args.program();
        assert_eq!(program, "worker");
        assert_eq!(program_args, ["--port", "8080"]);
        assert_eq!(args.max_attempts, Some(3));
        assert_eq!(args.delay_ms, Some(250));
        assert!(!args.cooperative);
    }

    #[test]
    fn test_parse_negative_max_attempts() {
        let cli =
            Cli::try_parse_from(["crashloop", "run", "--max-attempts", "-1", "worker"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.max_attempts, Some(-1));
        assert!(args.program().1.is_empty());
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "crashloop",
            "config",
            "show",
            "--json",
            "-vv",
            "--config",
            "/tmp/crashloop.yaml",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config.as_deref().map(|p| p.as_str()), Some("/tmp/crashloop.yaml"));
        let Commands::Config(ConfigCommands::Show(args)) = cli.command else {
            panic!("expected config show");
        };
        assert!(args.json);
    }

    #[test]
    fn test_parse_program_without_separator() {
        let cli = Cli::try_parse_from([
            "crashloop",
            "run",
            "--cooperative",
            "python3",
            "-m",
            "http.server",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert!(args.cooperative);
        let (program, program_args) = args.program();
        assert_eq!(program, "python3");
        assert_eq!(program_args, ["-m", "http.server"]);
    }

    #[test]
    fn test_run_requires_program() {
        assert!(Cli::try_parse_from(["crashloop", "run"]).is_err());
    }
}
