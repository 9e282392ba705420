// fun_project_root/fun/src/main.rs
use clap::Parser;
use fun_core::Value;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Pipe a JSON value through a chain of steps.
///
/// Each STEP is either a registered callable name (`reverse`, `flip`,
/// `count`, ...) or an expression over `$_` (`$_ * 2`, `$_['key']`).
/// Steps run left to right.
#[derive(Debug, Parser)]
#[command(name = "fun", version)]
struct Cli {
    /// Input value, as JSON
    #[arg(short, long, default_value = "null")]
    input: String,

    /// Raise log verbosity (-v debug, -vv trace); FUN_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Steps to apply, in order
    #[arg(value_name = "STEP")]
    steps: Vec<String>,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("FUN_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<serde_json::Value, String> {
    let input: serde_json::Value = serde_json::from_str(&cli.input)
        .map_err(|e| format!("Input Error: {}", e))?;
    debug!(steps = ?cli.steps, "running chain");
    fun_core::run_steps(cli.steps.as_slice(), Value::from(input))
        .map(|result| result.to_json())
        .map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(msg) => {
            eprintln!("{}", msg);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("fun").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn pipes_steps_over_json_input() {
        let parsed = cli(&["--input", r#"["foo","bar"]"#, "reverse", "flip"]);
        assert_eq!(run(&parsed).unwrap(), serde_json::json!({"bar": 0, "foo": 1}));
    }

    #[test]
    fn defaults_to_null_input() {
        assert_eq!(run(&cli(&["is_null"])).unwrap(), serde_json::json!(true));
    }

    #[test]
    fn reports_bad_input_and_bad_steps() {
        assert!(run(&cli(&["--input", "{nope"])).unwrap_err().starts_with("Input Error"));
        assert!(run(&cli(&["no_such_step"])).unwrap_err().starts_with("Construction Error"));
    }

    #[test]
    fn counts_verbosity_flags() {
        assert_eq!(cli(&["-vv", "count"]).verbose, 2);
    }
}
