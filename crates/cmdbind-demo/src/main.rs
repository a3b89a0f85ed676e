//! Routes command line words through a two-level command table.
//!
//! ```text
//! cmdbind-demo greet World 2
//! cmdbind-demo math sum "[1, 2.5, 4]"
//! cmdbind-demo --format yaml time parse "2024-03-01T12:00:00+01:00"
//! ```

use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use clap::Parser;
use cmdbind::{
    format_to, println, Args, ArgsDef, BuildError, CommandLogger, Context, Error, OutputFormat,
    SharedHandler, SuperStringArgsDispatcher, TracingLogger, DEFAULT,
};
use serde::Serialize;

const APP_NAME: &str = "cmdbind-demo";

#[derive(Parser, Debug)]
#[command(name = APP_NAME, version, about = "Calls plain functions by name")]
struct Cli {
    /// Serialize results as json, yaml, xml or csv instead of printing them
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Log every dispatched command
    #[arg(long)]
    log_commands: bool,

    /// [group] command [args...]
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    words: Vec<String>,
}

// =============================================================================
// Commands
// =============================================================================

#[derive(Args, Default)]
struct GreetArgs {
    #[arg(description = "Who to greet")]
    name: String,
    #[arg(description = "How often, once if omitted")]
    times: Option<u8>,
}

fn greet(name: String, times: Option<u8>) -> String {
    vec![format!("Hello {name}!"); times.unwrap_or(1) as usize].join(" ")
}

#[derive(Args, Default)]
struct SleepArgs {
    #[arg(description = "For example 1.5s or 250ms")]
    duration: Duration,
}

fn sleep(ctx: Context, duration: Duration) -> anyhow::Result<String> {
    if ctx.is_cancelled() {
        anyhow::bail!("cancelled before sleeping");
    }
    std::thread::sleep(duration);
    Ok(format!("slept {duration:?}"))
}

#[derive(Args, Default)]
struct PairArgs {
    #[arg]
    a: f64,
    #[arg]
    b: f64,
}

fn add(a: f64, b: f64) -> f64 {
    a + b
}

fn div(a: f64, b: f64) -> anyhow::Result<f64> {
    if b == 0.0 {
        anyhow::bail!("division by zero");
    }
    Ok(a / b)
}

#[derive(Args, Default)]
struct ValuesArgs {
    #[arg(description = "Numbers as [a, b, ...]")]
    values: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct Stats {
    count: usize,
    sum: f64,
    mean: Option<f64>,
}

fn sum(values: Vec<f64>) -> Stats {
    let total: f64 = values.iter().sum();
    Stats {
        count: values.len(),
        sum: total,
        mean: (!values.is_empty()).then(|| total / values.len() as f64),
    }
}

#[derive(Args, Default)]
struct TimeArgs {
    #[arg(description = "RFC 3339 or \"2006-01-02 15:04:05 -0700\" style")]
    time: DateTime<FixedOffset>,
}

#[derive(Debug, Serialize)]
struct TimeInfo {
    rfc3339: String,
    weekday: String,
    unix: i64,
}

fn parse_time(time: DateTime<FixedOffset>) -> TimeInfo {
    TimeInfo {
        rfc3339: time.to_rfc3339(),
        weekday: time.weekday().to_string(),
        unix: time.timestamp(),
    }
}

#[derive(Args, Default)]
struct RangeArgs {
    #[arg]
    from: NaiveDate,
    #[arg]
    to: NaiveDate,
}

fn days(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

fn build_commands(
    handlers: Vec<SharedHandler>,
    loggers: Vec<Arc<dyn CommandLogger>>,
) -> Result<SuperStringArgsDispatcher, BuildError> {
    let mut commands = SuperStringArgsDispatcher::new().with_loggers(loggers);

    let root = commands.add_super_command(DEFAULT)?;
    root.add_command(
        "greet",
        "Greets somebody",
        ArgsDef::of::<GreetArgs>()?,
        greet,
        handlers.clone(),
    )?;
    root.add_command(
        "sleep",
        "Sleeps for a while",
        ArgsDef::of::<SleepArgs>()?,
        sleep,
        handlers.clone(),
    )?;

    let math = commands.add_super_command("math")?;
    math.add_command("add", "", ArgsDef::of::<PairArgs>()?, add, handlers.clone())?;
    math.add_command("div", "", ArgsDef::of::<PairArgs>()?, div, handlers.clone())?;
    math.add_command(
        "sum",
        "Count, sum and mean",
        ArgsDef::of::<ValuesArgs>()?,
        sum,
        handlers.clone(),
    )?;

    let time = commands.add_super_command("time")?;
    time.add_command(
        "parse",
        "Normalizes a timestamp",
        ArgsDef::of::<TimeArgs>()?,
        parse_time,
        handlers.clone(),
    )?;
    time.add_command(
        "days",
        "Days between two dates",
        ArgsDef::of::<RangeArgs>()?,
        days,
        handlers,
    )?;

    Ok(commands)
}

/// Routes command line words. A first word naming a root command rather
/// than a group runs that command with the remaining words.
fn dispatch_words<S: AsRef<str>>(
    commands: &SuperStringArgsDispatcher,
    ctx: &Context,
    words: &[S],
) -> Result<(), Error> {
    match words {
        [first, rest @ ..]
            if commands.super_command(first.as_ref()).is_none()
                && commands.has_sub_command(DEFAULT, first.as_ref()) =>
        {
            commands.dispatch(ctx, DEFAULT, first.as_ref(), rest)
        }
        _ => commands.dispatch_combined_command_and_args(ctx, words),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = Cli::parse();

    let handlers = match cli.format {
        Some(format) => vec![format_to(io::stdout(), format)],
        None => vec![println()],
    };
    let loggers: Vec<Arc<dyn CommandLogger>> = if cli.log_commands {
        vec![Arc::new(TracingLogger)]
    } else {
        Vec::new()
    };

    let commands = match build_commands(handlers, loggers) {
        Ok(commands) => commands,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match dispatch_words(&commands, &Context::new(), &cli.words) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_not_found() => {
            if !cli.words.is_empty() {
                eprintln!("{err}\n");
            }
            eprintln!("Usage: {APP_NAME} [OPTIONS] [group] command [args...]\n");
            // Usage is best effort once stderr is gone.
            let _ = commands.print_commands_usage_intro(APP_NAME, &mut io::stderr().lock());
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
