//! Calculator whose subcommands are ordinary functions.
//!
//! ```text
//! fncli-calc sum -args 1,2,3
//! fncli-calc mult -a 1,2 -b 3,4
//! fncli-calc sqrt -x 2
//! fncli-calc --timeout-ms 100 wait -duration_ms 1000
//! ```

use anyhow::{bail, Context as _, Result};
use clap::Parser;
use fncli::{target, Cli, Config, Context, CustomFlag, CustomFlagRegistry, Level, Logger};
use std::fmt;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fncli-calc", about = "Calculator whose subcommands are plain functions")]
struct Opts {
    /// Log level: silent, info, debug or trace
    #[arg(long = "log-level", default_value = "info")]
    log_level: Level,

    /// Deadline for commands that take a context, in milliseconds
    #[arg(long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// Command followed by its flags
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

/// Comma separated integers.
#[derive(Debug, Clone, Default)]
struct IntList(Vec<i64>);

impl CustomFlag for IntList {
    type Err = anyhow::Error;

    fn unmarshal_flag(raw: &str) -> Result<Self> {
        raw.split(',')
            .map(|s| {
                s.trim()
                    .parse::<i64>()
                    .with_context(|| format!("not an integer: {:?}", s))
            })
            .collect::<Result<Vec<_>>>()
            .map(IntList)
    }
}

/// Complex number written as `re,im`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Complex {
    re: f64,
    im: f64,
}

impl Complex {
    fn times(self, other: Complex) -> Complex {
        Complex {
            re: self.re * other.re - self.im * other.im,
            im: self.re * other.im + self.im * other.re,
        }
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}{:+}i)", self.re, self.im)
    }
}

impl CustomFlag for Complex {
    type Err = anyhow::Error;

    fn unmarshal_flag(raw: &str) -> Result<Self> {
        let Some((re, im)) = raw.split_once(',') else {
            bail!("want re,im, got {:?}", raw);
        };
        Ok(Complex {
            re: re.trim().parse().context("real part")?,
            im: im.trim().parse().context("imaginary part")?,
        })
    }
}

/// Print the sum of the integers.
fn sum(args: IntList) {
    println!("{}", args.0.iter().sum::<i64>());
}

/// Print the product of two complex numbers.
fn mult(a: Complex, b: Complex) {
    println!("{}", a.times(b));
}

/// Print the square root of x.
fn sqrt(x: f64) -> Result<()> {
    if x < 0.0 {
        bail!("negative value {}", x);
    }
    println!("{}", x.sqrt());
    Ok(())
}

/// Sleep for duration_ms, giving up when the context is cancelled.
fn wait(ctx: Context, duration_ms: u64) -> Result<()> {
    let started = Instant::now();
    let until = started + Duration::from_millis(duration_ms);
    while Instant::now() < until {
        if ctx.is_cancelled() {
            bail!("cancelled after {}ms", started.elapsed().as_millis());
        }
        thread::sleep(Duration::from_millis(5));
    }
    println!("waited {}ms", duration_ms);
    Ok(())
}

fn build(logger: Logger) -> Result<Cli> {
    let mut registry = CustomFlagRegistry::new();
    registry.register::<IntList>().register::<Complex>();
    let config = Config::new()
        .with_custom_flags(registry)
        .with_logger(logger);

    let mut cli = Cli::new("fncli-calc").with_logger(logger);
    cli.add(target!(sum, config.clone())?)
        .add(target!(mult, config.clone())?)
        .add(target!(sqrt, config.clone())?)
        .add(target!(wait, config)?);
    Ok(cli)
}

fn main() -> ExitCode {
    let opts = Opts::parse();
    let filter = EnvFilter::try_from_env("FNCLI_LOG")
        .unwrap_or_else(|_| EnvFilter::new(LevelFilter::from(opts.log_level).to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let logger = Logger::new(opts.log_level);
    let mut cli = match build(logger) {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            return ExitCode::FAILURE;
        }
    };
    let ctx = match opts.timeout_ms {
        Some(ms) => Context::with_timeout(Duration::from_millis(ms)),
        None => Context::background(),
    };
    // The Cli reports its own errors.
    match cli.start_with_context(ctx, &opts.args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
