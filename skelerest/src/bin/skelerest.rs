use anyhow::{Context as _, Result};
use clap::FromArgMatches;
use log::{Level, LevelFilter};
use skelerest::cli::{build_command, collect_arguments, verbosity, Cli};
use skelerest::{config, default_context, Dispatcher, ExecutionResult};
use std::env;
use std::io::Write;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    // Subcommands come from the config document, so locate it first.
    let bootstrap = Cli::bootstrap_command().get_matches();
    let cli = Cli::from_arg_matches(&bootstrap)?;
    init_logger(cli.verbose)?;

    let ctx = default_context();
    let registry = config::load_registry(&ctx, &cli.config)
        .await
        .with_context(|| format!("failed to load requests from {}", cli.config))?;

    let matches = build_command(&registry)?.get_matches();
    raise_level(verbosity(&matches));
    let (id, sub) = matches
        .subcommand()
        .context("a request command is required")?;
    let args = collect_arguments(registry.get(id)?, sub);

    let dispatcher = Dispatcher::new(ctx, registry);
    match dispatcher.execute(id, &args).await? {
        ExecutionResult::Success { body, .. } => {
            println!("{body}");
            Ok(ExitCode::SUCCESS)
        }
        ExecutionResult::Failure { status, body } => {
            eprintln!("{status}");
            eprintln!("{body}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// The logger lets everything through unless `RUST_LOG` is set; verbosity only
/// moves the global max level.
fn init_logger(verbose: u8) -> Result<()> {
    let logger = env_logger::Builder::new()
        .filter_level(LevelFilter::Trace)
        .parse_default_env()
        .format(|buf, record| match record.level() {
            Level::Info => writeln!(buf, "|SKELEREST| {}", record.args()),
            level => writeln!(
                buf,
                "|SKELEREST| [{level} {}] {}",
                record.target(),
                record.args()
            ),
        })
        .build();

    let max = if env::var_os("RUST_LOG").is_some() {
        logger.filter()
    } else {
        level(verbose)
    };
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(max);
    Ok(())
}

/// `-v` given after the request subcommand is only known once it is parsed.
fn raise_level(verbose: u8) {
    if env::var_os("RUST_LOG").is_none() {
        log::set_max_level(log::max_level().max(level(verbose)));
    }
}
