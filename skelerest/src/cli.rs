//! Command line surface generated from a [`Registry`].

use crate::registry::Registry;
use crate::request::RequestDescriptor;
use clap::{Arg, ArgAction, ArgMatches, Command, CommandFactory, Parser};
use skelerest_core::{Error, Result};
use std::collections::{HashMap, HashSet};

/// Config file used when neither `--config` nor `SKELEREST_CONFIG` is set.
pub const DEFAULT_CONFIG: &str = "skelerest.yaml";

/// Execute REST calls declared in a configuration document.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "skelerest", version, about, disable_help_subcommand = true)]
pub struct Cli {
    /// Configuration document declaring the requests (.json, .toml, .yaml)
    #[arg(short, long, env = "SKELEREST_CONFIG", default_value = DEFAULT_CONFIG)]
    pub config: String,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl Cli {
    /// Command that only knows the global options.
    ///
    /// Used to find the config document before the request subcommands exist.
    pub fn bootstrap_command() -> Command {
        Cli::command()
            .ignore_errors(true)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .allow_external_subcommands(true)
    }
}

/// Flags every request subcommand already carries.
const RESERVED_FLAGS: [&str; 2] = ["help", "verbose"];

/// Full command with one subcommand per registered request.
///
/// Fails with [`skelerest_core::ErrorKind::ConfigInvalid`] when a variable would
/// shadow a flag in [`RESERVED_FLAGS`].
pub fn build_command(registry: &Registry) -> Result<Command> {
    let mut cmd = Cli::command()
        .subcommand_required(true)
        .arg_required_else_help(true);

    for (id, desc) in registry.iter() {
        if let Some(var) = desc
            .variables()
            .iter()
            .find(|var| RESERVED_FLAGS.contains(&var.name.as_str()))
        {
            return Err(Error::config_invalid(format!(
                "variable {} of {id} clashes with the --{} flag",
                var.name, var.name
            )));
        }
        cmd = cmd.subcommand(request_command(id, desc));
    }

    Ok(cmd)
}

/// Verbosity counted before and after the request subcommand.
pub fn verbosity(matches: &ArgMatches) -> u8 {
    let sub = matches
        .subcommand()
        .map(|(_, sub)| sub.get_count("verbose"))
        .unwrap_or(0);
    matches.get_count("verbose").max(sub)
}

/// One flag per distinct variable, the first occurrence decides the default.
fn request_command(id: &str, desc: &RequestDescriptor) -> Command {
    let mut cmd = Command::new(id.to_string()).about(desc.summary());
    let mut seen = HashSet::new();

    for var in desc.variables() {
        let flag = var.flag_name();
        if !seen.insert(flag.clone()) {
            continue;
        }

        let arg = Arg::new(flag)
            .long(var.name.clone())
            .value_name("VALUE")
            .action(ArgAction::Set);
        let arg = match &var.default {
            None => arg.required(true).help("REQUIRED"),
            Some(default) => arg
                .default_value(default.clone())
                .help(format!("DEFAULT: {default}")),
        };
        cmd = cmd.arg(arg);
    }

    cmd
}

/// Collect the parsed flags of `desc`'s subcommand, keyed by variable name.
pub fn collect_arguments(desc: &RequestDescriptor, matches: &ArgMatches) -> HashMap<String, String> {
    let mut args = HashMap::new();
    for var in desc.variables() {
        if let Some(value) = matches.get_one::<String>(&var.flag_name()) {
            args.entry(var.name.clone())
                .or_insert_with(|| value.clone());
        }
    }
    args
}
