//! CLI argument parsing module
//!
//! Handles the command-line interface using clap:
//! - `daemon` runs the storage synchronizer in the foreground
//! - query and removal commands talk to a running daemon over its socket
//! - output format selection (human/JSON)

use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::constants::{DAEMON_SUBCOMMAND, DEFAULT_SOCKET_PATH};

/// Parsed command line
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub socket_path: PathBuf,
    pub json_output: bool,
    pub command: CliCommand,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    Daemon { config: Option<PathBuf> },
    Services,
    Providers,
    ShowService { service_id: String },
    RemoveService { service_id: String },
    RemoveProvider { ident: String },
    Status,
    Stop,
}

pub fn build_cli() -> Command {
    Command::new("connstore")
        .version(env!("CONNSTORE_VERSION"))
        .long_version(concat!(env!("CONNSTORE_VERSION"), " (", env!("GIT_HASH"), ")"))
        .about("Connection manager settings storage")
        .long_about(
            "Keeps an in-memory mirror of the connection manager's storage directory \
             and answers queries about stored service and provider settings.",
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("socket")
                .short('s')
                .long("socket")
                .value_name("PATH")
                .help("Daemon socket path")
                .default_value(DEFAULT_SOCKET_PATH)
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .help("Output in JSON format")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new(DAEMON_SUBCOMMAND)
                .about("Run the storage daemon in the foreground")
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Configuration file (TOML)")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(Command::new("services").about("List services with stored settings"))
        .subcommand(Command::new("providers").about("List providers with stored settings"))
        .subcommand(
            Command::new("show-service")
                .about("Print the stored settings of a service")
                .arg(Arg::new("service_id").value_name("ID").required(true)),
        )
        .subcommand(
            Command::new("remove-service")
                .about("Remove a service's settings and statistics")
                .arg(Arg::new("service_id").value_name("ID").required(true)),
        )
        .subcommand(
            Command::new("remove-provider")
                .about("Remove a provider's stored settings")
                .arg(Arg::new("ident").value_name("IDENT").required(true)),
        )
        .subcommand(Command::new("status").about("Show daemon and mirror status"))
        .subcommand(Command::new("stop").about("Ask the daemon to shut down"))
}

/// Parse the process arguments
pub fn parse_args() -> Result<CliArgs> {
    parse_from(std::env::args_os())
}

pub fn parse_from<I, T>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_cli().get_matches_from(args);
    from_matches(&matches)
}

fn from_matches(matches: &ArgMatches) -> Result<CliArgs> {
    let command = match matches.subcommand() {
        Some((DAEMON_SUBCOMMAND, sub)) => CliCommand::Daemon {
            config: sub.get_one::<PathBuf>("config").cloned(),
        },
        Some(("services", _)) => CliCommand::Services,
        Some(("providers", _)) => CliCommand::Providers,
        Some(("show-service", sub)) => CliCommand::ShowService {
            service_id: required(sub, "service_id")?,
        },
        Some(("remove-service", sub)) => CliCommand::RemoveService {
            service_id: required(sub, "service_id")?,
        },
        Some(("remove-provider", sub)) => CliCommand::RemoveProvider {
            ident: required(sub, "ident")?,
        },
        Some(("status", _)) => CliCommand::Status,
        Some(("stop", _)) => CliCommand::Stop,
        Some((other, _)) => return Err(anyhow!("Unknown command: {}", other)),
        None => return Err(anyhow!("No command given")),
    };

    Ok(CliArgs {
        socket_path: matches
            .get_one::<PathBuf>("socket")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH)),
        json_output: matches.get_flag("json"),
        command,
    })
}

fn required(matches: &ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .ok_or_else(|| anyhow!("Missing argument: {}", name))
}
