//! `flowview` binary: replay recorded delta batches through the engine

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::process::ExitCode;

mod logging;
mod replay;

use logging::LogFormat;
use replay::ReplayOptions;

fn cli() -> Command {
    Command::new("flowview")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Incremental workflow state view fed by delta batches")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .value_parser(["text", "json"])
                .default_value("text")
                .help("Log output format (levels via RUST_LOG)"),
        )
        .subcommand(
            Command::new("replay")
                .about("Apply a JSON lines file of delta batches and print the final state")
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("One delta batch per line"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .short('c')
                        .value_name("TOML")
                        .value_parser(value_parser!(PathBuf))
                        .help("Sync configuration file"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
}

fn replay_options(args: &ArgMatches) -> anyhow::Result<ReplayOptions> {
    Ok(ReplayOptions {
        file: args
            .get_one::<PathBuf>("file")
            .cloned()
            .context("FILE is required")?,
        config: args.get_one::<PathBuf>("config").cloned(),
        json: args.get_flag("json"),
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    let format = matches
        .get_one::<String>("log-format")
        .map_or(LogFormat::Text, |name| LogFormat::parse(name));
    logging::init_logging(format);

    let result = match matches.subcommand() {
        Some(("replay", args)) => match replay_options(args) {
            Ok(options) => replay::run(&options).await,
            Err(error) => Err(error),
        },
        _ => Err(anyhow::anyhow!("unknown command")),
    };

    match result {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::error!("{:#}", error);
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
