//! Command-line interface for polyglot submissions
//! This binary parses notebook cells and shows how they would be dispatched, without running any
//! kernel.
//!
//! Usage:
//!   polyglot parse `<path>` [--kernel `<name>`] [--format treeviz|json]   - Print the syntax tree
//!   polyglot check `<path>` [--kernel `<name>`]                          - Print diagnostics, exit 1 on errors
//!   polyglot split `<path>` [--kernel `<name>`]                          - Print the split commands as JSON lines
//!
//! `--config <file>` layers a TOML file over the built-in kernel set. Logging goes to stderr and
//! is controlled by `RUST_LOG` (default `warn`).

mod render;

use clap::{Arg, ArgMatches, Command};
use polyglot_config::Loader;
use polyglot_kernel::{split_submission, KernelCommand};
use polyglot_parser::polyglot::{parse, DirectiveConfiguration, SyntaxTree};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    init_tracing();

    let source_args = || {
        [
            Arg::new("path")
                .help("Path to the submission")
                .required(true)
                .index(1),
            Arg::new("kernel")
                .long("kernel")
                .short('k')
                .help("Kernel for code before the first selector (default: the configured default kernel)"),
        ]
    };

    let matches = Command::new("polyglot")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A tool for inspecting polyglot notebook submissions")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("TOML file layered over the built-in kernel configuration")
                .global(true),
        )
        .subcommand(
            Command::new("parse")
                .about("Print the syntax tree of a submission")
                .args(source_args())
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format")
                        .value_parser(["treeviz", "json"])
                        .default_value("treeviz"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Report the diagnostics of a submission")
                .args(source_args()),
        )
        .subcommand(
            Command::new("split")
                .about("Print the commands a submission splits into")
                .args(source_args()),
        )
        .get_matches();

    let configuration = match load_configuration(&matches) {
        Ok(configuration) => configuration,
        Err(message) => return fail(&message),
    };

    let outcome = match matches.subcommand() {
        Some(("parse", args)) => handle_parse_command(args, &configuration),
        Some(("check", args)) => handle_check_command(args, &configuration),
        Some(("split", args)) => handle_split_command(args, &configuration),
        _ => Ok(ExitCode::SUCCESS),
    };
    outcome.unwrap_or_else(|message| fail(&message))
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn fail(message: &str) -> ExitCode {
    eprintln!("{}", message);
    ExitCode::from(2)
}

fn load_configuration(matches: &ArgMatches) -> Result<DirectiveConfiguration, String> {
    let mut loader = Loader::new();
    if let Some(path) = matches.get_one::<String>("config") {
        tracing::debug!(%path, "layering user configuration");
        loader = loader.with_file(path);
    }
    loader
        .load()
        .map_err(|e| format!("Configuration error: {}", e))
}

/// The path, the submission text and the kernel it starts in.
fn read_source(
    args: &ArgMatches,
    configuration: &DirectiveConfiguration,
) -> Result<(String, String, Option<String>), String> {
    let path = args
        .get_one::<String>("path")
        .expect("path is a required argument")
        .clone();
    let code = std::fs::read_to_string(&path)
        .map_err(|e| format!("Could not read '{}': {}", path, e))?;
    let kernel = args.get_one::<String>("kernel").cloned();
    if let Some(kernel) = &kernel {
        if configuration.kernel(kernel).is_none() {
            return Err(format!("Unknown kernel '{}'", kernel));
        }
    }
    Ok((path, code, kernel))
}

fn parse_source(
    args: &ArgMatches,
    configuration: &DirectiveConfiguration,
) -> Result<(String, SyntaxTree), String> {
    let (path, code, kernel) = read_source(args, configuration)?;
    Ok((path, parse(&code, kernel.as_deref(), configuration)))
}

/// Handle the parse command
fn handle_parse_command(
    args: &ArgMatches,
    configuration: &DirectiveConfiguration,
) -> Result<ExitCode, String> {
    let (_, tree) = parse_source(args, configuration)?;
    let format = args
        .get_one::<String>("format")
        .map_or("treeviz", String::as_str);
    print!("{}", render::render_tree(&tree, format)?);
    Ok(ExitCode::SUCCESS)
}

/// Handle the check command. Exits with 1 when any diagnostic is an error.
fn handle_check_command(
    args: &ArgMatches,
    configuration: &DirectiveConfiguration,
) -> Result<ExitCode, String> {
    let (path, tree) = parse_source(args, configuration)?;
    let diagnostics = tree.diagnostics();
    for diagnostic in &diagnostics {
        println!("{}", render::render_diagnostic(&path, diagnostic));
    }
    if tree.has_errors() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Handle the split command
fn handle_split_command(
    args: &ArgMatches,
    configuration: &DirectiveConfiguration,
) -> Result<ExitCode, String> {
    let (_, code, kernel) = read_source(args, configuration)?;
    let mut command = KernelCommand::submit_code(code);
    if let Some(kernel) = kernel {
        command = command.target(kernel);
    }
    let commands = split_submission(&Arc::new(command), configuration);
    print!("{}", render::render_envelopes(&commands)?);
    Ok(ExitCode::SUCCESS)
}
