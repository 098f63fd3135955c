//! Headless terminal runner
//!
//! Feeds a file or stdin through the engine in fixed-size chunks and prints
//! the resulting screen and the side effects it produced.

use std::io::{self, Read};
use std::process::ExitCode;

use vt_engine::{SideEffect, Terminal, TerminalConfig};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
}

struct Options {
    cols: usize,
    rows: usize,
    chunk: usize,
    format: OutputFormat,
    input: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(Some(options)) => options,
        Ok(None) => {
            print_help();
            return ExitCode::SUCCESS;
        },
        Err(message) => {
            eprintln!("{}", message);
            eprintln!("Try 'vt-headless --help'.");
            return ExitCode::FAILURE;
        },
    };

    let input = match &options.input {
        Some(path) => match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path, e);
                return ExitCode::FAILURE;
            },
        },
        None => {
            let mut data = Vec::new();
            if let Err(e) = io::stdin().read_to_end(&mut data) {
                eprintln!("Error reading stdin: {}", e);
                return ExitCode::FAILURE;
            }
            data
        },
    };

    let mut config = TerminalConfig::load_or_default();
    config.cols = options.cols;
    config.rows = options.rows;
    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let mut terminal = Terminal::new(&config);
    let mut effects = Vec::new();
    for chunk in input.chunks(options.chunk) {
        terminal.process(chunk);
        effects.extend(terminal.take_side_effects());
    }
    if terminal.pending_bytes() > 0 {
        tracing::warn!(bytes = terminal.pending_bytes(), "input ended inside a sequence");
    }

    let snapshot = terminal.snapshot();
    match options.format {
        OutputFormat::Text => {
            println!("Terminal State ({}x{}):", snapshot.cols, snapshot.rows);
            println!("Cursor: ({}, {})", snapshot.cursor.row, snapshot.cursor.col);
            println!("---");
            for line in &snapshot.lines {
                println!("{}", line.text());
            }
            println!("---");
            for effect in effects.iter().filter(|e| !matches!(e, SideEffect::RegionDirty { .. })) {
                println!("{:?}", effect);
            }
        },
        OutputFormat::Json => {
            let output = serde_json::json!({
                "snapshot": snapshot,
                "side_effects": effects,
            });
            match serde_json::to_string_pretty(&output) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error serializing snapshot: {}", e);
                    return ExitCode::FAILURE;
                },
            }
        },
    }

    ExitCode::SUCCESS
}

/// `Ok(None)` asks for help
fn parse_args(args: &[String]) -> Result<Option<Options>, String> {
    let mut options = Options {
        cols: 80,
        rows: 24,
        chunk: 4096,
        format: OutputFormat::Text,
        input: None,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-c" | "--cols" => options.cols = number(arg, iter.next())?,
            "-r" | "--rows" => options.rows = number(arg, iter.next())?,
            "--chunk" => options.chunk = number(arg, iter.next())?.max(1),
            "-j" | "--json" => options.format = OutputFormat::Json,
            "-t" | "--text" => options.format = OutputFormat::Text,
            "-h" | "--help" => return Ok(None),
            path if !path.starts_with('-') && options.input.is_none() => {
                options.input = Some(path.to_string());
            },
            other => return Err(format!("Unknown argument '{}'", other)),
        }
    }
    Ok(Some(options))
}

fn number(flag: &str, value: Option<&String>) -> Result<usize, String> {
    let value = value.ok_or_else(|| format!("{} needs a value", flag))?;
    value
        .parse()
        .map_err(|_| format!("{} expects a number, got '{}'", flag, value))
}

fn print_help() {
    println!("VT Engine Headless Runner");
    println!();
    println!("Usage: vt-headless [OPTIONS] [FILE]");
    println!();
    println!("Options:");
    println!("  -c, --cols <N>     Terminal width (default: 80)");
    println!("  -r, --rows <N>     Terminal height (default: 24)");
    println!("      --chunk <N>    Feed input in N-byte chunks (default: 4096)");
    println!("  -j, --json         Print snapshot and side effects as JSON");
    println!("  -t, --text         Print screen text (default)");
    println!("  -h, --help         Show this help message");
    println!();
    println!("If no file is given, reads from stdin. Set RUST_LOG=debug to see");
    println!("ignored and malformed sequences.");
    println!();
    println!("Examples:");
    println!("  printf 'Hello\\033[31mWorld\\033[0m' | vt-headless");
    println!("  vt-headless -c 120 -r 40 --chunk 1 session.log");
}
