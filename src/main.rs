use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use ariadne::Source;
use clap::Parser as ClapParser;
use confique::Config as _;
use tracing::*;

use crate::config::Config;
use crate::parser::Parser;
use crate::source::{ReaderSource, StrSource};

mod config;
mod diagnostics;
mod lexer;
mod logging;
mod parser;
mod source;
mod span;
mod token;

#[derive(Debug, ClapParser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path to the JSON document to validate; `-` reads standard input.
    input: PathBuf,

    /// Override the configured nesting depth limit.
    #[arg(long)]
    max_depth: Option<usize>,
}

fn main() -> anyhow::Result<ExitCode> {
    logging::setup_logging();

    let cli = Args::parse();

    debug!(input = ?cli.input);

    let config = Config::builder()
        .env()
        .file("jsonvet.toml")
        .load()
        .context("failed to load configuration")?;
    let max_depth = cli.max_depth.unwrap_or(config.max_nesting_depth);

    // Standard input is validated as it streams; there is no source text to quote
    // afterwards, so failures get the plain one-line form.
    if cli.input.as_os_str() == "-" {
        let stdin = std::io::stdin();
        let parser = Parser::new(ReaderSource::new(stdin.lock())).max_depth(max_depth);
        return Ok(match parser.parse() {
            Ok(()) => ExitCode::SUCCESS,
            Err(diag) => {
                eprintln!("(standard input): {diag}");
                ExitCode::FAILURE
            }
        });
    }

    let json_string = match std::fs::read_to_string(&cli.input) {
        Ok(file) => file,
        Err(e) => {
            error!(path = ?cli.input, "failed to read input");
            return Err(e)
                .with_context(|| format!("failed to read file `{}`", cli.input.display()));
        }
    };

    let path = cli.input.display().to_string();

    let parser = Parser::new(StrSource::new(&json_string)).max_depth(max_depth);
    match parser.parse() {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(diag) => {
            debug!(?diag);
            diag.report(&path)
                .print((&path, Source::from(&json_string)))?;
            Ok(ExitCode::FAILURE)
        }
    }
}
