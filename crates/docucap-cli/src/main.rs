// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Docucap — command-line front end.
//
// Entry point. Initialises logging, loads the engine configuration and
// dispatches to the analyze / enhance commands.

mod commands;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let outcome = commands::load_engine(cli.config.as_deref()).and_then(|mut engine| {
        match &cli.command {
            Commands::Analyze(args) => commands::analyze::run(&mut engine, args),
            Commands::Enhance(args) => commands::enhance::run(&mut engine, args),
        }
    });

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
