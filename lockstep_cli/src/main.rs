// SPDX-License-Identifier: MIT OR Apache-2.0

//! Binary entry point: `lockstep_cli <workers> <input.json> <output.json>`.

use std::process;

use lockstep_cli::CliArgs;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(error) => {
            eprintln!("{error}");
            eprintln!("usage: lockstep_cli <workers> <input.json> <output.json>");
            process::exit(1);
        },
    };

    if let Err(error) = lockstep_cli::run(&args) {
        eprintln!("{error}");
        process::exit(1);
    }
}
