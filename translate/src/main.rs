use clap::Parser;
use h2d_core::diagnostics::init_logging;
use h2d_translate::cli::{self, Args};
use h2d_translate::transpile;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

fn main() -> ExitCode {
    let args = Args::parse_from(cli::normalize_args(std::env::args_os()));
    init_logging(args.verbose);

    let config = match cli::initialize(&args) {
        Ok(Some(config)) => config,
        Ok(None) => return ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    match transpile(Arc::new(config)) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
