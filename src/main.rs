use std::process::ExitCode;

use clap::Parser;
use gcodescribe::{init_logging, run, Args};
use tracing::{debug, error};

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(e) = init_logging(args.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::from(1);
    }
    debug!(
        "gcodescribe {} (built {})",
        gcodescribe::VERSION,
        gcodescribe::BUILD_DATE
    );

    match run(&args) {
        Ok(outcome) => match serde_json::to_string_pretty(&outcome.result) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Failed to render result: {}", e);
                ExitCode::from(1)
            }
        },
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
