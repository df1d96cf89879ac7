use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::process::ExitCode;
use zk_admin::cli::Cli;
use zk_admin::core::config::LoggingConfig;
use zk_admin::core::tracing_init::init_tracing;
use zk_admin::device::zk_session::ZkConnector;
use zk_admin::models::response::{ErrorResponse, NoContext};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return usage_error(err),
    };

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            print_failure(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let logging = LoggingConfig::new(&cli.log_level, &cli.log_format)?;
    init_tracing(&logging);

    // One operation per process; no worker threads needed
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    let report = runtime.block_on(cli.command.invoke(&ZkConnector));
    println!("{}", report.line);

    Ok(report.success)
}

/// Help and version print as usual; anything else is a failure line
fn usage_error(err: clap::Error) -> ExitCode {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            ExitCode::SUCCESS
        }
        _ => {
            // Full usage text for the operator
            let _ = err.print();

            let rendered = err.to_string();
            let message = rendered
                .lines()
                .next()
                .unwrap_or("invalid arguments")
                .trim_start_matches("error: ");
            print_failure(message);
            ExitCode::FAILURE
        }
    }
}

fn print_failure(message: &str) {
    let response = ErrorResponse::new(
        format!("Invalid input: {}", message),
        "InvalidInput",
        NoContext::default(),
    );

    match serde_json::to_string(&response) {
        Ok(line) => println!("{}", line),
        Err(_) => println!(r#"{{"success":false,"error":"Invalid input","error_type":"InvalidInput"}}"#),
    }
}
