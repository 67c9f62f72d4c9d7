use std::process::ExitCode;

use clap::Parser;

use wgbs_observe::{LoggerConfig, logger_init};

mod cli;
mod run;

use cli::WorkflowArgs;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = WorkflowArgs::parse();

    let logger = LoggerConfig::default()
        .with_format(args.wrapper.log_format)
        .with_level(args.log_level());
    if let Err(e) = logger_init(&logger) {
        eprintln!("wgbs: {e}");
        return ExitCode::FAILURE;
    }

    let argv: Vec<String> = std::env::args().collect();
    let code = run::run(args, argv).await;
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
