use std::process::ExitCode;

use clap::Parser;
use iam_report::{INCOMPLETE_NOTICE, ReportCli, exit_status};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
pub async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = ReportCli::parse();

    let outcome = cli.run().await;

    match &outcome {
        Ok(status) if status.is_degraded() => println!("{INCOMPLETE_NOTICE}"),
        Ok(_) => {}
        Err(error) => eprintln!("{error}"),
    }

    ExitCode::from(exit_status(&outcome))
}
