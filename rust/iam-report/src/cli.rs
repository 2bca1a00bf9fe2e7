use std::path::PathBuf;

use clap::Parser;
use iam_directory::{
    AuthMethod, DEFAULT_ENDPOINT, ResourceDirectory, RestDirectory, RestDirectoryConfig,
};
use thiserror::Error;

use crate::{AuditError, RunStatus, Scope, SinkError, audit, write_csv_file};

/// Printed after a run where any call failed
pub const INCOMPLETE_NOTICE: &str =
    "There were errors while generating the report; it may not be completely accurate.";

/// Exit status of a run that stopped on a fatal error
pub const FATAL_EXIT_STATUS: u8 = 1;

/// Exit status for the outcome of [ReportCli::run]; zero only when every call
/// succeeded
pub fn exit_status(outcome: &Result<RunStatus, ReportError>) -> u8 {
    match outcome {
        Ok(status) => status.exit_status(),
        Err(_) => FATAL_EXIT_STATUS,
    }
}

#[derive(Debug, Parser)]
#[command(name = "gcp-iam-report")]
#[command(bin_name = "gcp-iam-report")]
#[command(
    about = "Produces an aggregate CSV of an organization's IAM policies or a subset thereof",
    long_about = None
)]
pub struct ReportCli {
    /// Organization ID
    pub org_id: String,

    /// Restrict search to folder
    #[arg(short, long = "folder", value_name = "FOLDER_ID")]
    pub folder: Option<String>,

    /// File to write results
    #[arg(short, long, default_value = "iam_members.csv")]
    pub output: PathBuf,

    /// Base URL of the resource manager API
    #[arg(long, env = "IAM_REPORT_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// OAuth access token sent as a bearer token
    #[arg(long, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Items requested per listing page
    #[arg(long)]
    pub page_size: Option<u32>,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl ReportCli {
    pub fn scope(&self) -> Scope {
        let scope = Scope::organization(&self.org_id);
        match &self.folder {
            Some(folder) => scope.with_folder(folder),
            None => scope,
        }
    }

    pub fn directory_config(&self) -> RestDirectoryConfig {
        let auth = match &self.access_token {
            Some(token) => AuthMethod::Bearer(token.clone()),
            None => AuthMethod::None,
        };

        let config = RestDirectoryConfig::new(&self.endpoint)
            .with_auth(auth)
            .with_timeout(self.timeout);

        match self.page_size {
            Some(page_size) => config.with_page_size(page_size),
            None => config,
        }
    }

    /// Run the report against the REST directory described by these
    /// arguments
    pub async fn run(&self) -> Result<RunStatus, ReportError> {
        let directory = RestDirectory::new(self.directory_config());
        self.run_with(&directory).await
    }

    /// Audit the scope, then write the report. The output file is only opened
    /// once every call has completed, and never if the organization lookup
    /// fails.
    pub async fn run_with<D>(&self, directory: &D) -> Result<RunStatus, ReportError>
    where
        D: ResourceDirectory + ?Sized,
    {
        let report = audit(directory, &self.scope()).await?;

        tracing::info!(
            rows = report.rows.len(),
            "Writing file \"{}\"",
            self.output.display()
        );
        write_csv_file(&self.output, &report.rows).await?;

        tracing::info!("Done.");

        if report.status.is_degraded() {
            tracing::warn!(issues = report.issues.len(), "Report may be incomplete");
        }

        Ok(report.status)
    }
}
