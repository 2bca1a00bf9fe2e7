use futures_util::StreamExt;
use iam_directory::{DirectoryError, Organization, Project, ResourceDirectory, ResourceName, projects};
use thiserror::Error;

use crate::{AuditContext, AuditIssue, ReportRow, RunStatus, collect_project_policies, walk_folders};

/// What part of the hierarchy to audit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub organization_id: String,
    /// Restrict the audit to this folder's subtree
    pub folder_id: Option<String>,
}

impl Scope {
    pub fn organization(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            folder_id: None,
        }
    }

    pub fn with_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    /// The node the folder walk starts from
    pub fn root(&self) -> ResourceName {
        match &self.folder_id {
            Some(folder_id) => ResourceName::folder(folder_id),
            None => ResourceName::organization(&self.organization_id),
        }
    }
}

/// A failure that stops the audit before anything was collected
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Error getting organization: {0}")]
    Organization(#[source] DirectoryError),
}

/// Everything an audit produced
#[derive(Debug)]
pub struct AuditReport {
    pub organization: Organization,
    pub rows: Vec<ReportRow>,
    pub status: RunStatus,
    pub issues: Vec<AuditIssue>,
}

/// Audit the bindings directly attached to every node within `scope`.
///
/// The organization lookup is the only fatal step. Every later failure is
/// recorded on the report, which is then [RunStatus::Degraded].
pub async fn audit<D>(directory: &D, scope: &Scope) -> Result<AuditReport, AuditError>
where
    D: ResourceDirectory + ?Sized,
{
    tracing::info!("Validating organization...");
    let organization = directory
        .get_organization(&scope.organization_id)
        .await
        .map_err(AuditError::Organization)?;

    let mut context = AuditContext::new();

    let listed = list_all_projects(directory, &mut context).await;

    let folder_restricted = scope.folder_id.is_some();
    if !folder_restricted {
        context.collect_policy(directory, &organization.name).await;
    }

    walk_folders(directory, scope.root(), &mut context).await;

    tracing::info!("Processing results...");
    collect_project_policies(
        directory,
        &listed,
        organization.id(),
        folder_restricted,
        &mut context,
    )
    .await;

    let (rows, status, issues) = context.into_parts();

    Ok(AuditReport {
        organization,
        rows,
        status,
        issues,
    })
}

/// Drain the project listing. A failed page is recorded and the projects
/// received before it are kept.
async fn list_all_projects<D>(directory: &D, context: &mut AuditContext) -> Vec<Project>
where
    D: ResourceDirectory + ?Sized,
{
    let mut listed = Vec::new();
    let stream = projects(directory);
    tokio::pin!(stream);

    while let Some(project) = stream.next().await {
        match project {
            Ok(project) => listed.push(project),
            Err(error) => {
                context.record_failure(error);
                break;
            }
        }
    }

    listed
}
