use std::collections::HashSet;

use iam_directory::{DirectoryError, MalformedMember, Policy, ResourceDirectory, ResourceName};
use thiserror::Error;

use crate::{Location, ReportRow, flatten_policy};

/// Whether every call of a run succeeded.
///
/// A run starts [RunStatus::Clean] and becomes [RunStatus::Degraded] on the
/// first recoverable failure; it never becomes clean again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunStatus {
    #[default]
    Clean,
    Degraded,
}

impl RunStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, RunStatus::Degraded)
    }

    /// Process exit status for a run that finished with this status
    pub fn exit_status(&self) -> u8 {
        match self {
            RunStatus::Clean => 0,
            RunStatus::Degraded => 1,
        }
    }

    fn degrade(&mut self) {
        *self = RunStatus::Degraded;
    }
}

/// A recoverable problem encountered during a run
#[derive(Debug, Error)]
pub enum AuditIssue {
    /// A single remote call failed
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// A member string was skipped
    #[error("Skipped a member of {location:?}: {member}")]
    MalformedMember {
        location: Location,
        member: MalformedMember,
    },
}

/// Mutable state of one audit run: discovered folders, accumulated rows and
/// the degraded flag. Owned by the run and lent to each stage in turn.
#[derive(Debug, Default)]
pub struct AuditContext {
    visited_folders: HashSet<String>,
    rows: Vec<ReportRow>,
    status: RunStatus,
    issues: Vec<AuditIssue>,
}

impl AuditContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a folder as visited. Returns `false` if it already was.
    pub fn visit_folder(&mut self, id: impl Into<String>) -> bool {
        self.visited_folders.insert(id.into())
    }

    pub fn visited_folders(&self) -> &HashSet<String> {
        &self.visited_folders
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn issues(&self) -> &[AuditIssue] {
        &self.issues
    }

    /// Report a failed remote call and degrade the run
    pub fn record_failure(&mut self, error: DirectoryError) {
        tracing::error!(
            operation = ?error.operation(),
            resource = error.resource(),
            "{error}"
        );
        self.status.degrade();
        self.issues.push(error.into());
    }

    /// Flatten `policy` into rows for `location`. Members outside the
    /// `type:identifier` grammar are skipped with a warning; unless they are
    /// principals the API is known to emit, they also degrade the run.
    pub fn add_policy(&mut self, policy: &Policy, location: Location) {
        let flattened = flatten_policy(policy, &location);

        self.rows.extend(flattened.rows);

        for member in flattened.rejected {
            if member.is_known_principal() {
                tracing::warn!(
                    location = location.id(),
                    principal = member.0.as_str(),
                    "Skipping principal without a member type"
                );
                continue;
            }

            tracing::warn!(location = location.id(), "Skipping member: {member}");
            self.status.degrade();
            self.issues.push(AuditIssue::MalformedMember {
                location: location.clone(),
                member,
            });
        }
    }

    /// Fetch the policy of `resource` and add its rows. A failed fetch is
    /// recorded and yields no rows.
    pub async fn collect_policy<D>(&mut self, directory: &D, resource: &ResourceName)
    where
        D: ResourceDirectory + ?Sized,
    {
        tracing::debug!(%resource, "Getting IAM policy");

        match directory.get_iam_policy(resource).await {
            Ok(policy) => self.add_policy(&policy, resource.into()),
            Err(error) => self.record_failure(error),
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<ReportRow>, RunStatus, Vec<AuditIssue>) {
        (self.rows, self.status, self.issues)
    }
}
