use std::collections::BTreeSet;

use clap::Parser;
use iam_directory::{
    Binding, Folder, LifecycleState, MemoryDirectory, Operation, ParentRef, Policy, Project,
    ResourceName,
};
use iam_report::{
    AuditError, Location, ReportCli, ReportError, ReportRow, RunStatus, Scope, audit,
    exit_status,
};
use pretty_assertions::assert_eq;
use testresult::TestResult;

fn row(member: &str, member_type: &str, role: &str, location: Location) -> ReportRow {
    ReportRow {
        member: member.into(),
        member_type: member_type.into(),
        role: role.into(),
        location,
    }
}

fn multiset(rows: &[ReportRow]) -> BTreeSet<ReportRow> {
    rows.iter().cloned().collect()
}

/// organizations/123
/// ├── folders/999
/// │   ├── folders/1000
/// │   │   └── projects/deep (active)
/// │   ├── projects/p2 (delete requested)
/// │   └── projects/in-folder (active)
/// ├── folders/500
/// │   └── projects/elsewhere (active)
/// └── projects/p1 (active)
fn make_hierarchy() -> iam_directory::MemoryDirectoryBuilder {
    let org = ResourceName::organization("123");

    MemoryDirectory::builder()
        .organization("123")
        .folder(Folder::new("999", org.clone()))
        .folder(Folder::new("500", org.clone()))
        .folder(Folder::new("1000", ResourceName::folder("999")))
        .project(Project::active("p1", ParentRef::organization("123")))
        .project(Project::active("in-folder", ParentRef::folder("999")))
        .project(
            Project::active("p2", ParentRef::folder("999"))
                .with_state(LifecycleState::DeleteRequested),
        )
        .project(Project::active("deep", ParentRef::folder("1000")))
        .project(Project::active("elsewhere", ParentRef::folder("500")))
        .policy(
            org,
            Policy::new(vec![Binding::new(
                "roles/owner",
                ["user:a@example.com", "group:g@example.com"],
            )]),
        )
        .policy(
            ResourceName::folder("999"),
            Policy::new(vec![Binding::new("roles/editor", ["user:f@example.com"])]),
        )
        .policy(
            ResourceName::folder("500"),
            Policy::new(vec![Binding::new("roles/editor", ["user:x@example.com"])]),
        )
        .policy(
            ResourceName::project("p1"),
            Policy::new(vec![Binding::new("roles/viewer", ["user:b@example.com"])]),
        )
        .policy(
            ResourceName::project("in-folder"),
            Policy::new(vec![Binding::new("roles/viewer", ["domain:example.com"])]),
        )
        .policy(
            ResourceName::project("p2"),
            Policy::new(vec![Binding::new("roles/viewer", ["user:gone@example.com"])]),
        )
        .policy(
            ResourceName::project("deep"),
            Policy::new(vec![Binding::new(
                "roles/viewer",
                ["serviceAccount:ci@deep.iam.gserviceaccount.com"],
            )]),
        )
        .policy(
            ResourceName::project("elsewhere"),
            Policy::new(vec![Binding::new("roles/viewer", ["user:y@example.com"])]),
        )
}

#[test_log::test(tokio::test)]
async fn it_reports_an_organization_without_folders() -> TestResult {
    let org = ResourceName::organization("123");
    let directory = MemoryDirectory::builder()
        .organization("123")
        .project(Project::active("p1", ParentRef::organization("123")))
        .policy(
            org,
            Policy::new(vec![Binding::new(
                "roles/owner",
                ["user:a@example.com", "group:g@example.com"],
            )]),
        )
        .policy(
            ResourceName::project("p1"),
            Policy::new(vec![Binding::new("roles/viewer", ["user:b@example.com"])]),
        )
        .build();

    let report = audit(&directory, &Scope::organization("123")).await?;

    assert_eq!(report.status, RunStatus::Clean);
    assert_eq!(
        multiset(&report.rows),
        BTreeSet::from([
            row("a@example.com", "user", "roles/owner", Location::Organization("123".into())),
            row("g@example.com", "group", "roles/owner", Location::Organization("123".into())),
            row("b@example.com", "user", "roles/viewer", Location::Project("p1".into())),
        ])
    );
    Ok(())
}

#[test_log::test(tokio::test)]
async fn it_reports_the_whole_hierarchy_when_unrestricted() -> TestResult {
    let directory = make_hierarchy().build();

    let report = audit(&directory, &Scope::organization("123")).await?;

    assert_eq!(report.status, RunStatus::Clean);
    assert_eq!(report.rows.len(), 8);

    let projects: BTreeSet<&str> = report
        .rows
        .iter()
        .filter_map(|row| match &row.location {
            Location::Project(id) => Some(id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        projects,
        BTreeSet::from(["p1", "in-folder", "deep", "elsewhere"])
    );
    Ok(())
}

#[test_log::test(tokio::test)]
async fn it_excludes_the_organization_policy_when_restricted_to_a_folder() -> TestResult {
    let directory = make_hierarchy().build();

    let report = audit(&directory, &Scope::organization("123").with_folder("999")).await?;

    assert_eq!(report.status, RunStatus::Clean);
    assert_eq!(
        multiset(&report.rows),
        BTreeSet::from([
            row("f@example.com", "user", "roles/editor", Location::Folder("999".into())),
            row("example.com", "domain", "roles/viewer", Location::Project("in-folder".into())),
            row(
                "ci@deep.iam.gserviceaccount.com",
                "serviceAccount",
                "roles/viewer",
                Location::Project("deep".into())
            ),
        ])
    );
    assert!(
        !directory
            .requests()
            .iter()
            .any(|request| request.operation == Operation::GetIamPolicy
                && request.resource == "organizations/123")
    );
    Ok(())
}

#[test_log::test(tokio::test)]
async fn it_excludes_inactive_projects_under_visited_folders() -> TestResult {
    let directory = make_hierarchy().build();

    let report = audit(&directory, &Scope::organization("123")).await?;

    assert!(
        report
            .rows
            .iter()
            .all(|row| row.location != Location::Project("p2".into()))
    );
    assert!(
        !directory
            .requests()
            .iter()
            .any(|request| request.resource == "projects/p2")
    );
    Ok(())
}

#[test_log::test(tokio::test)]
async fn it_degrades_but_continues_when_a_folder_listing_fails() -> TestResult {
    let directory = make_hierarchy()
        .fail_children(ResourceName::folder("999"))
        .build();

    let report = audit(&directory, &Scope::organization("123")).await?;

    assert_eq!(report.status, RunStatus::Degraded);
    assert_eq!(report.issues.len(), 1);

    let locations: BTreeSet<Location> = report.rows.iter().map(|r| r.location.clone()).collect();
    // 999 is still reported, its subtree is not; its sibling is unaffected
    assert!(locations.contains(&Location::Folder("999".into())));
    assert!(locations.contains(&Location::Folder("500".into())));
    assert!(locations.contains(&Location::Project("elsewhere".into())));
    assert!(locations.contains(&Location::Project("in-folder".into())));
    assert!(!locations.contains(&Location::Project("deep".into())));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn it_stays_degraded_after_later_calls_succeed() -> TestResult {
    let directory = make_hierarchy()
        .fail_policy(ResourceName::organization("123"))
        .build();

    let report = audit(&directory, &Scope::organization("123")).await?;

    assert_eq!(report.status, RunStatus::Degraded);
    assert_eq!(report.rows.len(), 6);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn it_skips_only_the_project_whose_policy_fails() -> TestResult {
    let directory = make_hierarchy()
        .fail_policy(ResourceName::project("deep"))
        .build();

    let report = audit(&directory, &Scope::organization("123")).await?;

    assert_eq!(report.status, RunStatus::Degraded);
    assert_eq!(report.rows.len(), 7);
    assert!(
        report
            .rows
            .iter()
            .any(|row| row.location == Location::Project("elsewhere".into()))
    );
    Ok(())
}

#[test_log::test(tokio::test)]
async fn it_joins_projects_against_the_final_visited_set() -> TestResult {
    // Listed before the folders that parent them are discovered
    let org = ResourceName::organization("1");
    let directory = MemoryDirectory::builder()
        .page_size(1)
        .organization("1")
        .project(Project::active("late", ParentRef::folder("30")))
        .folder(Folder::new("10", org))
        .folder(Folder::new("20", ResourceName::folder("10")))
        .folder(Folder::new("30", ResourceName::folder("20")))
        .policy(
            ResourceName::project("late"),
            Policy::new(vec![Binding::new("roles/viewer", ["user:l@example.com"])]),
        )
        .build();

    let report = audit(&directory, &Scope::organization("1")).await?;

    assert_eq!(
        report.rows,
        vec![row("l@example.com", "user", "roles/viewer", Location::Project("late".into()))]
    );
    Ok(())
}

#[test_log::test(tokio::test)]
async fn it_keeps_projects_listed_before_a_failed_page() -> TestResult {
    let directory = MemoryDirectory::builder()
        .page_size(1)
        .organization("1")
        .project(Project::active("first", ParentRef::organization("1")))
        .project(Project::active("second", ParentRef::organization("1")))
        .fail_project_page(1)
        .policy(
            ResourceName::project("first"),
            Policy::new(vec![Binding::new("roles/viewer", ["user:a@example.com"])]),
        )
        .build();

    let report = audit(&directory, &Scope::organization("1")).await?;

    assert_eq!(report.status, RunStatus::Degraded);
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].location, Location::Project("first".into()));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn it_stops_before_any_other_call_when_the_organization_is_missing() -> TestResult {
    let directory = make_hierarchy().build();

    let result = audit(&directory, &Scope::organization("404")).await;

    assert!(matches!(result, Err(AuditError::Organization(_))));
    assert_eq!(directory.requests().len(), 1);
    assert_eq!(directory.requests_for(Operation::GetIamPolicy), 0);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn it_never_creates_the_output_for_a_missing_organization() -> TestResult {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("iam_members.csv");
    let directory = make_hierarchy().build();

    let output_arg = output.display().to_string();
    let cli = ReportCli::try_parse_from(["gcp-iam-report", "404", "-o", &output_arg])?;

    let result = cli.run_with(&directory).await;

    assert!(matches!(result, Err(ReportError::Audit(_))));
    assert_ne!(exit_status(&result), 0);
    assert!(!output.exists());
    Ok(())
}

#[test_log::test(tokio::test)]
async fn it_writes_the_report_and_returns_the_run_status() -> TestResult {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("report.csv");
    let directory = make_hierarchy()
        .fail_children(ResourceName::folder("500"))
        .build();

    let output_arg = output.display().to_string();
    let cli = ReportCli::try_parse_from([
        "gcp-iam-report",
        "123",
        "--folder",
        "999",
        "--output",
        &output_arg,
    ])?;

    // 500 is outside the requested subtree, so its failure is never hit
    let outcome = cli.run_with(&directory).await;
    assert_eq!(exit_status(&outcome), 0);
    assert_eq!(outcome?, RunStatus::Clean);

    let written = std::fs::read_to_string(&output)?;
    let mut lines = written.lines();
    assert_eq!(
        lines.next(),
        Some("member,member_type,role,org_id,folder_id,project_id")
    );

    let records: BTreeSet<&str> = lines.collect();
    assert_eq!(
        records,
        BTreeSet::from([
            "f@example.com,user,roles/editor,,999,",
            "example.com,domain,roles/viewer,,,in-folder",
            "ci@deep.iam.gserviceaccount.com,serviceAccount,roles/viewer,,,deep",
        ])
    );
    Ok(())
}

#[test_log::test(tokio::test)]
async fn it_exits_non_zero_after_writing_a_degraded_report() -> TestResult {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("report.csv");
    let directory = make_hierarchy()
        .fail_policy(ResourceName::folder("500"))
        .build();

    let output_arg = output.display().to_string();
    let cli = ReportCli::try_parse_from(["gcp-iam-report", "123", "-o", &output_arg])?;

    let outcome = cli.run_with(&directory).await;

    assert!(matches!(outcome, Ok(RunStatus::Degraded)));
    assert_eq!(exit_status(&outcome), 1);
    // Everything that could be fetched is still written
    let written = std::fs::read_to_string(&output)?;
    assert_eq!(written.lines().count(), 1 + 7);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn it_stays_clean_when_policies_grant_public_or_deleted_principals() -> TestResult {
    let org = ResourceName::organization("1");
    let directory = MemoryDirectory::builder()
        .organization("1")
        .policy(
            org,
            Policy::new(vec![
                Binding::new("roles/viewer", ["allUsers", "user:a@example.com"]),
                Binding::new(
                    "roles/browser",
                    ["allAuthenticatedUsers", "deleted:group:old@example.com?uid=7"],
                ),
            ]),
        )
        .build();

    let report = audit(&directory, &Scope::organization("1")).await?;

    assert_eq!(report.status, RunStatus::Clean);
    assert_eq!(
        report.rows,
        vec![row("a@example.com", "user", "roles/viewer", Location::Organization("1".into()))]
    );
    Ok(())
}
