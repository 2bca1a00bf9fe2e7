use iam_directory::{Member, ResourceName};

/// Column header of the report, in record order
pub const HEADER: [&str; 6] = [
    "member",
    "member_type",
    "role",
    "org_id",
    "folder_id",
    "project_id",
];

/// The node a binding was attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Location {
    Organization(String),
    Folder(String),
    Project(String),
}

impl Location {
    /// The bare id of the node
    pub fn id(&self) -> &str {
        match self {
            Location::Organization(id) | Location::Folder(id) | Location::Project(id) => id,
        }
    }
}

impl From<&ResourceName> for Location {
    fn from(name: &ResourceName) -> Self {
        match name {
            ResourceName::Organization(id) => Location::Organization(id.clone()),
            ResourceName::Folder(id) => Location::Folder(id.clone()),
            ResourceName::Project(id) => Location::Project(id.clone()),
        }
    }
}

/// One (member, role) pair on one node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReportRow {
    pub member: String,
    pub member_type: String,
    pub role: String,
    pub location: Location,
}

impl ReportRow {
    pub fn new(member: Member, role: impl Into<String>, location: Location) -> Self {
        Self {
            member: member.id,
            member_type: member.member_type,
            role: role.into(),
            location,
        }
    }

    /// The row as a CSV record; exactly one of the last three fields is
    /// non-empty
    pub fn record(&self) -> [&str; 6] {
        let (org_id, folder_id, project_id) = match &self.location {
            Location::Organization(id) => (id.as_str(), "", ""),
            Location::Folder(id) => ("", id.as_str(), ""),
            Location::Project(id) => ("", "", id.as_str()),
        };

        [
            self.member.as_str(),
            self.member_type.as_str(),
            self.role.as_str(),
            org_id,
            folder_id,
            project_id,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_populates_exactly_one_location_column() {
        let member: Member = "user:a@example.com".parse().unwrap();

        for location in [
            Location::Organization("123".into()),
            Location::Folder("9".into()),
            Location::Project("p1".into()),
        ] {
            let row = ReportRow::new(member.clone(), "roles/owner", location.clone());
            let record = row.record();

            assert_eq!(&record[..3], &["a@example.com", "user", "roles/owner"]);
            let populated: Vec<&str> = record[3..].iter().copied().filter(|f| !f.is_empty()).collect();
            assert_eq!(populated, vec![location.id()]);
        }
    }
}
