use iam_directory::{MalformedMember, Policy};

use crate::{Location, ReportRow};

/// The rows produced from one policy, plus any member strings that could not
/// be parsed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flattened {
    pub rows: Vec<ReportRow>,
    pub rejected: Vec<MalformedMember>,
}

/// Split every binding of `policy` into one row per member, tagged with
/// `location`.
pub fn flatten_policy(policy: &Policy, location: &Location) -> Flattened {
    let mut flattened = Flattened::default();

    for binding in &policy.bindings {
        for member in binding.parsed_members() {
            match member {
                Ok(member) => flattened.rows.push(ReportRow::new(
                    member,
                    &binding.role,
                    location.clone(),
                )),
                Err(malformed) => flattened.rejected.push(malformed),
            }
        }
    }

    flattened
}
