use crate::common::validation::{Constraint, FieldViolation};
use crate::error::{IssueDeskError, Result};
use crate::store::StoreTransaction;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Pattern a project key must satisfy
pub const PROJECT_KEY_PATTERN: &str = "letters, digits and underscores";

/// Check a project key: non-empty, ASCII letters, digits or underscores
pub fn validate_project_key(field: &str, project: &str) -> std::result::Result<(), FieldViolation> {
    let valid = !project.is_empty()
        && project
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(FieldViolation::new(
            field,
            Some(project.to_string()),
            Constraint::Pattern(PROJECT_KEY_PATTERN),
        ))
    }
}

/// A unique issue name of the form `{project}-{sequence}`
///
/// The sequence is zero padded when allocated. Parsing accepts any number of
/// digits so names minted after the width grew still round-trip.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IssueName(String);

impl IssueName {
    /// Build a name from its parts, padding the sequence to `width` digits
    pub fn format(project: &str, sequence: u64, width: usize) -> Self {
        Self(format!("{}-{:0width$}", project, sequence, width = width))
    }

    /// The full name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The project key part
    pub fn project(&self) -> &str {
        self.split().0
    }

    /// The numeric sequence part
    pub fn sequence(&self) -> u64 {
        self.split().1.parse().unwrap_or(0)
    }

    fn split(&self) -> (&str, &str) {
        // Parsing guarantees a '-' separator is present
        self.0.rsplit_once('-').unwrap_or((&self.0, ""))
    }
}

impl FromStr for IssueName {
    type Err = FieldViolation;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let malformed = || FieldViolation::malformed("issue_name", s, "expected {project}-{digits}");
        let (project, digits) = s.rsplit_once('-').ok_or_else(malformed)?;
        validate_project_key("issue_name", project).map_err(|_| malformed())?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed());
        }
        if digits.parse::<u64>().is_err() {
            return Err(malformed());
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for IssueName {
    type Error = FieldViolation;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IssueName> for String {
    fn from(name: IssueName) -> Self {
        name.0
    }
}

impl AsRef<str> for IssueName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the next sequential name for a project
///
/// Allocation reads the highest suffix the project has ever issued and adds
/// one, so a deleted issue's name is never handed out again. That
/// read-increment-insert sequence is only safe when [`allocate`](Self::allocate)
/// runs inside the same transaction as the issue insert; the record store
/// serializes transactions, so concurrent creates for one project observe each
/// other's inserts and never mint the same suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameAllocator {
    width: usize,
    max_sequence: u64,
}

impl Default for NameAllocator {
    fn default() -> Self {
        Self {
            width: 4,
            max_sequence: 99_999_999,
        }
    }
}

impl NameAllocator {
    /// Create an allocator padding to `width` digits and refusing sequences above `max_sequence`
    pub fn new(width: usize, max_sequence: u64) -> Self {
        Self {
            width: width.max(1),
            max_sequence,
        }
    }

    /// Padding width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Largest sequence number that will be allocated
    pub fn max_sequence(&self) -> u64 {
        self.max_sequence
    }

    /// Pure next-name computation over the names that already exist
    ///
    /// Names for other projects are ignored. When the next sequence needs more
    /// digits than the configured width the name simply gets longer.
    pub fn next_name<'a, I>(&self, project: &str, existing: I) -> Result<IssueName>
    where
        I: IntoIterator<Item = &'a IssueName>,
    {
        let highest = existing
            .into_iter()
            .filter(|name| name.project() == project)
            .map(IssueName::sequence)
            .max()
            .unwrap_or(0);
        self.name_after(project, highest)
    }

    /// The name following sequence `highest`
    pub fn name_after(&self, project: &str, highest: u64) -> Result<IssueName> {
        let next = highest + 1;
        if next > self.max_sequence {
            return Err(IssueDeskError::conflict(format!(
                "project {} has exhausted its issue numbers (maximum {})",
                project, self.max_sequence
            )));
        }

        Ok(IssueName::format(project, next, self.width))
    }

    /// Allocate the next name for `project` inside an open transaction
    pub async fn allocate(
        &self,
        tx: &mut dyn StoreTransaction,
        project: &str,
    ) -> Result<IssueName> {
        validate_project_key("issue_project", project)?;

        let highest = tx.last_sequence(project).await?;
        let name = self.name_after(project, highest)?;

        debug!("Allocated issue name {} after {}", name, highest);
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn names(raw: &[&str]) -> Vec<IssueName> {
        raw.iter().map(|n| n.parse().unwrap()).collect()
    }

    #[test]
    fn test_first_name_for_project() {
        let allocator = NameAllocator::default();
        let name = allocator.next_name("DWB", std::iter::empty()).unwrap();
        assert_eq!(name.as_str(), "DWB-0001");
    }

    #[test]
    fn test_next_name_uses_highest_suffix_of_same_project() {
        let allocator = NameAllocator::default();
        let existing = names(&["DWB-0001", "DWB-0007", "OPS-0042", "DWB-0003"]);
        let name = allocator.next_name("DWB", &existing).unwrap();
        assert_eq!(name.as_str(), "DWB-0008");

        let name = allocator.next_name("OPS", &existing).unwrap();
        assert_eq!(name.as_str(), "OPS-0043");
    }

    #[test]
    fn test_width_grows_instead_of_truncating() {
        let allocator = NameAllocator::default();
        let existing = names(&["DWB-9999"]);
        let name = allocator.next_name("DWB", &existing).unwrap();
        assert_eq!(name.as_str(), "DWB-10000");
        assert_eq!(name.sequence(), 10_000);
    }

    #[test]
    fn test_name_after_issued_sequence() {
        let allocator = NameAllocator::default();
        assert_eq!(allocator.name_after("DWB", 0).unwrap().as_str(), "DWB-0001");
        assert_eq!(allocator.name_after("DWB", 2).unwrap().as_str(), "DWB-0003");
        assert!(NameAllocator::new(2, 99).name_after("DWB", 99).unwrap_err().is_conflict());
    }

    #[test]
    fn test_exhausted_sequence_is_conflict() {
        let allocator = NameAllocator::new(2, 99);
        let existing = names(&["DWB-99"]);
        let err = allocator.next_name("DWB", &existing).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_project_with_hyphen_in_other_names_is_not_confused() {
        let allocator = NameAllocator::default();
        let existing = names(&["DWB_X-0005"]);
        assert_eq!(allocator.next_name("DWB", &existing).unwrap().as_str(), "DWB-0001");
    }

    #[test]
    fn test_parse_rejects_malformed_names() {
        for bad in ["DWB", "DWB-", "-0001", "DWB-00a1", "D W-0001"] {
            assert!(bad.parse::<IssueName>().is_err(), "{} should not parse", bad);
        }
        let name: IssueName = "DWB-0012".parse().unwrap();
        assert_eq!(name.project(), "DWB");
        assert_eq!(name.sequence(), 12);
    }

    #[test]
    fn test_project_key_validation() {
        assert!(validate_project_key("issue_project", "DWB").is_ok());
        assert!(validate_project_key("issue_project", "web_2").is_ok());
        let violation = validate_project_key("issue_project", "DW-B").unwrap_err();
        assert_eq!(violation.constraint, Constraint::Pattern(PROJECT_KEY_PATTERN));
        assert!(validate_project_key("issue_project", "").is_err());
    }

    #[test]
    fn test_serde_is_plain_string() {
        let name: IssueName = "DWB-0001".parse().unwrap();
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"DWB-0001\"");
        assert!(serde_json::from_str::<IssueName>("\"nonsense\"").is_err());
    }

    proptest! {
        #[test]
        fn prop_format_parse_preserves_parts(
            project in "[A-Z][A-Z0-9_]{0,7}",
            sequence in 1u64..1_000_000,
            width in 1usize..8,
        ) {
            let name = IssueName::format(&project, sequence, width);
            let parsed: IssueName = name.as_str().parse().unwrap();
            prop_assert_eq!(parsed.project(), project.as_str());
            prop_assert_eq!(parsed.sequence(), sequence);
            prop_assert!(name.as_str().len() >= project.len() + 1 + width);
        }

        #[test]
        fn prop_sequential_allocation_is_dense(count in 1usize..60) {
            let allocator = NameAllocator::default();
            let mut existing: Vec<IssueName> = Vec::new();
            for _ in 0..count {
                let name = allocator.next_name("DWB", &existing).unwrap();
                existing.push(name);
            }
            for (index, name) in existing.iter().enumerate() {
                prop_assert_eq!(name.as_str(), format!("DWB-{:04}", index + 1));
            }
        }
    }
}
