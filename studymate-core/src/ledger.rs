//! Upload history ledger
//!
//! Append-only list of uploaded files. Records sharing a name are treated
//! as versions of the same file.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::session::{FileCategory, UploadRecord};

/// Fields of an upload before the ledger assigns identity and time
#[derive(Debug, Clone, PartialEq)]
pub struct UploadDraft {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub content: Option<String>,
    pub category: FileCategory,
    pub original_image: Option<String>,
}

impl UploadDraft {
    /// Assign a fresh id and `date`
    pub fn into_record(self, date: DateTime<Utc>) -> UploadRecord {
        UploadRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: self.name,
            mime_type: self.mime_type,
            size: self.size,
            date,
            content: self.content,
            category: self.category,
            original_image: self.original_image,
        }
    }
}

/// All versions of one file name, newest first
#[derive(Debug, Clone, PartialEq)]
pub struct UploadGroup {
    pub name: String,
    pub versions: Vec<UploadRecord>,
}

impl UploadGroup {
    pub fn latest(&self) -> &UploadRecord {
        &self.versions[0]
    }

    pub fn latest_date(&self) -> DateTime<Utc> {
        self.latest().date
    }
}

/// Result of promoting a history entry to the active file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored,
    /// The entry exists but its payload was dropped
    MissingContent,
    NotFound,
}

/// Mutable view over the upload history vector of a session
#[derive(Debug)]
pub struct UploadLedger<'a> {
    records: &'a mut Vec<UploadRecord>,
}

impl<'a> UploadLedger<'a> {
    pub fn new(records: &'a mut Vec<UploadRecord>) -> Self {
        Self { records }
    }

    /// Append a new record with a fresh id and the current time
    pub fn add(&mut self, draft: UploadDraft) -> UploadRecord {
        self.add_at(draft, Utc::now())
    }

    /// Append a new record dated `date`
    pub fn add_at(&mut self, draft: UploadDraft, date: DateTime<Utc>) -> UploadRecord {
        let record = draft.into_record(date);
        debug!(id = %record.id, name = %record.name, "Recorded upload");
        self.records.push(record.clone());
        record
    }

    /// Delete the record with `id`; returns whether one was removed
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        self.records.len() != before
    }

    pub fn get(&self, id: &str) -> Option<&UploadRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UploadRecord> {
        self.records.iter()
    }

    /// Newest record carrying `name`
    pub fn latest_version(&self, name: &str) -> Option<&UploadRecord> {
        self.records
            .iter()
            .filter(|r| r.name == name)
            .max_by_key(|r| r.date)
    }

    pub fn group_by_name(&self) -> Vec<UploadGroup> {
        group_by_name(self.records.as_slice())
    }

    /// Make the record with `id` the active file context. The active file
    /// is only replaced when the record still carries its content.
    pub fn restore(&self, id: &str, current_file: &mut Option<UploadRecord>) -> RestoreOutcome {
        restore(self.records.as_slice(), id, current_file)
    }
}

/// Partition records by name, newest first within and across groups
pub fn group_by_name(records: &[UploadRecord]) -> Vec<UploadGroup> {
    let mut by_name: HashMap<&str, Vec<UploadRecord>> = HashMap::new();
    for record in records {
        by_name
            .entry(record.name.as_str())
            .or_default()
            .push(record.clone());
    }

    let mut groups: Vec<UploadGroup> = by_name
        .into_iter()
        .map(|(name, mut versions)| {
            versions.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
            UploadGroup {
                name: name.to_string(),
                versions,
            }
        })
        .collect();

    groups.sort_by(|a, b| {
        b.latest_date()
            .cmp(&a.latest_date())
            .then_with(|| a.name.cmp(&b.name))
    });
    groups
}

/// See [`UploadLedger::restore`]
pub fn restore(
    records: &[UploadRecord],
    id: &str,
    current_file: &mut Option<UploadRecord>,
) -> RestoreOutcome {
    let Some(record) = records.iter().find(|r| r.id == id) else {
        return RestoreOutcome::NotFound;
    };
    if !record.has_content() {
        return RestoreOutcome::MissingContent;
    }
    *current_file = Some(record.clone());
    RestoreOutcome::Restored
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn draft(name: &str, content: Option<&str>) -> UploadDraft {
        UploadDraft {
            name: name.to_string(),
            mime_type: "text/plain".to_string(),
            size: content.map(|c| c.len() as u64).unwrap_or(0),
            content: content.map(ToString::to_string),
            category: FileCategory::Text,
            original_image: None,
        }
    }

    #[test]
    fn test_add_assigns_unique_ids() {
        let mut records = Vec::new();
        let mut ledger = UploadLedger::new(&mut records);
        let a = ledger.add(draft("a.txt", Some("1")));
        let b = ledger.add(draft("a.txt", Some("2")));

        assert_ne!(a.id, b.id);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get(&b.id).unwrap().content.as_deref(), Some("2"));
    }

    #[test]
    fn test_remove_only_matching_record() {
        let mut records = Vec::new();
        let mut ledger = UploadLedger::new(&mut records);
        let a = ledger.add(draft("a.txt", Some("1")));
        let b = ledger.add(draft("b.txt", Some("2")));

        assert!(ledger.remove(&a.id));
        assert!(!ledger.remove(&a.id));
        assert_eq!(ledger.len(), 1);
        assert!(ledger.get(&b.id).is_some());
    }

    #[test]
    fn test_group_by_name_orders_within_and_across_groups() {
        let base = Utc::now();
        let mut records = Vec::new();
        let mut ledger = UploadLedger::new(&mut records);
        ledger.add_at(draft("essay.docx", Some("v1")), base);
        ledger.add_at(draft("notes.txt", Some("n1")), base + Duration::minutes(1));
        ledger.add_at(draft("essay.docx", Some("v2")), base + Duration::minutes(5));
        ledger.add_at(draft("notes.txt", Some("n2")), base + Duration::minutes(3));
        ledger.add_at(draft("slides.pdf", Some("s1")), base + Duration::minutes(2));

        let groups = ledger.group_by_name();
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["essay.docx", "notes.txt", "slides.pdf"]);

        for group in &groups {
            for pair in group.versions.windows(2) {
                assert!(pair[0].date >= pair[1].date);
            }
        }
        assert_eq!(groups[0].latest().content.as_deref(), Some("v2"));
        assert_eq!(groups[1].versions.len(), 2);
        for pair in groups.windows(2) {
            assert!(pair[0].latest_date() >= pair[1].latest_date());
        }
    }

    #[test]
    fn test_group_by_name_is_pure() {
        let mut records = Vec::new();
        let mut ledger = UploadLedger::new(&mut records);
        ledger.add(draft("a.txt", Some("1")));
        ledger.add(draft("b.txt", Some("2")));

        let first = ledger.group_by_name();
        let second = ledger.group_by_name();
        assert_eq!(first, second);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_group_by_name_empty() {
        assert!(group_by_name(&[]).is_empty());
    }

    #[test]
    fn test_latest_version() {
        let base = Utc::now();
        let mut records = Vec::new();
        let mut ledger = UploadLedger::new(&mut records);
        ledger.add_at(draft("a.txt", Some("old")), base);
        ledger.add_at(draft("a.txt", Some("new")), base + Duration::seconds(30));

        let latest = ledger.latest_version("a.txt").unwrap();
        assert_eq!(latest.content.as_deref(), Some("new"));
        assert!(ledger.latest_version("missing.txt").is_none());
    }

    #[test]
    fn test_restore_promotes_record() {
        let mut records = Vec::new();
        let mut ledger = UploadLedger::new(&mut records);
        let rec = ledger.add(draft("a.txt", Some("Hello")));

        let mut current = None;
        assert_eq!(ledger.restore(&rec.id, &mut current), RestoreOutcome::Restored);
        assert_eq!(current, Some(rec));
    }

    #[test]
    fn test_restore_without_content_leaves_current_file() {
        let mut records = Vec::new();
        let mut ledger = UploadLedger::new(&mut records);
        let active = ledger.add(draft("active.txt", Some("keep me")));
        let stripped = ledger.add(draft("old.txt", None));

        let mut current = Some(active.clone());
        assert_eq!(
            ledger.restore(&stripped.id, &mut current),
            RestoreOutcome::MissingContent
        );
        assert_eq!(current, Some(active));

        let mut none = None;
        assert_eq!(
            ledger.restore(&stripped.id, &mut none),
            RestoreOutcome::MissingContent
        );
        assert!(none.is_none());
    }

    #[test]
    fn test_restore_unknown_id() {
        let mut records = Vec::new();
        let ledger = UploadLedger::new(&mut records);
        let mut current = None;
        assert_eq!(ledger.restore("nope", &mut current), RestoreOutcome::NotFound);
    }
}
