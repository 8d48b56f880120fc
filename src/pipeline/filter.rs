//! Tag filter: pick the ids of records carrying at least one wanted tag.

use crate::record::{RecordId, RecordKind, SourceRecord};
use std::collections::HashSet;

/// Topical tags ingested when no `--tag` is given.
pub const DEFAULT_TAGS: &[&str] = &[
    "terraform",
    "tfe",
    "terraform-enterprise",
    "tfe-enterprise",
    "UDP",
    "gitlab",
    "gitlab-ci",
    "gitlab-ci-cd",
    "cicd",
    "venafi",
    "modules",
    "module",
    "gitlab-ci-pipelines",
    "gitlab-pipelines",
    "gitlab-pipeline",
    "devsecops",
    "devops",
];

/// Exact, case-sensitive tag matcher.
#[derive(Debug, Clone)]
pub struct TagFilter {
    values: HashSet<String>,
}

impl TagFilter {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether any of `tags` is in the filter set.
    pub fn matches(&self, tags: &[String]) -> bool {
        tags.iter().any(|t| self.values.contains(t))
    }

    /// Ids of matching records, in first-seen order without duplicates.
    ///
    /// Records with no id for `kind` are skipped.
    pub fn select_ids(&self, records: &[SourceRecord], kind: RecordKind) -> Vec<RecordId> {
        let mut seen = HashSet::new();
        records
            .iter()
            .filter(|r| self.matches(&r.tags))
            .filter_map(|r| r.id(kind))
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect()
    }
}

impl Default for TagFilter {
    fn default() -> Self {
        Self::new(DEFAULT_TAGS.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: i64, tags: &[&str]) -> SourceRecord {
        SourceRecord {
            question_id: Some(RecordId::Number(id)),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn keeps_records_with_any_matching_tag() {
        let f = TagFilter::new(["terraform", "gitlab"]);
        let records = vec![
            rec(1, &["python"]),
            rec(2, &["python", "gitlab"]),
            rec(3, &["terraform"]),
            rec(4, &[]),
        ];
        assert_eq!(
            f.select_ids(&records, RecordKind::Question),
            vec![RecordId::Number(2), RecordId::Number(3)]
        );
    }

    #[test]
    fn match_is_exact_and_case_sensitive() {
        let f = TagFilter::new(["UDP"]);
        assert!(f.matches(&["UDP".to_string()]));
        assert!(!f.matches(&["udp".to_string()]));
        assert!(!f.matches(&["UDP-2".to_string()]));
    }

    #[test]
    fn records_without_id_are_skipped() {
        let f = TagFilter::default();
        let mut no_id = rec(1, &["terraform"]);
        no_id.question_id = None;
        assert!(f.select_ids(&[no_id], RecordKind::Question).is_empty());
    }

    #[test]
    fn uses_id_field_of_kind() {
        let f = TagFilter::default();
        let article = SourceRecord {
            article_id: Some(RecordId::Number(9)),
            tags: vec!["devops".into()],
            ..Default::default()
        };
        assert!(f.select_ids(&[article.clone()], RecordKind::Question).is_empty());
        assert_eq!(f.select_ids(&[article], RecordKind::Article), vec![RecordId::Number(9)]);
    }

    #[test]
    fn duplicates_collapse_in_first_seen_order() {
        let f = TagFilter::default();
        let records = vec![rec(5, &["tfe"]), rec(3, &["cicd"]), rec(5, &["tfe"])];
        assert_eq!(
            f.select_ids(&records, RecordKind::Question),
            vec![RecordId::Number(5), RecordId::Number(3)]
        );
    }

    #[test]
    fn default_set_covers_known_topics() {
        let f = TagFilter::default();
        for tag in ["terraform", "gitlab-ci", "venafi", "devsecops"] {
            assert!(f.matches(&[tag.to_string()]), "{tag}");
        }
    }
}
