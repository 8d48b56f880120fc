//! Record types and the record normalizer.
//!
//! Source records arrive from the Q&A API as loosely-typed JSON: every field
//! may be absent depending on the API filter in use. They deserialise into
//! [`SourceRecord`] with defaults everywhere, and [`normalize`] turns one into
//! the flat [`NormalizedRecord`] written to disk. The input is never mutated.

use crate::markdown::html_to_markdown;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric or string identifier of a source record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{n}"),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Number(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

/// The two kinds of Q&A content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Article,
    Question,
}

impl RecordKind {
    /// API path segment for listings and by-id lookups.
    pub fn endpoint(self) -> &'static str {
        match self {
            RecordKind::Article => "articles",
            RecordKind::Question => "questions",
        }
    }

    /// Name of the identifier field in source records.
    pub fn id_field(self) -> &'static str {
        match self {
            RecordKind::Article => "article_id",
            RecordKind::Question => "question_id",
        }
    }

    /// Output sub-directory for normalized records of this kind.
    pub fn dir_name(self) -> &'static str {
        self.endpoint()
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// Author block of a source record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A raw article or question as returned by the Q&A API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceRecord {
    pub article_id: Option<RecordId>,
    pub question_id: Option<RecordId>,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub owner: Option<Owner>,
    pub score: Option<i64>,
    pub creation_date: Option<i64>,
    pub link: Option<String>,
    /// Raw HTML body.
    pub body: String,
    pub answers: Vec<SourceAnswer>,
}

impl SourceRecord {
    /// The identifier matching `kind`, if present.
    pub fn id(&self, kind: RecordKind) -> Option<&RecordId> {
        match kind {
            RecordKind::Article => self.article_id.as_ref(),
            RecordKind::Question => self.question_id.as_ref(),
        }
    }

    fn author(&self) -> Option<String> {
        self.owner.as_ref().and_then(|o| o.display_name.clone())
    }
}

/// A raw answer attached to a question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceAnswer {
    pub owner: Option<Owner>,
    pub score: Option<i64>,
    pub creation_date: Option<i64>,
    pub is_accepted: bool,
    pub body: String,
}

/// Clean record written to disk for downstream indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub author: Option<String>,
    pub score: Option<i64>,
    pub created: Option<i64>,
    pub link: Option<String>,
    pub body_markdown: String,
    /// Present for questions (possibly empty), absent for articles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<NormalizedAnswer>>,
}

/// Clean answer nested in a [`NormalizedRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAnswer {
    pub author: Option<String>,
    pub score: Option<i64>,
    pub created: Option<i64>,
    pub is_accepted: bool,
    pub body_markdown: String,
}

/// A converted wiki page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiPage {
    pub page_id: String,
    pub title: String,
    pub classifier: String,
    pub body_markdown: String,
}

/// Normalize a source record of the given kind.
pub fn normalize(record: &SourceRecord, kind: RecordKind) -> NormalizedRecord {
    match kind {
        RecordKind::Article => normalize_article(record),
        RecordKind::Question => normalize_question(record),
    }
}

/// Normalize an article. Answers are never emitted for articles.
pub fn normalize_article(record: &SourceRecord) -> NormalizedRecord {
    NormalizedRecord {
        title: record.title.clone(),
        tags: record.tags.clone(),
        author: record.author(),
        score: record.score,
        created: record.creation_date,
        link: record.link.clone(),
        body_markdown: html_to_markdown(&record.body),
        answers: None,
    }
}

/// Normalize a question and its answers, keeping answer order.
pub fn normalize_question(record: &SourceRecord) -> NormalizedRecord {
    let answers = record.answers.iter().map(normalize_answer).collect();
    NormalizedRecord {
        answers: Some(answers),
        ..normalize_article(record)
    }
}

fn normalize_answer(answer: &SourceAnswer) -> NormalizedAnswer {
    NormalizedAnswer {
        author: answer.owner.as_ref().and_then(|o| o.display_name.clone()),
        score: answer.score,
        created: answer.creation_date,
        is_accepted: answer.is_accepted,
        body_markdown: html_to_markdown(&answer.body),
    }
}
