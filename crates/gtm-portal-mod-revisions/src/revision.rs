/// Core revision types.
use std::fmt;
use std::str::FromStr;

use anyhow::{bail, ensure};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timestamp;

/// Tag carried by every draft, removed on publish.
pub const DRAFT_TAG: &str = "draft";

/// Summary recorded when a draft is created.
pub const DRAFT_CREATED: &str = "Draft created";

/// Summary appended when a draft is published.
pub const PUBLISHED: &str = "Published";

/// Highest version accepted from an import or the storage mirror.
///
/// Appends past this keep counting in `u32` space, leaving room for
/// billions of further revisions before the counter saturates.
pub const MAX_LOADED_VERSION: u32 = i32::MAX as u32;

/// Characters of content kept in a history preview.
const PREVIEW_CHARS: usize = 100;

/// Caller-defined key-value bag, passed through unmodified.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Classification of the versioned item. Not interpreted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionKind {
    Conversation,
    Document,
    Project,
    Strategy,
}

impl RevisionKind {
    /// Wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::Document => "document",
            Self::Project => "project",
            Self::Strategy => "strategy",
        }
    }
}

impl fmt::Display for RevisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RevisionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conversation" => Ok(Self::Conversation),
            "document" => Ok(Self::Document),
            "project" => Ok(Self::Project),
            "strategy" => Ok(Self::Strategy),
            other => bail!("Unknown revision kind: {other}"),
        }
    }
}

/// One snapshot of an item's content plus audit metadata.
///
/// Published revisions are never changed. A draft is "updated" by building
/// a new value with [`Revision::with_draft_edit`] and replacing the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub id: String,
    /// 1-based, strictly increasing within an item's list.
    pub version: u32,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: RevisionKind,
    pub author: String,
    /// Creation time, or time of the last draft edit.
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Change summary. Draft edits append to it, separated by `"; "`.
    pub changes: String,
    /// Weak back-reference used for lineage display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub is_draft: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Revision {
    /// Builds a published revision for slot `version`.
    pub fn published(
        item_id: &str,
        version: u32,
        content: String,
        kind: RevisionKind,
        author: String,
        changes: String,
        metadata: Option<Metadata>,
    ) -> Self {
        Self {
            id: format!("{item_id}-v{version}"),
            version,
            content,
            kind,
            author,
            timestamp: timestamp::now(),
            changes,
            parent_id: None,
            is_draft: false,
            tags: Vec::new(),
            metadata,
        }
    }

    /// Builds a fresh draft for slot `version`.
    pub fn draft(
        item_id: &str,
        version: u32,
        content: String,
        kind: RevisionKind,
        author: String,
        metadata: Option<Metadata>,
    ) -> Self {
        let now = timestamp::now();
        Self {
            id: format!("{item_id}-draft-{}", now.timestamp_millis()),
            version,
            content,
            kind,
            author,
            timestamp: now,
            changes: DRAFT_CREATED.to_string(),
            parent_id: None,
            is_draft: true,
            tags: vec![DRAFT_TAG.to_string()],
            metadata,
        }
    }

    /// Returns a copy with new content and `changes` appended to the summary.
    pub fn with_draft_edit(&self, content: String, changes: &str, author: String) -> Self {
        Self {
            content,
            changes: format!("{}; {changes}", self.changes),
            timestamp: timestamp::now(),
            author,
            ..self.clone()
        }
    }

    /// Returns the published form of this draft.
    pub fn into_published(self, author: String) -> Self {
        Self {
            is_draft: false,
            changes: format!("{}; {PUBLISHED}", self.changes),
            timestamp: timestamp::now(),
            author,
            tags: self.tags.into_iter().filter(|t| t != DRAFT_TAG).collect(),
            ..self
        }
    }

    /// First 100 characters of the content, with `...` when truncated.
    pub fn content_preview(&self) -> String {
        let mut chars = self.content.chars();
        let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Checks the list invariants of a history read from outside the store.
///
/// Versions must start at 1 or above, strictly increase, and stay within
/// [`MAX_LOADED_VERSION`]. At most one entry may be a draft.
pub fn check_history(revisions: &[Revision]) -> anyhow::Result<()> {
    let mut previous = 0;
    for revision in revisions {
        ensure!(
            revision.version > previous,
            "Revision '{}' has version {} after version {previous}",
            revision.id,
            revision.version
        );
        previous = revision.version;
    }
    ensure!(
        previous <= MAX_LOADED_VERSION,
        "Revision version {previous} exceeds {MAX_LOADED_VERSION}"
    );
    let drafts = revisions.iter().filter(|r| r.is_draft).count();
    ensure!(drafts <= 1, "History holds {drafts} drafts");
    Ok(())
}

/// Condensed view of a revision for history listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionSummary {
    pub version: u32,
    pub author: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub changes: String,
    pub is_draft: bool,
    pub content_preview: String,
}

impl From<&Revision> for RevisionSummary {
    fn from(rev: &Revision) -> Self {
        Self {
            version: rev.version,
            author: rev.author.clone(),
            timestamp: rev.timestamp,
            changes: rev.changes.clone(),
            is_draft: rev.is_draft,
            content_preview: rev.content_preview(),
        }
    }
}
