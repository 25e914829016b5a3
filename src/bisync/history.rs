// Per-directory version history
//
// Each replica keeps, per directory, the sequence of states it has observed for
// every filename. Entries are newest-first and serialize as `[timestamp, content]`
// pairs so the metadata file stays readable by hand:
//
//     {
//         "x.txt": [
//             ["2024-03-01 10:00:00 +1200", "2cf24dba..."],
//             ["2024-02-27 08:12:40 +1200", "deleted"]
//         ]
//     }

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

/// Timestamp format in metadata files. The `+1200` is a fixed label; the clock
/// reading itself is UTC.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S +1200";

/// Literal stored in the content slot of a deletion entry.
pub const TOMBSTONE_LITERAL: &str = "deleted";

/// Wall-clock time at one-second resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Truncates sub-second precision.
    pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
        Self(datetime.trunc_subsecs(0).naive_utc())
    }

    pub fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).map(Self)
    }

    #[allow(dead_code)] // Used in tests
    pub fn unix_seconds(&self) -> i64 {
        self.0.and_utc().timestamp()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Timestamp::parse(&s).map_err(|e| {
            serde::de::Error::custom(format!("invalid timestamp '{}': {}", s, e))
        })
    }
}

/// What a history entry says about the file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Content {
    /// SHA-256 hex of the file contents
    Digest(String),
    /// The file was observed missing
    Tombstone,
}

impl Content {
    pub fn digest(&self) -> Option<&str> {
        match self {
            Content::Digest(d) => Some(d),
            Content::Tombstone => None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Content::Tombstone)
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        if s == TOMBSTONE_LITERAL {
            Content::Tombstone
        } else {
            Content::Digest(s)
        }
    }
}

impl From<Content> for String {
    fn from(content: Content) -> Self {
        match content {
            Content::Digest(d) => d,
            Content::Tombstone => TOMBSTONE_LITERAL.to_string(),
        }
    }
}

/// One observed state of a filename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(Timestamp, Content)", into = "(Timestamp, Content)")]
pub struct VersionEntry {
    pub timestamp: Timestamp,
    pub content: Content,
}

impl VersionEntry {
    pub fn digest(timestamp: Timestamp, digest: impl Into<String>) -> Self {
        Self {
            timestamp,
            content: Content::Digest(digest.into()),
        }
    }

    pub fn tombstone(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            content: Content::Tombstone,
        }
    }
}

impl From<(Timestamp, Content)> for VersionEntry {
    fn from((timestamp, content): (Timestamp, Content)) -> Self {
        Self { timestamp, content }
    }
}

impl From<VersionEntry> for (Timestamp, Content) {
    fn from(entry: VersionEntry) -> Self {
        (entry.timestamp, entry.content)
    }
}

/// Observed states of one filename, newest first. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<VersionEntry>", into = "Vec<VersionEntry>")]
pub struct FileHistory {
    entries: Vec<VersionEntry>,
}

impl FileHistory {
    pub fn new(first: VersionEntry) -> Self {
        Self {
            entries: vec![first],
        }
    }

    /// Most recently observed state
    pub fn head(&self) -> &VersionEntry {
        &self.entries[0]
    }

    /// Everything before the head, newest first
    pub fn past(&self) -> &[VersionEntry] {
        &self.entries[1..]
    }

    #[allow(dead_code)] // Used in tests
    pub fn entries(&self) -> &[VersionEntry] {
        &self.entries
    }

    #[allow(dead_code)] // Used in tests
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_deleted(&self) -> bool {
        self.head().content.is_tombstone()
    }

    /// Record a newly observed state.
    ///
    /// Returns false (and records nothing) when the content matches the head.
    /// A timestamp older than the head is raised to the head's timestamp so the
    /// history stays non-increasing when read newest-first.
    pub fn record(&mut self, timestamp: Timestamp, content: Content) -> bool {
        let head = self.head();
        if head.content == content {
            return false;
        }
        let timestamp = timestamp.max(head.timestamp);
        self.entries.insert(0, VersionEntry { timestamp, content });
        true
    }

    /// Whether `digest` appears anywhere behind the head.
    pub fn superseded(&self, digest: &str) -> bool {
        self.past()
            .iter()
            .any(|entry| entry.content.digest() == Some(digest))
    }

    /// Whether `content` was observed at some point before the head.
    ///
    /// Content only: timestamps of copied-in entries may have been raised by
    /// `record`, so they can't be compared with the other replica's mtimes.
    pub fn has_seen(&self, content: &Content) -> bool {
        self.past().iter().any(|entry| &entry.content == content)
    }
}

impl TryFrom<Vec<VersionEntry>> for FileHistory {
    type Error = String;

    fn try_from(entries: Vec<VersionEntry>) -> Result<Self, Self::Error> {
        if entries.is_empty() {
            return Err("file history must contain at least one entry".to_string());
        }
        Ok(Self { entries })
    }
}

impl From<FileHistory> for Vec<VersionEntry> {
    fn from(history: FileHistory) -> Self {
        history.entries
    }
}

/// Histories of every filename one replica has seen in one directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirectoryHistory {
    files: BTreeMap<String, FileHistory>,
}

impl DirectoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FileHistory> {
        self.files.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FileHistory> {
        self.files.get_mut(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, history: FileHistory) {
        self.files.insert(name.into(), history);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FileHistory> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[allow(dead_code)] // Used in tests
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Parse metadata file contents. Blank input is an empty history.
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_str(content)
    }

    /// Render as four-space indented JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        buf.push(b'\n');
        Ok(buf)
    }
}
