//! Data types for sections, chunks, and search hits.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::RagError;

/// Payload field names shared by the chunker, the stores and the payload indexes.
pub mod fields {
    /// Chunk text stored next to the vector.
    pub const TEXT: &str = "text";
    /// Path or identifier of the source document.
    pub const SOURCE: &str = "source";
    /// Title of the section the chunk was cut from.
    pub const SECTION_TITLE: &str = "section_title";
    /// Markdown heading hierarchy, `"Parent > Child"`.
    pub const HEADER_PATH: &str = "header_path";
    /// Structured manual entry identifier (e.g. `RT-04`).
    pub const RT_ID: &str = "rt_id";
    /// Structured manual entry ordinal.
    pub const NUMERO_RT: &str = "numero_rt";
    /// Structured manual entry category.
    pub const CATEGORY: &str = "category";
    /// Labels of the subsections found in a structured manual entry.
    pub const SUBSECTIONS: &str = "subsections";
    /// Kind of section the chunk came from.
    pub const CONTENT_TYPE: &str = "content_type";
}

/// The layout of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    /// Heading-delimited markdown (`#` … `######`).
    Markdown,
    /// Separator-delimited first-aid manual records (`RT-01: Title`).
    RtManual,
}

impl DocumentFormat {
    /// The identifier used in configuration and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Markdown => "markdown",
            DocumentFormat::RtManual => "rt_manual",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentFormat {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(DocumentFormat::Markdown),
            "rt_manual" | "rt-manual" | "manual" => Ok(DocumentFormat::RtManual),
            other => Err(RagError::ConfigError(format!("unknown document format '{other}'"))),
        }
    }
}

/// What a [`Section`] was parsed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SectionKind {
    /// A markdown heading block. Level 0 is the implicit section before the first heading.
    Heading {
        /// Heading depth (number of `#`).
        level: u8,
        /// Titles of the enclosing headings joined with `" > "`.
        header_path: String,
    },
    /// A structured manual record.
    ManualEntry {
        /// Record identifier from the `ID: Title` line.
        id: String,
        /// Numeric ordinal of the record.
        ordinal: i64,
        /// Category label, when the record carries one.
        category: Option<String>,
        /// Upper-case `LABEL:` blocks of the record, keyed by label.
        subsections: BTreeMap<String, String>,
    },
}

/// A logical subdivision of a document, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Heading text or record title.
    pub title: String,
    /// Body text of the section.
    pub content: String,
    /// Format-specific attributes.
    pub kind: SectionKind,
}

impl Section {
    /// Heading level for markdown sections.
    pub fn level(&self) -> Option<u8> {
        match &self.kind {
            SectionKind::Heading { level, .. } => Some(*level),
            SectionKind::ManualEntry { .. } => None,
        }
    }
}

/// Metadata attached to every [`Chunk`].
///
/// Core fields are typed; format-specific fields (`rt_id`, `numero_rt`,
/// `content_type`, …) live in `extra` and are flattened into the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Path or identifier of the source document.
    #[serde(default)]
    pub source: String,
    /// Title of the section the chunk belongs to.
    #[serde(default)]
    pub section_title: String,
    /// 0-based position of the chunk within its section.
    #[serde(default)]
    pub chunk_index: usize,
    /// Number of chunks cut from the same section.
    #[serde(default)]
    pub total_chunks: usize,
    /// Markdown heading level of the section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_level: Option<u8>,
    /// Open extension map for format-specific fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ChunkMetadata {
    /// Look up an extension field.
    pub fn get_extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Look up an extension field holding a string.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

/// The atomic retrieval unit produced by the chunker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text. Never empty.
    pub text: String,
    /// Chunk metadata.
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Stable point identifier for this chunk, see [`point_id`].
    pub fn point_id(&self) -> String {
        point_id(&self.text, &self.metadata.source, self.metadata.chunk_index)
    }

    /// Build the store payload: `text` plus all metadata fields at the top level.
    pub fn to_payload(&self) -> Map<String, Value> {
        let mut payload = match serde_json::to_value(&self.metadata) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        payload.insert(fields::TEXT.to_string(), Value::String(self.text.clone()));
        payload
    }
}

/// Namespace for chunk point ids.
const POINT_NAMESPACE: Uuid = Uuid::from_u128(0x6d65_6469_632d_7261_672d_6368_756e_6b73);

/// Deterministic point id derived from `(text, source, chunk_index)`.
///
/// Re-ingesting identical content yields identical ids, so upserts overwrite
/// instead of duplicating. The id is a name-based UUID, which every supported
/// store accepts as a point identifier.
pub fn point_id(text: &str, source: &str, chunk_index: usize) -> String {
    let mut name = Vec::with_capacity(text.len() + source.len() + 24);
    name.extend_from_slice(source.as_bytes());
    name.push(0);
    name.extend_from_slice(chunk_index.to_string().as_bytes());
    name.push(0);
    name.extend_from_slice(text.as_bytes());
    Uuid::new_v5(&POINT_NAMESPACE, &name).to_string()
}

/// A retrieved chunk with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Point identifier in the store.
    pub id: String,
    /// Chunk text from the payload.
    pub text: String,
    /// Cosine similarity, higher is more relevant.
    pub score: f32,
    /// Remaining payload fields.
    pub metadata: ChunkMetadata,
}

impl SearchHit {
    /// Unpack a store payload into text and metadata.
    pub fn from_payload(id: String, score: f32, mut payload: Map<String, Value>) -> Self {
        let text = match payload.remove(fields::TEXT) {
            Some(Value::String(text)) => text,
            _ => String::new(),
        };
        let metadata = serde_json::from_value(Value::Object(payload)).unwrap_or_default();
        Self { id, text, score, metadata }
    }
}
