//! Fuzzy search over note names and bodies.
//!
//! Each note is scored per field (name, content); matched fields combine
//! into one relevance score where lower is better:
//!
//! ```text
//! score = Π over matched fields of max(field_score, ε) ^ (weight_share * norm)
//! norm  = 1 / sqrt(token_count(field))
//! ```
//!
//! With the default 3:1 weights a name hit outranks a body hit of the same
//! quality. Results carry up to five literal line hits for display.

mod fuzzy;
mod query;

use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::catalog::{FileCatalog, FileEntry};
use crate::error::{MdrError, Result};

pub use fuzzy::{ApproximateScorer, FuzzyScorer};
use query::ParsedQuery;

/// Search tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Maximum errors per pattern character for fuzzy terms.
    pub threshold: f64,
    /// Relative weight of the file name.
    pub name_weight: f64,
    /// Relative weight of the body.
    pub content_weight: f64,
    /// Fuzzy terms shorter than this never match.
    pub min_match_chars: usize,
    /// Result cap when the caller gives none.
    pub default_limit: usize,
    /// Line hits reported per result.
    pub max_line_matches: usize,
    /// Concurrent reads while building.
    pub read_concurrency: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            name_weight: 3.0,
            content_weight: 1.0,
            min_match_chars: 2,
            default_limit: 50,
            max_line_matches: 5,
            read_concurrency: 10,
        }
    }
}

/// One literal hit inside a note body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    /// 1-based line number.
    pub line_number: u32,
    /// Trimmed line text.
    pub line_content: String,
    /// Previous, current and next line, trimmed as a block.
    pub context: String,
    /// Char offset of the hit in `line_content`.
    pub match_start: usize,
    /// Char offset one past the hit.
    pub match_end: usize,
}

/// One ranked note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Note id.
    pub file_id: String,
    /// Note name.
    pub file_name: String,
    /// Literal line hits, at most `max_line_matches`.
    pub matches: Vec<SearchMatch>,
    /// Relevance, lower is better.
    pub score: f64,
}

/// Note position in the index with its combined score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedMatch {
    /// Position in catalog order.
    pub record: usize,
    /// Combined relevance, lower is better.
    pub score: f64,
}

struct IndexedNote {
    id: String,
    name: String,
    content: String,
    name_chars: Vec<char>,
    content_chars: Vec<char>,
    name_norm: f64,
    content_norm: f64,
}

impl IndexedNote {
    fn new(id: String, name: String, content: String) -> Self {
        Self {
            name_chars: name.to_lowercase().chars().collect(),
            content_chars: content.to_lowercase().chars().collect(),
            name_norm: field_norm(&name),
            content_norm: field_norm(&content),
            id,
            name,
            content,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn field_norm(text: &str) -> f64 {
    let tokens = text.split(' ').filter(|token| !token.is_empty()).count().max(1);
    1.0 / (tokens as f64).sqrt()
}

/// Searchable snapshot of every note body.
pub struct SearchIndex {
    notes: Vec<IndexedNote>,
    options: SearchOptions,
    scorer: Arc<dyn FuzzyScorer>,
}

impl fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchIndex")
            .field("notes", &self.notes.len())
            .field("options", &self.options)
            .field("scorer", &self.scorer)
            .finish()
    }
}

impl SearchIndex {
    /// Index `(id, name, content)` triples in the given order.
    pub fn from_documents(
        documents: impl IntoIterator<Item = (String, String, String)>,
        options: SearchOptions,
    ) -> Self {
        let scorer = Arc::new(ApproximateScorer::new(options.threshold));
        Self {
            notes: documents
                .into_iter()
                .map(|(id, name, content)| IndexedNote::new(id, name, content))
                .collect(),
            options,
            scorer,
        }
    }

    /// Swap the field scorer.
    #[must_use]
    pub fn with_scorer(mut self, scorer: Arc<dyn FuzzyScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Read every catalog note (bounded concurrency) and index it.
    ///
    /// Unreadable notes are logged and left out.
    pub async fn build(catalog: &FileCatalog, files: &[FileEntry], options: SearchOptions) -> Self {
        let documents: Vec<(String, String, String)> = stream::iter(files)
            .map(|file| async move { (file, catalog.read(&file.id).await) })
            .buffered(options.read_concurrency.max(1))
            .filter_map(|(file, read)| async move {
                match read {
                    Ok(body) => Some((file.id.clone(), file.name.clone(), body.content)),
                    Err(err) => {
                        tracing::warn!(file_id = %file.id, error = %err, "skipping unreadable note");
                        None
                    }
                }
            })
            .collect()
            .await;
        tracing::debug!(notes = documents.len(), "search index built");
        Self::from_documents(documents, options)
    }

    /// Indexed note count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// Whether nothing was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Active options.
    #[must_use]
    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Every matching note, best first; ties keep catalog order.
    #[must_use]
    pub fn rank(&self, raw_query: &str) -> Vec<RankedMatch> {
        let parsed = ParsedQuery::parse(raw_query.trim());
        if parsed.is_empty() {
            return Vec::new();
        }
        let total_weight = self.options.name_weight + self.options.content_weight;
        let (name_share, content_share) = if total_weight > 0.0 {
            (
                self.options.name_weight / total_weight,
                self.options.content_weight / total_weight,
            )
        } else {
            (0.5, 0.5)
        };
        let min_chars = self.options.min_match_chars;
        let scorer = self.scorer.as_ref();

        let mut ranked: Vec<RankedMatch> = self
            .notes
            .iter()
            .enumerate()
            .filter_map(|(record, note)| {
                let name = parsed.score_field(&note.name_chars, scorer, min_chars);
                let content = parsed.score_field(&note.content_chars, scorer, min_chars);
                if name.is_none() && content.is_none() {
                    return None;
                }
                let mut score = 1.0;
                if let Some(field) = name {
                    score *= field.max(f64::EPSILON).powf(name_share * note.name_norm);
                }
                if let Some(field) = content {
                    score *= field.max(f64::EPSILON).powf(content_share * note.content_norm);
                }
                Some(RankedMatch { record, score })
            })
            .collect();
        ranked.sort_by(|a, b| a.score.total_cmp(&b.score).then(a.record.cmp(&b.record)));
        ranked
    }

    /// Top `limit` notes for `raw_query` with their line hits.
    ///
    /// A blank query returns nothing.
    #[must_use]
    pub fn search(&self, raw_query: &str, limit: usize) -> Vec<SearchResult> {
        let query = raw_query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        self.rank(query)
            .into_iter()
            .take(limit)
            .filter_map(|ranked| {
                let note = self.notes.get(ranked.record)?;
                Some(SearchResult {
                    file_id: note.id.clone(),
                    file_name: note.name.clone(),
                    matches: line_matches(&note.content, query, self.options.max_line_matches),
                    score: ranked.score,
                })
            })
            .collect()
    }
}

/// Literal case-insensitive hits of `query`, one per line, at most `max` of them.
#[must_use]
pub fn line_matches(content: &str, query: &str, max: usize) -> Vec<SearchMatch> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() || max == 0 {
        return Vec::new();
    }
    let needle_chars = needle.chars().count();
    let lines: Vec<&str> = content.split('\n').collect();
    let mut out = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        let line_content = line.trim();
        let lowered = line_content.to_lowercase();
        let Some(byte_start) = lowered.find(&needle) else {
            continue;
        };
        let match_start = lowered[..byte_start].chars().count();
        let from = index.saturating_sub(1);
        let to = (index + 2).min(lines.len());
        out.push(SearchMatch {
            line_number: u32::try_from(index + 1).unwrap_or(u32::MAX),
            line_content: line_content.to_string(),
            context: lines[from..to].join("\n").trim().to_string(),
            match_start,
            match_end: match_start + needle_chars,
        });
        if out.len() >= max {
            break;
        }
    }
    out
}

/// Validate a transport-level query parameter.
///
/// # Errors
/// Returns `MdrError::InvalidQuery` when the parameter is missing or blank.
pub fn require_query(raw: Option<&str>) -> Result<&str> {
    match raw.map(str::trim) {
        Some(query) if !query.is_empty() => Ok(query),
        _ => Err(MdrError::InvalidQuery(
            "missing query parameter `q`".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_spans_neighbor_lines_and_clips_at_edges() {
        let hits = line_matches("first hit\nmiddle\nlast HIT", "hit", 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].line_number, 1);
        assert_eq!(hits[0].context, "first hit\nmiddle");
        assert_eq!(hits[1].context, "middle\nlast HIT");
        assert_eq!((hits[1].match_start, hits[1].match_end), (5, 8));
    }

    #[test]
    fn line_hits_are_capped() {
        let body = "x\n".repeat(10);
        assert_eq!(line_matches(&body, "x", 5).len(), 5);
    }

    #[test]
    fn missing_query_is_invalid() {
        assert!(matches!(require_query(None), Err(MdrError::InvalidQuery(_))));
        assert!(matches!(require_query(Some("  ")), Err(MdrError::InvalidQuery(_))));
        assert!(matches!(require_query(Some(" intro ")), Ok("intro")));
    }
}
