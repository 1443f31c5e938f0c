//! SQL Extractor
//!
//! Pulls a single candidate statement out of free-form LLM text. Models wrap SQL in
//! markdown fences, JSON objects or chatty prose; none of that is trusted.

use lazy_static::lazy_static;
use regex::Regex;

/// Strategy for locating candidate SQL in raw model output.
pub trait SqlExtractor: Send + Sync {
    /// `None` when nothing that looks like a statement is present.
    fn extract(&self, raw: &str) -> Option<String>;
}

lazy_static! {
    static ref FENCE: Regex = Regex::new(r"(?s)```(.*?)```").expect("valid fence regex");
    static ref STATEMENT_START: Regex =
        Regex::new(r"(?i)^(SELECT|INSERT|UPDATE|DELETE|WITH)\b").expect("valid keyword regex");
    // WITH only counts when followed by a CTE header, so prose like "with a join" is skipped.
    static ref KEYWORD_UPPER: Regex = Regex::new(
        r"\b(SELECT|INSERT\s+INTO|UPDATE|DELETE\s+FROM|WITH\s+(?:RECURSIVE\s+)?\w+\s*(?:\(|AS\b))"
    )
    .expect("valid keyword regex");
    static ref KEYWORD_ANY_CASE: Regex = Regex::new(
        r"(?i)\b(SELECT|INSERT\s+INTO|UPDATE|DELETE\s+FROM|WITH\s+(?:RECURSIVE\s+)?\w+\s*(?:\(|AS\b))"
    )
    .expect("valid keyword regex");
}

/// Fence-first, then keyword-scan extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicExtractor;

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self
    }

    fn from_json(raw: &str) -> Option<String> {
        let start = raw.find('{')?;
        let end = raw.rfind('}')?;
        if end <= start {
            return None;
        }
        let value: serde_json::Value = serde_json::from_str(&raw[start..=end]).ok()?;
        let sql = value.get("sql").or_else(|| value.get("query"))?.as_str()?;
        Some(sql.to_string())
    }

    fn from_fences(raw: &str) -> Option<String> {
        FENCE
            .captures_iter(raw)
            .filter_map(|caps| caps.get(1))
            .map(|body| strip_info_string(body.as_str()))
            .find(|body| STATEMENT_START.is_match(body))
            .map(|body| body.trim().to_string())
    }

    fn from_free_text(raw: &str) -> Option<String> {
        // Upper-case keywords are far more likely to be SQL than prose.
        let start = KEYWORD_UPPER
            .find(raw)
            .or_else(|| KEYWORD_ANY_CASE.find(raw))?
            .start();
        let rest = &raw[start..];
        let end = statement_end(rest).unwrap_or(rest.len());
        let sql = rest[..end].trim();
        (!sql.is_empty()).then(|| sql.to_string())
    }
}

impl SqlExtractor for HeuristicExtractor {
    fn extract(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let unwrapped = Self::from_json(raw);
        let text = unwrapped.as_deref().unwrap_or(raw);

        // Once the model used fences, only a fenced statement counts.
        if FENCE.is_match(text) {
            return Self::from_fences(text).filter(|sql| !sql.is_empty());
        }
        Self::from_free_text(&text.replace("```", "\n"))
    }
}

/// Drops a fence info string such as `sql` or `postgresql`, whether it sits on its own
/// line or directly in front of the statement.
fn strip_info_string(body: &str) -> &str {
    let body = body.trim_start_matches([' ', '\t']);
    if STATEMENT_START.is_match(body) {
        return body;
    }
    if let Some((first_line, rest)) = body.split_once('\n') {
        let info = first_line.trim();
        if !info.contains(char::is_whitespace) {
            return rest.trim_start();
        }
    }
    match body.split_once(char::is_whitespace) {
        Some((word, rest)) if is_language_tag(word) => rest.trim_start(),
        _ => body,
    }
}

fn is_language_tag(word: &str) -> bool {
    matches!(
        word.to_lowercase().as_str(),
        "sql" | "postgresql" | "postgres" | "psql" | "pgsql" | "mysql" | "sqlite" | "tsql" | "plsql"
    )
}

/// Byte offset just past the first `;` outside quotes.
fn statement_end(sql: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (idx, c) in sql.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                ';' => return Some(idx + 1),
                _ => {}
            },
        }
    }
    None
}
