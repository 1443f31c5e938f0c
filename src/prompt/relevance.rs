//! Keyword relevance filter for large schemas
//!
//! Ranks tables against the question in three tiers: exact name match, substring
//! match, then everything else in schema order.

use crate::schema::{SchemaDescription, TableDescriptor};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    Exact,
    Partial,
    Fallback,
}

/// Tables chosen for the prompt, most relevant first.
#[derive(Debug)]
pub struct RelevantSchema<'a> {
    pub tables: Vec<&'a TableDescriptor>,
    pub omitted: usize,
}

/// Pick the tables to render. The whole schema is kept, in schema order, when it already
/// fits both limits.
pub fn select_tables<'a>(
    schema: &'a SchemaDescription,
    question: &str,
    max_tables: usize,
    max_columns: usize,
) -> RelevantSchema<'a> {
    if schema.tables.len() <= max_tables && schema.column_count() <= max_columns {
        return RelevantSchema {
            tables: schema.tables.iter().collect(),
            omitted: 0,
        };
    }

    let tokens = question_tokens(question);
    let mut ranked: Vec<(MatchTier, usize, &TableDescriptor)> = schema
        .tables
        .iter()
        .enumerate()
        .map(|(idx, table)| (tier(table, &tokens), idx, table))
        .collect();
    ranked.sort_by_key(|(tier, idx, _)| (*tier, *idx));

    let mut tables = Vec::new();
    let mut columns = 0;
    for (_, _, table) in ranked {
        if tables.len() >= max_tables {
            break;
        }
        if !tables.is_empty() && columns + table.columns.len() > max_columns {
            break;
        }
        columns += table.columns.len();
        tables.push(table);
    }

    RelevantSchema {
        omitted: schema.tables.len() - tables.len(),
        tables,
    }
}

pub fn tier(table: &TableDescriptor, tokens: &BTreeSet<String>) -> MatchTier {
    let name = table.name.to_lowercase();
    let singular = singularize(&name);

    let exact = tokens.contains(&name)
        || tokens.contains(&singular)
        || table
            .column_names()
            .any(|column| tokens.contains(&column.to_lowercase()));
    if exact {
        return MatchTier::Exact;
    }

    let partial = tokens.iter().any(|token| {
        (token.len() >= 3
            && (name.contains(token.as_str())
                || table
                    .column_names()
                    .any(|column| column.to_lowercase().contains(token.as_str()))))
            || (singular.len() >= 3 && token.contains(singular.as_str()))
    });
    if partial {
        MatchTier::Partial
    } else {
        MatchTier::Fallback
    }
}

/// Lowercase alphanumeric words of the question plus their naive singular forms.
pub fn question_tokens(question: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    for word in question
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
    {
        let word = word.to_lowercase();
        let singular = singularize(&word);
        if singular != word {
            tokens.insert(singular);
        }
        tokens.insert(word);
    }
    tokens
}

fn singularize(word: &str) -> String {
    if word.len() > 4 && word.ends_with("ies") {
        format!("{}y", &word[..word.len() - 3])
    } else if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}
