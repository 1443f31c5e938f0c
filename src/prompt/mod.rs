//! Prompt Builder
//!
//! Renders the instruction + schema + question prompt, and on repair attempts the
//! previous candidate with the violations it must fix. Output depends only on the
//! inputs, so identical inputs give byte-identical prompts.

pub mod relevance;

use crate::config::CrafterConfig;
use crate::schema::{SchemaDescription, TableDescriptor};
use crate::session::Attempt;
use crate::validation::{SqlDialect, Violation};
use itertools::Itertools;
use relevance::select_tables;
use strsim::jaro_winkler;

const SUGGESTION_THRESHOLD: f64 = 0.8;
const MAX_SUGGESTIONS: usize = 3;
const MAX_ECHOED_RESPONSE_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct PromptOptions {
    pub max_tables: usize,
    pub max_columns: usize,
    pub dialect: SqlDialect,
    pub read_only: bool,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            max_tables: 25,
            max_columns: 200,
            dialect: SqlDialect::default(),
            read_only: true,
        }
    }
}

impl From<&CrafterConfig> for PromptOptions {
    fn from(config: &CrafterConfig) -> Self {
        Self {
            max_tables: config.prompt_max_tables,
            max_columns: config.prompt_max_columns,
            dialect: config.dialect,
            read_only: config.read_only,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    options: PromptOptions,
}

impl PromptBuilder {
    pub fn new(options: PromptOptions) -> Self {
        Self { options }
    }

    /// Build the prompt for the next attempt.
    ///
    /// Only the most recent attempt that got an answer from the model feeds the repair
    /// section; failed LLM calls leave the prompt as it was.
    pub fn build(&self, schema: &SchemaDescription, question: &str, attempts: &[Attempt]) -> String {
        let mut prompt_parts = Vec::new();

        prompt_parts.push(self.instructions());
        prompt_parts.push(self.schema_section(schema, question));
        prompt_parts.push(format!("### Question\n{}", question.trim()));

        if let Some(previous) = attempts.iter().rev().find(|a| a.was_answered()) {
            prompt_parts.push(repair_section(previous, schema));
        }

        prompt_parts.push("### SQL".to_string());
        prompt_parts.join("\n\n")
    }

    fn instructions(&self) -> String {
        let mut lines = vec![
            format!(
                "You are an expert {} developer. Translate the question into one SQL statement for the database schema below.",
                self.options.dialect.display_name()
            ),
            String::new(),
            "Rules:".to_string(),
            "- Use only the tables and columns listed in the schema.".to_string(),
            "- Return exactly one statement, with no comments and no explanation.".to_string(),
            "- Wrap the statement in a ```sql fenced code block.".to_string(),
        ];
        if self.options.read_only {
            lines.push("- Only read-only queries are allowed: SELECT, optionally with WITH.".to_string());
        }
        lines.join("\n")
    }

    fn schema_section(&self, schema: &SchemaDescription, question: &str) -> String {
        let relevant = select_tables(
            schema,
            question,
            self.options.max_tables,
            self.options.max_columns,
        );

        let mut lines = vec!["### Schema".to_string()];
        for table in &relevant.tables {
            lines.push(render_table(table));
        }

        let foreign_keys: Vec<String> = relevant
            .tables
            .iter()
            .flat_map(|table| {
                table.foreign_keys.iter().map(move |fk| {
                    format!(
                        "{}.{} -> {}.{}",
                        table.name, fk.column, fk.references_table, fk.references_column
                    )
                })
            })
            .collect();
        if !foreign_keys.is_empty() {
            lines.push(String::new());
            lines.push("Foreign keys:".to_string());
            lines.extend(foreign_keys.into_iter().map(|fk| format!("- {}", fk)));
        }

        if relevant.omitted > 0 {
            lines.push(String::new());
            lines.push(format!(
                "({} more tables not shown; they are unlikely to be relevant.)",
                relevant.omitted
            ));
        }
        lines.join("\n")
    }
}

fn render_table(table: &TableDescriptor) -> String {
    let columns = table
        .columns
        .iter()
        .map(|c| {
            if c.nullable {
                format!("{} {}", c.name, c.declared_type)
            } else {
                format!("{} {} NOT NULL", c.name, c.declared_type)
            }
        })
        .join(", ");
    format!("TABLE {} ({})", table.name, columns)
}

fn repair_section(previous: &Attempt, schema: &SchemaDescription) -> String {
    let mut lines = vec![format!("### Previous attempt {}", previous.number)];

    match &previous.candidate {
        Some(candidate) => {
            lines.push("Your previous SQL was:".to_string());
            lines.push(format!("```sql\n{}\n```", candidate));
        }
        None => {
            let response = previous.response.as_deref().unwrap_or_default();
            let echoed: String = response.chars().take(MAX_ECHOED_RESPONSE_CHARS).collect();
            lines.push("Your previous answer did not contain a SQL statement:".to_string());
            lines.push(echoed);
        }
    }

    lines.push("It was rejected for these reasons:".to_string());
    for violation in previous.outcome.violations() {
        lines.push(format!("- {}", violation));
        if let Some(hint) = suggestion(violation, schema) {
            lines.push(format!("  {}", hint));
        }
    }
    if previous.outcome.is_empty() && previous.candidate.is_none() {
        lines.push(format!("- {}", Violation::no_statement()));
    }

    lines.push("Correct exactly these problems and return the corrected statement.".to_string());
    lines.join("\n")
}

/// "did you mean" hint for unknown names, closest first.
fn suggestion(violation: &Violation, schema: &SchemaDescription) -> Option<String> {
    let (name, candidates): (&str, Vec<&str>) = match violation {
        Violation::UnknownTable { table } => (table.as_str(), schema.table_names().collect()),
        Violation::UnknownColumn { column, table } => {
            let scoped = table.as_deref().and_then(|t| schema.table(t));
            let candidates: Vec<&str> = match scoped {
                Some(table) => table.column_names().collect(),
                None => schema
                    .tables
                    .iter()
                    .flat_map(|t| t.column_names())
                    .collect(),
            };
            (column.as_str(), candidates)
        }
        _ => return None,
    };

    let needle = name.to_lowercase();
    let mut scored: Vec<(f64, &str)> = candidates
        .into_iter()
        .map(|candidate| (jaro_winkler(&needle, &candidate.to_lowercase()), candidate))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored.dedup_by(|a, b| a.1 == b.1);

    if scored.is_empty() {
        return None;
    }
    let names = scored
        .iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, name)| format!("\"{}\"", name))
        .join(" or ");
    Some(format!("hint: did you mean {}?", names))
}
