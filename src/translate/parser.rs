//! Completion parsing.
//!
//! Completions are expected to carry two labelled fields (`SQL:` and an
//! explanation label), but models drift: the parser degrades from a clean
//! split through a per-line scan to a label-free fallback in which the raw
//! completion becomes the explanation.

use super::prompt::{EXPLANATION_LABELS, SQL_LABEL};
use super::Translation;

/// Returns the byte offset and label of the first explanation label present.
fn find_explanation_label(content: &str) -> Option<(usize, &'static str)> {
    EXPLANATION_LABELS
        .iter()
        .filter_map(|label| content.find(label).map(|idx| (idx, *label)))
        .min_by_key(|(idx, _)| *idx)
}

/// Strips Markdown code-fence markers from a SQL field.
fn strip_fences(sql: &str) -> String {
    sql.replace("```sql", "").replace("```", "").trim().to_string()
}

/// Parses a completion into a [`Translation`].
///
/// Strategy, in order:
///
/// 1. Both labels present: split once on the explanation label; everything
///    before it, stripped of the `SQL:` label, is the SQL field.
/// 2. Per-line scan for either label (last matching line wins).
/// 3. No SQL field found: empty SQL, the raw completion as explanation —
///    a valid terminal outcome, not an error.
#[must_use]
pub fn parse_completion(content: &str) -> Translation {
    let mut sql = String::new();
    let mut explanation = String::new();
    let mut found_sql = false;

    if content.contains(SQL_LABEL) {
        if let Some((idx, label)) = find_explanation_label(content) {
            let sql_part = &content[..idx];
            sql = sql_part.replace(SQL_LABEL, "").trim().to_string();
            explanation = content[idx + label.len()..].trim().to_string();
            found_sql = true;
        }
    }

    if !found_sql {
        for line in content.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix(SQL_LABEL) {
                sql = rest.trim().to_string();
                found_sql = true;
            } else if let Some(rest) =
                EXPLANATION_LABELS.iter().find_map(|l| line.strip_prefix(l))
            {
                explanation = rest.trim().to_string();
            }
        }
    }

    if !found_sql {
        return Translation {
            sql: String::new(),
            explanation: content.trim().to_string(),
        };
    }

    Translation {
        sql: strip_fences(&sql),
        explanation,
    }
}
