// homescript-lang/src/lines.rs
// ============================================================================
// Module: Logical Line Reader
// Description: Physical-to-logical line mapping for HomeScript source.
// Purpose: Skip blanks/comments and join multi-line IF conditions.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Source is line-oriented: one logical line per physical line, except that
//! blank and `#`-comment lines vanish and an `IF`/`ELSE IF` condition may
//! continue across physical lines while it dangles on a logical operator or
//! the next line leads with one. Reported line numbers are always the
//! physical line of the opener.

// ============================================================================
// SECTION: Types
// ============================================================================

/// One logical source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// 1-based physical line number of the opener.
    pub number: u32,
    /// Joined statement text, trimmed.
    pub text: String,
}

/// Keywords that begin a statement and therefore stop condition joining.
pub const STATEMENT_KEYWORDS: &[&str] = &[
    "SET",
    "PRINT",
    "GET",
    "CALL",
    "IF",
    "ELSE",
    "END_IF",
    "WHILE",
    "END_WHILE",
    "FUNCTION",
    "END_FUNCTION",
    "RETURN",
    "IMPORT",
    "REQUIRED",
    "OPTIONAL",
    "LABEL",
    "GOTO",
    "BREAK",
    "CONTINUE",
    "TEST",
];

// ============================================================================
// SECTION: Reader
// ============================================================================

/// Splits source into logical lines.
#[must_use]
pub fn logical_lines(source: &str) -> Vec<LogicalLine> {
    let physical: Vec<(u32, &str)> = source
        .lines()
        .enumerate()
        .map(|(index, text)| (u32::try_from(index + 1).unwrap_or(u32::MAX), text))
        .collect();

    let mut out = Vec::new();
    let mut index = 0;
    while index < physical.len() {
        let (number, raw) = physical[index];
        let trimmed = raw.trim();
        if is_transparent(trimmed) {
            index += 1;
            continue;
        }

        let mut text = trimmed.to_string();
        if is_condition_opener(trimmed) {
            while let Some(next_index) = next_content(&physical, index + 1) {
                let next = physical[next_index].1.trim();
                let join = (ends_with_logical_op(&text) || starts_with_logical_op(next))
                    && !starts_with_keyword(next);
                if !join {
                    break;
                }
                text.push(' ');
                text.push_str(next);
                index = next_index;
            }
        }

        out.push(LogicalLine { number, text });
        index += 1;
    }
    out
}

/// Returns true for blank and comment lines.
fn is_transparent(trimmed: &str) -> bool {
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Returns the next non-transparent physical line index at or after `from`.
fn next_content(physical: &[(u32, &str)], from: usize) -> Option<usize> {
    (from..physical.len()).find(|&candidate| !is_transparent(physical[candidate].1.trim()))
}

/// Returns true when the line opens a joinable condition.
fn is_condition_opener(trimmed: &str) -> bool {
    trimmed == "IF"
        || trimmed.starts_with("IF ")
        || trimmed.starts_with("IF(")
        || trimmed == "ELSE IF"
        || trimmed.starts_with("ELSE IF ")
        || trimmed.starts_with("ELSE IF(")
}

/// Returns true when the accumulated condition dangles on a logical operator.
fn ends_with_logical_op(text: &str) -> bool {
    let trimmed = text.trim_end();
    if trimmed.ends_with("&&") || trimmed.ends_with("||") || trimmed.ends_with('!') {
        return true;
    }
    let last_word = trimmed
        .rsplit(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .next()
        .unwrap_or("");
    matches!(
        last_word.to_ascii_uppercase().as_str(),
        "AND" | "OR" | "NOT"
    )
}

/// Returns true when the line leads with a logical operator.
fn starts_with_logical_op(trimmed: &str) -> bool {
    if trimmed.starts_with("&&") || trimmed.starts_with("||") || trimmed.starts_with('!') {
        return true;
    }
    let first_word = trimmed
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .next()
        .unwrap_or("");
    matches!(
        first_word.to_ascii_uppercase().as_str(),
        "AND" | "OR" | "NOT"
    )
}

/// Returns true when the line begins with a statement keyword.
fn starts_with_keyword(trimmed: &str) -> bool {
    let first_word = trimmed.split_whitespace().next().unwrap_or("");
    STATEMENT_KEYWORDS.contains(&first_word)
}
