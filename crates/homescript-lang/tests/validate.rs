// homescript-lang/tests/validate.rs
// ============================================================================
// Test Module: Static Validator
// Coverage: Placement, block balance, labels, BREAK/TEST shape checks.
// ============================================================================

//! ## Overview
//! Integration tests for the static validator.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions."
)]

use homescript_lang::validate;

/// Asserts that some diagnostic on `line` contains `needle`.
fn assert_diagnostic(source: &str, line: u32, needle: &str) {
    let diagnostics = validate(source);
    assert!(
        diagnostics
            .iter()
            .any(|d| d.line == line && d.message.contains(needle)),
        "expected a diagnostic on line {line} containing {needle:?}, got {diagnostics:?}"
    );
}

#[test]
fn clean_scripts_produce_no_diagnostics() {
    let source = concat!(
        "REQUIRED $mode\n",
        "OPTIONAL $level = 1\n",
        "# comment\n",
        "IF $mode = \"night\"\n",
        "  PRINT \"night\"\n",
        "ELSE\n",
        "  PRINT \"day\"\n",
        "END_IF\n",
    );
    assert!(validate(source).is_empty());
}

#[test]
fn declarations_after_statements_are_flagged() {
    let source = "PRINT \"x\"\nREQUIRED $mode\n";
    assert_diagnostic(source, 2, "REQUIRED/OPTIONAL must be at the top of script");
}

#[test]
fn declarations_after_comments_and_blanks_are_fine() {
    let source = "# header\n\nREQUIRED $mode\nOPTIONAL $x\nPRINT $mode\n";
    assert!(validate(source).is_empty());
}

#[test]
fn malformed_required_is_flagged() {
    assert_diagnostic("REQUIRED mode\n", 1, "Malformed REQUIRED");
    assert_diagnostic("REQUIRED $mode = 5\n", 1, "defaults are not allowed");
}

#[test]
fn missing_terminator_reports_opener_line() {
    let source = "SET $x = 1\nWHILE $x < 3 DO\nSET $x = $x + 1\n";
    assert_diagnostic(source, 2, "Missing END_WHILE");
}

#[test]
fn stray_terminator_reports_its_own_line() {
    assert_diagnostic("PRINT 1\nEND_IF\n", 2, "END_IF without matching opener");
    assert_diagnostic("END_WHILE\n", 1, "END_WHILE without matching opener");
}

#[test]
fn mismatched_terminators_are_flagged() {
    let source = "IF TRUE\nPRINT 1\nEND_WHILE\n";
    let diagnostics = validate(source);
    assert!(diagnostics.iter().any(|d| d.line == 3));
    assert!(diagnostics.iter().any(|d| d.line == 1));
}

#[test]
fn duplicate_labels_are_flagged() {
    let source = "LABEL here\nPRINT 1\nLABEL here\n";
    assert_diagnostic(source, 3, "Duplicate label 'here'");
}

#[test]
fn goto_unknown_label_is_flagged() {
    assert_diagnostic("GOTO missing\n", 1, "GOTO to unknown label: missing");
}

#[test]
fn malformed_label_and_goto_are_flagged() {
    assert_diagnostic("LABEL two words\n", 1, "Malformed LABEL");
    assert_diagnostic("GOTO $x\n", 1, "Malformed GOTO");
}

#[test]
fn break_requires_three_digit_code() {
    assert_diagnostic("BREAK 42\n", 1, "Malformed BREAK");
    assert_diagnostic("BREAK abc\n", 1, "Malformed BREAK");
    assert!(validate("WHILE TRUE DO\nBREAK\nEND_WHILE\n").is_empty());
    assert!(validate("BREAK 404 \"gone\"\n").is_empty());
}

#[test]
fn test_statement_requires_regex_literal() {
    assert_diagnostic("TEST $a $b\n", 1, "Malformed TEST");
    assert_diagnostic("TEST /unterminated $x\n", 1, "Malformed TEST");
    assert!(validate("TEST /^a$/ $x INTO $ok\n").is_empty());
}

#[test]
fn every_diagnostic_line_is_in_range() {
    let source = "PRINT \"x\"\nREQUIRED $late\nEND_IF\nGOTO gone\nBREAK 9\n";
    let total = u32::try_from(source.lines().count()).unwrap();
    for diagnostic in validate(source) {
        assert!(diagnostic.line >= 1 && diagnostic.line <= total);
    }
}

#[test]
fn invalid_keyword_is_reported() {
    assert_diagnostic("WIBBLE 1\n", 1, "Invalid keyword: WIBBLE");
}
