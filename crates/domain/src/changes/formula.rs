//! Symbolic composition of formula fields.
//!
//! Formula fields hold dice/arithmetic expressions that a separate roller
//! evaluates later. Changes against them are composed textually so dice terms
//! and `@` references survive until roll time. All string surgery lives here,
//! behind [`compose_formula`].

use std::sync::LazyLock;

use regex_lite::{NoExpand, Regex};

use super::change::ChangeMode;

static LEADING_SIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[+-]?\s*").expect("valid regex"));
static CLOSING_PAREN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\)\s*$").expect("valid regex"));
static FUNCTION_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\(").expect("valid regex"));

/// Outcome of composing a change into a formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormulaComposition {
    /// New expression for the field
    Composed(String),
    /// Mode has no formula semantics; hand off to the custom-mode hook
    Custom,
}

/// A top-level term of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaTerm<'a> {
    Operand(&'a str),
    Operator(char),
}

/// Compose `delta` into the `current` expression under `mode`.
pub fn compose_formula(current: Option<&str>, mode: ChangeMode, delta: &str) -> FormulaComposition {
    let current = current.map(str::trim).unwrap_or_default();
    if current.is_empty() || mode == ChangeMode::Override {
        return FormulaComposition::Composed(delta.to_string());
    }

    let composed = match mode {
        ChangeMode::Add => {
            let operator = if delta.trim_start().starts_with('-') {
                '-'
            } else {
                '+'
            };
            let stripped = LEADING_SIGN_RE.replace(delta, "");
            format!("{} {} {}", current, operator, stripped.trim())
        }
        ChangeMode::Multiply => {
            if top_level_terms(current).len() > 1 {
                format!("({}) * {}", current, delta)
            } else {
                format!("{} * {}", current, delta)
            }
        }
        ChangeMode::Upgrade => clamp(current, "max", delta),
        ChangeMode::Downgrade => clamp(current, "min", delta),
        ChangeMode::Override => delta.to_string(),
        ChangeMode::Custom => return FormulaComposition::Custom,
    };
    FormulaComposition::Composed(composed)
}

/// Extend an existing `function(...)` call, or wrap the expression in a new one.
fn clamp(current: &str, function: &str, delta: &str) -> String {
    if outermost_function(current) == Some(function) {
        inject_argument(current, delta)
    } else {
        format!("{}({}, {})", function, current, delta)
    }
}

/// Append an argument before the closing parenthesis of a trailing call.
pub fn inject_argument(expression: &str, argument: &str) -> String {
    let replacement = format!(", {})", argument);
    CLOSING_PAREN_RE
        .replace(expression, NoExpand(&replacement))
        .into_owned()
}

/// Name of the function when the whole expression is a single call, e.g. `max` for
/// `max(@prof, 2)`. `max(1, 2) + 3` has no single outermost call.
pub fn outermost_function(expression: &str) -> Option<&str> {
    let expression = expression.trim();
    let terms = top_level_terms(expression);
    let [FormulaTerm::Operand(term)] = terms.as_slice() else {
        return None;
    };
    let term: &str = *term;
    let name = FUNCTION_CALL_RE.captures(term)?.get(1)?;
    let open = name.end();
    (matching_close(term, open)? == term.len() - 1).then(|| name.as_str())
}

/// Split an expression into its top-level operands and binary operators.
///
/// Parenthesised groups, function calls and flavor brackets count as one operand.
/// A sign with no operand before it is unary and belongs to the next operand.
pub fn top_level_terms(expression: &str) -> Vec<FormulaTerm<'_>> {
    let mut terms = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    let mut last_end = 0usize;

    for (index, c) in expression.char_indices() {
        match c {
            '(' | '[' | '{' => {
                depth += 1;
                start.get_or_insert(index);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                last_end = index + c.len_utf8();
            }
            '+' | '-' | '*' | '/' | '%' if depth == 0 => {
                if let Some(s) = start.take() {
                    terms.push(FormulaTerm::Operand(expression[s..last_end].trim()));
                    terms.push(FormulaTerm::Operator(c));
                } else if matches!(c, '+' | '-') {
                    start = Some(index);
                } else {
                    terms.push(FormulaTerm::Operator(c));
                }
            }
            c if c.is_whitespace() => {}
            _ => {
                start.get_or_insert(index);
                last_end = index + c.len_utf8();
            }
        }
    }
    if let Some(s) = start {
        let end = last_end.max(s + 1).min(expression.len());
        terms.push(FormulaTerm::Operand(expression[s..end].trim()));
    }
    terms
}

/// Split on `separator` where it is not nested in any bracket.
pub fn split_top_level(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (index, c) in input.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(&input[start..index]);
                start = index + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Byte index of the bracket closing the one at `open`.
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Cheap structural check: brackets balance and no operator dangles.
pub fn is_well_formed(expression: &str) -> bool {
    let mut depth = 0i32;
    for c in expression.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return false;
        }
    }
    if depth != 0 {
        return false;
    }
    let terms = top_level_terms(expression);
    !terms.is_empty()
        && matches!(terms.first(), Some(FormulaTerm::Operand(_)))
        && matches!(terms.last(), Some(FormulaTerm::Operand(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composed(current: &str, mode: ChangeMode, delta: &str) -> String {
        match compose_formula(Some(current), mode, delta) {
            FormulaComposition::Composed(s) => s,
            FormulaComposition::Custom => panic!("expected a composed formula"),
        }
    }

    #[test]
    fn counts_top_level_terms() {
        assert_eq!(top_level_terms("@prof").len(), 1);
        assert_eq!(top_level_terms("1d20 + 5").len(), 3);
        assert_eq!(top_level_terms("(1 + 2)").len(), 1);
        assert_eq!(top_level_terms("max(1, 2) * 3").len(), 3);
        assert_eq!(top_level_terms("-2").len(), 1);
        assert_eq!(top_level_terms("2d6[fire] - 1").len(), 3);
    }

    #[test]
    fn detects_outermost_function() {
        assert_eq!(outermost_function("max(@prof, 2)"), Some("max"));
        assert_eq!(outermost_function("min(max(1, 2), 3)"), Some("min"));
        assert_eq!(outermost_function("max(1, 2) + 3"), None);
        assert_eq!(outermost_function("max(1, 2) + max(3, 4)"), None);
        assert_eq!(outermost_function("(1 + 2)"), None);
        assert_eq!(outermost_function("@prof"), None);
    }

    #[test]
    fn empty_current_or_override_replaces() {
        assert_eq!(
            compose_formula(None, ChangeMode::Add, "1d4"),
            FormulaComposition::Composed("1d4".into())
        );
        assert_eq!(
            compose_formula(Some("  "), ChangeMode::Multiply, "2"),
            FormulaComposition::Composed("2".into())
        );
        assert_eq!(composed("1d20 + 5", ChangeMode::Override, "10"), "10");
    }

    #[test]
    fn add_normalizes_the_sign() {
        assert_eq!(composed("@prof", ChangeMode::Add, "2"), "@prof + 2");
        assert_eq!(composed("@prof", ChangeMode::Add, "+2"), "@prof + 2");
        assert_eq!(composed("@prof", ChangeMode::Add, "-1d4"), "@prof - 1d4");
        assert_eq!(composed("@prof", ChangeMode::Add, "- 3"), "@prof - 3");
    }

    #[test]
    fn multiply_parenthesizes_compound_expressions() {
        assert_eq!(composed("@prof", ChangeMode::Multiply, "2"), "@prof * 2");
        assert_eq!(composed("max(1, 2)", ChangeMode::Multiply, "2"), "max(1, 2) * 2");
        assert_eq!(composed("1 + @prof", ChangeMode::Multiply, "2"), "(1 + @prof) * 2");
    }

    #[test]
    fn repeated_upgrades_share_one_max_call() {
        let first = composed("@abilities.dex.mod", ChangeMode::Upgrade, "3");
        assert_eq!(first, "max(@abilities.dex.mod, 3)");
        let second = composed(&first, ChangeMode::Upgrade, "5");
        assert_eq!(second, "max(@abilities.dex.mod, 3, 5)");
    }

    #[test]
    fn repeated_downgrades_share_one_min_call() {
        let first = composed("10", ChangeMode::Downgrade, "@prof");
        let second = composed(&first, ChangeMode::Downgrade, "4");
        assert_eq!(second, "min(10, @prof, 4)");
    }

    #[test]
    fn different_outer_function_is_rewrapped() {
        assert_eq!(composed("min(1, 2)", ChangeMode::Upgrade, "3"), "max(min(1, 2), 3)");
        assert_eq!(composed("max(1, 2) + 1", ChangeMode::Upgrade, "3"), "max(max(1, 2) + 1, 3)");
    }

    #[test]
    fn custom_mode_defers_to_hook() {
        assert_eq!(
            compose_formula(Some("1"), ChangeMode::Custom, "2"),
            FormulaComposition::Custom
        );
    }

    #[test]
    fn composed_formulas_stay_well_formed() {
        let mut formula = String::from("1d20 + @prof");
        for (mode, delta) in [
            (ChangeMode::Add, "-1"),
            (ChangeMode::Multiply, "2"),
            (ChangeMode::Upgrade, "3"),
            (ChangeMode::Upgrade, "4"),
            (ChangeMode::Downgrade, "30"),
            (ChangeMode::Add, "1d4"),
        ] {
            formula = composed(&formula, mode, delta);
            assert!(is_well_formed(&formula), "{} is malformed", formula);
        }
        assert!(!is_well_formed("max(1, 2"));
        assert!(!is_well_formed("1 +"));
    }

    #[test]
    fn split_respects_nesting() {
        assert_eq!(split_top_level("max(1, 2), 3", ','), vec!["max(1, 2)", " 3"]);
        assert_eq!(split_top_level("a", ','), vec!["a"]);
    }
}
