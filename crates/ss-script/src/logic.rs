//! Boolean conditions for `if` lines.
//!
//! A condition is a space separated list of comparisons joined by `and` /
//! `or`. Both joiners have the same precedence and apply left to right.
//! Grouping is written by gluing `(` to the front of a left operand and `)`
//! to the end of a right operand.

use std::collections::HashMap;
use std::fmt;

use crate::error::ScriptError;
use crate::value::Value;

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn parse(text: &str) -> Option<Self> {
        Some(match text {
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            _ => return None,
        })
    }

    /// Compare two evaluated operands. `==` and `!=` compare literal text;
    /// ordering requires integers on both sides.
    pub fn apply(self, lhs: &Value, rhs: &Value) -> Result<bool, ScriptError> {
        Ok(match self {
            Self::Eq => lhs.literal() == rhs.literal(),
            Self::Ne => lhs.literal() != rhs.literal(),
            Self::Lt => int(lhs)? < int(rhs)?,
            Self::Le => int(lhs)? <= int(rhs)?,
            Self::Gt => int(lhs)? > int(rhs)?,
            Self::Ge => int(lhs)? >= int(rhs)?,
        })
    }
}

fn int(value: &Value) -> Result<i64, ScriptError> {
    value
        .as_int()
        .ok_or_else(|| ScriptError::NotANumber(value.literal()))
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joiner {
    And,
    Or,
}

fn combine(lhs: bool, joiner: Option<Joiner>, rhs: bool) -> bool {
    match joiner {
        Some(Joiner::And) => lhs && rhs,
        Some(Joiner::Or) => lhs || rhs,
        // Two comparisons without a joiner: the later one is ignored.
        None => lhs,
    }
}

/// Evaluate a condition. `compare` receives the raw operand texts (parens
/// stripped) and the parsed operator, and evaluates one comparison.
///
/// The operator of each comparison is validated before its operands are
/// handed to `compare`.
pub fn evaluate<E, F>(condition: &str, mut compare: F) -> Result<bool, E>
where
    E: From<ScriptError>,
    F: FnMut(&str, Comparison, &str) -> Result<bool, E>,
{
    let words: Vec<&str> = condition.split(' ').filter(|w| !w.is_empty()).collect();
    if words.is_empty() {
        return Err(ScriptError::InvalidCondition(condition.to_string()).into());
    }

    let mut depth: i32 = 0;
    let mut last_depth: i32 = -1;
    let mut joiner: Option<Joiner> = None;
    let mut master: Option<bool> = None;
    let mut store: HashMap<i32, (bool, Option<Joiner>)> = HashMap::new();

    let mut i = 0;
    while i < words.len() {
        let word = words[i];
        match word {
            "and" => {
                joiner = Some(Joiner::And);
                i += 1;
                continue;
            }
            "or" => {
                joiner = Some(Joiner::Or);
                i += 1;
                continue;
            }
            _ => {}
        }

        let (Some(op_text), Some(rhs_word)) = (words.get(i + 1), words.get(i + 2)) else {
            return Err(ScriptError::InvalidCondition(condition.to_string()).into());
        };
        i += 3;

        let mut lhs = word;
        while let Some(rest) = lhs.strip_prefix('(') {
            depth += 1;
            lhs = rest.trim();
        }
        let mut rhs = *rhs_word;
        while let Some(rest) = rhs.strip_suffix(')') {
            depth -= 1;
            rhs = rest.trim();
        }

        let op = Comparison::parse(op_text)
            .ok_or_else(|| ScriptError::UnknownOperator((*op_text).to_string()))?;
        let result = compare(lhs, op, rhs)?;

        master = Some(match master {
            None => result,
            Some(current) if depth > last_depth => {
                store.insert(last_depth, (current, joiner));
                result
            }
            Some(current) if depth < last_depth => {
                let inner = combine(current, joiner, result);
                match store.remove(&depth) {
                    Some((outer, outer_joiner)) => {
                        joiner = outer_joiner;
                        combine(outer, outer_joiner, inner)
                    }
                    None => inner,
                }
            }
            Some(current) => combine(current, joiner, result),
        });
        last_depth = depth;
    }

    master.ok_or_else(|| ScriptError::InvalidCondition(condition.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Evaluate with integer-literal operands only.
    fn eval(condition: &str) -> Result<bool, ScriptError> {
        evaluate(condition, |lhs, op, rhs| {
            let a = Value::parse_literal(lhs).unwrap_or_else(|| Value::Text(lhs.into()));
            let b = Value::parse_literal(rhs).unwrap_or_else(|| Value::Text(rhs.into()));
            op.apply(&a, &b)
        })
    }

    #[test]
    fn single_comparisons() {
        assert!(eval("1 == 1").unwrap());
        assert!(eval("1 != 2").unwrap());
        assert!(eval("1 < 2").unwrap());
        assert!(eval("2 <= 2").unwrap());
        assert!(!eval("1 > 2").unwrap());
        assert!(eval("3 >= 2").unwrap());
    }

    #[test]
    fn textual_equality() {
        assert!(eval("\"a\" == \"a\"").unwrap());
        assert!(!eval("\"1\" == 1").unwrap());
    }

    #[test]
    fn ordering_needs_numbers() {
        let err = eval("\"a\" < 2").unwrap_err();
        assert!(matches!(err, ScriptError::NotANumber(_)));
    }

    #[test]
    fn left_to_right_without_precedence() {
        // Conventional precedence would give true || (true && false) = true.
        assert!(!eval("1 == 1 or 1 == 1 and 1 == 2").unwrap());
        assert!(eval("1 == 2 and 1 == 1 or 1 == 1").unwrap());
    }

    #[test]
    fn grouping_restores_outer_joiner() {
        assert!(eval("1 == 1 and (1 == 2 or 2 == 2)").unwrap());
        assert!(!eval("1 == 2 and (1 == 1 or 2 == 2)").unwrap());
        assert!(eval("(1 == 2 or 2 == 2) and 3 == 3").unwrap());
        assert!(!eval("(1 == 1 or 2 == 2) and 3 == 4").unwrap());
    }

    #[test]
    fn nested_groups() {
        assert!(eval("1 == 2 or (1 == 1 and (2 == 3 or 3 == 3))").unwrap());
    }

    #[test]
    fn unknown_operator_is_rejected_before_operands() {
        let mut called = false;
        let err = evaluate::<ScriptError, _>("1 =< 2", |_, _, _| {
            called = true;
            Ok(true)
        })
        .unwrap_err();
        assert_eq!(err, ScriptError::UnknownOperator("=<".into()));
        assert!(!called);
    }

    #[test]
    fn incomplete_conditions() {
        assert!(matches!(eval("1 =="), Err(ScriptError::InvalidCondition(_))));
        assert!(matches!(eval(""), Err(ScriptError::InvalidCondition(_))));
        assert!(matches!(eval("and"), Err(ScriptError::InvalidCondition(_))));
    }

    #[test]
    fn extra_spaces_are_ignored() {
        assert!(eval("  1   ==  1 ").unwrap());
    }
}
