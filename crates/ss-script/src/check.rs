//! Static checks that need no world: block structure, `var` syntax, and
//! condition shape.

use std::fmt;

use crate::error::ScriptError;
use crate::instance::{if_condition, is_comment, split_var};
use crate::logic;

/// The first problem found in a script.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    /// 1-based line number.
    pub line: usize,
    /// What is wrong with that line.
    pub error: ScriptError,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.error)
    }
}

/// Check a script without running it.
///
/// Conditions are checked for shape and operators only; their operands are
/// not evaluated.
pub fn check(source: &str) -> Result<(), Problem> {
    let mut open_blocks: Vec<usize> = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        let line = raw.trim();
        let number = index + 1;
        let fail = |error: ScriptError| Problem { line: number, error };

        if line.is_empty() || is_comment(line) {
            continue;
        }
        match line {
            "end" => {
                open_blocks
                    .pop()
                    .ok_or_else(|| fail(ScriptError::UnexpectedBlockKeyword("end")))?;
            }
            "else" => {
                if open_blocks.is_empty() {
                    return Err(fail(ScriptError::UnexpectedBlockKeyword("else")));
                }
            }
            _ => {
                if let Some(condition) = if_condition(line) {
                    logic::evaluate(condition.trim(), |_, _, _| Ok::<bool, ScriptError>(true))
                        .map_err(fail)?;
                    open_blocks.push(number);
                } else if let Some(rest) = line.strip_prefix("var ") {
                    let (_, expr) = split_var(rest).map_err(fail)?;
                    if expr.trim().is_empty() {
                        return Err(fail(ScriptError::EmptyExpression));
                    }
                }
            }
        }
    }

    match open_blocks.last() {
        Some(&line) => Err(Problem {
            line,
            error: ScriptError::UnclosedBlock,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_script_passes() {
        let source = "\
// greeter
var n = 1
if n == 1 and n < 2
log(\"one\")
else
if (n > 5 or n == 0)
log(\"never\")
end
end
exit(n)";
        assert_eq!(check(source), Ok(()));
    }

    #[test]
    fn stray_end_and_else() {
        let err = check("log(1)\nend").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.error, ScriptError::UnexpectedBlockKeyword("end"));

        let err = check("else").unwrap_err();
        assert_eq!(err.to_string(), "line 1: Unexpected 'else'");
    }

    #[test]
    fn unclosed_block_points_at_innermost_if() {
        let err = check("if 1 == 1\nif 2 == 2\nend").unwrap_err();
        assert_eq!(err.line, 1);
        let err = check("if 1 == 1\nend\nif 2 == 2").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.error, ScriptError::UnclosedBlock);
    }

    #[test]
    fn bad_var_lines() {
        assert_eq!(check("var x").unwrap_err().error, ScriptError::InvalidVariableSyntax);
        assert_eq!(check("var 1x = 2").unwrap_err().error, ScriptError::InvalidVariableSyntax);
        assert_eq!(check("var items = 2").unwrap_err().error, ScriptError::InvalidVariableSyntax);
        assert_eq!(check("var x = ").unwrap_err().error, ScriptError::EmptyExpression);
    }

    #[test]
    fn bad_conditions() {
        assert_eq!(
            check("if a <> b\nend").unwrap_err().error,
            ScriptError::UnknownOperator("<>".into())
        );
        assert!(matches!(
            check("if a ==\nend").unwrap_err().error,
            ScriptError::InvalidCondition(_)
        ));
    }
}
