//! Pure text helpers for statement chains.
//!
//! A statement such as `$Entity[2].open(1, "a").x` is a chain of segments
//! separated by `.` or `:`. Separators inside quotes or parentheses belong to
//! the segment they appear in.

/// One link of a statement chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Property or root name, e.g. `Health`, `$Entity[1]`, `_`.
    Accessor(String),
    /// Function call including its parameter list, e.g. `move(2)`.
    Call(String),
}

impl Segment {
    fn from_fragment(fragment: &str) -> Self {
        let fragment = fragment.trim().to_string();
        if !fragment.starts_with('"') && fragment.contains('(') {
            Self::Call(fragment)
        } else {
            Self::Accessor(fragment)
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Accessor(s) | Self::Call(s) => s,
        }
    }
}

/// Tracks quote and bracket nesting while scanning a line.
#[derive(Debug, Default)]
struct Scanner {
    depth: i32,
    in_quote: bool,
}

impl Scanner {
    /// Feed one character; returns whether it sits at top level (outside
    /// quotes and brackets) before nesting is updated.
    fn feed(&mut self, ch: char) -> bool {
        if ch == '"' {
            self.in_quote = !self.in_quote;
            return false;
        }
        if self.in_quote {
            return false;
        }
        let top = self.depth == 0;
        match ch {
            '(' | '[' => self.depth += 1,
            ')' | ']' => self.depth -= 1,
            _ => {}
        }
        top
    }
}

/// Split a statement into chain segments. The final fragment is always
/// emitted, so a trailing separator yields an empty accessor.
pub fn tokenize(statement: &str) -> Vec<Segment> {
    let statement = statement.trim();
    if statement.is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut scanner = Scanner::default();
    let mut start = 0;
    for (i, ch) in statement.char_indices() {
        if scanner.feed(ch) && (ch == '.' || ch == ':') {
            segments.push(Segment::from_fragment(&statement[start..i]));
            start = i + ch.len_utf8();
        }
    }
    segments.push(Segment::from_fragment(&statement[start..]));
    segments
}

/// Text of `statement` up to and including segment `index`.
pub fn chain_prefix(statement: &str, index: usize) -> &str {
    let statement = statement.trim();
    let mut scanner = Scanner::default();
    let mut seen = 0;
    for (i, ch) in statement.char_indices() {
        if scanner.feed(ch) && (ch == '.' || ch == ':') {
            if seen == index {
                return statement[..i].trim_end();
            }
            seen += 1;
        }
    }
    statement
}

/// Split `name(args)` into the trimmed name and the raw argument text.
pub fn split_call(text: &str) -> Option<(&str, &str)> {
    let text = text.trim();
    let open = text.find('(')?;
    let inner = text.strip_suffix(')')?;
    if inner.len() < open + 1 {
        return None;
    }
    Some((text[..open].trim(), &inner[open + 1..]))
}

/// Split raw argument text on top-level commas. Empty parameters are dropped.
pub fn split_params(raw: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut scanner = Scanner::default();
    let mut start = 0;
    for (i, ch) in raw.char_indices() {
        if scanner.feed(ch) && ch == ',' {
            params.push(raw[start..i].trim());
            start = i + 1;
        }
    }
    params.push(raw[start..].trim());
    params.retain(|p| !p.is_empty());
    params
}

/// Arithmetic operators in the order they are tried.
pub const ARITHMETIC_OPERATORS: [char; 4] = ['+', '-', '*', '/'];

/// Split an expression on the first arithmetic operator (in
/// [`ARITHMETIC_OPERATORS`] order) that occurs at top level. A `-` with no
/// operand before it is a sign, not an operator.
pub fn split_arithmetic(text: &str) -> Option<(char, Vec<&str>)> {
    for op in ARITHMETIC_OPERATORS {
        let mut scanner = Scanner::default();
        let mut cuts = Vec::new();
        let mut previous: Option<char> = None;
        for (i, ch) in text.char_indices() {
            let top = scanner.feed(ch);
            if top && ch == op {
                let unary = op == '-'
                    && previous.is_none_or(|p| ARITHMETIC_OPERATORS.contains(&p) || p == ',' || p == '(');
                if !unary {
                    cuts.push(i);
                }
            }
            if !ch.is_whitespace() {
                previous = Some(ch);
            }
        }
        if cuts.is_empty() {
            continue;
        }

        let mut operands = Vec::with_capacity(cuts.len() + 1);
        let mut start = 0;
        for cut in cuts {
            operands.push(text[start..cut].trim());
            start = cut + 1;
        }
        operands.push(text[start..].trim());
        return Some((op, operands));
    }
    None
}

/// Split `NAME = EXPR` on the first top-level `=` that is not part of a
/// comparison operator.
pub fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let bytes = line.as_bytes();
    let mut scanner = Scanner::default();
    for (i, ch) in line.char_indices() {
        if !scanner.feed(ch) || ch != '=' {
            continue;
        }
        let before = i.checked_sub(1).map(|j| bytes[j]);
        let after = bytes.get(i + 1).copied();
        let comparison = matches!(before, Some(b'=' | b'!' | b'<' | b'>')) || after == Some(b'=');
        if !comparison {
            return Some((line[..i].trim(), line[i + 1..].trim()));
        }
    }
    None
}

/// Whether `name` is a valid variable name.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acc(s: &str) -> Segment {
        Segment::Accessor(s.into())
    }

    fn call(s: &str) -> Segment {
        Segment::Call(s.into())
    }

    #[test]
    fn tokenize_chain() {
        assert_eq!(
            tokenize("$Entity[2].open(1, \"a.b\").x"),
            vec![acc("$Entity[2]"), call("open(1, \"a.b\")"), acc("x")]
        );
    }

    #[test]
    fn tokenize_authority_prefix() {
        assert_eq!(tokenize("_:move(a.x, 1, 2, 3)"), vec![acc("_"), call("move(a.x, 1, 2, 3)")]);
    }

    #[test]
    fn tokenize_keeps_separators_inside_quotes() {
        assert_eq!(tokenize("log(\"a:b.c\")"), vec![call("log(\"a:b.c\")")]);
        assert_eq!(tokenize("\"x.y\""), vec![acc("\"x.y\"")]);
    }

    #[test]
    fn tokenize_trailing_separator_emits_empty() {
        assert_eq!(tokenize("get()."), vec![call("get()"), acc("")]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn tokenize_quoted_paren_is_literal() {
        assert_eq!(tokenize("\"a(b\""), vec![acc("\"a(b\"")]);
    }

    #[test]
    fn chain_prefix_cuts_after_segment() {
        let s = "$Entity[2].friend(1, 2).Health";
        assert_eq!(chain_prefix(s, 0), "$Entity[2]");
        assert_eq!(chain_prefix(s, 1), "$Entity[2].friend(1, 2)");
        assert_eq!(chain_prefix(s, 2), s);
        assert_eq!(chain_prefix(" get() ", 0), "get()");
    }

    #[test]
    fn split_call_parts() {
        assert_eq!(split_call("move(1, 2)"), Some(("move", "1, 2")));
        assert_eq!(split_call("get()"), Some(("get", "")));
        assert_eq!(split_call("f(g(1))"), Some(("f", "g(1)")));
        assert_eq!(split_call("broken(1"), None);
    }

    #[test]
    fn split_params_respects_nesting() {
        assert_eq!(split_params("1, f(2, 3), \"a,b\""), vec!["1", "f(2, 3)", "\"a,b\""]);
        assert!(split_params("").is_empty());
        assert_eq!(split_params(" x ,"), vec!["x"]);
    }

    #[test]
    fn arithmetic_split_order() {
        assert_eq!(split_arithmetic("1 + 2 * 3"), Some(('+', vec!["1", "2 * 3"])));
        assert_eq!(split_arithmetic("8 - 2 - 1"), Some(('-', vec!["8", "2", "1"])));
        assert_eq!(split_arithmetic("a * b"), Some(('*', vec!["a", "b"])));
        assert_eq!(split_arithmetic("9 / 3"), Some(('/', vec!["9", "3"])));
    }

    #[test]
    fn arithmetic_ignores_quotes_calls_and_signs() {
        assert_eq!(split_arithmetic("\"a-b\""), None);
        assert_eq!(split_arithmetic("f(1 + 2)"), None);
        assert_eq!(split_arithmetic("-5"), None);
        assert_eq!(split_arithmetic("3 * -2"), Some(('*', vec!["3", "-2"])));
        assert_eq!(split_arithmetic("$Entity[1]"), None);
    }

    #[test]
    fn assignment_split_skips_comparisons() {
        assert_eq!(split_assignment("x = 5"), Some(("x", "5")));
        assert_eq!(split_assignment("x = y == 1"), Some(("x", "y == 1")));
        assert_eq!(split_assignment("a != b"), None);
        assert_eq!(split_assignment("a <= b"), None);
        assert_eq!(split_assignment("log(\"a=b\")"), None);
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("_param0"));
        assert!(is_identifier("health"));
        assert!(!is_identifier("0x"));
        assert!(!is_identifier("a.b"));
        assert!(!is_identifier(""));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn tokenize_recovers_plain_segments(
                parts in proptest::collection::vec("[a-zA-Z_][a-zA-Z0-9_]{0,8}", 1..6)
            ) {
                let statement = parts.join(".");
                let segments = tokenize(&statement);
                prop_assert_eq!(segments.len(), parts.len());
                for (segment, part) in segments.iter().zip(&parts) {
                    prop_assert_eq!(segment.text(), part.as_str());
                }
            }

            #[test]
            fn quoted_text_never_splits(body in "[a-z.:, ()+*/-]{0,12}") {
                let literal = format!("\"{body}\"");
                prop_assert_eq!(tokenize(&literal).len(), 1);
                prop_assert_eq!(split_params(&literal), vec![literal.as_str()]);
                prop_assert!(split_arithmetic(&literal).is_none());
            }
        }
    }
}
