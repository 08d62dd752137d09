//! Balanced-delimiter scanning over raw route source text.
//!
//! The route sources are never parsed into a syntax tree. Instead every recognizer in
//! [`crate::syntax`] and [`crate::extractor`] is built on two primitives defined here:
//!
//! - [`match_balanced`] captures the content of a delimited group, skipping nested groups of
//!   the same kind, so a call such as `.get('/x', wrap(handler(ctx)))` is captured whole.
//! - [`split_top_level`] splits delimited content on the commas that sit at nesting depth
//!   zero, so `a(b,c),d` yields two elements.
//!
//! String literals (`'`, `"` and backtick) and comments are opaque to both: delimiters or
//! commas inside them never count.

/// Delimiter pairs understood by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `(` … `)`, call arguments
    Paren,
    /// `[` … `]`, array literals
    Square,
    /// `{` … `}`, object literals
    Curly,
}

impl Delimiter {
    pub fn open(self) -> u8 {
        match self {
            Delimiter::Paren => b'(',
            Delimiter::Square => b'[',
            Delimiter::Curly => b'{',
        }
    }

    pub fn close(self) -> u8 {
        match self {
            Delimiter::Paren => b')',
            Delimiter::Square => b']',
            Delimiter::Curly => b'}',
        }
    }
}

/// Content captured between an opening delimiter and its matching close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balanced<'a> {
    /// Text between the delimiters, exclusive of both
    pub content: &'a str,
    /// Byte offset just past the closing delimiter
    pub end: usize,
}

/// What sits at a given offset as far as scanning is concerned.
enum Opaque {
    /// Ordinary code
    Code,
    /// A string literal or comment ending just before this offset
    Skip(usize),
    /// A string literal or block comment that never terminates
    Unterminated,
}

fn opaque_at(bytes: &[u8], i: usize) -> Opaque {
    match bytes[i] {
        quote @ (b'\'' | b'"' | b'`') => {
            let mut j = i + 1;
            while j < bytes.len() {
                match bytes[j] {
                    b'\\' => j += 2,
                    b if b == quote => return Opaque::Skip(j + 1),
                    _ => j += 1,
                }
            }
            Opaque::Unterminated
        }
        b'/' if bytes.get(i + 1) == Some(&b'/') => {
            let end = bytes[i..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(bytes.len(), |p| i + p);
            Opaque::Skip(end)
        }
        b'/' if bytes.get(i + 1) == Some(&b'*') => {
            match bytes[i + 2..].windows(2).position(|w| w == b"*/") {
                Some(p) => Opaque::Skip(i + 2 + p + 2),
                None => Opaque::Unterminated,
            }
        }
        _ => Opaque::Code,
    }
}

/// Captures the content of a delimited group.
///
/// `start` is the offset immediately after the opening delimiter. Returns `None` when the
/// text ends before the group closes (or inside a string literal), which callers treat as
/// "declaration not recognized".
pub fn match_balanced(text: &str, start: usize, delimiter: Delimiter) -> Option<Balanced<'_>> {
    let bytes = text.as_bytes();
    if start > bytes.len() {
        return None;
    }

    let mut depth = 1usize;
    let mut i = start;
    while i < bytes.len() {
        match opaque_at(bytes, i) {
            Opaque::Skip(next) => {
                i = next;
                continue;
            }
            Opaque::Unterminated => return None,
            Opaque::Code => {}
        }

        let b = bytes[i];
        if b == delimiter.open() {
            depth += 1;
        } else if b == delimiter.close() {
            depth -= 1;
            if depth == 0 {
                return Some(Balanced {
                    content: text.get(start..i)?,
                    end: i + 1,
                });
            }
        }
        i += 1;
    }

    None
}

/// Splits delimited content on commas at nesting depth zero.
///
/// All three delimiter kinds are tracked together, so commas inside calls, arrays and object
/// literals never split. Elements are trimmed and empty elements are dropped, which makes
/// empty content yield an empty vector. Returns `None` when the content itself is unbalanced.
pub fn split_top_level(content: &str) -> Option<Vec<&str>> {
    let bytes = content.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match opaque_at(bytes, i) {
            Opaque::Skip(next) => {
                i = next;
                continue;
            }
            Opaque::Unterminated => return None,
            Opaque::Code => {}
        }

        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            b',' if depth == 0 => {
                push_part(&mut parts, &content[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    if depth != 0 {
        return None;
    }
    push_part(&mut parts, &content[start..]);
    Some(parts)
}

fn push_part<'a>(parts: &mut Vec<&'a str>, raw: &'a str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        parts.push(trimmed);
    }
}

/// Iterator over the byte offsets of `text` that lie in code, outside string literals and
/// comments. Stops at an unterminated literal.
pub struct CodeOffsets<'a> {
    bytes: &'a [u8],
    i: usize,
}

impl Iterator for CodeOffsets<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.i < self.bytes.len() {
            match opaque_at(self.bytes, self.i) {
                Opaque::Skip(next) => self.i = next,
                Opaque::Unterminated => {
                    self.i = self.bytes.len();
                    return None;
                }
                Opaque::Code => {
                    let at = self.i;
                    self.i += 1;
                    return Some(at);
                }
            }
        }
        None
    }
}

/// Code offsets of `text` starting at `from`, which must itself lie in code.
pub fn code_offsets(text: &str, from: usize) -> CodeOffsets<'_> {
    CodeOffsets {
        bytes: text.as_bytes(),
        i: from,
    }
}

/// Finds the next occurrence of `needle` at or after `from` that lies in code, not inside a
/// string literal or comment.
pub fn find_code(text: &str, from: usize, needle: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    code_offsets(text, from).find(|&i| bytes[i..].starts_with(needle.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paren_balance(s: &str) -> i32 {
        s.chars().fold(0, |acc, c| match c {
            '(' => acc + 1,
            ')' => acc - 1,
            _ => acc,
        })
    }

    #[test]
    fn test_match_balanced_keeps_nested_groups() {
        let text = "get('/a', wrap(handler(ctx)), other()) rest";
        let start = text.find('(').unwrap() + 1;
        let balanced = match_balanced(text, start, Delimiter::Paren).unwrap();

        assert_eq!(balanced.content, "'/a', wrap(handler(ctx)), other()");
        assert_eq!(paren_balance(balanced.content), 0);
        assert_eq!(&text[balanced.end..], " rest");
    }

    #[test]
    fn test_match_balanced_deep_nesting_is_not_truncated() {
        for depth in 1..8 {
            let inner = format!("{}x{}", "f(".repeat(depth), ")".repeat(depth));
            let text = format!("({}, y) tail", inner);
            let balanced = match_balanced(&text, 1, Delimiter::Paren).unwrap();

            assert_eq!(balanced.content, format!("{}, y", inner));
            assert_eq!(paren_balance(balanced.content), 0);
        }
    }

    #[test]
    fn test_match_balanced_square_mode() {
        let text = "[{status: 200, schema: s.a}, [1, 2]] after";
        let balanced = match_balanced(text, 1, Delimiter::Square).unwrap();
        assert_eq!(balanced.content, "{status: 200, schema: s.a}, [1, 2]");
    }

    #[test]
    fn test_match_balanced_ignores_delimiters_in_strings_and_comments() {
        let text = "(')' + \"(\", // )\n x)";
        let balanced = match_balanced(text, 1, Delimiter::Paren).unwrap();
        assert_eq!(balanced.end, text.len());
    }

    #[test]
    fn test_match_balanced_unterminated() {
        assert!(match_balanced("(a, b(c)", 1, Delimiter::Paren).is_none());
        assert!(match_balanced("('oops)", 1, Delimiter::Paren).is_none());
        assert!(match_balanced("()", 10, Delimiter::Paren).is_none());
    }

    #[test]
    fn test_split_top_level_respects_nesting() {
        let parts = split_top_level("a(b,c),d,e(f,g(h,i))").unwrap();
        assert_eq!(parts, vec!["a(b,c)", "d", "e(f,g(h,i))"]);
    }

    #[test]
    fn test_split_top_level_arrays_objects_and_strings() {
        let parts =
            split_top_level("'/a,b', validateResponse([{status: 200, schema: s.x}]), h").unwrap();
        assert_eq!(
            parts,
            vec!["'/a,b'", "validateResponse([{status: 200, schema: s.x}])", "h"]
        );
    }

    #[test]
    fn test_split_top_level_empty_content() {
        assert!(split_top_level("").unwrap().is_empty());
        assert!(split_top_level("   ").unwrap().is_empty());
        assert_eq!(split_top_level("a, b,").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_split_top_level_unbalanced() {
        assert!(split_top_level("a), b").is_none());
        assert!(split_top_level("a(b, c").is_none());
    }

    #[test]
    fn test_find_code_skips_literals() {
        let text = "'.get(' // .get(\n x.get(";
        let found = find_code(text, 0, ".get(").unwrap();
        assert_eq!(&text[found..], ".get(");
    }
}
