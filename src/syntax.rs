//! The route-source micro-grammar.
//!
//! Only a fixed vocabulary of shapes is recognized; everything else is opaque text:
//!
//! | token | shape |
//! |---|---|
//! | import statement | `import { a, b as c } from './x.ts'`, `import * as ns from './x.ts'`, `import d from './x.ts'` |
//! | router definition | `const users = new Router()` (`let`, `var` and a type annotation are accepted) |
//! | mount declaration | `.use('/users', users.routes(), users.allowedMethods())` |
//! | call | `callee(arg, ...)` where `callee` is a dotted identifier path |
//! | object literal | `{key: value, shorthand}` |
//!
//! Recognizers work on a [`Cursor`] and on the primitives of [`crate::bracket`].

use crate::bracket::{code_offsets, find_code, match_balanced, split_top_level, Delimiter};

pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

pub fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// A position in source text with small combinators for the micro-grammar.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    pub fn at(src: &'a str, pos: usize) -> Self {
        Self {
            src,
            pos: pos.min(src.len()),
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Skips whitespace, line breaks included.
    pub fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Skips spaces and tabs only.
    pub fn skip_inline_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start_matches([' ', '\t']).len();
    }

    pub fn eat(&mut self, literal: &str) -> bool {
        if self.rest().starts_with(literal) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    /// Eats `keyword` only when it is not the prefix of a longer identifier.
    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        let rest = self.rest();
        if rest.starts_with(keyword)
            && !rest[keyword.len()..].chars().next().is_some_and(is_ident_char)
        {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    pub fn ident(&mut self) -> Option<&'a str> {
        let rest = self.rest();
        if !rest.chars().next().is_some_and(is_ident_start) {
            return None;
        }
        let len = rest
            .char_indices()
            .find(|(_, c)| !is_ident_char(*c))
            .map_or(rest.len(), |(i, _)| i);
        self.pos += len;
        Some(&rest[..len])
    }

    /// A dotted identifier path such as `schemas.user.create`.
    pub fn ident_path(&mut self) -> Option<&'a str> {
        let start = self.pos;
        self.ident()?;
        loop {
            let save = self.pos;
            if self.eat(".") && self.ident().is_some() {
                continue;
            }
            self.pos = save;
            break;
        }
        Some(&self.src[start..self.pos])
    }

    /// A quoted string literal; returns the text between the quotes.
    pub fn string_literal(&mut self) -> Option<&'a str> {
        let quote = self.peek().filter(|c| matches!(c, '\'' | '"' | '`'))?;
        let body_start = self.pos + 1;
        let bytes = self.src.as_bytes();
        let mut i = body_start;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b if b == quote as u8 => {
                    self.pos = i + 1;
                    return Some(&self.src[body_start..i]);
                }
                _ => i += 1,
            }
        }
        None
    }

    /// A delimited group starting at the cursor; returns its content.
    pub fn group(&mut self, delimiter: Delimiter) -> Option<&'a str> {
        if self.src.as_bytes().get(self.pos) != Some(&delimiter.open()) {
            return None;
        }
        self.pos += 1;
        let balanced = match_balanced(self.src, self.pos, delimiter)?;
        self.pos = balanced.end;
        Some(balanced.content)
    }

    /// Skips a `<...>` type argument list, nested lists included.
    ///
    /// Leaves the cursor in place and returns false when no complete list starts here.
    pub fn skip_type_arguments(&mut self) -> bool {
        let bytes = self.rest().as_bytes();
        if bytes.first() != Some(&b'<') {
            return false;
        }

        let mut depth = 0usize;
        for (i, &b) in bytes.iter().enumerate() {
            match b {
                b'<' => depth += 1,
                // `=>` of a function type
                b'>' if i > 0 && bytes[i - 1] == b'=' => {}
                b'>' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += i + 1;
                        return true;
                    }
                }
                b';' | b'(' | b')' => return false,
                _ => {}
            }
        }
        false
    }

    /// True when the previous character is not part of an identifier.
    pub fn at_word_boundary(&self) -> bool {
        !self.src[..self.pos]
            .chars()
            .next_back()
            .is_some_and(|c| is_ident_char(c) || c == '.')
    }
}

/// One name bound by an import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportName {
    /// Exported name in the source module; `*` for namespace and `default` for default imports
    pub imported: String,
    /// Name bound in the importing file
    pub local: String,
}

impl ImportName {
    fn new(imported: &str, local: &str) -> Self {
        Self {
            imported: imported.to_string(),
            local: local.to_string(),
        }
    }
}

/// An `import ... from '...'` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    /// Names bound by the statement
    pub names: Vec<ImportName>,
    /// Module specifier, without quotes
    pub specifier: String,
    /// Byte offset of the `import` keyword
    pub start: usize,
    /// Byte offset just past the statement (including an optional `;`)
    pub end: usize,
}

impl ImportStatement {
    /// The binding that introduces `local`, if this statement has one.
    pub fn binding(&self, local: &str) -> Option<&ImportName> {
        self.names.iter().find(|n| n.local == local)
    }

    pub fn local_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|n| n.local.as_str())
    }

    pub fn is_relative(&self) -> bool {
        self.specifier.starts_with("./") || self.specifier.starts_with("../")
    }
}

/// Parses an import statement whose `import` keyword sits at `start`.
pub fn parse_import(src: &str, start: usize) -> Option<ImportStatement> {
    let mut cursor = Cursor::at(src, start);
    if !cursor.eat_keyword("import") {
        return None;
    }
    cursor.skip_ws();
    if cursor.eat_keyword("type") {
        cursor.skip_ws();
    }

    let mut names = Vec::new();
    if cursor.eat("*") {
        cursor.skip_ws();
        if !cursor.eat_keyword("as") {
            return None;
        }
        cursor.skip_ws();
        names.push(ImportName::new("*", cursor.ident()?));
    } else {
        if let Some(default) = cursor.ident() {
            names.push(ImportName::new("default", default));
            cursor.skip_ws();
            if !cursor.eat(",") {
                return finish_import(cursor, names, start);
            }
            cursor.skip_ws();
        }
        let group = cursor.group(Delimiter::Curly)?;
        for binding in split_top_level(group)? {
            let mut words = binding.split_whitespace().filter(|w| *w != "type");
            let first = words.next()?;
            let local = match (words.next(), words.next()) {
                (Some("as"), Some(alias)) => alias,
                _ => first,
            };
            names.push(ImportName::new(first, local));
        }
    }

    finish_import(cursor, names, start)
}

fn finish_import(
    mut cursor: Cursor<'_>,
    names: Vec<ImportName>,
    start: usize,
) -> Option<ImportStatement> {
    cursor.skip_ws();
    if !cursor.eat_keyword("from") {
        return None;
    }
    cursor.skip_ws();
    let specifier = cursor.string_literal()?.to_string();
    cursor.skip_inline_ws();
    cursor.eat(";");
    Some(ImportStatement {
        names,
        specifier,
        start,
        end: cursor.pos(),
    })
}

/// Collects import statements that begin a line, in source order.
pub fn find_imports(src: &str) -> Vec<ImportStatement> {
    let mut imports = Vec::new();
    let mut line_start = 0;

    while line_start < src.len() {
        let line_end = src[line_start..]
            .find('\n')
            .map_or(src.len(), |p| line_start + p);
        let line = &src[line_start..line_end];
        let indent = line.len() - line.trim_start().len();

        if line.trim_start().starts_with("import") {
            if let Some(import) = parse_import(src, line_start + indent) {
                line_start = import.end;
                imports.push(import);
                continue;
            }
        }
        line_start = line_end + 1;
    }

    imports
}

/// A `const <name> = new Router(...)` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterMarker {
    pub name: String,
    /// Byte offset of the declaring keyword
    pub start: usize,
}

/// Finds every router definition marker, in source order.
pub fn find_router_definitions(src: &str) -> Vec<RouterMarker> {
    let mut markers = Vec::new();
    let mut from = 0;

    while let Some(at) = find_code(src, from, "new") {
        from = at + 3;
        let mut cursor = Cursor::at(src, at);
        if !cursor.at_word_boundary() || !cursor.eat_keyword("new") {
            continue;
        }
        cursor.skip_ws();
        if !cursor.eat_keyword("Router") {
            continue;
        }
        cursor.skip_ws();
        if cursor.skip_type_arguments() {
            cursor.skip_ws();
        }
        if cursor.peek() != Some('(') {
            continue;
        }
        if let Some(marker) = declaration_before(src, at) {
            markers.push(marker);
        }
    }

    markers
}

/// Walks back from `new` over `= [: Type] name (const|let|var)`.
fn declaration_before(src: &str, new_at: usize) -> Option<RouterMarker> {
    let head = src[..new_at].trim_end();
    let head = head.strip_suffix('=')?.trim_end();

    // optional `: Router` annotation
    let head = match head.rfind(':') {
        Some(colon)
            if head[colon + 1..]
                .trim()
                .chars()
                .all(|c| is_ident_char(c) || matches!(c, '.' | '<' | '>' | ',' | ' ')) =>
        {
            head[..colon].trim_end()
        }
        _ => head,
    };

    let name_start = head
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_ident_char(*c))
        .last()
        .map(|(i, _)| i)?;
    let name = &head[name_start..];
    let before = head[..name_start].trim_end();

    for keyword in ["const", "let", "var"] {
        if let Some(prefix) = before.strip_suffix(keyword) {
            if !prefix.chars().next_back().is_some_and(is_ident_char) {
                return Some(RouterMarker {
                    name: name.to_string(),
                    start: prefix.len(),
                });
            }
        }
    }
    None
}

/// A `.use('/mount', router.routes(), ...)` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountDeclaration {
    pub router: String,
    /// Mount path exactly as written, without quotes
    pub path: String,
}

/// Finds every mount declaration, in source order.
pub fn find_mounts(src: &str) -> Vec<MountDeclaration> {
    let mut mounts = Vec::new();
    let mut from = 0;

    while let Some(at) = find_code(src, from, ".use") {
        from = at + 4;
        let mut cursor = Cursor::at(src, at + 1);
        if !cursor.eat_keyword("use") {
            continue;
        }
        cursor.skip_ws();
        let Some(args) = cursor.group(Delimiter::Paren) else {
            continue;
        };
        if let Some(mount) = parse_mount_arguments(args) {
            mounts.push(mount);
        }
        from = cursor.pos();
    }

    mounts
}

fn parse_mount_arguments(args: &str) -> Option<MountDeclaration> {
    let parts = split_top_level(args)?;
    let path = Cursor::new(parts.first()?).string_literal()?.to_string();

    let mut cursor = Cursor::new(parts.get(1)?);
    let router = cursor.ident()?;
    cursor.skip_ws();
    if !(cursor.eat(".") && cursor.eat_keyword("routes")) {
        return None;
    }

    Some(MountDeclaration {
        router: router.to_string(),
        path,
    })
}

/// A call expression `callee(args)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call<'a> {
    pub callee: &'a str,
    pub args: Vec<&'a str>,
}

/// Finds the first call of `name` inside `expr` and returns its arguments.
///
/// `name` matches when it is the last segment of the callee path, so both
/// `validateBody(...)` and `mw.validateBody(...)` are found.
pub fn find_call<'a>(expr: &'a str, name: &str) -> Option<Call<'a>> {
    let mut from = 0;
    while let Some(at) = find_code(expr, from, name) {
        from = at + name.len();
        let mut cursor = Cursor::at(expr, at);
        let boundary = !expr[..at].chars().next_back().is_some_and(is_ident_char);
        if !boundary || !cursor.eat_keyword(name) {
            continue;
        }
        cursor.skip_ws();
        if let Some(content) = cursor.group(Delimiter::Paren) {
            return Some(Call {
                callee: &expr[at..at + name.len()],
                args: split_top_level(content)?,
            });
        }
    }
    None
}

/// Parses `expr` as a single call whose callee is an identifier path.
pub fn parse_call(expr: &str) -> Option<Call<'_>> {
    let expr = expr.trim();
    let mut cursor = Cursor::new(expr);
    let callee = cursor.ident_path()?;
    cursor.skip_ws();
    let content = cursor.group(Delimiter::Paren)?;
    Some(Call {
        callee,
        args: split_top_level(content)?,
    })
}

/// Identifier tokens of `expr` outside string literals and comments.
pub fn identifiers(expr: &str) -> Vec<&str> {
    let bytes = expr.as_bytes();
    let mut found = Vec::new();
    let mut start: Option<usize> = None;
    let mut prev: Option<usize> = None;

    for i in code_offsets(expr, 0) {
        let c = bytes[i] as char;
        let contiguous = i > 0 && prev == Some(i - 1);
        if let (Some(s), Some(p)) = (start, prev) {
            if !contiguous || !is_ident_char(c) {
                found.push(&expr[s..=p]);
                start = None;
            }
        }
        let after_word = contiguous && is_ident_char(bytes[i - 1] as char);
        if start.is_none() && is_ident_start(c) && !after_word {
            start = Some(i);
        }
        prev = Some(i);
    }
    if let (Some(s), Some(p)) = (start, prev) {
        found.push(&expr[s..=p]);
    }

    found
}

/// True when `text` is exactly a dotted identifier path.
pub fn is_ident_path(text: &str) -> bool {
    let mut cursor = Cursor::new(text.trim());
    cursor.ident_path().is_some() && cursor.is_eof()
}

/// Parses an object literal into `(key, value)` pairs; shorthand entries map a key to itself.
pub fn parse_object_literal(text: &str) -> Option<Vec<(&str, &str)>> {
    let mut cursor = Cursor::new(text.trim());
    let content = cursor.group(Delimiter::Curly)?;

    let mut entries = Vec::new();
    for entry in split_top_level(content)? {
        let mut cursor = Cursor::new(entry);
        let key = match cursor.string_literal().or_else(|| cursor.ident()) {
            Some(key) => key,
            None => continue,
        };
        cursor.skip_ws();
        if cursor.eat(":") {
            entries.push((key, cursor.rest().trim()));
        } else if cursor.is_eof() {
            entries.push((key, key));
        }
    }
    Some(entries)
}

/// A status code literal such as `200` or `'404'`.
pub fn parse_status(text: &str) -> Option<&str> {
    let text = text.trim();
    let unquoted = Cursor::new(text).string_literal().unwrap_or(text);
    let valid = !unquoted.is_empty() && unquoted.chars().all(|c| c.is_ascii_digit());
    valid.then_some(unquoted)
}
