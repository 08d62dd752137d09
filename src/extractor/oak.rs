use crate::bracket::{find_code, match_balanced, Delimiter};
use crate::extractor::{EndpointExtractor, EndpointToken, HttpMethod};
use crate::syntax::Cursor;
use log::{debug, warn};

/// Maximum distance between a call's closing parenthesis and a description annotation.
const ANNOTATION_WINDOW: usize = 8;

const ANNOTATION_TAG: &str = "@description";

/// Extractor for Oak-style routers: `router.get('/path', ...middlewares)`.
///
/// Verb calls may be chained (`.get(...).post(...)`) or repeated on the router variable.
/// Every call is captured with its full argument list, nested calls included, so inline
/// handlers containing their own parentheses are never truncated.
#[derive(Debug, Clone, Copy, Default)]
pub struct OakExtractor;

impl EndpointExtractor for OakExtractor {
    fn extract_tokens(&self, section: &str) -> Vec<EndpointToken> {
        let mut tokens = Vec::new();
        let mut from = 0;

        while let Some(dot) = find_code(section, from, ".") {
            from = dot + 1;

            let mut cursor = Cursor::at(section, dot + 1);
            let Some(method) = cursor.ident().and_then(HttpMethod::from_keyword) else {
                continue;
            };
            cursor.skip_ws();
            if cursor.peek() != Some('(') {
                continue;
            }

            let Some(call) = match_balanced(section, cursor.pos() + 1, Delimiter::Paren) else {
                warn!(
                    "Unterminated .{}( call at offset {}, ignoring the rest of the router",
                    method.keyword(),
                    dot
                );
                break;
            };

            let description = trailing_description(section, call.end);
            debug!("Found .{}() at offset {}", method.keyword(), dot);
            tokens.push(EndpointToken {
                method,
                arguments: call.content.to_string(),
                description,
                offset: dot,
            });
            from = call.end;
        }

        tokens
    }
}

/// Reads a `// @description <text>` comment that closely follows a call.
fn trailing_description(section: &str, call_end: usize) -> Option<String> {
    let rest = &section[call_end..];
    let skipped = rest
        .char_indices()
        .take_while(|(_, c)| matches!(c, ' ' | '\t' | ';' | ','))
        .count();
    if skipped > ANNOTATION_WINDOW {
        return None;
    }

    let mut cursor = Cursor::at(section, call_end + skipped);
    if !cursor.eat("//") {
        return None;
    }
    cursor.skip_inline_ws();
    if !cursor.eat(ANNOTATION_TAG) {
        return None;
    }

    let text = cursor.rest().lines().next().unwrap_or("").trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_repeated_and_chained_calls() {
        let section = r#"const users = new Router();
users.get('/', listUsers);
users
    .post('/', validateBody(schemas.create), createUser)
    .delete('/:id', removeUser);
"#;
        let tokens = OakExtractor.extract_tokens(section);
        let methods: Vec<_> = tokens.iter().map(|t| t.method).collect();
        assert_eq!(
            methods,
            vec![HttpMethod::Get, HttpMethod::Post, HttpMethod::Delete]
        );
        assert_eq!(
            tokens[1].arguments,
            "'/', validateBody(schemas.create), createUser"
        );
    }

    #[test]
    fn test_extract_keeps_nested_parentheses() {
        let section = "r.put('/x', async (ctx) => { await save(ctx.request.body()); ctx.response.status = 204; });";
        let tokens = OakExtractor.extract_tokens(section);

        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].arguments.ends_with("ctx.response.status = 204; }"));
    }

    #[test]
    fn test_extract_ignores_lookalikes_and_comments() {
        let section = "r.getUser('/a');\n// r.get('/commented', h);\nconst s = '.get(';\nr.get('/real', h);";
        let tokens = OakExtractor.extract_tokens(section);

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].arguments, "'/real', h");
    }

    #[test]
    fn test_extract_stops_at_unterminated_call() {
        let section = "r.get('/a', h);\nr.post('/b', wrap(h);\nr.get('/c', h);";
        let tokens = OakExtractor.extract_tokens(section);

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].arguments, "'/a', h");
    }

    #[test]
    fn test_description_annotation() {
        let section = "r.get('/a', h); // @description Lists every user\nr.get('/b', h);\n// @description too far\nr.get('/c', h);    ;   // plain comment";
        let tokens = OakExtractor.extract_tokens(section);

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].description.as_deref(), Some("Lists every user"));
        assert_eq!(tokens[1].description, None);
        assert_eq!(tokens[2].description, None);
    }
}
