//! Markup tokenizer
//!
//! Splits a block's raw markup into a flat sequence of tokens. Text and
//! entity tokens each stand for exactly one character of plain text; tag
//! tokens (elements, comments, declarations) stand for none.
//!
//! The tokenizer is total: anything that does not look like a complete tag
//! or a decodable character reference is treated as literal text, so every
//! byte of the input belongs to exactly one token.

/// Longest character reference accepted, `&` and `;` included
const MAX_ENTITY_LEN: usize = 10;

/// Elements that never have children or a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// What a token contributes to the plain text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A literal character
    Text(char),
    /// A character reference such as `&amp;`, decoded
    Entity(char),
    /// A tag, comment or declaration
    Tag,
}

/// A slice of markup with its meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Verbatim source text
    pub raw: &'a str,
    /// Byte offset of `raw` within the markup
    pub start: usize,
}

impl<'a> Token<'a> {
    /// Byte offset just past this token
    pub fn end(&self) -> usize {
        self.start + self.raw.len()
    }

    /// The plain-text character this token contributes, if any
    pub fn plain_char(&self) -> Option<char> {
        match self.kind {
            TokenKind::Text(c) | TokenKind::Entity(c) => Some(c),
            TokenKind::Tag => None,
        }
    }

    pub fn is_tag(&self) -> bool {
        self.kind == TokenKind::Tag
    }

    /// Parsed tag details for tag tokens
    pub fn tag(&self) -> Option<Tag<'a>> {
        self.is_tag().then(|| Tag::parse(self.raw))
    }
}

/// Kinds of tag token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Open,
    Close,
    SelfClosing,
    Comment,
    /// `<!DOCTYPE ...>`, `<?xml ...?>` and similar
    Declaration,
}

/// A tag token's name and kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag<'a> {
    pub name: &'a str,
    pub kind: TagKind,
}

impl<'a> Tag<'a> {
    /// Parse a raw tag token. Never fails; unknown shapes become declarations.
    pub fn parse(raw: &'a str) -> Self {
        if raw.starts_with("<!--") {
            return Self { name: "", kind: TagKind::Comment };
        }
        if raw.starts_with("<!") || raw.starts_with("<?") {
            return Self { name: "", kind: TagKind::Declaration };
        }

        let (body, closing) = match raw.strip_prefix("</") {
            Some(rest) => (rest, true),
            None => (&raw[1..], false),
        };
        let name_end = body
            .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .unwrap_or(body.len());
        let name = &body[..name_end];

        let kind = if closing {
            TagKind::Close
        } else if raw.ends_with("/>") {
            TagKind::SelfClosing
        } else {
            TagKind::Open
        };

        Self { name, kind }
    }

    /// Whether the element can never have content
    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS
            .iter()
            .any(|v| v.eq_ignore_ascii_case(self.name))
    }

    /// Whether this tag starts an element that later tags must close
    pub fn opens_element(&self) -> bool {
        self.kind == TagKind::Open && !self.is_void()
    }

    /// Whether this tag changes element nesting.
    ///
    /// Wrappers must not straddle such a tag or the output stops being
    /// well-formed.
    pub fn changes_nesting(&self) -> bool {
        self.opens_element() || self.kind == TagKind::Close
    }
}

/// Iterator over the tokens of a markup string
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    markup: &'a str,
    pos: usize,
}

/// Tokenize markup
pub fn tokenize(markup: &str) -> Tokens<'_> {
    Tokens { markup, pos: 0 }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let rest = &self.markup[self.pos..];
        let ch = rest.chars().next()?;
        let start = self.pos;

        let (kind, len) = match ch {
            '<' => match tag_len(rest) {
                Some(len) => (TokenKind::Tag, len),
                None => (TokenKind::Text('<'), 1),
            },
            '&' => match entity(rest) {
                Some((decoded, len)) => (TokenKind::Entity(decoded), len),
                None => (TokenKind::Text('&'), 1),
            },
            c => (TokenKind::Text(c), c.len_utf8()),
        };

        self.pos += len;
        Some(Token {
            kind,
            raw: &self.markup[start..start + len],
            start,
        })
    }
}

/// Byte length of the tag starting at `rest[0] == '<'`, if it is one
fn tag_len(rest: &str) -> Option<usize> {
    if let Some(body) = rest.strip_prefix("<!--") {
        return body.find("-->").map(|i| 4 + i + 3);
    }

    let next = rest[1..].chars().next()?;
    if !(next.is_ascii_alphabetic() || matches!(next, '/' | '!' | '?')) {
        return None;
    }

    // A '>' inside a quoted attribute value does not end the tag
    let mut quote: Option<char> = None;
    let mut after_equals = false;
    for (i, c) in rest.char_indices().skip(1) {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '>' => return Some(i + 1),
                '"' | '\'' if after_equals => quote = Some(c),
                _ => {}
            },
        }
        if !c.is_whitespace() {
            after_equals = c == '=';
        }
    }

    None
}

/// Decoded character and byte length of the entity at `rest[0] == '&'`
fn entity(rest: &str) -> Option<(char, usize)> {
    let semi = rest
        .bytes()
        .take(MAX_ENTITY_LEN)
        .position(|b| b == b';')?;
    if semi < 2 {
        return None;
    }

    let body = &rest.as_bytes()[1..semi];
    if !body.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'#') {
        return None;
    }

    let raw = &rest[..=semi];
    let decoded = html_escape::decode_html_entities(raw);
    if decoded.as_ref() == raw {
        return None;
    }

    let mut chars = decoded.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some((c, raw.len())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(markup: &str) -> Vec<TokenKind> {
        tokenize(markup).map(|t| t.kind).collect()
    }

    #[test]
    fn test_text_and_tags() {
        let tokens: Vec<_> = tokenize("<p>Hi</p>").collect();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].raw, "<p>");
        assert!(tokens[0].is_tag());
        assert_eq!(tokens[1].kind, TokenKind::Text('H'));
        assert_eq!(tokens[3].raw, "</p>");
        assert_eq!(tokens[3].start, 5);
    }

    #[test]
    fn test_entities_are_single_tokens() {
        assert_eq!(
            kinds("a&amp;b"),
            vec![
                TokenKind::Text('a'),
                TokenKind::Entity('&'),
                TokenKind::Text('b')
            ]
        );
        assert_eq!(kinds("&#39;"), vec![TokenKind::Entity('\'')]);
        assert_eq!(kinds("&nbsp;"), vec![TokenKind::Entity('\u{a0}')]);
    }

    #[test]
    fn test_unknown_entity_is_literal() {
        let tokens = kinds("&bogus;");
        assert_eq!(tokens[0], TokenKind::Text('&'));
        assert_eq!(tokens.len(), "&bogus;".len());
    }

    #[test]
    fn test_bare_ampersand_and_angle() {
        assert_eq!(
            kinds("a & b < c"),
            "a & b < c".chars().map(TokenKind::Text).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_unterminated_tag_is_text() {
        let tokens = kinds("<b");
        assert_eq!(tokens, vec![TokenKind::Text('<'), TokenKind::Text('b')]);
    }

    #[test]
    fn test_quoted_attribute_with_angle() {
        let tokens: Vec<_> = tokenize(r#"<a title="x>y">z</a>"#).collect();
        assert_eq!(tokens[0].raw, r#"<a title="x>y">"#);
        assert_eq!(tokens[1].kind, TokenKind::Text('z'));
    }

    #[test]
    fn test_comment_token() {
        let tokens: Vec<_> = tokenize("a<!-- <b> -->b").collect();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].tag().map(|t| t.kind), Some(TagKind::Comment));
    }

    #[test]
    fn test_tag_parse() {
        let open = Tag::parse(r#"<span class="x">"#);
        assert_eq!(open.name, "span");
        assert_eq!(open.kind, TagKind::Open);
        assert!(open.changes_nesting());

        let close = Tag::parse("</em>");
        assert_eq!(close.name, "em");
        assert_eq!(close.kind, TagKind::Close);

        let br = Tag::parse("<BR>");
        assert!(br.is_void());
        assert!(!br.changes_nesting());

        assert_eq!(Tag::parse("<img src=x />").kind, TagKind::SelfClosing);
        assert_eq!(Tag::parse("<!DOCTYPE html>").kind, TagKind::Declaration);
    }

    #[test]
    fn test_multibyte_text() {
        let tokens: Vec<_> = tokenize("café").collect();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[3].raw, "é");
        assert_eq!(tokens[3].end(), "café".len());
    }
}
