//! Lexer for SQL templates using logos.
//!
//! The token set is deliberately small: tag punctuation, identifiers,
//! quoted strings, whitespace and everything else. The parser decides from
//! context whether a run of tokens is markup or SQL text, and recovers SQL
//! text verbatim through the token spans.

use crate::span::Span;
use logos::Logos;

/// Token types for the template language.
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    #[token("</")]
    CloseOpen,
    #[token("/>")]
    SelfClose,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Eq,

    /// A double-quoted string; the payload excludes the quotes.
    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    Quoted(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    /// Any other run of characters (digits, operators, `#prop#` markers).
    #[regex(r#"[^<>="a-zA-Z_ \t\r\n]+"#)]
    Other,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::CloseOpen => write!(f, "'</'"),
            Token::SelfClose => write!(f, "'/>'"),
            Token::Lt => write!(f, "'<'"),
            Token::Gt => write!(f, "'>'"),
            Token::Eq => write!(f, "'='"),
            Token::Quoted(s) => write!(f, "\"{}\"", s),
            Token::Ident(s) => write!(f, "'{}'", s),
            Token::Whitespace => write!(f, "whitespace"),
            Token::Other => write!(f, "text"),
        }
    }
}

/// A token with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Tokenize a template.
///
/// Input the token rules reject (an unterminated quote, for example) is
/// kept as [`Token::Other`] so that no SQL text is lost.
pub fn tokenize(source: &str) -> Vec<SpannedToken> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span: Span = lexer.span().into();
        let token = result.unwrap_or(Token::Other);
        tokens.push(SpannedToken { token, span });
    }
    tokens
}

/// Decode the predefined XML entities.
///
/// Unknown entities are left untouched.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    const ENTITIES: [(&str, char); 5] = [
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&amp;", '&'),
        ("&quot;", '"'),
        ("&apos;", '\''),
    ];

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        match ENTITIES.iter().find(|(name, _)| rest.starts_with(name)) {
            Some((name, ch)) => {
                out.push(*ch);
                rest = &rest[name.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn test_tag_tokens() {
        assert_eq!(
            kinds(r#"<isNull property="name">"#),
            vec![
                Token::Lt,
                Token::Ident("isNull".into()),
                Token::Whitespace,
                Token::Ident("property".into()),
                Token::Eq,
                Token::Quoted("name".into()),
                Token::Gt,
            ]
        );
        assert_eq!(
            kinds("</dynamic>"),
            vec![Token::CloseOpen, Token::Ident("dynamic".into()), Token::Gt]
        );
        assert_eq!(
            kinds(r#"<include refid="x"/>"#).last(),
            Some(&Token::SelfClose)
        );
    }

    #[test]
    fn test_spans_cover_source() {
        let source = "id = #id# AND n < 5";
        let rebuilt: String = tokenize(source)
            .iter()
            .map(|t| t.span.slice(source))
            .collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn test_unterminated_quote_is_text() {
        let source = "name = \"abc";
        let rebuilt: String = tokenize(source)
            .iter()
            .map(|t| t.span.slice(source))
            .collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt; b &amp;&amp; c"), "a < b && c");
        assert_eq!(decode_entities("&unknown; &gt;"), "&unknown; >");
        assert_eq!(decode_entities("plain"), "plain");
    }
}
