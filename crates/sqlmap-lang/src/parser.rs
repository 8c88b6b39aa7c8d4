//! Recursive descent parser for SQL templates.

use crate::ast::{CompareTarget, ConditionKind, Conditional, Dynamic, Include, Iterate, SqlNode};
use crate::error::ParseError;
use crate::lexer::{decode_entities, tokenize, SpannedToken, Token};
use crate::span::Span;

/// Names of every tag the template language knows.
const STRUCTURAL_TAGS: [&str; 3] = ["dynamic", "iterate", "include"];

const CONDITION_ATTRS: [&str; 2] = ["prepend", "property"];
const COMPARISON_ATTRS: [&str; 4] = ["prepend", "property", "compareValue", "compareProperty"];
const PARAMETER_ATTRS: [&str; 1] = ["prepend"];
const ITERATE_ATTRS: [&str; 5] = ["prepend", "property", "open", "close", "conjunction"];
const DYNAMIC_ATTRS: [&str; 1] = ["prepend"];
const INCLUDE_ATTRS: [&str; 1] = ["refid"];

/// An attribute as written in the source.
#[derive(Debug)]
struct Attribute {
    name: String,
    value: String,
    span: Span,
}

/// A parsed opening tag.
#[derive(Debug)]
struct OpenTag {
    name: String,
    attributes: Vec<Attribute>,
    self_closing: bool,
    span: Span,
}

impl OpenTag {
    fn take(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(index).value)
    }
}

/// Parser for SQL templates.
pub struct Parser<'source> {
    source: &'source str,
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl<'source> Parser<'source> {
    /// Create a new parser for the given template.
    pub fn new(source: &'source str) -> Self {
        Self {
            source,
            tokens: tokenize(source),
            pos: 0,
        }
    }

    /// Parse the whole template into a node list.
    pub fn parse(mut self) -> Result<Vec<SqlNode>, ParseError> {
        self.parse_nodes(None)
    }

    /// Parse nodes until end of input or the closing tag of `parent`.
    fn parse_nodes(&mut self, parent: Option<&OpenTag>) -> Result<Vec<SqlNode>, ParseError> {
        let mut nodes = Vec::new();
        let mut text = String::new();

        loop {
            let Some(tok) = self.tokens.get(self.pos) else {
                if let Some(open) = parent {
                    return Err(ParseError::new(
                        format!("unclosed <{}> tag", open.name),
                        open.span,
                    )
                    .with_hint(format!("add </{}>", open.name)));
                }
                flush_text(&mut nodes, &mut text);
                return Ok(nodes);
            };

            match &tok.token {
                Token::Lt if self.looks_like_tag() => {
                    flush_text(&mut nodes, &mut text);
                    let open = self.parse_open_tag()?;
                    nodes.push(self.parse_element(open)?);
                }
                Token::CloseOpen if matches!(self.token_at(1), Some(Token::Ident(_))) => {
                    let (name, span) = self.parse_close_tag()?;
                    return match parent {
                        Some(open) if open.name == name => {
                            flush_text(&mut nodes, &mut text);
                            Ok(nodes)
                        }
                        Some(open) => Err(ParseError::new(
                            format!("mismatched closing tag </{}>", name),
                            span,
                        )
                        .with_hint(format!("expected </{}>", open.name))),
                        None => Err(ParseError::new(
                            format!("unexpected closing tag </{}>", name),
                            span,
                        )),
                    };
                }
                _ => {
                    text.push_str(tok.span.slice(self.source));
                    self.pos += 1;
                }
            }
        }
    }

    /// Decide whether the `<` at the cursor starts markup.
    ///
    /// Known tag names always do. Unknown names only count when followed by
    /// something tag-shaped, so `a<b` stays SQL text.
    fn looks_like_tag(&self) -> bool {
        let Some(Token::Ident(name)) = self.token_at(1) else {
            return false;
        };
        if is_known_tag(name) {
            return true;
        }
        match self.token_at(2) {
            Some(Token::Gt) | Some(Token::SelfClose) => true,
            Some(Token::Whitespace) => {
                matches!(self.token_at(3), Some(Token::Ident(_)))
                    && matches!(self.token_at(4), Some(Token::Eq))
            }
            _ => false,
        }
    }

    fn parse_open_tag(&mut self) -> Result<OpenTag, ParseError> {
        let start = self.expect(Token::Lt)?.span;
        let (name, name_span) = self.expect_ident()?;

        if !is_known_tag(&name) {
            return Err(ParseError::new(format!("unknown tag <{}>", name), name_span)
                .with_hint(format!("did you mean {}?", closest_tag(&name))));
        }

        let mut attributes: Vec<Attribute> = Vec::new();
        loop {
            self.skip_whitespace();
            let tok = self.next_token()?;
            match tok.token {
                Token::Gt => {
                    return Ok(OpenTag {
                        name,
                        attributes,
                        self_closing: false,
                        span: start.merge(tok.span),
                    })
                }
                Token::SelfClose => {
                    return Ok(OpenTag {
                        name,
                        attributes,
                        self_closing: true,
                        span: start.merge(tok.span),
                    })
                }
                Token::Ident(attr) => {
                    self.skip_whitespace();
                    self.expect(Token::Eq)?;
                    self.skip_whitespace();
                    let value_tok = self.next_token()?;
                    let Token::Quoted(value) = value_tok.token else {
                        return Err(ParseError::new(
                            format!("expected quoted value for '{}', found {}", attr, value_tok.token),
                            value_tok.span,
                        )
                        .with_hint(format!("write {}=\"...\"", attr)));
                    };
                    let span = tok.span.merge(value_tok.span);
                    if attributes.iter().any(|a| a.name == attr) {
                        return Err(ParseError::new(
                            format!("duplicate attribute '{}' on <{}>", attr, name),
                            span,
                        ));
                    }
                    attributes.push(Attribute {
                        name: attr,
                        value: decode_entities(&value),
                        span,
                    });
                }
                other => {
                    return Err(ParseError::new(
                        format!("expected attribute or '>' in <{}>, found {}", name, other),
                        tok.span,
                    )
                    .with_hint("tags are written <name attr=\"value\">"))
                }
            }
        }
    }

    fn parse_close_tag(&mut self) -> Result<(String, Span), ParseError> {
        let start = self.expect(Token::CloseOpen)?.span;
        let (name, _) = self.expect_ident()?;
        self.skip_whitespace();
        let end = self.expect(Token::Gt)?.span;
        Ok((name, start.merge(end)))
    }

    /// Build a node from an opening tag, parsing its body.
    fn parse_element(&mut self, mut open: OpenTag) -> Result<SqlNode, ParseError> {
        let allowed: &[&str] = match open.name.as_str() {
            "dynamic" => &DYNAMIC_ATTRS,
            "iterate" => &ITERATE_ATTRS,
            "include" => &INCLUDE_ATTRS,
            name => match ConditionKind::from_tag_name(name) {
                Some(kind) if kind.is_comparison() => &COMPARISON_ATTRS,
                Some(kind) if kind.tests_parameter() => &PARAMETER_ATTRS,
                _ => &CONDITION_ATTRS,
            },
        };
        if let Some(bad) = open.attributes.iter().find(|a| !allowed.contains(&a.name.as_str())) {
            return Err(ParseError::new(
                format!("unknown attribute '{}' on <{}>", bad.name, open.name),
                bad.span,
            )
            .with_hint(format!("allowed attributes: {}", allowed.join(", "))));
        }

        let children = if open.self_closing {
            Vec::new()
        } else {
            self.parse_nodes(Some(&open))?
        };

        let tag = std::mem::take(&mut open.name);
        let node = match tag.as_str() {
            "dynamic" => SqlNode::Dynamic(Dynamic {
                prepend: open.take("prepend"),
                children,
            }),
            "iterate" => SqlNode::Iterate(Iterate {
                prepend: open.take("prepend"),
                property: open.take("property"),
                open: open.take("open"),
                close: open.take("close"),
                conjunction: open.take("conjunction"),
                children,
            }),
            "include" => {
                if !children.is_empty() {
                    return Err(ParseError::new("<include> cannot have a body", open.span)
                        .with_hint("write <include refid=\"...\"/>"));
                }
                let refid = open.take("refid").ok_or_else(|| {
                    ParseError::new("<include> requires a 'refid' attribute", open.span)
                })?;
                SqlNode::Include(Include { refid })
            }
            name => {
                let Some(kind) = ConditionKind::from_tag_name(name) else {
                    return Err(ParseError::new(format!("unknown tag <{}>", name), open.span));
                };
                let span = open.span;
                let prepend = open.take("prepend");
                let property = open.take("property");
                if property.is_none() && !kind.tests_parameter() {
                    return Err(ParseError::new(
                        format!("<{}> requires a 'property' attribute", name),
                        span,
                    ));
                }

                let compare = match (open.take("compareValue"), open.take("compareProperty")) {
                    (Some(_), Some(_)) => {
                        return Err(ParseError::new(
                            format!("<{}> cannot have both compareValue and compareProperty", name),
                            span,
                        ))
                    }
                    (Some(v), None) => Some(CompareTarget::Value(v)),
                    (None, Some(p)) => Some(CompareTarget::Property(p)),
                    (None, None) if kind.is_comparison() => {
                        return Err(ParseError::new(
                            format!("<{}> needs something to compare against", name),
                            span,
                        )
                        .with_hint("add compareValue=\"...\" or compareProperty=\"...\""))
                    }
                    (None, None) => None,
                };

                SqlNode::Conditional(Conditional {
                    kind,
                    prepend,
                    property,
                    compare,
                    children,
                })
            }
        };
        Ok(node)
    }

    fn token_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.token_at(0), Some(Token::Whitespace)) {
            self.pos += 1;
        }
    }

    /// Expect and consume an identifier.
    fn expect_ident(&mut self) -> Result<(String, Span), ParseError> {
        let tok = self.next_token()?;
        match tok.token {
            Token::Ident(name) => Ok((name, tok.span)),
            other => Err(ParseError::new(
                format!("expected tag name, found {}", other),
                tok.span,
            )),
        }
    }

    /// Expect and consume a specific token.
    fn expect(&mut self, expected: Token) -> Result<SpannedToken, ParseError> {
        let tok = self.next_token()?;
        if std::mem::discriminant(&tok.token) == std::mem::discriminant(&expected) {
            Ok(tok)
        } else {
            Err(ParseError::new(
                format!("expected {}, found {}", expected, tok.token),
                tok.span,
            ))
        }
    }

    /// Get the next token or error if EOF.
    fn next_token(&mut self) -> Result<SpannedToken, ParseError> {
        let tok = self.tokens.get(self.pos).cloned().ok_or_else(|| {
            ParseError::new(
                "unexpected end of template",
                Span::at(self.source.len()),
            )
            .with_hint("a tag is not terminated")
        })?;
        self.pos += 1;
        Ok(tok)
    }
}

fn flush_text(nodes: &mut Vec<SqlNode>, text: &mut String) {
    if !text.is_empty() {
        nodes.push(SqlNode::Text(decode_entities(text)));
        text.clear();
    }
}

fn is_known_tag(name: &str) -> bool {
    STRUCTURAL_TAGS.contains(&name) || ConditionKind::from_tag_name(name).is_some()
}

/// The known tag sharing the longest case-insensitive prefix with `name`.
fn closest_tag(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    STRUCTURAL_TAGS
        .into_iter()
        .chain(ConditionKind::ALL.into_iter().map(ConditionKind::tag_name))
        .max_by_key(|tag| {
            tag.to_ascii_lowercase()
                .chars()
                .zip(lower.chars())
                .take_while(|(a, b)| a == b)
                .count()
        })
        .unwrap_or("dynamic")
}
