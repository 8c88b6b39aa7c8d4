//! Inline parameter and substitution markers inside SQL text.
//!
//! `#prop#` becomes a `?` placeholder bound to `prop`. Attributes may follow
//! the property, either as `#prop,type=int,dbType=INTEGER,direction=Output,
//! nullValue=-1,handler=name#` or in the short form `#prop:DBTYPE:nullValue#`.
//! `$prop$` is replaced by the display form of the value. `##` and `$$`
//! produce a literal `#` and `$`.

use crate::driver::ParameterDirection;
use crate::error::Error;
use crate::mapping::ParameterProperty;

/// A piece of SQL text after marker scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece<'a> {
    Text(&'a str),
    /// Contents between two markers.
    Marker(&'a str),
}

/// Split `text` on `marker`-delimited tokens.
///
/// A doubled marker yields a one-character text piece. When `strict` is set
/// an unterminated marker is an error; otherwise it is kept as text.
pub fn split_markers(text: &str, marker: char, strict: bool) -> Result<Vec<Piece<'_>>, Error> {
    let mut pieces = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(marker) {
        if start > 0 {
            pieces.push(Piece::Text(&rest[..start]));
        }
        let after = &rest[start + 1..];
        if after.starts_with(marker) {
            pieces.push(Piece::Text(&rest[start..start + 1]));
            rest = &after[1..];
            continue;
        }
        match after.find(marker) {
            Some(end) => {
                pieces.push(Piece::Marker(&after[..end]));
                rest = &after[end + 1..];
            }
            None if strict => {
                return Err(Error::config(format!(
                    "unterminated '{}' marker in SQL text: {}",
                    marker,
                    text.trim()
                )))
            }
            None => {
                pieces.push(Piece::Text(&rest[start..]));
                rest = "";
            }
        }
    }
    if !rest.is_empty() {
        pieces.push(Piece::Text(rest));
    }
    Ok(pieces)
}

/// Whether a `$...$` token looks like a property path.
pub fn is_substitution(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'))
}

/// Whether `text` contains a `$prop$` substitution.
pub fn has_substitution(text: &str) -> bool {
    split_markers(text, '$', false)
        .map(|pieces| {
            pieces
                .iter()
                .any(|p| matches!(p, Piece::Marker(token) if is_substitution(token)))
        })
        .unwrap_or(false)
}

/// Expand `$...$` markers in `text`.
///
/// Property-path tokens are replaced by `resolve`; any other token is kept
/// with its delimiters. `$$` becomes `$`.
pub fn substitute<F>(text: &str, mut resolve: F) -> Result<String, Error>
where
    F: FnMut(&str) -> Result<String, Error>,
{
    if !text.contains('$') {
        return Ok(text.to_string());
    }
    let mut out = String::with_capacity(text.len());
    for piece in split_markers(text, '$', false)? {
        match piece {
            Piece::Text(t) => out.push_str(t),
            Piece::Marker(token) if is_substitution(token) => out.push_str(&resolve(token)?),
            Piece::Marker(token) => {
                out.push('$');
                out.push_str(token);
                out.push('$');
            }
        }
    }
    Ok(out)
}

/// Parse the contents of a `#...#` marker.
pub fn parse_inline(token: &str) -> Result<ParameterProperty, Error> {
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::config("empty inline parameter '##'"));
    }

    if let Some((property, attributes)) = token.split_once(',') {
        let mut param = ParameterProperty::new(property.trim());
        for attribute in attributes.split(',') {
            let (key, value) = attribute.split_once('=').ok_or_else(|| {
                Error::config(format!(
                    "expected key=value in inline parameter '#{}#'",
                    token
                ))
            })?;
            let value = value.trim().to_string();
            match key.trim() {
                "type" | "javaType" | "clrType" => param.type_name = Some(value),
                "dbType" | "jdbcType" => param.db_type = Some(value),
                "nullValue" => param.null_value = Some(value),
                "handler" => param.handler = Some(value),
                "column" => param.column = Some(value),
                "direction" | "mode" => {
                    param.direction = ParameterDirection::parse(&value).ok_or_else(|| {
                        Error::config(format!("unknown parameter direction '{}'", value))
                    })?
                }
                other => {
                    return Err(Error::config(format!(
                        "unknown inline parameter attribute '{}' in '#{}#'",
                        other, token
                    )))
                }
            }
        }
        return Ok(param);
    }

    let mut parts = token.split(':');
    let property = parts.next().unwrap_or_default().trim();
    let mut param = ParameterProperty::new(property);
    if let Some(db_type) = parts.next() {
        param.db_type = Some(db_type.trim().to_string());
    }
    if let Some(null_value) = parts.next() {
        param.null_value = Some(null_value.trim().to_string());
    }
    if parts.next().is_some() {
        return Err(Error::config(format!(
            "too many ':' sections in inline parameter '#{}#'",
            token
        )));
    }
    Ok(param)
}

/// Collapse whitespace runs to one space outside single-quoted literals and
/// trim both ends.
pub fn normalize_whitespace(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut in_literal = false;
    let mut pending_space = false;

    for ch in sql.chars() {
        if in_literal {
            out.push(ch);
            if ch == '\'' {
                in_literal = false;
            }
            continue;
        }
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        if ch == '\'' {
            in_literal = true;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_markers() {
        let pieces = split_markers("a = #a# AND b = ##x", '#', true).unwrap();
        assert_eq!(
            pieces,
            vec![
                Piece::Text("a = "),
                Piece::Marker("a"),
                Piece::Text(" AND b = "),
                Piece::Text("#"),
                Piece::Text("x"),
            ]
        );
        assert!(split_markers("a = #a", '#', true).is_err());
        assert_eq!(
            split_markers("cost $5", '$', false).unwrap(),
            vec![Piece::Text("cost "), Piece::Text("$5")]
        );
    }

    #[test]
    fn test_substitute_unescapes_and_keeps_non_paths() {
        let out = substitute("a $x$ '$$' '$ 5 $' $", |token| Ok(token.to_uppercase())).unwrap();
        assert_eq!(out, "a X '$' '$ 5 $' $");
        assert!(substitute("$x$", |_| Err(Error::config("no"))).is_err());
    }

    #[test]
    fn test_has_substitution() {
        assert!(has_substitution("ORDER BY $column$"));
        assert!(!has_substitution("WHERE price = '$ 5 $'"));
        assert!(!has_substitution("no markers"));
    }

    #[test]
    fn test_parse_inline_long_form() {
        let param = parse_inline("total, type=int, dbType=INTEGER, direction=Output, nullValue=-1").unwrap();
        assert_eq!(param.property, "total");
        assert_eq!(param.type_name.as_deref(), Some("int"));
        assert_eq!(param.db_type.as_deref(), Some("INTEGER"));
        assert_eq!(param.direction, ParameterDirection::Output);
        assert_eq!(param.null_value.as_deref(), Some("-1"));

        assert!(parse_inline("x,color=red").is_err());
        assert!(parse_inline("x,direction=sideways").is_err());
    }

    #[test]
    fn test_parse_inline_short_form() {
        let param = parse_inline("name:VARCHAR:NO_NAME").unwrap();
        assert_eq!(param.property, "name");
        assert_eq!(param.db_type.as_deref(), Some("VARCHAR"));
        assert_eq!(param.null_value.as_deref(), Some("NO_NAME"));

        let param = parse_inline("ids[0]").unwrap();
        assert_eq!(param.property, "ids[0]");
        assert_eq!(param.direction, ParameterDirection::Input);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("  SELECT *\n  FROM t   WHERE a = '  x  ' "),
            "SELECT * FROM t WHERE a = '  x  '"
        );
    }
}
