//! SQL text production.
//!
//! A statement's template is compiled once into a [`Sql`]: templates without
//! tags or `$prop$` substitutions become [`Sql::Static`] and have their
//! placeholders and parameter list computed up front; everything else is
//! [`Sql::Dynamic`] and is evaluated on every call.

pub mod evaluator;
pub mod inline;

use sqlmap_lang::SqlNode;
use sqlmap_value::Value;

use crate::capability::PropertyAccessor;
use crate::error::Error;
use crate::mapping::ParameterProperty;

use inline::{
    has_substitution, normalize_whitespace, parse_inline, split_markers, substitute, Piece,
};

/// SQL text and parameter list for one call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestSql {
    pub text: String,
    /// Inline parameters in placeholder order. Empty when the statement
    /// declares a parameter map.
    pub parameters: Vec<ParameterProperty>,
}

/// Compiled statement SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum Sql {
    /// Text and parameters that do not depend on the parameter object.
    Static(RequestSql),
    /// A template evaluated per call.
    Dynamic {
        nodes: Vec<SqlNode>,
        inline_params: bool,
    },
}

impl Sql {
    /// Compile an include-free template.
    ///
    /// With `inline_params` unset, `#...#` markers are not interpreted and
    /// the statement binds from its declared parameter map.
    pub fn compile(nodes: Vec<SqlNode>, inline_params: bool) -> Result<Self, Error> {
        let is_dynamic = nodes.iter().any(|node| match node {
            SqlNode::Text(text) => has_substitution(text),
            _ => true,
        });
        if is_dynamic {
            return Ok(Sql::Dynamic {
                nodes,
                inline_params,
            });
        }

        let text: String = nodes
            .iter()
            .filter_map(|node| match node {
                SqlNode::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();

        // No `$prop$` tokens remain here, only `$$` escapes and stray `$`.
        let literal = |t: &str| substitute(t, |token| Ok(format!("${}$", token)));

        if !inline_params {
            return Ok(Sql::Static(RequestSql {
                text: normalize_whitespace(&literal(&text)?),
                parameters: Vec::new(),
            }));
        }

        let mut sql = String::with_capacity(text.len());
        let mut parameters = Vec::new();
        for piece in split_markers(&text, '#', true)? {
            match piece {
                Piece::Text(t) => sql.push_str(&literal(t)?),
                Piece::Marker(token) => {
                    parameters.push(parse_inline(token)?);
                    sql.push('?');
                }
            }
        }
        Ok(Sql::Static(RequestSql {
            text: normalize_whitespace(&sql),
            parameters,
        }))
    }

    /// Whether the SQL must be evaluated per call.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Sql::Dynamic { .. })
    }

    /// Produce the SQL for one call.
    pub fn request(
        &self,
        parameter: &Value,
        accessor: &dyn PropertyAccessor,
    ) -> Result<RequestSql, Error> {
        match self {
            Sql::Static(request) => Ok(request.clone()),
            Sql::Dynamic {
                nodes,
                inline_params,
            } => evaluator::evaluate(nodes, parameter, accessor, *inline_params),
        }
    }
}
