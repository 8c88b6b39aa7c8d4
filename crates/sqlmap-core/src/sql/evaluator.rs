//! Evaluation of a template tree against a parameter object.

use std::cmp::Ordering;

use sqlmap_lang::{CompareTarget, ConditionKind, Conditional, Iterate, SqlNode};
use sqlmap_value::Value;

use crate::capability::PropertyAccessor;
use crate::error::Error;
use crate::mapping::ParameterProperty;

use super::inline::{self, normalize_whitespace, parse_inline, split_markers, Piece};
use super::RequestSql;

/// Evaluate `nodes` against `parameter`.
///
/// With `inline_params` set, `#prop#` markers become `?` placeholders and
/// are collected in order; otherwise the text is kept as written.
pub fn evaluate(
    nodes: &[SqlNode],
    parameter: &Value,
    accessor: &dyn PropertyAccessor,
    inline_params: bool,
) -> Result<RequestSql, Error> {
    let mut evaluator = Evaluator {
        accessor,
        parameter,
        inline_params,
        sql: String::new(),
        parameters: Vec::new(),
        scopes: Vec::new(),
        iterations: Vec::new(),
    };
    evaluator.eval_nodes(nodes)?;
    Ok(RequestSql {
        text: normalize_whitespace(&evaluator.sql),
        parameters: evaluator.parameters,
    })
}

/// Per-call evaluation state.
struct Evaluator<'a> {
    accessor: &'a dyn PropertyAccessor,
    parameter: &'a Value,
    inline_params: bool,
    sql: String,
    parameters: Vec<ParameterProperty>,
    /// Start offsets of the enclosing `<dynamic>` blocks.
    scopes: Vec<usize>,
    /// Enclosing iterations: resolved collection path and current index.
    iterations: Vec<(String, usize)>,
}

impl Evaluator<'_> {
    fn eval_nodes(&mut self, nodes: &[SqlNode]) -> Result<(), Error> {
        for node in nodes {
            self.eval_node(node)?;
        }
        Ok(())
    }

    fn eval_node(&mut self, node: &SqlNode) -> Result<(), Error> {
        match node {
            SqlNode::Text(text) => self.append_text(text),
            SqlNode::Conditional(cond) => {
                if self.condition_holds(cond)? {
                    self.eval_tag(cond.prepend.as_deref(), false, |e| {
                        e.eval_nodes(&cond.children)
                    })?;
                }
                Ok(())
            }
            SqlNode::Iterate(iterate) => self.eval_iterate(iterate),
            SqlNode::Dynamic(dynamic) => {
                self.eval_tag(dynamic.prepend.as_deref(), true, |e| {
                    e.eval_nodes(&dynamic.children)
                })
            }
            SqlNode::Include(include) => Err(Error::config(format!(
                "unresolved include '{}'",
                include.refid
            ))),
        }
    }

    /// Whether nothing has been emitted yet in the innermost dynamic block.
    fn at_scope_start(&self) -> bool {
        self.scopes
            .last()
            .is_some_and(|&start| self.sql[start..].trim().is_empty())
    }

    /// Emit a tag body preceded by its prepend.
    ///
    /// The prepend is dropped when the tag is the first fragment of its
    /// dynamic block. If the body emits nothing, the tag leaves no trace.
    fn eval_tag<F>(&mut self, prepend: Option<&str>, opens_scope: bool, body: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Self) -> Result<(), Error>,
    {
        let mark = self.sql.len();
        let params_mark = self.parameters.len();

        if let Some(prepend) = prepend {
            if !self.at_scope_start() {
                self.sql.push(' ');
                self.sql.push_str(prepend);
                self.sql.push(' ');
            }
        }

        let body_start = self.sql.len();
        if opens_scope {
            self.scopes.push(body_start);
        }
        let result = body(self);
        if opens_scope {
            self.scopes.pop();
        }
        result?;

        if self.sql[body_start..].trim().is_empty() && self.parameters.len() == params_mark {
            self.sql.truncate(mark);
        }
        Ok(())
    }

    fn eval_iterate(&mut self, iterate: &Iterate) -> Result<(), Error> {
        let path = iterate
            .property
            .as_deref()
            .map(|p| self.resolve_path(p))
            .unwrap_or_default();
        let collection = self.property_value(&path)?;
        let count = match &collection {
            Value::Null => return Ok(()),
            Value::List(items) => items.len(),
            other => {
                return Err(Error::binding(format!(
                    "iterate property '{}' must be a list, found {}",
                    path,
                    other.type_name()
                )))
            }
        };

        self.eval_tag(iterate.prepend.as_deref(), false, |e| {
            if let Some(open) = &iterate.open {
                e.sql.push_str(open);
            }
            let mut emitted = false;
            for index in 0..count {
                let before = e.sql.len();
                let params_before = e.parameters.len();
                if emitted {
                    if let Some(conjunction) = &iterate.conjunction {
                        e.sql.push_str(conjunction);
                    }
                }
                let element_start = e.sql.len();

                e.iterations.push((path.clone(), index));
                let result = e.eval_nodes(&iterate.children);
                e.iterations.pop();
                result?;

                if e.sql[element_start..].trim().is_empty() && e.parameters.len() == params_before
                {
                    e.sql.truncate(before);
                } else {
                    emitted = true;
                }
            }
            if let Some(close) = &iterate.close {
                e.sql.push_str(close);
            }
            Ok(())
        })
    }

    fn condition_holds(&self, cond: &Conditional) -> Result<bool, Error> {
        let path = cond
            .property
            .as_deref()
            .map(|p| self.resolve_path(p))
            .unwrap_or_default();

        let holds = match cond.kind {
            ConditionKind::IsParameterPresent => !self.parameter.is_null(),
            ConditionKind::IsNotParameterPresent => self.parameter.is_null(),
            ConditionKind::IsPropertyAvailable => self.accessor.has_property(self.parameter, &path),
            ConditionKind::IsNotPropertyAvailable => {
                !self.accessor.has_property(self.parameter, &path)
            }
            ConditionKind::IsNull => self.property_value(&path)?.is_null(),
            ConditionKind::IsNotNull => !self.property_value(&path)?.is_null(),
            ConditionKind::IsEmpty => self.property_value(&path)?.is_empty(),
            ConditionKind::IsNotEmpty => !self.property_value(&path)?.is_empty(),
            kind => {
                let value = self.property_value(&path)?;
                let other = match &cond.compare {
                    Some(CompareTarget::Value(literal)) => value.coerce_literal(literal),
                    Some(CompareTarget::Property(property)) => {
                        self.property_value(&self.resolve_path(property))?
                    }
                    None => {
                        return Err(Error::config(format!(
                            "<{}> on '{}' has no compareValue or compareProperty",
                            kind.tag_name(),
                            path
                        )))
                    }
                };
                let ordering = value.compare(&other);
                match kind {
                    ConditionKind::IsEqual => ordering == Some(Ordering::Equal),
                    ConditionKind::IsNotEqual => ordering != Some(Ordering::Equal),
                    ConditionKind::IsGreaterThan => ordering == Some(Ordering::Greater),
                    ConditionKind::IsGreaterEqual => {
                        matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
                    }
                    ConditionKind::IsLessThan => ordering == Some(Ordering::Less),
                    ConditionKind::IsLessEqual => {
                        matches!(ordering, Some(Ordering::Less | Ordering::Equal))
                    }
                    _ => false,
                }
            }
        };
        Ok(holds)
    }

    /// Value at `path`; the empty path is the parameter object itself.
    fn property_value(&self, path: &str) -> Result<Value, Error> {
        if path.is_empty() {
            return Ok(self.parameter.clone());
        }
        self.accessor.get(self.parameter, path)
    }

    /// Replace `collection[]` with the index of the enclosing iteration.
    fn resolve_path(&self, raw: &str) -> String {
        let mut path = raw.trim().to_string();
        for (collection, index) in &self.iterations {
            let pattern = format!("{}[]", collection);
            if let Some(rest) = path.strip_prefix(&pattern) {
                path = format!("{}[{}]{}", collection, index, rest);
            }
        }
        path
    }

    /// Append template text. `#` markers are found in the text as written;
    /// `$` substitution only touches the pieces between them.
    fn append_text(&mut self, text: &str) -> Result<(), Error> {
        if !self.inline_params {
            let text = self.substitute(text)?;
            self.sql.push_str(&text);
            return Ok(());
        }
        for piece in split_markers(text, '#', true)? {
            match piece {
                Piece::Text(t) => {
                    let t = self.substitute(t)?;
                    self.sql.push_str(&t);
                }
                Piece::Marker(token) => {
                    let mut param = parse_inline(token)?;
                    param.property = self.resolve_path(&param.property);
                    self.parameters.push(param);
                    self.sql.push('?');
                }
            }
        }
        Ok(())
    }

    /// Replace `$prop$` markers with display values.
    fn substitute(&self, text: &str) -> Result<String, Error> {
        inline::substitute(text, |token| {
            self.property_value(&self.resolve_path(token))
                .map(|value| value.to_string())
        })
    }
}
