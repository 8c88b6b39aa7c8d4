//! Dynamic SQL template language for sqlmap.
//!
//! Statement SQL is written as text interleaved with a small fixed set of
//! tags that decide, per call, which fragments are emitted:
//!
//! ```text
//! SELECT * FROM orders
//! <dynamic prepend="WHERE">
//!   <isNotNull prepend="AND" property="status">status = #status#</isNotNull>
//!   <iterate prepend="AND" property="ids" open="id IN (" close=")" conjunction=",">#ids[]#</iterate>
//! </dynamic>
//! ```
//!
//! This crate only parses templates into a [`SqlNode`] tree. Evaluation
//! against a parameter object happens in `sqlmap-core`.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod span;

pub use ast::{CompareTarget, ConditionKind, Conditional, Dynamic, Include, Iterate, SqlNode};
pub use error::ParseError;
pub use lexer::{tokenize, SpannedToken, Token};
pub use span::{Location, Span};

/// Parse a SQL template into its node tree.
///
/// # Example
///
/// ```
/// use sqlmap_lang::{parse_template, SqlNode};
///
/// let nodes = parse_template("SELECT * FROM users WHERE id = #id#").unwrap();
/// assert_eq!(nodes, vec![SqlNode::text("SELECT * FROM users WHERE id = #id#")]);
/// ```
pub fn parse_template(source: &str) -> Result<Vec<SqlNode>, ParseError> {
    parser::Parser::new(source).parse()
}
