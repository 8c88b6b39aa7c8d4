//! sqlmap - maps named, parameterized SQL statements to object graphs.
//!
//! Statements are written as SQL with a small tag vocabulary for conditional
//! fragments and lists. At call time the template is evaluated against a
//! parameter object, executed through a driver, and the rows are mapped back
//! into nested objects, optionally behind a per-statement cache.
//!
//! # Crates
//!
//! - [`value`] - runtime values and objects
//! - [`lang`] - template parsing
//! - [`core`] - the execution pipeline
//! - `sqlite` (feature `sqlite`) - a SQLite driver
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sqlmap::{SqlMap, SqlMapper, StatementDef, Value};
//! use sqlmap::sqlite::SqliteDataSource;
//!
//! let map = SqlMap::builder()
//!     .statement(StatementDef::select(
//!         "usersIn",
//!         "SELECT * FROM users WHERE id IN \
//!          <iterate property=\"ids\" open=\"(\" close=\")\" conjunction=\",\">#ids[]#</iterate>",
//!     )?)
//!     .build()?;
//! let mapper = SqlMapper::new(map, Arc::new(SqliteDataSource::new("app.db")));
//! let users = mapper.query_for_list("usersIn", &params)?;
//! ```

pub use sqlmap_core as core;
pub use sqlmap_lang as lang;
pub use sqlmap_value as value;

#[cfg(feature = "sqlite")]
pub use sqlmap_sqlite as sqlite;

pub use sqlmap_core::{
    new_shared_registry, CacheModelDef, CachePolicy, DataSource, Discriminator, Error,
    ExecutionEvent, ExecutionListener, KeyTiming, MapperSettings, MetricsRegistry, ParameterMap,
    ParameterProperty, Result, ResultMap, ResultProperty, SelectKey, Session, SqlFragment, SqlMap,
    SqlMapBuilder, SqlMapper, StatementDef, StatementKind,
};
pub use sqlmap_lang::{parse_template, ParseError};
pub use sqlmap_value::{Deferred, Object, Value};
