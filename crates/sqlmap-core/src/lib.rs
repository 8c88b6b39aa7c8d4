//! sqlmap core - the statement execution pipeline.
//!
//! Statements, result maps, parameter maps and cache models are described
//! with the types in [`mapping`] and assembled by [`SqlMapBuilder`] into an
//! immutable [`SqlMap`]. A [`SqlMapper`] pairs the map with a
//! [`driver::DataSource`] and opens [`Session`]s that execute statements:
//!
//! ```ignore
//! let map = SqlMap::builder()
//!     .statement(StatementDef::select(
//!         "findUsers",
//!         "SELECT * FROM users <dynamic prepend=\"WHERE\">\
//!            <isNotNull prepend=\"AND\" property=\"name\">name = #name#</isNotNull>\
//!          </dynamic>",
//!     )?)
//!     .build()?;
//! let mapper = SqlMapper::new(map, data_source);
//! let users = mapper.query_for_list("findUsers", &params)?;
//! ```

pub mod binding;
pub mod cache;
pub mod capability;
pub mod config;
pub mod driver;
pub mod error;
pub mod exec;
pub mod map;
pub mod mapper;
pub mod mapping;
pub mod metrics;
pub mod result;
pub mod sql;

pub use binding::{OutputValue, ParameterBinder};
pub use cache::{CacheController, CacheEntry, CacheKey, CacheModel};
pub use capability::{
    ObjectAccessor, ObjectFactory, PropertyAccessor, PropertyPath, RecordFactory, TypeHandler,
    TypeHandlerRegistry,
};
pub use config::MapperSettings;
pub use driver::{
    ColumnRef, Command, CommandKind, Connection, DataSource, DbParameter, DriverError,
    ParameterDirection, Row, RowReader,
};
pub use error::{Error, Result};
pub use exec::{CacheOutcome, ExecutionEvent, ExecutionListener, Session};
pub use map::{MappedStatement, SqlMap, SqlMapBuilder};
pub use mapper::SqlMapper;
pub use mapping::{
    CacheModelDef, CachePolicy, Discriminator, KeyTiming, ParameterMap, ParameterProperty,
    ResultMap, ResultProperty, SelectKey, SqlFragment, StatementDef, StatementKind,
};
pub use metrics::{new_shared_registry, MetricsRegistry, SharedMetricsRegistry};
pub use sql::{RequestSql, Sql};
