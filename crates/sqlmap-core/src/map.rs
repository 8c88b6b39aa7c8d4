//! The engine context.
//!
//! [`SqlMapBuilder`] collects descriptors, resolves every reference between
//! them once and produces an immutable [`SqlMap`]. Extends chains are
//! flattened, includes are expanded, namespaced references are rewritten to
//! the ids they resolve to and statement SQL is compiled.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use sqlmap_lang::SqlNode;
use tracing::debug;

use crate::cache::CacheModel;
use crate::capability::{
    ObjectAccessor, ObjectFactory, PropertyAccessor, RecordFactory, TypeHandler,
    TypeHandlerRegistry,
};
use crate::config::MapperSettings;
use crate::error::{Error, Result};
use crate::exec::{ExecutionEvent, ExecutionListener};
use crate::mapping::{
    CacheModelDef, ParameterMap, ParameterProperty, ResultMap, ResultProperty, SelectKey,
    SqlFragment, StatementDef, StatementKind,
};
use crate::sql::Sql;

const MAX_INCLUDE_DEPTH: usize = 32;

/// A statement ready to execute.
#[derive(Debug)]
pub struct MappedStatement {
    def: StatementDef,
    sql: Sql,
    parameters: Option<Vec<ParameterProperty>>,
    select_key: Option<(SelectKey, Sql)>,
    cache: Option<Arc<CacheModel>>,
}

impl MappedStatement {
    pub fn id(&self) -> &str {
        &self.def.id
    }

    pub fn kind(&self) -> StatementKind {
        self.def.kind
    }

    /// The descriptor, with references rewritten to resolved ids.
    pub fn def(&self) -> &StatementDef {
        &self.def
    }

    pub fn sql(&self) -> &Sql {
        &self.sql
    }

    /// Properties of the declared parameter map, flattened.
    pub fn declared_parameters(&self) -> Option<&[ParameterProperty]> {
        self.parameters.as_deref()
    }

    pub fn select_key(&self) -> Option<(&SelectKey, &Sql)> {
        self.select_key.as_ref().map(|(key, sql)| (key, sql))
    }

    pub fn cache(&self) -> Option<&Arc<CacheModel>> {
        self.cache.as_ref()
    }
}

/// Immutable engine context shared by every session of one mapper.
pub struct SqlMap {
    settings: MapperSettings,
    handlers: TypeHandlerRegistry,
    accessor: Arc<dyn PropertyAccessor>,
    factory: Arc<dyn ObjectFactory>,
    statements: HashMap<String, MappedStatement>,
    result_maps: HashMap<String, ResultMap>,
    parameter_maps: HashMap<String, ParameterMap>,
    cache_models: HashMap<String, Arc<CacheModel>>,
    triggers: HashMap<String, Vec<Arc<CacheModel>>>,
    listeners: RwLock<Vec<Arc<dyn ExecutionListener>>>,
}

impl std::fmt::Debug for SqlMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlMap")
            .field("settings", &self.settings)
            .field("statements", &self.statements.len())
            .field("result_maps", &self.result_maps.len())
            .field("cache_models", &self.cache_models.len())
            .finish()
    }
}

impl SqlMap {
    pub fn builder() -> SqlMapBuilder {
        SqlMapBuilder::new()
    }

    pub fn settings(&self) -> &MapperSettings {
        &self.settings
    }

    pub fn handlers(&self) -> &TypeHandlerRegistry {
        &self.handlers
    }

    pub fn accessor(&self) -> &dyn PropertyAccessor {
        self.accessor.as_ref()
    }

    pub fn factory(&self) -> &dyn ObjectFactory {
        self.factory.as_ref()
    }

    /// Look up a statement by id.
    pub fn statement(&self, id: &str) -> Result<&MappedStatement> {
        self.statements
            .get(id)
            .ok_or_else(|| Error::config(format!("no statement named '{}'", id)))
    }

    /// Look up a flattened result map by id.
    pub fn result_map(&self, id: &str) -> Result<&ResultMap> {
        self.result_maps
            .get(id)
            .ok_or_else(|| Error::config(format!("no result map named '{}'", id)))
    }

    /// Look up a flattened parameter map by id.
    pub fn parameter_map(&self, id: &str) -> Result<&ParameterMap> {
        self.parameter_maps
            .get(id)
            .ok_or_else(|| Error::config(format!("no parameter map named '{}'", id)))
    }

    pub fn cache_model(&self, id: &str) -> Option<&Arc<CacheModel>> {
        self.cache_models.get(id)
    }

    /// Ids of all statements, sorted.
    pub fn statement_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.statements.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Hit ratio of the cache behind a statement. `None` when the statement
    /// is uncached or its cache has not been consulted yet.
    pub fn cache_hit_ratio(&self, statement: &str) -> Result<Option<f64>> {
        Ok(self
            .statement(statement)?
            .cache()
            .and_then(|cache| cache.hit_ratio()))
    }

    /// Flush every cache model.
    pub fn flush_caches(&self) {
        for cache in self.cache_models.values() {
            cache.flush();
        }
    }

    /// Register a listener for execution events.
    pub fn subscribe(&self, listener: Arc<dyn ExecutionListener>) {
        self.listeners.write().push(listener);
    }

    pub(crate) fn notify(&self, event: &ExecutionEvent) {
        for listener in self.listeners.read().iter() {
            listener.on_executed(event);
        }
    }

    /// Flush the caches that list `statement` as a trigger.
    pub(crate) fn flush_triggered_by(&self, statement: &str) {
        if let Some(caches) = self.triggers.get(statement) {
            for cache in caches {
                debug!(statement, cache = cache.id(), "trigger flush");
                cache.flush();
            }
        }
    }
}

/// Assembles a [`SqlMap`].
pub struct SqlMapBuilder {
    settings: MapperSettings,
    handlers: TypeHandlerRegistry,
    accessor: Arc<dyn PropertyAccessor>,
    factory: Arc<dyn ObjectFactory>,
    statements: Vec<StatementDef>,
    result_maps: Vec<ResultMap>,
    parameter_maps: Vec<ParameterMap>,
    cache_models: Vec<CacheModelDef>,
    fragments: Vec<SqlFragment>,
}

impl Default for SqlMapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlMapBuilder {
    pub fn new() -> Self {
        Self {
            settings: MapperSettings::default(),
            handlers: TypeHandlerRegistry::new(),
            accessor: Arc::new(ObjectAccessor),
            factory: Arc::new(RecordFactory),
            statements: Vec::new(),
            result_maps: Vec::new(),
            parameter_maps: Vec::new(),
            cache_models: Vec::new(),
            fragments: Vec::new(),
        }
    }

    pub fn settings(mut self, settings: MapperSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn type_handler(mut self, type_name: &str, handler: Arc<dyn TypeHandler>) -> Self {
        self.handlers.register(type_name, handler);
        self
    }

    pub fn type_handler_for_db_type(
        mut self,
        type_name: &str,
        db_type: &str,
        handler: Arc<dyn TypeHandler>,
    ) -> Self {
        self.handlers.register_for_db_type(type_name, db_type, handler);
        self
    }

    pub fn accessor(mut self, accessor: Arc<dyn PropertyAccessor>) -> Self {
        self.accessor = accessor;
        self
    }

    pub fn factory(mut self, factory: Arc<dyn ObjectFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn statement(mut self, statement: StatementDef) -> Self {
        self.statements.push(statement);
        self
    }

    pub fn result_map(mut self, map: ResultMap) -> Self {
        self.result_maps.push(map);
        self
    }

    pub fn parameter_map(mut self, map: ParameterMap) -> Self {
        self.parameter_maps.push(map);
        self
    }

    pub fn cache_model(mut self, model: CacheModelDef) -> Self {
        self.cache_models.push(model);
        self
    }

    pub fn fragment(mut self, fragment: SqlFragment) -> Self {
        self.fragments.push(fragment);
        self
    }

    /// Resolve and validate everything.
    pub fn build(self) -> Result<SqlMap> {
        let resolver = Resolver {
            namespaces: self.settings.use_statement_namespaces,
        };

        let raw_results = index_unique("result map", self.result_maps, |m| &m.id)?;
        let raw_params = index_unique("parameter map", self.parameter_maps, |m| &m.id)?;
        let fragments = index_unique("sql fragment", self.fragments, |f| &f.id)?;
        let cache_defs = index_unique("cache model", self.cache_models, |c| &c.id)?;
        let statement_defs = index_unique("statement", self.statements, |s| &s.id)?;

        let mut result_maps = HashMap::new();
        for id in raw_results.keys() {
            flatten(&resolver, id, &raw_results, &mut result_maps, &mut Vec::new(), inherit_result_map)?;
        }
        for map in result_maps.values_mut() {
            resolve_result_map(&resolver, map, &raw_results, &statement_defs, &self.handlers)?;
        }

        let mut parameter_maps = HashMap::new();
        for id in raw_params.keys() {
            flatten(&resolver, id, &raw_params, &mut parameter_maps, &mut Vec::new(), inherit_parameter_map)?;
        }
        for map in parameter_maps.values() {
            for property in &map.properties {
                self.handlers
                    .resolve(property.handler_type(), property.db_type.as_deref())
                    .map_err(|e| in_context(e, "parameter map", &map.id))?;
            }
        }

        let cache_models: HashMap<String, Arc<CacheModel>> = cache_defs
            .iter()
            .map(|(id, def)| {
                let model = CacheModel::from_def(def, self.settings.default_cache_capacity);
                (id.clone(), Arc::new(model))
            })
            .collect();

        let mut triggers: HashMap<String, Vec<Arc<CacheModel>>> = HashMap::new();
        for (id, def) in &cache_defs {
            for trigger in &def.flush_on_execute {
                let statement =
                    resolver.resolve(id, trigger, "statement", |s| statement_defs.contains_key(s))?;
                triggers
                    .entry(statement)
                    .or_default()
                    .push(Arc::clone(&cache_models[id]));
            }
        }

        let fragment_nodes: HashMap<String, Vec<SqlNode>> = fragments
            .into_iter()
            .map(|(id, fragment)| (id, fragment.nodes))
            .collect();

        let mut statements = HashMap::new();
        for (id, mut def) in statement_defs {
            def.sql = expand_includes(&resolver, &id, std::mem::take(&mut def.sql), &fragment_nodes, 0)?;

            let parameters = match def.parameter_map.take() {
                Some(reference) => {
                    let resolved = resolver.resolve(&id, &reference, "parameter map", |m| {
                        parameter_maps.contains_key(m)
                    })?;
                    let properties = parameter_maps[&resolved].properties.clone();
                    def.parameter_map = Some(resolved);
                    Some(properties)
                }
                None => None,
            };

            def.result_maps = def
                .result_maps
                .iter()
                .map(|reference| {
                    resolver.resolve(&id, reference, "result map", |m| result_maps.contains_key(m))
                })
                .collect::<Result<_>>()?;

            let cache = match def.cache_model.take() {
                Some(reference) => {
                    let resolved = resolver.resolve(&id, &reference, "cache model", |c| {
                        cache_models.contains_key(c)
                    })?;
                    let cache = Arc::clone(&cache_models[&resolved]);
                    def.cache_model = Some(resolved);
                    Some(cache)
                }
                None => None,
            };

            let select_key = match def.select_key.clone() {
                Some(mut key) => {
                    if def.kind != StatementKind::Insert {
                        return Err(Error::config(format!(
                            "statement '{}' declares a select key but is not an insert",
                            id
                        )));
                    }
                    key.sql = expand_includes(&resolver, &id, std::mem::take(&mut key.sql), &fragment_nodes, 0)?;
                    let sql = Sql::compile(key.sql.clone(), true)?;
                    Some((key, sql))
                }
                None => None,
            };

            let sql = Sql::compile(def.sql.clone(), parameters.is_none())?;
            debug!(statement = %id, dynamic = sql.is_dynamic(), "statement compiled");
            statements.insert(
                id,
                MappedStatement {
                    def,
                    sql,
                    parameters,
                    select_key,
                    cache,
                },
            );
        }

        Ok(SqlMap {
            settings: self.settings,
            handlers: self.handlers,
            accessor: self.accessor,
            factory: self.factory,
            statements,
            result_maps,
            parameter_maps,
            cache_models,
            triggers,
            listeners: RwLock::new(Vec::new()),
        })
    }
}

fn index_unique<T>(
    kind: &str,
    items: Vec<T>,
    id: impl Fn(&T) -> &String,
) -> Result<HashMap<String, T>> {
    let mut index = HashMap::with_capacity(items.len());
    for item in items {
        let key = id(&item).clone();
        if key.is_empty() {
            return Err(Error::config(format!("{} without an id", kind)));
        }
        if index.insert(key.clone(), item).is_some() {
            return Err(Error::config(format!("duplicate {} id '{}'", kind, key)));
        }
    }
    Ok(index)
}

fn in_context(error: Error, kind: &str, id: &str) -> Error {
    match error {
        Error::Configuration(message) => Error::config(format!("{} '{}': {}", kind, id, message)),
        other => other,
    }
}

/// Reference resolution, optionally relative to the referencing namespace.
struct Resolver {
    namespaces: bool,
}

impl Resolver {
    fn resolve(
        &self,
        owner: &str,
        reference: &str,
        kind: &str,
        exists: impl Fn(&str) -> bool,
    ) -> Result<String> {
        if exists(reference) {
            return Ok(reference.to_string());
        }
        if self.namespaces {
            if let Some((namespace, _)) = owner.rsplit_once('.') {
                let qualified = format!("{}.{}", namespace, reference);
                if exists(&qualified) {
                    return Ok(qualified);
                }
            }
        }
        Err(Error::config(format!(
            "{} '{}' referenced from '{}' is not defined",
            kind, reference, owner
        )))
    }
}

trait Extends: Clone {
    fn parent(&self) -> Option<&str>;
}

impl Extends for ResultMap {
    fn parent(&self) -> Option<&str> {
        self.extends.as_deref()
    }
}

impl Extends for ParameterMap {
    fn parent(&self) -> Option<&str> {
        self.extends.as_deref()
    }
}

fn flatten<T: Extends>(
    resolver: &Resolver,
    id: &str,
    raw: &HashMap<String, T>,
    done: &mut HashMap<String, T>,
    visiting: &mut Vec<String>,
    inherit: fn(&T, T) -> T,
) -> Result<()> {
    if done.contains_key(id) {
        return Ok(());
    }
    if visiting.iter().any(|v| v == id) {
        visiting.push(id.to_string());
        return Err(Error::config(format!(
            "extends cycle: {}",
            visiting.join(" -> ")
        )));
    }
    let item = raw[id].clone();
    let Some(parent_ref) = item.parent().map(str::to_string) else {
        done.insert(id.to_string(), item);
        return Ok(());
    };
    let parent_id = resolver.resolve(id, &parent_ref, "extended map", |p| raw.contains_key(p))?;

    visiting.push(id.to_string());
    flatten(resolver, &parent_id, raw, done, visiting, inherit)?;
    visiting.pop();

    let merged = inherit(&done[&parent_id], item);
    done.insert(id.to_string(), merged);
    Ok(())
}

fn merge_properties<P: Clone>(
    parent: &[P],
    child: Vec<P>,
    name: impl Fn(&P) -> &str,
) -> Vec<P> {
    let mut merged = parent.to_vec();
    for property in child {
        match merged.iter_mut().find(|p| name(p) == name(&property)) {
            Some(slot) => *slot = property,
            None => merged.push(property),
        }
    }
    merged
}

fn inherit_result_map(parent: &ResultMap, child: ResultMap) -> ResultMap {
    ResultMap {
        id: child.id,
        class: if child.class.is_empty() {
            parent.class.clone()
        } else {
            child.class
        },
        properties: merge_properties(&parent.properties, child.properties, |p| &p.property),
        constructor: if child.constructor.is_empty() {
            parent.constructor.clone()
        } else {
            child.constructor
        },
        discriminator: child.discriminator.or_else(|| parent.discriminator.clone()),
        group_by: if child.group_by.is_empty() {
            parent.group_by.clone()
        } else {
            child.group_by
        },
        extends: None,
    }
}

fn inherit_parameter_map(parent: &ParameterMap, child: ParameterMap) -> ParameterMap {
    ParameterMap {
        id: child.id,
        class: child.class.or_else(|| parent.class.clone()),
        properties: merge_properties(&parent.properties, child.properties, |p| &p.property),
        extends: None,
    }
}

fn resolve_result_map(
    resolver: &Resolver,
    map: &mut ResultMap,
    result_maps: &HashMap<String, ResultMap>,
    statements: &HashMap<String, StatementDef>,
    handlers: &TypeHandlerRegistry,
) -> Result<()> {
    let owner = map.id.clone();

    for argument in &map.constructor {
        if argument.result_map.is_some() || argument.select.is_some() {
            return Err(Error::config(format!(
                "constructor argument '{}' of result map '{}' cannot use a nested map or select",
                argument.property, owner
            )));
        }
    }

    for property in map.properties.iter_mut().chain(map.constructor.iter_mut()) {
        resolve_result_property(resolver, &owner, property, result_maps, statements, handlers)?;
    }

    for name in &map.group_by {
        if map.find_property(name).is_none() {
            return Err(Error::config(format!(
                "groupBy property '{}' of result map '{}' has no matching result property",
                name, owner
            )));
        }
    }

    if let Some(discriminator) = &mut map.discriminator {
        handlers
            .resolve(discriminator.type_name.as_deref(), None)
            .map_err(|e| in_context(e, "result map", &owner))?;
        for sub_map in &mut discriminator.sub_maps {
            sub_map.result_map = resolver.resolve(&owner, &sub_map.result_map, "result map", |m| {
                result_maps.contains_key(m)
            })?;
        }
    }
    Ok(())
}

fn resolve_result_property(
    resolver: &Resolver,
    owner: &str,
    property: &mut ResultProperty,
    result_maps: &HashMap<String, ResultMap>,
    statements: &HashMap<String, StatementDef>,
    handlers: &TypeHandlerRegistry,
) -> Result<()> {
    if let Some(reference) = &property.result_map {
        property.result_map = Some(resolver.resolve(owner, reference, "result map", |m| {
            result_maps.contains_key(m)
        })?);
    }
    if let Some(reference) = &property.select {
        property.select = Some(resolver.resolve(owner, reference, "statement", |s| {
            statements.contains_key(s)
        })?);
        if let Some(Err(message)) = property.composite_columns() {
            return Err(Error::config(format!("result map '{}': {}", owner, message)));
        }
    }
    handlers
        .resolve(property.type_name.as_deref(), property.db_type.as_deref())
        .map_err(|e| in_context(e, "result map", owner))?;
    Ok(())
}

fn expand_includes(
    resolver: &Resolver,
    owner: &str,
    nodes: Vec<SqlNode>,
    fragments: &HashMap<String, Vec<SqlNode>>,
    depth: usize,
) -> Result<Vec<SqlNode>> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(Error::config(format!(
            "include nesting too deep in '{}' (circular include?)",
            owner
        )));
    }
    let mut expanded = Vec::with_capacity(nodes.len());
    for mut node in nodes {
        match node {
            SqlNode::Include(include) => {
                let id = resolver.resolve(owner, &include.refid, "sql fragment", |f| {
                    fragments.contains_key(f)
                })?;
                let body = fragments[&id].clone();
                expanded.extend(expand_includes(resolver, &id, body, fragments, depth + 1)?);
            }
            _ => {
                if let Some(children) = node.children_mut() {
                    let taken = std::mem::take(children);
                    *children = expand_includes(resolver, owner, taken, fragments, depth)?;
                }
                expanded.push(node);
            }
        }
    }
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{Discriminator, KeyTiming};

    fn select(id: &str, sql: &str) -> StatementDef {
        StatementDef::select(id, sql).unwrap()
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = SqlMap::builder()
            .statement(select("a", "SELECT 1"))
            .statement(select("a", "SELECT 2"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(m) if m.contains("duplicate statement")));
    }

    #[test]
    fn test_include_expanded_and_missing_include_rejected() {
        let map = SqlMap::builder()
            .fragment(SqlFragment::new("cols", "id, name").unwrap())
            .statement(select("list", "SELECT <include refid=\"cols\"/> FROM t"))
            .build()
            .unwrap();
        let statement = map.statement("list").unwrap();
        assert!(!statement.sql().is_dynamic());
        let request = statement
            .sql()
            .request(&sqlmap_value::Value::Null, map.accessor())
            .unwrap();
        assert_eq!(request.text, "SELECT id, name FROM t");

        let err = SqlMap::builder()
            .statement(select("list", "SELECT <include refid=\"nope\"/> FROM t"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_circular_include_rejected() {
        let err = SqlMap::builder()
            .fragment(SqlFragment::new("a", "<include refid=\"b\"/>").unwrap())
            .fragment(SqlFragment::new("b", "<include refid=\"a\"/>").unwrap())
            .statement(select("s", "SELECT <include refid=\"a\"/>"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(m) if m.contains("too deep")));
    }

    #[test]
    fn test_extends_flattened_child_wins() {
        let map = SqlMap::builder()
            .result_map(
                ResultMap::new("base", "Animal")
                    .property(ResultProperty::new("id").column("ID"))
                    .property(ResultProperty::new("name").column("NAME")),
            )
            .result_map(
                ResultMap::new("dog", "Dog")
                    .extends("base")
                    .property(ResultProperty::new("name").column("DOG_NAME"))
                    .property(ResultProperty::new("breed")),
            )
            .build()
            .unwrap();

        let dog = map.result_map("dog").unwrap();
        let columns: Vec<&str> = dog.properties.iter().map(|p| p.column_name()).collect();
        assert_eq!(columns, vec!["ID", "DOG_NAME", "breed"]);
        assert_eq!(dog.class, "Dog");
        assert_eq!(dog.extends, None);
    }

    #[test]
    fn test_extends_cycle_rejected() {
        let err = SqlMap::builder()
            .result_map(ResultMap::new("a", "A").extends("b"))
            .result_map(ResultMap::new("b", "B").extends("a"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(m) if m.contains("cycle")));
    }

    #[test]
    fn test_namespaced_references() {
        let settings = MapperSettings::new().with_statement_namespaces(true);
        let map = SqlMap::builder()
            .settings(settings)
            .result_map(ResultMap::new("Orders.order", "Order").property(ResultProperty::new("id")))
            .cache_model(CacheModelDef::lru("Orders.cache", 2).flush_on_execute("insertOrder"))
            .statement(select("Orders.get", "SELECT 1").result_map("order").cache_model("cache"))
            .statement(StatementDef::insert("Orders.insertOrder", "INSERT").unwrap())
            .build()
            .unwrap();

        let def = map.statement("Orders.get").unwrap().def();
        assert_eq!(def.result_maps, vec!["Orders.order".to_string()]);
        assert_eq!(def.cache_model.as_deref(), Some("Orders.cache"));
        assert!(map.triggers.contains_key("Orders.insertOrder"));
    }

    #[test]
    fn test_references_validated() {
        let err = SqlMap::builder()
            .statement(select("s", "SELECT 1").result_map("missing"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(m) if m.contains("missing")));

        let err = SqlMap::builder()
            .result_map(
                ResultMap::new("m", "M")
                    .property(ResultProperty::new("id"))
                    .group_by(["nope"]),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(m) if m.contains("groupBy")));

        let err = SqlMap::builder()
            .result_map(
                ResultMap::new("m", "M").discriminator(Discriminator::new("t").sub_map("A", "x")),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = SqlMap::builder()
            .result_map(ResultMap::new("m", "M").property(ResultProperty::new("id").type_name("uuid")))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(m) if m.contains("result map 'm'")));
    }

    #[test]
    fn test_parameter_map_makes_sql_positional() {
        let map = SqlMap::builder()
            .parameter_map(
                ParameterMap::new("p")
                    .property(ParameterProperty::new("a"))
                    .property(ParameterProperty::new("b")),
            )
            .statement(
                StatementDef::update("u", "UPDATE t SET a = ? WHERE b = ?")
                    .unwrap()
                    .parameter_map("p"),
            )
            .build()
            .unwrap();
        let statement = map.statement("u").unwrap();
        assert_eq!(statement.declared_parameters().map(|p| p.len()), Some(2));
    }

    #[test]
    fn test_select_key_only_on_inserts() {
        let key = SelectKey::new("id", "SELECT 1", KeyTiming::Post).unwrap();
        let err = SqlMap::builder()
            .statement(StatementDef::update("u", "UPDATE t").unwrap().select_key(key))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
