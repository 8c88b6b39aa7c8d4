//! Row to object mapping.

use sqlmap_value::{Deferred, Object, Value, MAP_TYPE};

use crate::capability::{PathSegment, PropertyPath, TypeHandler};
use crate::driver::{ColumnRef, Row, RowReader};
use crate::error::{Error, Result};
use crate::map::{MappedStatement, SqlMap};
use crate::mapping::{ResultMap, ResultProperty};

use super::scope::{PendingSelect, RequestScope};

const MAX_DISCRIMINATOR_DEPTH: usize = 16;

/// How rows of one result set become objects.
#[derive(Debug, Clone, Copy)]
enum RowTarget<'m> {
    Map(&'m ResultMap),
    /// Columns become members of an instance of the named class, or the
    /// first column is converted when the class names a type handler.
    Implicit(&'m str),
}

/// An object mapped from one row, with the map that produced it after
/// discrimination and the sub-selects it still needs.
struct Mapped<'m> {
    map: &'m ResultMap,
    value: Value,
    pending: Vec<PendingSelect>,
}

/// Maps rows to objects using the result maps of a [`SqlMap`].
pub struct ResultMapper<'m> {
    map: &'m SqlMap,
}

impl<'m> ResultMapper<'m> {
    pub fn new(map: &'m SqlMap) -> Self {
        Self { map }
    }

    /// Read every result set of `reader`.
    ///
    /// Result set *n* is mapped with the statement's *n*-th result map;
    /// result sets beyond the declared maps are ignored. `skip` and `max`
    /// apply to the rows of the first result set. Sub-selects are queued on
    /// `scope` rather than executed.
    pub fn read_all(
        &self,
        statement: &'m MappedStatement,
        reader: &mut dyn RowReader,
        scope: &mut RequestScope,
        skip: usize,
        max: Option<usize>,
    ) -> Result<Vec<Value>> {
        let def = statement.def();
        let mut results = Vec::new();
        let mut set = 0usize;

        loop {
            let target = match def.result_maps.get(set) {
                Some(id) => RowTarget::Map(self.map.result_map(id)?),
                None if def.result_maps.is_empty() => {
                    RowTarget::Implicit(def.result_class.as_deref().unwrap_or(MAP_TYPE))
                }
                None => break,
            };

            let mut last_group = None;
            let mut skipped = 0usize;
            let mut taken = 0usize;
            while let Some(row) = reader.next_row()? {
                if set == 0 {
                    if skipped < skip {
                        skipped += 1;
                        continue;
                    }
                    if max.is_some_and(|max| taken >= max) {
                        break;
                    }
                    taken += 1;
                }
                match target {
                    RowTarget::Implicit(class) => results.push(self.map_implicit(class, &row)?),
                    RowTarget::Map(result_map) => {
                        self.add_row(result_map, &row, &mut results, &mut last_group, scope)?
                    }
                }
            }

            if !reader.next_result()? {
                break;
            }
            set += 1;
        }
        Ok(results)
    }

    /// Pick the map a row is mapped with. `None` means the discriminator
    /// read null and the row yields no object.
    pub fn resolve_sub_map(&self, base: &'m ResultMap, row: &Row) -> Result<Option<&'m ResultMap>> {
        let map: &'m SqlMap = self.map;
        let mut current = base;
        for _ in 0..MAX_DISCRIMINATOR_DEPTH {
            let Some(discriminator) = &current.discriminator else {
                return Ok(Some(current));
            };
            let handler = map
                .handlers()
                .resolve(discriminator.type_name.as_deref(), None)?;
            let column = column_ref(&discriminator.column, discriminator.column_index);
            let mut value = handler.get_value(row, column)?;
            if value.is_null() {
                if let Some(literal) = &discriminator.null_value {
                    value = handler.value_of(literal)?;
                }
            }
            if value.is_null() {
                return Ok(None);
            }
            let Some(next_id) = discriminator.lookup(&value.to_string()) else {
                return Ok(Some(current));
            };
            let next = map.result_map(next_id)?;
            if next.id == current.id {
                return Ok(Some(current));
            }
            current = next;
        }
        Err(Error::config(format!(
            "discriminator chain starting at result map '{}' does not terminate",
            base.id
        )))
    }

    fn add_row(
        &self,
        base: &'m ResultMap,
        row: &Row,
        results: &mut Vec<Value>,
        last_group: &mut Option<usize>,
        scope: &mut RequestScope,
    ) -> Result<()> {
        let Some(mapped) = self.map_object(base, row)? else {
            // A row without an object still separates the rows around it.
            *last_group = None;
            return Ok(());
        };

        if base.is_grouped() {
            if let Some(index) = *last_group {
                if self.same_group(base, &results[index], &mapped.value)? {
                    let adopted =
                        self.merge(mapped.map, &mut results[index], mapped.value, mapped.pending, row)?;
                    for pending in adopted {
                        scope.enqueue(index, pending);
                    }
                    return Ok(());
                }
            }
        }

        let index = results.len();
        results.push(mapped.value);
        *last_group = Some(index);
        for pending in mapped.pending {
            scope.enqueue(index, pending);
        }
        Ok(())
    }

    fn map_object(&self, base: &'m ResultMap, row: &Row) -> Result<Option<Mapped<'m>>> {
        let Some(result_map) = self.resolve_sub_map(base, row)? else {
            return Ok(None);
        };
        let handlers = self.map.handlers();
        let mut found = false;

        // A map whose class names a type handler yields the scalar of its
        // first property.
        if result_map.constructor.is_empty() && handlers.contains(&result_map.class) {
            let Some(property) = result_map.properties.first() else {
                return Ok(None);
            };
            let handler = handlers.resolve(Some(&result_map.class), None)?;
            let value = handler.from_database_value(self.column_value(property, row, &mut found)?)?;
            return Ok(found.then_some(Mapped {
                map: result_map,
                value,
                pending: Vec::new(),
            }));
        }

        let mut arguments = Vec::with_capacity(result_map.constructor.len());
        for argument in &result_map.constructor {
            let value = self.column_value(argument, row, &mut found)?;
            arguments.push((argument.property.clone(), value));
        }
        let mut object = self.map.factory().create(&result_map.class, arguments)?;

        let accessor = self.map.accessor();
        let mut pending = Vec::new();
        for property in &result_map.properties {
            let value = if let Some(statement) = &property.select {
                self.select_value(property, statement, row, &mut found, &mut pending)?
            } else if let Some(nested) = &property.result_map {
                self.nested_value(property, nested, row, &mut found, &mut pending)?
            } else {
                self.column_value(property, row, &mut found)?
            };
            accessor.set(&mut object, &property.property, value)?;
        }

        Ok(found.then_some(Mapped {
            map: result_map,
            value: object,
            pending,
        }))
    }

    fn column_value(&self, property: &ResultProperty, row: &Row, found: &mut bool) -> Result<Value> {
        let handler = self.handler_for(property)?;
        let value = handler.get_value(row, column_ref(property.column_name(), property.column_index))?;
        if !value.is_null() {
            *found = true;
            return Ok(value);
        }
        match &property.null_value {
            Some(literal) => {
                *found = true;
                handler.value_of(literal)
            }
            None => Ok(handler.null_value()),
        }
    }

    fn nested_value(
        &self,
        property: &ResultProperty,
        nested_id: &str,
        row: &Row,
        found: &mut bool,
        pending: &mut Vec<PendingSelect>,
    ) -> Result<Value> {
        let nested = self.map.result_map(nested_id)?;
        let Some(child) = self.map_object(nested, row)? else {
            return Ok(self.empty_value(property, Some(&nested.class)));
        };
        *found = true;

        let path = PropertyPath::parse(&property.property)?;
        if !property.is_list {
            pending.extend(child.pending.into_iter().map(|p| p.under(&path)));
            return Ok(child.value);
        }

        let element = path.child(PathSegment::Index(0));
        pending.extend(child.pending.into_iter().map(|p| p.under(&element)));
        let mut list = self.map.factory().create_list(Some(&nested.class));
        list.as_list_mut()
            .ok_or_else(|| not_a_list(property, nested_id))?
            .push(child.value);
        Ok(list)
    }

    fn select_value(
        &self,
        property: &ResultProperty,
        statement: &str,
        row: &Row,
        found: &mut bool,
        pending: &mut Vec<PendingSelect>,
    ) -> Result<Value> {
        let Some(parameter) = self.select_parameter(property, row)? else {
            return Ok(self.empty_value(property, None));
        };
        *found = true;

        if property.lazy && self.map.settings().lazy_loading_enabled {
            return Ok(Value::Deferred(Deferred::new(
                statement,
                parameter,
                property.is_list,
            )));
        }
        pending.push(PendingSelect {
            path: PropertyPath::parse(&property.property)?,
            statement: statement.to_string(),
            parameter,
            many: property.is_list,
        });
        Ok(self.empty_value(property, None))
    }

    /// Parameter for a sub-select, or `None` when every key column is null.
    fn select_parameter(&self, property: &ResultProperty, row: &Row) -> Result<Option<Value>> {
        let Some(columns) = property.composite_columns() else {
            let handler = self.handler_for(property)?;
            let value =
                handler.get_value(row, column_ref(property.column_name(), property.column_index))?;
            return Ok((!value.is_null()).then_some(value));
        };

        let columns = columns.map_err(Error::Configuration)?;
        let mut parameter = Object::map();
        let mut any = false;
        for (name, column) in columns {
            let value = row
                .get(ColumnRef::Name(&column))
                .cloned()
                .ok_or_else(|| Error::mapping(format!("column '{}' not found in result", column)))?;
            any |= !value.is_null();
            parameter.set(name, value);
        }
        Ok(any.then_some(Value::Object(parameter)))
    }

    fn same_group(&self, result_map: &ResultMap, existing: &Value, incoming: &Value) -> Result<bool> {
        let accessor = self.map.accessor();
        for name in &result_map.group_by {
            if accessor.get(existing, name)? != accessor.get(incoming, name)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Fold the nested list members of `incoming` into `existing`.
    ///
    /// Returns the sub-selects of the adopted elements, addressed relative
    /// to `existing`. Everything else about `incoming` is discarded.
    fn merge(
        &self,
        result_map: &'m ResultMap,
        existing: &mut Value,
        mut incoming: Value,
        pending: Vec<PendingSelect>,
        row: &Row,
    ) -> Result<Vec<PendingSelect>> {
        let accessor = self.map.accessor();
        let mut adopted = Vec::new();

        for property in &result_map.properties {
            let Some(nested_id) = property.result_map.as_deref() else {
                continue;
            };
            if !property.is_list {
                continue;
            }
            let nested = self.map.result_map(nested_id)?;
            let path = PropertyPath::parse(&property.property)?;
            let element = path.child(PathSegment::Index(0));

            let Value::List(children) =
                std::mem::replace(accessor.get_mut(&mut incoming, &property.property)?, Value::Null)
            else {
                continue;
            };
            let Some(child) = children.into_iter().next() else {
                continue;
            };
            let child_pending: Vec<PendingSelect> = pending
                .iter()
                .filter_map(|p| {
                    p.path.strip_prefix(&element).map(|rest| PendingSelect {
                        path: rest,
                        ..p.clone()
                    })
                })
                .collect();

            let slot = accessor.get_mut(existing, &property.property)?;
            if slot.is_null() {
                *slot = self.map.factory().create_list(Some(&nested.class));
            }
            let items = slot
                .as_list_mut()
                .ok_or_else(|| not_a_list(property, &result_map.id))?;

            if let (true, Some(index)) = (nested.is_grouped(), items.len().checked_sub(1)) {
                if self.same_group(nested, &items[index], &child)? {
                    let child_map = self.resolve_sub_map(nested, row)?.unwrap_or(nested);
                    let merged =
                        self.merge(child_map, &mut items[index], child, child_pending, row)?;
                    let target = path.child(PathSegment::Index(index));
                    adopted.extend(merged.into_iter().map(|p| p.under(&target)));
                    continue;
                }
            }

            let target = path.child(PathSegment::Index(items.len()));
            items.push(child);
            adopted.extend(child_pending.into_iter().map(|p| p.under(&target)));
        }
        Ok(adopted)
    }

    fn map_implicit(&self, class: &str, row: &Row) -> Result<Value> {
        let handlers = self.map.handlers();
        if handlers.contains(class) {
            return handlers
                .resolve(Some(class), None)?
                .get_value(row, ColumnRef::Index(0));
        }
        let mut object = self.map.factory().create(class, Vec::new())?;
        let accessor = self.map.accessor();
        for (column, value) in row.columns().iter().zip(row.values()) {
            accessor.set(&mut object, column, value.clone())?;
        }
        Ok(object)
    }

    fn handler_for(&self, property: &ResultProperty) -> Result<std::sync::Arc<dyn TypeHandler>> {
        self.map
            .handlers()
            .resolve(property.type_name.as_deref(), property.db_type.as_deref())
    }

    fn empty_value(&self, property: &ResultProperty, element_type: Option<&str>) -> Value {
        if property.is_list {
            self.map.factory().create_list(element_type)
        } else {
            Value::Null
        }
    }
}

fn column_ref(name: &str, index: Option<usize>) -> ColumnRef<'_> {
    match index {
        Some(index) => ColumnRef::Index(index),
        None => ColumnRef::Name(name),
    }
}

fn not_a_list(property: &ResultProperty, owner: &str) -> Error {
    Error::mapping(format!(
        "property '{}' of '{}' does not hold a list",
        property.property, owner
    ))
}
