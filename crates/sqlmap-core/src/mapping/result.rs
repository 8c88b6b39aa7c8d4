//! Result map descriptors.

/// How one member of a result object is populated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultProperty {
    /// Member path on the result object.
    pub property: String,
    /// Column name. Defaults to the property name.
    ///
    /// For `select` properties this may be a composite key written as
    /// `{param=COLUMN, other=COLUMN2}`.
    pub column: Option<String>,
    /// Column position, preferred over the name when set.
    pub column_index: Option<usize>,
    pub type_name: Option<String>,
    pub db_type: Option<String>,
    /// Substituted when the column is null.
    pub null_value: Option<String>,
    /// Nested result map built from the same row.
    pub result_map: Option<String>,
    /// Statement run with this column's value to populate the member.
    pub select: Option<String>,
    /// Defer the select until the caller asks for it.
    pub lazy: bool,
    /// The member holds a list (aggregated nested maps or a list select).
    pub is_list: bool,
}

impl ResultProperty {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ..Default::default()
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn column_index(mut self, index: usize) -> Self {
        self.column_index = Some(index);
        self
    }

    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn db_type(mut self, db_type: impl Into<String>) -> Self {
        self.db_type = Some(db_type.into());
        self
    }

    pub fn null_value(mut self, literal: impl Into<String>) -> Self {
        self.null_value = Some(literal.into());
        self
    }

    pub fn result_map(mut self, result_map: impl Into<String>) -> Self {
        self.result_map = Some(result_map.into());
        self
    }

    pub fn select(mut self, statement: impl Into<String>) -> Self {
        self.select = Some(statement.into());
        self
    }

    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn list(mut self) -> Self {
        self.is_list = true;
        self
    }

    /// Column name, falling back to the property name.
    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.property)
    }

    /// Parse a composite `{name=COLUMN, ...}` column.
    ///
    /// Returns `None` for a plain column and `Some(Err)` for a malformed
    /// composite.
    pub fn composite_columns(&self) -> Option<Result<Vec<(String, String)>, String>> {
        let column = self.column.as_deref()?.trim();
        let inner = column.strip_prefix('{')?;
        let Some(inner) = inner.strip_suffix('}') else {
            return Some(Err(format!("unterminated composite column '{}'", column)));
        };
        let parsed = inner
            .split(',')
            .map(|pair| {
                let (name, col) = pair
                    .split_once('=')
                    .ok_or_else(|| format!("expected name=COLUMN in '{}'", column))?;
                let (name, col) = (name.trim(), col.trim());
                if name.is_empty() || col.is_empty() {
                    return Err(format!("empty name or column in '{}'", column));
                }
                Ok((name.to_string(), col.to_string()))
            })
            .collect();
        Some(parsed)
    }
}

/// One entry of a discriminator table.
#[derive(Debug, Clone, PartialEq)]
pub struct SubMap {
    /// Display form of the column value selecting this map.
    pub value: String,
    pub result_map: String,
}

/// Switch on a column value to pick a more specific result map.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Discriminator {
    pub column: String,
    pub column_index: Option<usize>,
    pub type_name: Option<String>,
    pub null_value: Option<String>,
    pub sub_maps: Vec<SubMap>,
}

impl Discriminator {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ..Default::default()
        }
    }

    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn null_value(mut self, literal: impl Into<String>) -> Self {
        self.null_value = Some(literal.into());
        self
    }

    pub fn sub_map(mut self, value: impl Into<String>, result_map: impl Into<String>) -> Self {
        self.sub_maps.push(SubMap {
            value: value.into(),
            result_map: result_map.into(),
        });
        self
    }

    /// Result map id registered for a discriminator value.
    pub fn lookup(&self, value: &str) -> Option<&str> {
        self.sub_maps
            .iter()
            .find(|s| s.value == value)
            .map(|s| s.result_map.as_str())
    }
}

/// Recipe for building an object from a row.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMap {
    pub id: String,
    /// Type name of the produced object. Use `"map"` for dictionaries.
    pub class: String,
    pub properties: Vec<ResultProperty>,
    /// Constructor arguments, in order.
    pub constructor: Vec<ResultProperty>,
    pub discriminator: Option<Discriminator>,
    /// Properties forming the row identity for one-to-many aggregation.
    pub group_by: Vec<String>,
    /// Parent map whose properties are inherited.
    pub extends: Option<String>,
}

impl ResultMap {
    pub fn new(id: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class: class.into(),
            properties: Vec::new(),
            constructor: Vec::new(),
            discriminator: None,
            group_by: Vec::new(),
            extends: None,
        }
    }

    pub fn property(mut self, property: ResultProperty) -> Self {
        self.properties.push(property);
        self
    }

    pub fn constructor_arg(mut self, argument: ResultProperty) -> Self {
        self.constructor.push(argument);
        self
    }

    pub fn discriminator(mut self, discriminator: Discriminator) -> Self {
        self.discriminator = Some(discriminator);
        self
    }

    pub fn group_by<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = properties.into_iter().map(Into::into).collect();
        self
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    /// Find a property by member name.
    pub fn find_property(&self, name: &str) -> Option<&ResultProperty> {
        self.properties.iter().find(|p| p.property == name)
    }

    /// Whether rows of this map aggregate on group-by properties.
    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_columns() {
        let prop = ResultProperty::new("lines").column("{orderId=ID, region=REGION}");
        assert_eq!(
            prop.composite_columns(),
            Some(Ok(vec![
                ("orderId".to_string(), "ID".to_string()),
                ("region".to_string(), "REGION".to_string()),
            ]))
        );

        assert_eq!(ResultProperty::new("x").column("X").composite_columns(), None);
        assert!(matches!(
            ResultProperty::new("x").column("{a=}").composite_columns(),
            Some(Err(_))
        ));
        assert!(matches!(
            ResultProperty::new("x").column("{a=B").composite_columns(),
            Some(Err(_))
        ));
    }

    #[test]
    fn test_column_name_defaults_to_property() {
        assert_eq!(ResultProperty::new("name").column_name(), "name");
        assert_eq!(ResultProperty::new("name").column("NM").column_name(), "NM");
    }

    #[test]
    fn test_discriminator_lookup() {
        let d = Discriminator::new("type").sub_map("A", "mapA").sub_map("B", "mapB");
        assert_eq!(d.lookup("B"), Some("mapB"));
        assert_eq!(d.lookup("C"), None);
    }
}
