//! Parameter descriptors.

use crate::driver::ParameterDirection;

/// How one bind parameter is read from the parameter object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterProperty {
    /// Property path on the parameter object.
    pub property: String,
    /// Column or procedure parameter name, informational.
    pub column: Option<String>,
    /// Declared type, selects the type handler.
    pub type_name: Option<String>,
    /// Database type hint passed to the driver.
    pub db_type: Option<String>,
    pub direction: ParameterDirection,
    /// When the property equals this literal, null is sent instead.
    pub null_value: Option<String>,
    /// Name of a registered type handler overriding `type_name`.
    pub handler: Option<String>,
}

impl ParameterProperty {
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

    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn db_type(mut self, db_type: impl Into<String>) -> Self {
        self.db_type = Some(db_type.into());
        self
    }

    pub fn direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn null_value(mut self, literal: impl Into<String>) -> Self {
        self.null_value = Some(literal.into());
        self
    }

    pub fn handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    /// Name the type handler is resolved by.
    pub fn handler_type(&self) -> Option<&str> {
        self.handler.as_deref().or(self.type_name.as_deref())
    }
}

/// Declared, ordered parameter list for statements using `?` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterMap {
    pub id: String,
    pub class: Option<String>,
    pub properties: Vec<ParameterProperty>,
    /// Parent map whose properties come first.
    pub extends: Option<String>,
}

impl ParameterMap {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class: None,
            properties: Vec::new(),
            extends: None,
        }
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn property(mut self, property: ParameterProperty) -> Self {
        self.properties.push(property);
        self
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    /// Whether any property is written back after execution.
    pub fn has_outputs(&self) -> bool {
        self.properties.iter().any(|p| p.direction.is_output())
    }
}
