//! Parameter binding.
//!
//! Turns a statement's parameter properties (declared or inline) into the
//! positional [`DbParameter`] list a command is executed with, and reads
//! output parameters back once the command has run.

use sqlmap_value::Value;

use crate::capability::{PropertyAccessor, TypeHandlerRegistry};
use crate::driver::{Command, DbParameter, ParameterDirection};
use crate::error::Error;
use crate::mapping::ParameterProperty;

/// A value the driver wrote back into an output parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputValue {
    /// Property path on the parameter object.
    pub property: String,
    pub direction: ParameterDirection,
    pub value: Value,
}

/// Binds parameter properties against a parameter object.
pub struct ParameterBinder<'a> {
    accessor: &'a dyn PropertyAccessor,
    handlers: &'a TypeHandlerRegistry,
}

impl<'a> ParameterBinder<'a> {
    pub fn new(accessor: &'a dyn PropertyAccessor, handlers: &'a TypeHandlerRegistry) -> Self {
        Self { accessor, handlers }
    }

    /// Produce bind parameters in property order.
    ///
    /// Pure output parameters are bound as null. A value equal to the
    /// property's null substitution is sent as null.
    pub fn bind(
        &self,
        properties: &[ParameterProperty],
        parameter: &Value,
    ) -> Result<Vec<DbParameter>, Error> {
        properties
            .iter()
            .map(|property| self.bind_one(property, parameter))
            .collect()
    }

    fn bind_one(
        &self,
        property: &ParameterProperty,
        parameter: &Value,
    ) -> Result<DbParameter, Error> {
        let handler = self
            .handlers
            .resolve(property.handler_type(), property.db_type.as_deref())?;

        let value = if property.direction.is_input() {
            let raw = self.accessor.get(parameter, &property.property)?;
            match &property.null_value {
                Some(literal) if !raw.is_null() && raw.loosely_equals(&raw.coerce_literal(literal)) => {
                    Value::Null
                }
                _ => handler.to_database_value(&raw)?,
            }
        } else {
            Value::Null
        };

        Ok(DbParameter {
            name: property
                .column
                .clone()
                .unwrap_or_else(|| property.property.clone()),
            value,
            direction: property.direction,
            db_type: property.db_type.clone(),
        })
    }

    /// Read output and input-output parameters from an executed command.
    pub fn retrieve_outputs(
        &self,
        properties: &[ParameterProperty],
        command: &dyn Command,
    ) -> Result<Vec<OutputValue>, Error> {
        let mut outputs = Vec::new();
        for (index, property) in properties.iter().enumerate() {
            if !property.direction.is_output() {
                continue;
            }
            let Some(raw) = command.parameter_value(index) else {
                continue;
            };
            let handler = self
                .handlers
                .resolve(property.handler_type(), property.db_type.as_deref())?;
            let value = if raw.is_null() {
                match &property.null_value {
                    Some(literal) => handler.value_of(literal)?,
                    None => handler.null_value(),
                }
            } else {
                handler.from_database_value(raw)?
            };
            outputs.push(OutputValue {
                property: property.property.clone(),
                direction: property.direction,
                value,
            });
        }
        Ok(outputs)
    }

    /// Write retrieved outputs onto the parameter object.
    ///
    /// A return value is only written when the parameter object is a
    /// container; a scalar parameter has nowhere to hold it.
    pub fn apply_outputs(&self, outputs: &[OutputValue], target: &mut Value) -> Result<(), Error> {
        for output in outputs {
            if target.is_scalar() && !target.is_null() {
                continue;
            }
            self.accessor
                .set(target, &output.property, output.value.clone())?;
        }
        Ok(())
    }
}
