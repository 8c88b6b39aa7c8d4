//! Statement descriptors.

use sqlmap_lang::{parse_template, ParseError, SqlNode};

/// Kind of statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    /// Stored procedure call; the SQL text is the procedure name.
    Procedure,
}

impl StatementKind {
    pub const ALL: [StatementKind; 5] = [
        StatementKind::Select,
        StatementKind::Insert,
        StatementKind::Update,
        StatementKind::Delete,
        StatementKind::Procedure,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
            StatementKind::Procedure => "procedure",
        }
    }
}

/// When a select-key statement runs relative to its insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTiming {
    /// Before the insert; the key is bound into the insert itself.
    Pre,
    /// After the insert, for generated keys.
    Post,
}

/// Key query attached to an insert statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectKey {
    /// Property of the parameter object receiving the key.
    pub property: String,
    pub sql: Vec<SqlNode>,
    /// Scalar type of the key, such as `"long"`.
    pub result_class: Option<String>,
    pub timing: KeyTiming,
}

impl SelectKey {
    /// Parse a select-key template.
    pub fn new(
        property: impl Into<String>,
        template: &str,
        timing: KeyTiming,
    ) -> Result<Self, ParseError> {
        Ok(Self {
            property: property.into(),
            sql: parse_template(template)?,
            result_class: None,
            timing,
        })
    }

    pub fn result_class(mut self, class: impl Into<String>) -> Self {
        self.result_class = Some(class.into());
        self
    }
}

/// A reusable SQL fragment referenced by `<include refid="..."/>`.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    pub id: String,
    pub nodes: Vec<SqlNode>,
}

impl SqlFragment {
    pub fn new(id: impl Into<String>, template: &str) -> Result<Self, ParseError> {
        Ok(Self {
            id: id.into(),
            nodes: parse_template(template)?,
        })
    }
}

/// A named, executable statement.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementDef {
    pub id: String,
    pub kind: StatementKind,
    pub sql: Vec<SqlNode>,
    /// Declared parameter map; the SQL then uses `?` placeholders.
    pub parameter_map: Option<String>,
    /// Type of the parameter object, informational.
    pub parameter_class: Option<String>,
    /// One result map per result set.
    pub result_maps: Vec<String>,
    /// Implicit mapping target when no result map is given.
    pub result_class: Option<String>,
    pub cache_model: Option<String>,
    pub select_key: Option<SelectKey>,
}

impl StatementDef {
    /// Create a statement from an already parsed template.
    pub fn from_nodes(id: impl Into<String>, kind: StatementKind, sql: Vec<SqlNode>) -> Self {
        Self {
            id: id.into(),
            kind,
            sql,
            parameter_map: None,
            parameter_class: None,
            result_maps: Vec::new(),
            result_class: None,
            cache_model: None,
            select_key: None,
        }
    }

    /// Parse a template and create a statement.
    pub fn new(
        id: impl Into<String>,
        kind: StatementKind,
        template: &str,
    ) -> Result<Self, ParseError> {
        Ok(Self::from_nodes(id, kind, parse_template(template)?))
    }

    pub fn select(id: impl Into<String>, template: &str) -> Result<Self, ParseError> {
        Self::new(id, StatementKind::Select, template)
    }

    pub fn insert(id: impl Into<String>, template: &str) -> Result<Self, ParseError> {
        Self::new(id, StatementKind::Insert, template)
    }

    pub fn update(id: impl Into<String>, template: &str) -> Result<Self, ParseError> {
        Self::new(id, StatementKind::Update, template)
    }

    pub fn delete(id: impl Into<String>, template: &str) -> Result<Self, ParseError> {
        Self::new(id, StatementKind::Delete, template)
    }

    pub fn procedure(id: impl Into<String>, template: &str) -> Result<Self, ParseError> {
        Self::new(id, StatementKind::Procedure, template)
    }

    pub fn parameter_map(mut self, id: impl Into<String>) -> Self {
        self.parameter_map = Some(id.into());
        self
    }

    pub fn parameter_class(mut self, class: impl Into<String>) -> Self {
        self.parameter_class = Some(class.into());
        self
    }

    pub fn result_map(mut self, id: impl Into<String>) -> Self {
        self.result_maps.push(id.into());
        self
    }

    pub fn result_class(mut self, class: impl Into<String>) -> Self {
        self.result_class = Some(class.into());
        self
    }

    pub fn cache_model(mut self, id: impl Into<String>) -> Self {
        self.cache_model = Some(id.into());
        self
    }

    pub fn select_key(mut self, key: SelectKey) -> Self {
        self.select_key = Some(key);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_parse_templates() {
        let stmt = StatementDef::select("getUser", "SELECT * FROM users WHERE id = #id#")
            .unwrap()
            .result_map("user")
            .cache_model("users");

        assert_eq!(stmt.kind, StatementKind::Select);
        assert_eq!(stmt.sql.len(), 1);
        assert_eq!(stmt.result_maps, vec!["user".to_string()]);
        assert_eq!(stmt.cache_model.as_deref(), Some("users"));
    }

    #[test]
    fn test_template_errors_surface() {
        assert!(StatementDef::update("bad", "<isNull>").is_err());
        assert!(SelectKey::new("id", "<dynamic>", KeyTiming::Post).is_err());
    }
}
