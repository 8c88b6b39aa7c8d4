//! Mapper-wide settings.

use serde::Deserialize;

use crate::error::Error;

/// Settings shared by every statement of a configured mapper.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapperSettings {
    /// Consult and populate cache models. When false, statements that
    /// reference a cache model run uncached.
    pub cache_models_enabled: bool,

    /// Honor `lazy` on select properties. When false every select property
    /// is loaded eagerly.
    pub lazy_loading_enabled: bool,

    /// Resolve references relative to the namespace of the referencing id.
    pub use_statement_namespaces: bool,

    /// Capacity used by LRU/FIFO cache models declared without one.
    pub default_cache_capacity: usize,
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            cache_models_enabled: true,
            lazy_loading_enabled: true,
            use_statement_namespaces: false,
            default_cache_capacity: 100,
        }
    }
}

impl MapperSettings {
    /// Create default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::config(format!("invalid settings: {}", e)))
    }

    /// Set whether cache models are used.
    pub fn with_cache_models(mut self, enabled: bool) -> Self {
        self.cache_models_enabled = enabled;
        self
    }

    /// Set whether lazy loading is honored.
    pub fn with_lazy_loading(mut self, enabled: bool) -> Self {
        self.lazy_loading_enabled = enabled;
        self
    }

    /// Set whether statement namespaces are used.
    pub fn with_statement_namespaces(mut self, enabled: bool) -> Self {
        self.use_statement_namespaces = enabled;
        self
    }

    /// Set the default cache capacity.
    pub fn with_default_cache_capacity(mut self, capacity: usize) -> Self {
        self.default_cache_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = MapperSettings::default();
        assert!(settings.cache_models_enabled);
        assert!(settings.lazy_loading_enabled);
        assert!(!settings.use_statement_namespaces);
        assert_eq!(settings.default_cache_capacity, 100);
    }

    #[test]
    fn test_from_json_partial() {
        let settings =
            MapperSettings::from_json(r#"{"useStatementNamespaces": true, "defaultCacheCapacity": 8}"#)
                .unwrap();
        assert!(settings.use_statement_namespaces);
        assert_eq!(settings.default_cache_capacity, 8);
        assert!(settings.cache_models_enabled);
    }

    #[test]
    fn test_from_json_invalid() {
        let err = MapperSettings::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_builder() {
        let settings = MapperSettings::new()
            .with_cache_models(false)
            .with_lazy_loading(false);
        assert!(!settings.cache_models_enabled);
        assert!(!settings.lazy_loading_enabled);
    }
}
