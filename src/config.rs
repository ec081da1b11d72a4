use serde::Deserialize;

use crate::cache::TemplateCache;
use crate::dialect::Dialect;
use crate::render::RenderOptions;

/// Engine settings, usually read from JSON.
///
/// Missing fields fall back to their defaults:
///
/// ```
/// use sqlx_statement::{Dialect, EngineConfig};
///
/// let config = EngineConfig::from_json(r#"{ "dialect": "sqlserver", "quote_identifiers": true }"#)?;
/// assert_eq!(config.dialect, Dialect::SqlServer);
/// assert_eq!(config.template_cache_capacity, 256);
/// assert!(!config.qualify_columns);
/// # Ok::<(), sqlx_statement::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub dialect: Dialect,
    /// Parsed templates kept in the cache. 0 turns caching off.
    pub template_cache_capacity: usize,
    pub quote_identifiers: bool,
    pub qualify_columns: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            template_cache_capacity: TemplateCache::DEFAULT_CAPACITY,
            quote_identifiers: false,
            qualify_columns: false,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            quote_identifiers: self.quote_identifiers,
            qualify_columns: self.qualify_columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.render_options(), RenderOptions::default());
    }

    #[test]
    fn test_full_config() {
        let config = EngineConfig::from_json(
            r#"{
                "dialect": "mysql",
                "template_cache_capacity": 0,
                "quote_identifiers": true,
                "qualify_columns": true
            }"#,
        )
        .unwrap();
        assert_eq!(config.dialect, Dialect::MySql);
        assert_eq!(config.template_cache_capacity, 0);
        assert!(config.render_options().quote_identifiers);
        assert!(config.render_options().qualify_columns);
    }

    #[test]
    fn test_unknown_dialect_is_config_error() {
        let result = EngineConfig::from_json(r#"{ "dialect": "db2" }"#);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
