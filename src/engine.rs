//! [`SqlEngine`], the entry point bundling a dialect with its collaborators.

use std::sync::Arc;

use tracing::debug;

use crate::assembler::StatementAssembler;
use crate::bindings::Bindings;
use crate::cache::TemplateCache;
use crate::condition::Table;
use crate::config::EngineConfig;
use crate::criteria::Criteria;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::expander::{self, ExpandedSql, ParameterSource};
use crate::mapper::{ConditionMapper, MappedCondition};
use crate::metadata::EntityMetadata;
use crate::parser::{NamedParameterParser, ParsedSqlTemplate};
use crate::render::RenderOptions;
use crate::value::{DefaultValueConverter, ValueConverter};

/// Dialect, template cache, value converter and render options in one place.
///
/// Engines are cheap to clone and safe to share between threads; the only
/// shared mutable state is the template cache.
///
/// ```
/// use sqlx_statement::{Dialect, MapParameterSource, SqlEngine};
///
/// let engine = SqlEngine::new(Dialect::SqlServer);
/// let source = MapParameterSource::new().with("id", 7).with("name", "Ann");
/// let (sql, bindings) = engine.prepare("UPDATE t SET name = :name WHERE id = :id", &source)?;
/// assert_eq!(sql, "UPDATE t SET name = @name WHERE id = @id");
/// assert_eq!(bindings.len(), 2);
/// # Ok::<(), sqlx_statement::Error>(())
/// ```
#[derive(Clone)]
pub struct SqlEngine {
    dialect: Dialect,
    parser: NamedParameterParser,
    converter: Arc<dyn ValueConverter>,
    options: RenderOptions,
}

impl std::fmt::Debug for SqlEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlEngine")
            .field("dialect", &self.dialect)
            .field("parser", &self.parser)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SqlEngine {
    /// Engine on the process-wide template cache with default settings.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            parser: NamedParameterParser::default(),
            converter: Arc::new(DefaultValueConverter),
            options: RenderOptions::default(),
        }
    }

    /// Engine with its own template cache sized by `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        debug!(
            dialect = %config.dialect,
            cache_capacity = config.template_cache_capacity,
            "creating sql engine"
        );
        Self {
            parser: NamedParameterParser::new(Arc::new(TemplateCache::new(
                config.template_cache_capacity,
            ))),
            options: config.render_options(),
            ..Self::new(config.dialect)
        }
    }

    pub fn with_cache(self, cache: Arc<TemplateCache>) -> Self {
        Self {
            parser: NamedParameterParser::new(cache),
            ..self
        }
    }

    pub fn with_converter(self, converter: Arc<dyn ValueConverter>) -> Self {
        Self { converter, ..self }
    }

    pub fn with_render_options(self, options: RenderOptions) -> Self {
        Self { options, ..self }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn cache(&self) -> &Arc<TemplateCache> {
        self.parser.cache()
    }

    pub fn parse(&self, sql: &str) -> Result<Arc<ParsedSqlTemplate>> {
        self.parser.parse(sql)
    }

    /// Parses `sql` and expands it with values from `source`. Names missing
    /// from `source` can still be bound on the result.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Syntax`] for a malformed template and
    /// [`crate::Error::EmptyCollection`] for an empty list value.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlx_statement::{Dialect, MapParameterSource, SqlEngine, Value};
    ///
    /// let engine = SqlEngine::new(Dialect::Oracle);
    /// let source = MapParameterSource::new().with("name", "Ann");
    /// let mut expanded = engine.expand("SELECT * FROM t WHERE name = :name AND id = :id", &source)?;
    /// assert_eq!(expanded.unbound(), vec!["id"]);
    ///
    /// expanded.bind("id", 7)?;
    /// let (sql, bindings) = expanded.finish()?;
    /// assert_eq!(sql, "SELECT * FROM t WHERE name = :name AND id = :id");
    /// assert_eq!(bindings.values(), vec![Value::from("Ann"), Value::Int(7)]);
    /// # Ok::<(), sqlx_statement::Error>(())
    /// ```
    pub fn expand(&self, sql: &str, source: &dyn ParameterSource) -> Result<ExpandedSql> {
        let template = self.parse(sql)?;
        expander::expand(&template, &self.dialect.bind_markers(), source)
    }

    /// Expands `sql` and requires every parameter to be resolved by `source`.
    ///
    /// # Errors
    ///
    /// Everything [`SqlEngine::expand`] reports, plus
    /// [`crate::Error::UnresolvedParameter`] for a name `source` lacks.
    pub fn prepare(&self, sql: &str, source: &dyn ParameterSource) -> Result<(String, Bindings)> {
        self.expand(sql, source)?.finish()
    }

    /// Maps `criteria` to a condition with markers numbered from the start.
    ///
    /// # Errors
    ///
    /// [`crate::Error::UnsupportedComparator`] when the dialect cannot express
    /// a comparator, and [`crate::Error::Conversion`] for values the converter
    /// rejects.
    pub fn map_criteria(
        &self,
        criteria: &Criteria,
        table: &Table,
        metadata: Option<&dyn EntityMetadata>,
    ) -> Result<MappedCondition> {
        let mut markers = self.dialect.bind_markers().create();
        ConditionMapper::new(self.dialect, self.converter.as_ref()).map(
            &mut markers,
            criteria,
            table,
            metadata,
        )
    }

    /// Statement assembler sharing this engine's settings.
    pub fn statements(&self) -> StatementAssembler<'_> {
        StatementAssembler::new(self.dialect)
            .with_converter(self.converter.as_ref())
            .with_render_options(self.options)
    }

    /// Like [`SqlEngine::statements`], resolving property names through `metadata`.
    pub fn statements_for<'a>(&'a self, metadata: &'a dyn EntityMetadata) -> StatementAssembler<'a> {
        self.statements().with_entity_metadata(metadata)
    }
}
