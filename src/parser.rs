//! Named-parameter tokenizer.
//!
//! Recognizes `:name`, `&name` and `:{name}` outside of quoted literals and
//! comments. `::` is the PostgreSQL cast operator and never starts a
//! parameter. `\:` is unescaped to a literal colon.

use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::TemplateCache;
use crate::error::{Error, Result};

/// Region openers and their closers. An unterminated region runs to the end.
const SKIP_REGIONS: [(&str, &str); 4] = [("'", "'"), ("\"", "\""), ("--", "\n"), ("/*", "*/")];

/// Characters that end a parameter name, besides whitespace.
const PARAMETER_SEPARATORS: &[u8] = b"\"':&,;()|=+-*%/\\<>^";

/// A located named-parameter token within the rewritten SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterOccurrence {
    pub name: String,
    /// Byte offset of the leading `:`/`&`.
    pub start: usize,
    /// Byte offset just past the token.
    pub end: usize,
}

/// SQL text with its named parameters located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSqlTemplate {
    rewritten_sql: String,
    occurrences: Vec<ParameterOccurrence>,
    distinct_name_count: usize,
    total_occurrence_count: usize,
}

impl ParsedSqlTemplate {
    /// Tokenizes `sql` without consulting any cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Syntax`] for an unterminated `:{` declaration or a
    /// `:`/`{` inside one.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlx_statement::ParsedSqlTemplate;
    ///
    /// let parsed = ParsedSqlTemplate::parse("SELECT * FROM t WHERE a = :a AND b = :a")?;
    /// assert_eq!(parsed.distinct_name_count(), 1);
    /// assert_eq!(parsed.total_occurrence_count(), 2);
    /// # Ok::<(), sqlx_statement::Error>(())
    /// ```
    pub fn parse(sql: &str) -> Result<Self> {
        let bytes = sql.as_bytes();
        let len = bytes.len();

        let mut rewritten = String::with_capacity(len);
        let mut copied = 0;
        let mut escapes = 0;
        let mut occurrences = Vec::new();
        let mut seen = HashSet::new();

        let mut record = |name: &str, start: usize, end: usize, escapes: usize| {
            seen.insert(name.to_owned());
            occurrences.push(ParameterOccurrence {
                name: name.to_owned(),
                start: start - escapes,
                end: end - escapes,
            });
        };

        let mut i = 0;
        while i < len {
            let skip_to = skip_comments_and_quotes(bytes, i);
            if skip_to != i {
                i = skip_to;
                continue;
            }

            let c = bytes[i];
            if c == b':' || c == b'&' {
                let mut j = i + 1;
                if c == b':' && j < len && bytes[j] == b':' {
                    i += 2;
                    continue;
                }
                if c == b':' && j < len && bytes[j] == b'{' {
                    loop {
                        j += 1;
                        if j >= len {
                            return Err(Error::syntax(
                                "Non-terminated named parameter declaration",
                                i,
                            ));
                        }
                        match bytes[j] {
                            b'}' => break,
                            b':' | b'{' => {
                                return Err(Error::syntax(
                                    format!(
                                        "Parameter name contains invalid character '{}'",
                                        bytes[j] as char
                                    ),
                                    i,
                                ))
                            }
                            _ => {}
                        }
                    }
                    if j - i > 2 {
                        record(&sql[i + 2..j], i, j + 1, escapes);
                    }
                    i = j + 1;
                    continue;
                }
                while j < len && !is_separator(bytes[j]) {
                    j += 1;
                }
                if j - i > 1 {
                    record(&sql[i + 1..j], i, j, escapes);
                }
                i = j;
                continue;
            }

            if c == b'\\' && i + 1 < len && bytes[i + 1] == b':' {
                rewritten.push_str(&sql[copied..i]);
                copied = i + 1;
                escapes += 1;
                i += 2;
                continue;
            }

            i += 1;
        }
        rewritten.push_str(&sql[copied..]);

        let distinct_name_count = seen.len();
        let total_occurrence_count = occurrences.len();
        Ok(Self {
            rewritten_sql: rewritten,
            occurrences,
            distinct_name_count,
            total_occurrence_count,
        })
    }

    /// SQL text with escapes removed; occurrence offsets refer to it.
    pub fn rewritten_sql(&self) -> &str {
        &self.rewritten_sql
    }

    pub fn occurrences(&self) -> &[ParameterOccurrence] {
        &self.occurrences
    }

    pub fn distinct_name_count(&self) -> usize {
        self.distinct_name_count
    }

    pub fn total_occurrence_count(&self) -> usize {
        self.total_occurrence_count
    }

    /// Distinct parameter names in order of first appearance.
    pub fn parameter_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.occurrences
            .iter()
            .map(|o| o.name.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }
}

fn skip_comments_and_quotes(sql: &[u8], position: usize) -> usize {
    let rest = &sql[position..];
    for (open, close) in SKIP_REGIONS {
        if rest.starts_with(open.as_bytes()) {
            let from = position + open.len();
            return match find(&sql[from..], close.as_bytes()) {
                Some(offset) => from + offset + close.len(),
                None => sql.len(),
            };
        }
    }
    position
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn is_separator(b: u8) -> bool {
    b.is_ascii_whitespace() || PARAMETER_SEPARATORS.contains(&b)
}

/// Parser backed by a template cache.
#[derive(Debug, Clone)]
pub struct NamedParameterParser {
    cache: Arc<TemplateCache>,
}

impl NamedParameterParser {
    pub fn new(cache: Arc<TemplateCache>) -> Self {
        Self { cache }
    }

    /// Parser without caching.
    pub fn uncached() -> Self {
        Self::new(Arc::new(TemplateCache::disabled()))
    }

    pub fn parse(&self, sql: &str) -> Result<Arc<ParsedSqlTemplate>> {
        self.cache.get_or_parse(sql)
    }

    pub fn cache(&self) -> &Arc<TemplateCache> {
        &self.cache
    }
}

impl Default for NamedParameterParser {
    fn default() -> Self {
        Self::new(TemplateCache::shared())
    }
}

/// Parses `sql` through the process-wide template cache.
pub fn parse_named_parameters(sql: &str) -> Result<Arc<ParsedSqlTemplate>> {
    TemplateCache::shared().get_or_parse(sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(sql: &str) -> Vec<String> {
        ParsedSqlTemplate::parse(sql)
            .unwrap()
            .occurrences()
            .iter()
            .map(|o| o.name.clone())
            .collect()
    }

    #[test]
    fn test_parse_locates_occurrences() {
        let sql = "SELECT * FROM t WHERE id = :id AND name = :name";
        let parsed = ParsedSqlTemplate::parse(sql).unwrap();
        let occ = &parsed.occurrences()[0];
        assert_eq!(occ.name, "id");
        assert_eq!(&sql[occ.start..occ.end], ":id");
        assert_eq!(parsed.distinct_name_count(), 2);
        assert_eq!(parsed.total_occurrence_count(), 2);
    }

    #[test]
    fn test_repeated_names_counted_once() {
        let parsed = ParsedSqlTemplate::parse("SELECT :a, :b, :a").unwrap();
        assert_eq!(parsed.distinct_name_count(), 2);
        assert_eq!(parsed.total_occurrence_count(), 3);
        assert_eq!(parsed.parameter_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_ampersand_and_brace_forms() {
        let sql = "SELECT * FROM t WHERE a = &a AND b = :{b.c-d}";
        let parsed = ParsedSqlTemplate::parse(sql).unwrap();
        assert_eq!(names(sql), vec!["a", "b.c-d"]);
        let occ = &parsed.occurrences()[1];
        assert_eq!(&sql[occ.start..occ.end], ":{b.c-d}");
    }

    #[test]
    fn test_empty_brace_is_not_a_parameter() {
        assert!(names("SELECT ':{}' , :{}").is_empty());
    }

    #[test]
    fn test_parameters_in_quotes_and_comments_are_ignored() {
        let placements = [
            "SELECT ':a' FROM t",
            "SELECT \":a\" FROM t",
            "SELECT 1 -- :a\nFROM t",
            "SELECT 1 /* :a */ FROM t",
            "SELECT 1 FROM t -- :a",
            "SELECT 'it''s :a' FROM t",
            "SELECT 1 /* unterminated :a",
        ];
        for sql in placements {
            assert!(names(sql).is_empty(), "{sql}");
        }
        assert_eq!(names("SELECT ':x' || :y -- :z\n, :w"), vec!["y", "w"]);
    }

    #[test]
    fn test_cast_operator_is_skipped() {
        assert!(names("SELECT x::int FROM t").is_empty());
        assert!(names("::a").is_empty());
        assert_eq!(names("SELECT :v::text"), vec!["v"]);
        assert_eq!(names("SELECT 1::int, :v"), vec!["v"]);
    }

    #[test]
    fn test_escaped_colon_is_unescaped() {
        let parsed = ParsedSqlTemplate::parse("SELECT '\\:x', \\:foo, :bar").unwrap();
        assert_eq!(parsed.rewritten_sql(), "SELECT '\\:x', :foo, :bar");
        assert_eq!(parsed.total_occurrence_count(), 1);
        let occ = &parsed.occurrences()[0];
        assert_eq!(&parsed.rewritten_sql()[occ.start..occ.end], ":bar");
    }

    #[test]
    fn test_multiple_escapes_shift_offsets() {
        let parsed = ParsedSqlTemplate::parse("\\:a \\:b :c").unwrap();
        assert_eq!(parsed.rewritten_sql(), ":a :b :c");
        let occ = &parsed.occurrences()[0];
        assert_eq!((occ.start, occ.end), (6, 8));
    }

    #[test]
    fn test_name_ends_at_separator() {
        assert_eq!(names("WHERE a=:a;"), vec!["a"]);
        assert_eq!(names("VALUES(:a,:b)"), vec!["a", "b"]);
        assert_eq!(names("WHERE a = :a||:b"), vec!["a", "b"]);
        assert_eq!(names("WHERE a = : AND b = &"), Vec::<String>::new());
    }

    #[test]
    fn test_unterminated_brace_is_syntax_error() {
        let err = ParsedSqlTemplate::parse("SELECT :{abc").unwrap_err();
        assert!(matches!(err, Error::Syntax { position: 7, .. }));
    }

    #[test]
    fn test_invalid_character_in_brace_is_syntax_error() {
        let err = ParsedSqlTemplate::parse("SELECT :{a:b}").unwrap_err();
        assert!(matches!(err, Error::Syntax { position: 7, .. }));
    }

    #[test]
    fn test_reparse_is_idempotent() {
        let sql = "SELECT * FROM t WHERE a = :a AND b IN (:b) AND c::text = ':c'";
        let first = ParsedSqlTemplate::parse(sql).unwrap();
        let second = ParsedSqlTemplate::parse(first.rewritten_sql()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_non_ascii_text_is_preserved() {
        let sql = "SELECT 'ü' AS x, :名前 FROM t";
        let parsed = ParsedSqlTemplate::parse(sql).unwrap();
        assert_eq!(parsed.parameter_names(), vec!["名前"]);
        assert_eq!(parsed.rewritten_sql(), sql);
    }
}
