//! Extraction of permitted value lists from vendor constraint text.
//!
//! Databases expose finite value sets in different places: MySQL in the
//! column type (`enum('a','b')`), Oracle, H2 and SQLite in check constraints
//! (`COL IN ('a', 'b')`), PostgreSQL in check constraints rewritten to
//! `= ANY (ARRAY['a'::text, ...])`. Each vendor supplies one pattern with a
//! single capture group around the comma separated list.

use regex::Regex;
use std::sync::OnceLock;

/// Pulls an ordered list of literal values out of raw constraint text.
#[derive(Debug, Clone)]
pub struct EnumValueExtractor {
    pattern: Regex,
    strip_casts: bool,
    skip_negated: bool,
}

impl EnumValueExtractor {
    /// Creates an extractor from a pattern with exactly one capture group.
    ///
    /// # Errors
    /// Returns the regex error when the pattern does not compile, or a
    /// configuration error when it does not have exactly one capture group.
    pub fn new(pattern: &str) -> crate::Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            crate::error::DbModelerError::configuration(format!(
                "Invalid enum pattern '{}': {}",
                pattern, e
            ))
        })?;
        // captures_len counts the implicit whole-match group
        if pattern.captures_len() != 2 {
            return Err(crate::error::DbModelerError::configuration(format!(
                "Enum pattern '{}' must have exactly one capture group",
                pattern
            )));
        }
        Ok(Self {
            pattern,
            strip_casts: false,
            skip_negated: false,
        })
    }

    /// Drops PostgreSQL `::type` casts from each token before unquoting.
    pub fn with_cast_stripping(mut self) -> Self {
        self.strip_casts = true;
        self
    }

    /// MySQL `enum('a','b')` column types.
    pub fn mysql() -> &'static Self {
        static EXTRACTOR: OnceLock<EnumValueExtractor> = OnceLock::new();
        EXTRACTOR.get_or_init(|| Self::compile(r"(?is)^\s*enum\s*\((.*)\)\s*$", false))
    }

    /// `COL IN (...)` check constraints (Oracle, H2, SQLite).
    ///
    /// `COL NOT IN (...)` lists forbidden values and never matches.
    pub fn check_in_list() -> &'static Self {
        static EXTRACTOR: OnceLock<EnumValueExtractor> = OnceLock::new();
        EXTRACTOR.get_or_init(|| {
            let mut extractor = Self::compile(r"(?is)\bIN\s*\(([^)]*)\)", false);
            extractor.skip_negated = true;
            extractor
        })
    }

    /// PostgreSQL `= ANY (ARRAY[...])` check constraints.
    pub fn postgres_check() -> &'static Self {
        static EXTRACTOR: OnceLock<EnumValueExtractor> = OnceLock::new();
        EXTRACTOR.get_or_init(|| Self::compile(r"(?is)ARRAY\s*\[([^\]]*)\]", true))
    }

    #[allow(clippy::expect_used)]
    fn compile(pattern: &str, strip_casts: bool) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("Invalid built-in enum pattern"),
            strip_casts,
            skip_negated: false,
        }
    }

    /// Extracts the value list; empty when the pattern does not match.
    ///
    /// Values keep their source order and duplicates are preserved.
    ///
    /// # Example
    /// ```rust
    /// use dbmodeler_core::enum_values::EnumValueExtractor;
    ///
    /// let values = EnumValueExtractor::mysql().extract("enum('G','PG','PG-13','R','NC-17')");
    /// assert_eq!(values, vec!["G", "PG", "PG-13", "R", "NC-17"]);
    /// ```
    pub fn extract(&self, raw: &str) -> Vec<String> {
        let Some(list) = self
            .pattern
            .captures_iter(raw)
            .filter(|captures| {
                !self.skip_negated
                    || captures
                        .get(0)
                        .is_none_or(|whole| !follows_not(&raw[..whole.start()]))
            })
            .find_map(|captures| captures.get(1))
        else {
            return Vec::new();
        };

        if list.as_str().trim().is_empty() {
            return Vec::new();
        }

        list.as_str()
            .split(',')
            .map(|token| self.clean_token(token))
            .collect()
    }

    fn clean_token(&self, token: &str) -> String {
        let mut token = token.trim();
        if self.strip_casts {
            // 'PG'::character varying -> 'PG'
            if let Some(pos) = token.find("::") {
                token = token[..pos].trim();
            }
            token = token.trim_start_matches('(').trim_end_matches(')').trim();
        }
        token
            .trim_matches(|c| c == '\'' || c == '"')
            .trim()
            .to_string()
    }
}

/// True when `prefix` ends with the standalone keyword `NOT`.
fn follows_not(prefix: &str) -> bool {
    let trimmed = prefix.trim_end();
    let Some(head) = trimmed
        .len()
        .checked_sub(3)
        .and_then(|at| trimmed.get(at..).map(|tail| (at, tail)))
        .filter(|(_, tail)| tail.eq_ignore_ascii_case("NOT"))
        .map(|(at, _)| &trimmed[..at])
    else {
        return false;
    };
    !head
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_enum_five_values() {
        let values = EnumValueExtractor::mysql().extract("enum('G','PG','PG-13','R','NC-17')");
        assert_eq!(values, vec!["G", "PG", "PG-13", "R", "NC-17"]);
    }

    #[test]
    fn test_mysql_enum_uppercase_and_spacing() {
        let values = EnumValueExtractor::mysql().extract("ENUM( 'small' , 'medium', 'large' )");
        assert_eq!(values, vec!["small", "medium", "large"]);
    }

    #[test]
    fn test_check_in_list_bare_numbers() {
        let values = EnumValueExtractor::check_in_list().extract("(COL IN(1, 2, 3))");
        assert_eq!(values, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_check_in_list_quoted_values() {
        let values =
            EnumValueExtractor::check_in_list().extract("CHECK (status in ('NEW', \"OPEN\", 'DONE'))");
        assert_eq!(values, vec!["NEW", "OPEN", "DONE"]);
    }

    #[test]
    fn test_check_not_in_list_is_not_an_enum() {
        let extractor = EnumValueExtractor::check_in_list();
        assert!(extractor.extract("RATING NOT IN('XXX','BANNED')").is_empty());
        assert!(extractor.extract("(status not\n in ('gone'))").is_empty());
        assert_eq!(
            extractor.extract("KNOT IN ('a', 'b')"),
            vec!["a", "b"]
        );
        assert_eq!(
            extractor.extract("CODE NOT IN ('X') AND CODE IN ('A', 'B')"),
            vec!["A", "B"]
        );
    }

    #[test]
    fn test_duplicates_and_order_preserved() {
        let values = EnumValueExtractor::mysql().extract("enum('b','a','b')");
        assert_eq!(values, vec!["b", "a", "b"]);
    }

    #[test]
    fn test_non_matching_input() {
        assert!(EnumValueExtractor::mysql().extract("varchar(20)").is_empty());
        assert!(
            EnumValueExtractor::check_in_list()
                .extract("CHECK (price > 0)")
                .is_empty()
        );
        assert!(EnumValueExtractor::mysql().extract("enum()").is_empty());
    }

    #[test]
    fn test_postgres_check_with_casts() {
        let definition = "CHECK (((rating)::text = ANY ((ARRAY['G'::character varying, \
                          'PG'::character varying, 'R'::character varying])::text[])))";
        let values = EnumValueExtractor::postgres_check().extract(definition);
        assert_eq!(values, vec!["G", "PG", "R"]);
    }

    #[test]
    fn test_custom_pattern_requires_single_group() {
        assert!(EnumValueExtractor::new(r"values:(.*)").is_ok());
        assert!(EnumValueExtractor::new(r"(a)(b)").is_err());
        assert!(EnumValueExtractor::new(r"no groups").is_err());
        assert!(EnumValueExtractor::new(r"(unclosed").is_err());
    }

    #[test]
    fn test_custom_pattern_extracts() {
        let extractor = EnumValueExtractor::new(r"domain\{(.*)\}").unwrap();
        assert_eq!(extractor.extract("domain{x, y}"), vec!["x", "y"]);
    }
}
