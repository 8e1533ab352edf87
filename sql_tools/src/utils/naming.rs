//! Naming utilities for sql_tools
//!
//! Identifier quoting, generated key names, and the normalization rules the
//! comparator applies before it compares SQL fragments.

use once_cell::sync::Lazy;
use regex::Regex;
use sha1::{Digest, Sha1};

/// Length of generated key names such as `PK_b249cc64cf63b8a22557cdc8537`
pub const KEY_NAME_LENGTH: usize = 30;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// `'value'::character varying` or `'{}'::text[]`
static CAST_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^('(?:[^']|'')*')::[\w\s."]+(?:\[\])?$"#).unwrap());

/// Quote an identifier for PostgreSQL
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal for PostgreSQL
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quote and join a column list: `"a", "b"`
pub fn quote_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| quote_identifier(n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Generate a deterministic key name from a table and the columns it covers:
/// `prefix + sha1(table_column1_column2)`, cut to [`KEY_NAME_LENGTH`]
pub fn key_name(prefix: &str, table_name: &str, columns: &[String]) -> String {
    let digest = Sha1::digest(format!("{}_{}", table_name, columns.join("_")).as_bytes());
    let mut name = format!("{}{:x}", prefix, digest);
    name.truncate(KEY_NAME_LENGTH);
    name
}

/// Collapse whitespace runs and trim
pub fn normalize_sql(sql: &str) -> String {
    WHITESPACE.replace_all(sql.trim(), " ").into_owned()
}

/// Canonical spelling of a type name, so `varchar` and `character varying` compare equal
pub fn normalize_type(data_type: &str) -> String {
    let lowered = normalize_sql(data_type).to_lowercase();

    // Split off a length / precision modifier so aliases still apply
    let (base, modifier) = match lowered.find('(') {
        Some(pos) => (lowered[..pos].trim().to_string(), lowered[pos..].replace(' ', "")),
        None => (lowered.clone(), String::new()),
    };

    let canonical = match base.as_str() {
        "int" | "int4" | "integer" => "integer",
        "int2" | "smallint" => "smallint",
        "int8" | "bigint" => "bigint",
        "float4" | "real" => "real",
        "float8" | "double precision" => "double precision",
        "bool" | "boolean" => "boolean",
        "varchar" | "character varying" => "character varying",
        "char" | "character" | "bpchar" => "character",
        "decimal" | "numeric" => "numeric",
        "timestamp" | "timestamp without time zone" => "timestamp without time zone",
        "timestamptz" | "timestamp with time zone" => "timestamp with time zone",
        "time" | "time without time zone" => "time without time zone",
        "timetz" | "time with time zone" => "time with time zone",
        other => other,
    };

    format!("{}{}", canonical, modifier)
}

/// Canonical default expression: drops the redundant cast PostgreSQL adds to literals
pub fn normalize_default(default: &str) -> String {
    let normalized = normalize_sql(default);
    match CAST_LITERAL.captures(&normalized) {
        Some(captures) => captures[1].to_string(),
        None => normalized,
    }
}

/// Canonical check / predicate expression: strips enclosing parentheses
pub fn normalize_expression(expression: &str) -> String {
    let mut current = normalize_sql(expression);
    while let Some(inner) = strip_outer_parens(&current) {
        current = inner.trim().to_string();
    }
    current
}

fn strip_outer_parens(expression: &str) -> Option<&str> {
    if !expression.starts_with('(') || !expression.ends_with(')') {
        return None;
    }

    // Only strip when the first paren closes at the very end
    let mut depth = 0usize;
    for (i, c) in expression.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && i != expression.len() - 1 {
                    return None;
                }
            }
            _ => {}
        }
    }

    Some(&expression[1..expression.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("parentId"), "\"parentId\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_key_name() {
        let name = key_name("PK_", "table1", &["id".to_string()]);
        assert_eq!(name, "PK_b249cc64cf63b8a22557cdc8537");
        assert_eq!(name.len(), KEY_NAME_LENGTH);
        assert_ne!(name, key_name("PK_", "table2", &["id".to_string()]));

        let columns = vec!["parentId".to_string()];
        assert_eq!(key_name("FK_", "table2", &columns), "FK_3fcca5cc563abf256fc346e3ff4");
        assert_eq!(key_name("IDX_", "table2", &columns), "IDX_3fcca5cc563abf256fc346e3ff");
    }

    #[rstest]
    #[case("varchar(255)", "character varying(255)")]
    #[case("VARCHAR ( 255 )", "character varying(255)")]
    #[case("int4", "integer")]
    #[case("timestamptz", "timestamp with time zone")]
    #[case("uuid", "uuid")]
    #[case("numeric(10, 2)", "numeric(10,2)")]
    fn test_normalize_type(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_type(input), expected);
    }

    #[rstest]
    #[case("'active'::character varying", "'active'")]
    #[case("'{}'::text[]", "'{}'")]
    #[case("now()", "now()")]
    #[case("  gen_random_uuid( )  ", "gen_random_uuid( )")]
    fn test_normalize_default(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_default(input), expected);
    }

    #[rstest]
    #[case("((age > 0))", "age > 0")]
    #[case("(a > 0) AND (b > 0)", "(a > 0) AND (b > 0)")]
    #[case("age   >\n 0", "age > 0")]
    fn test_normalize_expression(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_expression(input), expected);
    }
}
