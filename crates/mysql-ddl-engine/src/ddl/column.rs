//! Column definition fragment builder.
//!
//! Reproduces the server's own grammar and defaulting rules for column
//! clauses: per-type default quoting, generated-column syntax, the
//! AUTO_INCREMENT/primary-key coupling, and relative-position markers.
//! The builders are pure functions over a [`ColumnSpec`].

use std::collections::HashSet;

use crate::core::identifier::{backquote, quote_literal};
use crate::core::spec::{ColumnSpec, ColumnPosition, DefaultValue, FnSpelling};

/// Types that never receive a `(length)` clause, whatever was supplied.
const TYPES_WITHOUT_LENGTH: &[&str] = &[
    "DATE",
    "DATETIME",
    "TIME",
    "TINYBLOB",
    "TINYTEXT",
    "BLOB",
    "TEXT",
    "MEDIUMBLOB",
    "MEDIUMTEXT",
    "LONGBLOB",
    "LONGTEXT",
    "SERIAL",
    "BOOLEAN",
    "UUID",
];

/// Types that accept a `CHARACTER SET` clause.
const TYPES_WITH_CHARSET: &[&str] = &[
    "CHAR",
    "VARCHAR",
    "TINYTEXT",
    "TEXT",
    "MEDIUMTEXT",
    "LONGTEXT",
    "ENUM",
    "SET",
];

fn type_permits_length(sql_type: &str) -> bool {
    let upper = sql_type.to_ascii_uppercase();
    !TYPES_WITHOUT_LENGTH.contains(&upper.as_str())
}

fn type_accepts_charset(sql_type: &str) -> bool {
    let upper = sql_type.to_ascii_uppercase();
    TYPES_WITH_CHARSET.contains(&upper.as_str())
}

fn is_boolean_type(sql_type: &str) -> bool {
    sql_type.eq_ignore_ascii_case("BOOLEAN")
}

/// Types whose CURRENT_TIMESTAMP default carries the fractional-seconds
/// precision of the column.
fn is_time_type(sql_type: &str) -> bool {
    sql_type.eq_ignore_ascii_case("TIMESTAMP")
        || sql_type.eq_ignore_ascii_case("DATETIME")
        || sql_type.eq_ignore_ascii_case("TIME")
}

/// Render a boolean literal from a user-supplied default value.
///
/// One layer of single quotes is tolerated; empty, `0` and `false` are
/// falsy, everything else truthy.
fn boolean_literal(value: &str) -> &'static str {
    let bare = value.trim_matches('\'');
    if bare.is_empty() || bare == "0" || bare.eq_ignore_ascii_case("false") {
        "FALSE"
    } else {
        "TRUE"
    }
}

/// Build a column definition fragment: quoted name followed by the full
/// clause list, plus an `, add PRIMARY KEY (...)` suffix when an
/// AUTO_INCREMENT column is not yet covered by the primary key.
///
/// Returns the fragment and whether the primary-key suffix was appended.
pub fn build_column_definition(
    spec: &ColumnSpec,
    pk_columns: &HashSet<String>,
) -> (String, bool) {
    let mut fragment = format!("{} {}", backquote(&spec.name), render_clauses(spec));

    let auto_increment = spec.generated.is_none()
        && spec.extra.to_ascii_uppercase().contains("AUTO_INCREMENT");
    let appended_pk = auto_increment && !pk_columns.contains(&spec.name);
    if appended_pk {
        fragment.push_str(&format!(", add PRIMARY KEY ({})", backquote(&spec.name)));
    }

    (fragment, appended_pk)
}

/// Build a column alteration fragment: `` `old` `new` <clauses> ``.
///
/// Same grammar as [`build_column_definition`] minus the primary-key
/// auto-insertion.
pub fn build_column_alteration(old_name: &str, new_name: &str, spec: &ColumnSpec) -> String {
    format!(
        "{} {} {}",
        backquote(old_name),
        backquote(new_name),
        render_clauses(spec)
    )
}

/// Everything after the column name: type, attributes, generated
/// clause, charset, nullability, default, extra, comment, position.
fn render_clauses(spec: &ColumnSpec) -> String {
    let mut query = spec.sql_type.clone();

    if !spec.length.is_empty() && type_permits_length(&spec.sql_type) {
        query.push_str(&format!("({})", spec.length));
    }

    if !spec.attribute.is_empty() {
        query.push(' ');
        query.push_str(&spec.attribute);
    }

    // A generated column cannot also be AUTO_INCREMENT.
    let mut extra = spec.extra.clone();
    if spec.generated.is_some() {
        let trimmed = extra.trim_start();
        if trimmed
            .get(..14)
            .is_some_and(|head| head.eq_ignore_ascii_case("AUTO_INCREMENT"))
        {
            extra = trimmed[14..].trim().to_string();
        }
    }

    if let Some(generated) = &spec.generated {
        query.push_str(&format!(
            " AS ({}) {}",
            generated.expression,
            generated.virtuality.as_sql()
        ));
    }

    if !spec.collation.is_empty()
        && spec.collation != "NULL"
        && type_accepts_charset(&spec.sql_type)
    {
        query.push_str(&format!(" CHARACTER SET {}", spec.collation));
    }

    query.push_str(if spec.nullable { " NULL" } else { " NOT NULL" });

    if spec.generated.is_none() {
        query.push_str(&render_default(spec));
    }

    if !extra.is_empty() {
        query.push(' ');
        query.push_str(&extra);
    }

    if !spec.comment.is_empty() {
        query.push_str(&format!(" COMMENT {}", quote_literal(&spec.comment)));
    }

    match &spec.position {
        Some(ColumnPosition::First) => query.push_str(" FIRST"),
        Some(ColumnPosition::After(column)) => {
            query.push_str(&format!(" AFTER {}", backquote(column)));
        }
        None => {}
    }

    query
}

fn render_default(spec: &ColumnSpec) -> String {
    match &spec.default {
        DefaultValue::None => String::new(),
        DefaultValue::Null => " DEFAULT NULL".to_string(),
        DefaultValue::CurrentTimestamp(FnSpelling::Keyword) => {
            if !spec.length.is_empty() && is_time_type(&spec.sql_type) {
                format!(" DEFAULT CURRENT_TIMESTAMP({})", spec.length)
            } else {
                " DEFAULT CURRENT_TIMESTAMP".to_string()
            }
        }
        DefaultValue::CurrentTimestamp(FnSpelling::FunctionCall) => {
            " DEFAULT current_timestamp()".to_string()
        }
        // Both spellings normalize to the function call.
        DefaultValue::Uuid(_) => " DEFAULT uuid()".to_string(),
        DefaultValue::UserDefined(value) => {
            if is_boolean_type(&spec.sql_type) {
                format!(" DEFAULT {}", boolean_literal(value))
            } else {
                format!(" DEFAULT {}", value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spec::{GeneratedExpr, Virtuality};

    fn base_spec(name: &str, sql_type: &str) -> ColumnSpec {
        ColumnSpec {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            length: "12".to_string(),
            attribute: "PMA_attribute".to_string(),
            collation: "PMA_collation".to_string(),
            nullable: true,
            default: DefaultValue::UserDefined("'12'".to_string()),
            extra: String::new(),
            comment: "PMA_comment".to_string(),
            generated: None,
            position: Some(ColumnPosition::First),
        }
    }

    fn pk(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_user_defined_default_rendered_verbatim() {
        let spec = base_spec("PMA_name", "DOUBLE");
        let (sql, appended) = build_column_definition(&spec, &pk(&["PMA_name"]));
        assert_eq!(
            sql,
            "`PMA_name` DOUBLE(12) PMA_attribute NULL DEFAULT '12' COMMENT 'PMA_comment' FIRST"
        );
        assert!(!appended);
    }

    #[test]
    fn test_boolean_gets_no_length_and_literal_defaults() {
        let mut spec = base_spec("PMA_name", "BOOLEAN");
        spec.default = DefaultValue::UserDefined("1".to_string());
        let (sql, _) = build_column_definition(&spec, &pk(&[]));
        assert_eq!(
            sql,
            "`PMA_name` BOOLEAN PMA_attribute NULL DEFAULT TRUE COMMENT 'PMA_comment' FIRST"
        );

        spec.default = DefaultValue::UserDefined("'0'".to_string());
        let (sql, _) = build_column_definition(&spec, &pk(&[]));
        assert!(sql.contains("DEFAULT FALSE"));

        // truthy literals other than 1 render TRUE as well
        spec.default = DefaultValue::UserDefined("12".to_string());
        let (sql, _) = build_column_definition(&spec, &pk(&[]));
        assert!(sql.contains("DEFAULT TRUE"));
    }

    #[test]
    fn test_default_null() {
        let mut spec = base_spec("PMA_name", "BOOLEAN");
        spec.default = DefaultValue::Null;
        let (sql, _) = build_column_definition(&spec, &pk(&[]));
        assert_eq!(
            sql,
            "`PMA_name` BOOLEAN PMA_attribute NULL DEFAULT NULL COMMENT 'PMA_comment' FIRST"
        );
    }

    #[test]
    fn test_current_timestamp_spellings() {
        let mut spec = base_spec("PMA_name", "BOOLEAN");
        spec.default = DefaultValue::CurrentTimestamp(FnSpelling::Keyword);
        let (sql, _) = build_column_definition(&spec, &pk(&[]));
        assert!(sql.contains("DEFAULT CURRENT_TIMESTAMP "));

        spec.default = DefaultValue::CurrentTimestamp(FnSpelling::FunctionCall);
        let (sql, _) = build_column_definition(&spec, &pk(&[]));
        assert!(sql.contains("DEFAULT current_timestamp() "));
    }

    #[test]
    fn test_current_timestamp_carries_column_precision() {
        let mut spec = base_spec("PMA_name", "TIMESTAMP");
        spec.length = "3".to_string();
        spec.default = DefaultValue::CurrentTimestamp(FnSpelling::Keyword);
        let (sql, _) = build_column_definition(&spec, &pk(&[]));
        assert_eq!(
            sql,
            "`PMA_name` TIMESTAMP(3) PMA_attribute NULL DEFAULT CURRENT_TIMESTAMP(3) \
             COMMENT 'PMA_comment' FIRST"
        );

        // the function-call spelling never takes the precision suffix
        spec.default = DefaultValue::CurrentTimestamp(FnSpelling::FunctionCall);
        let (sql, _) = build_column_definition(&spec, &pk(&[]));
        assert!(sql.contains("DEFAULT current_timestamp() "));
    }

    #[test]
    fn test_timestamp_user_defined_default_kept_as_given() {
        let mut spec = base_spec("PMA_name", "TIMESTAMP");
        spec.length = String::new();
        spec.default = DefaultValue::UserDefined("'0000-00-00 00:00:00.000000'".to_string());
        let (sql, _) = build_column_definition(&spec, &pk(&[]));
        assert_eq!(
            sql,
            "`PMA_name` TIMESTAMP PMA_attribute NULL DEFAULT '0000-00-00 00:00:00.000000' \
             COMMENT 'PMA_comment' FIRST"
        );
    }

    #[test]
    fn test_uuid_default_always_function_call() {
        let mut spec = base_spec("PMA_name", "UUID");
        spec.comment = String::new();
        spec.position = None;
        spec.default = DefaultValue::Uuid(FnSpelling::Keyword);
        let (sql, _) = build_column_definition(&spec, &pk(&[]));
        assert_eq!(sql, "`PMA_name` UUID PMA_attribute NULL DEFAULT uuid()");

        spec.default = DefaultValue::Uuid(FnSpelling::FunctionCall);
        let (sql, _) = build_column_definition(&spec, &pk(&[]));
        assert_eq!(sql, "`PMA_name` UUID PMA_attribute NULL DEFAULT uuid()");
    }

    #[test]
    fn test_no_default_clause_for_none() {
        let mut spec = base_spec("PMA_name", "BOOLEAN");
        spec.default = DefaultValue::None;
        spec.extra = "INCREMENT".to_string();
        let (sql, appended) = build_column_definition(&spec, &pk(&[]));
        assert_eq!(
            sql,
            "`PMA_name` BOOLEAN PMA_attribute NULL INCREMENT COMMENT 'PMA_comment' FIRST"
        );
        assert!(!appended);
    }

    #[test]
    fn test_auto_increment_adds_primary_key_when_missing() {
        let mut spec = base_spec("ids", "INT");
        spec.length = "11".to_string();
        spec.default = DefaultValue::None;
        spec.extra = "AUTO_INCREMENT".to_string();

        let (sql, appended) = build_column_definition(&spec, &pk(&["othercol"]));
        assert_eq!(
            sql,
            "`ids` INT(11) PMA_attribute NULL AUTO_INCREMENT COMMENT 'PMA_comment' FIRST, \
             add PRIMARY KEY (`ids`)"
        );
        assert!(appended);
    }

    #[test]
    fn test_auto_increment_skips_primary_key_when_covered() {
        let mut spec = base_spec("ids", "INT");
        spec.length = "11".to_string();
        spec.default = DefaultValue::None;
        spec.extra = "AUTO_INCREMENT".to_string();

        let (sql, appended) = build_column_definition(&spec, &pk(&["ids"]));
        assert_eq!(
            sql,
            "`ids` INT(11) PMA_attribute NULL AUTO_INCREMENT COMMENT 'PMA_comment' FIRST"
        );
        assert!(!appended);
    }

    #[test]
    fn test_other_extra_never_adds_primary_key() {
        let mut spec = base_spec("ids", "INT");
        spec.length = "11".to_string();
        spec.default = DefaultValue::None;
        spec.extra = "DEF".to_string();

        let (sql, appended) = build_column_definition(&spec, &pk(&[]));
        assert_eq!(
            sql,
            "`ids` INT(11) PMA_attribute NULL DEF COMMENT 'PMA_comment' FIRST"
        );
        assert!(!appended);
    }

    #[test]
    fn test_generated_column_suppresses_default_and_auto_increment() {
        let mut spec = base_spec("ids", "INT");
        spec.length = "11".to_string();
        spec.default = DefaultValue::Null;
        spec.extra = "AUTO_INCREMENT".to_string();
        spec.generated = Some(GeneratedExpr {
            expression: "1".to_string(),
            virtuality: Virtuality::Virtual,
        });

        let (sql, appended) = build_column_definition(&spec, &pk(&[]));
        assert_eq!(
            sql,
            "`ids` INT(11) PMA_attribute AS (1) VIRTUAL NULL COMMENT 'PMA_comment' FIRST"
        );
        assert!(!appended);
    }

    #[test]
    fn test_stored_generated_column() {
        let mut spec = ColumnSpec::new("total", "INT");
        spec.generated = Some(GeneratedExpr {
            expression: "`a` + `b`".to_string(),
            virtuality: Virtuality::Stored,
        });
        let (sql, _) = build_column_definition(&spec, &pk(&[]));
        assert_eq!(sql, "`total` INT AS (`a` + `b`) STORED NULL");
    }

    #[test]
    fn test_generated_string_column_clause_order() {
        let mut spec = ColumnSpec::new("slug", "VARCHAR");
        spec.length = "64".to_string();
        spec.collation = "utf8mb4_general_ci".to_string();
        spec.generated = Some(GeneratedExpr {
            expression: "lower(`name`)".to_string(),
            virtuality: Virtuality::Stored,
        });

        // the AS clause follows the attributes directly, before charset
        let (sql, _) = build_column_definition(&spec, &pk(&[]));
        assert_eq!(
            sql,
            "`slug` VARCHAR(64) AS (lower(`name`)) STORED \
             CHARACTER SET utf8mb4_general_ci NULL"
        );
    }

    #[test]
    fn test_charset_only_for_string_types() {
        let mut spec = base_spec("name", "VARCHAR");
        spec.length = "2".to_string();
        spec.collation = "charset1".to_string();
        spec.comment = String::new();
        spec.position = None;
        spec.default = DefaultValue::None;
        let (sql, _) = build_column_definition(&spec, &pk(&[]));
        assert_eq!(
            sql,
            "`name` VARCHAR(2) PMA_attribute CHARACTER SET charset1 NULL"
        );

        // numeric types silently drop the collation
        spec.sql_type = "INT".to_string();
        let (sql, _) = build_column_definition(&spec, &pk(&[]));
        assert_eq!(sql, "`name` INT(2) PMA_attribute NULL");
    }

    #[test]
    fn test_not_null() {
        let mut spec = ColumnSpec::new("id", "INT");
        spec.nullable = false;
        let (sql, _) = build_column_definition(&spec, &pk(&[]));
        assert_eq!(sql, "`id` INT NOT NULL");
    }

    #[test]
    fn test_build_is_idempotent() {
        let spec = base_spec("PMA_name", "DOUBLE");
        let first = build_column_definition(&spec, &pk(&[]));
        let second = build_column_definition(&spec, &pk(&[]));
        assert_eq!(first, second);
    }

    #[test]
    fn test_column_alteration() {
        let spec = ColumnSpec {
            name: "new_name".to_string(),
            sql_type: "VARCHAR".to_string(),
            length: "2".to_string(),
            attribute: "new_name".to_string(),
            collation: "charset1".to_string(),
            nullable: true,
            default: DefaultValue::UserDefined("'VARCHAR'".to_string()),
            extra: "AUTO_INCREMENT".to_string(),
            comment: "PMA comment".to_string(),
            generated: None,
            position: Some(ColumnPosition::After("new_name".to_string())),
        };

        let sql = build_column_alteration("name", "new_name", &spec);
        assert_eq!(
            sql,
            "`name` `new_name` VARCHAR(2) new_name CHARACTER SET charset1 NULL \
             DEFAULT 'VARCHAR' AUTO_INCREMENT COMMENT 'PMA comment' AFTER `new_name`"
        );
    }
}
