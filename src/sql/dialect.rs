//! Per-database differences in generated SQL.

use crate::data::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    #[default]
    Postgres,
    SqlServer,
    Sqlite,
}

impl SqlDialect {
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            SqlDialect::SqlServer => format!("[{}]", name.replace(']', "]]")),
            SqlDialect::Postgres | SqlDialect::Sqlite => {
                format!("\"{}\"", name.replace('"', "\"\""))
            }
        }
    }

    /// Placeholder for the parameter at 1-based `index`
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            SqlDialect::Postgres => format!("${}", index),
            SqlDialect::SqlServer => format!("@p{}", index),
            SqlDialect::Sqlite => format!("?{}", index),
        }
    }

    pub fn boolean_literal(&self, value: bool) -> &'static str {
        match (self, value) {
            (SqlDialect::Postgres, true) => "TRUE",
            (SqlDialect::Postgres, false) => "FALSE",
            (_, true) => "1",
            (_, false) => "0",
        }
    }

    pub fn string_literal(&self, value: &str) -> String {
        let escaped = value.replace('\'', "''");
        match self {
            SqlDialect::SqlServer => format!("N'{}'", escaped),
            SqlDialect::Postgres | SqlDialect::Sqlite => format!("'{}'", escaped),
        }
    }

    /// Literal for NaN or an infinity, if the database can represent it
    pub fn non_finite_literal(&self, value: f64) -> Option<&'static str> {
        match self {
            SqlDialect::Postgres if value.is_nan() => Some("'NaN'::float8"),
            SqlDialect::Postgres if value > 0.0 => Some("'Infinity'::float8"),
            SqlDialect::Postgres => Some("'-Infinity'::float8"),
            // SQLite stores NaN as NULL
            SqlDialect::Sqlite if value.is_nan() => Some("NULL"),
            SqlDialect::Sqlite if value > 0.0 => Some("9e999"),
            SqlDialect::Sqlite => Some("-9e999"),
            SqlDialect::SqlServer => None,
        }
    }

    pub fn concat_operator(&self) -> &'static str {
        match self {
            SqlDialect::SqlServer => "+",
            SqlDialect::Postgres | SqlDialect::Sqlite => "||",
        }
    }

    /// Bitwise XOR operator, if the database has one
    pub fn xor_operator(&self) -> Option<&'static str> {
        match self {
            SqlDialect::Postgres => Some("#"),
            SqlDialect::SqlServer => Some("^"),
            SqlDialect::Sqlite => None,
        }
    }

    pub fn length_function(&self) -> &'static str {
        match self {
            SqlDialect::SqlServer => "LEN",
            SqlDialect::Postgres | SqlDialect::Sqlite => "LENGTH",
        }
    }

    pub fn type_name(&self, data_type: DataType) -> &'static str {
        match (self, data_type) {
            (SqlDialect::Postgres, DataType::Boolean) => "BOOLEAN",
            (SqlDialect::Postgres, DataType::Int32) => "INTEGER",
            (SqlDialect::Postgres, DataType::Int64) => "BIGINT",
            (SqlDialect::Postgres, DataType::Double) => "DOUBLE PRECISION",
            (SqlDialect::Postgres, DataType::Varchar) => "TEXT",

            (SqlDialect::SqlServer, DataType::Boolean) => "BIT",
            (SqlDialect::SqlServer, DataType::Int32) => "INT",
            (SqlDialect::SqlServer, DataType::Int64) => "BIGINT",
            (SqlDialect::SqlServer, DataType::Double) => "FLOAT",
            (SqlDialect::SqlServer, DataType::Varchar) => "NVARCHAR(4000)",

            (SqlDialect::Sqlite, DataType::Boolean) => "INTEGER",
            (SqlDialect::Sqlite, DataType::Int32) => "INTEGER",
            (SqlDialect::Sqlite, DataType::Int64) => "INTEGER",
            (SqlDialect::Sqlite, DataType::Double) => "REAL",
            (SqlDialect::Sqlite, DataType::Varchar) => "TEXT",
        }
    }

    /// Trailing paging clause, including its leading space.
    ///
    /// SQL Server pages through `OFFSET .. FETCH`, which needs an ORDER BY;
    /// `has_order_by` tells whether the statement already has one.
    pub fn paging_clause(
        &self,
        has_order_by: bool,
        offset: Option<usize>,
        fetch: Option<usize>,
    ) -> String {
        if offset.is_none() && fetch.is_none() {
            return String::new();
        }

        match self {
            SqlDialect::SqlServer => {
                let mut clause = String::new();
                if !has_order_by {
                    clause.push_str(" ORDER BY (SELECT NULL)");
                }
                clause.push_str(&format!(" OFFSET {} ROWS", offset.unwrap_or(0)));
                if let Some(fetch) = fetch {
                    clause.push_str(&format!(" FETCH NEXT {} ROWS ONLY", fetch));
                }
                clause
            }
            SqlDialect::Postgres | SqlDialect::Sqlite => {
                let mut clause = String::new();
                match (fetch, self) {
                    (Some(fetch), _) => clause.push_str(&format!(" LIMIT {}", fetch)),
                    (None, SqlDialect::Sqlite) => clause.push_str(" LIMIT -1"),
                    (None, _) => {}
                }
                if let Some(offset) = offset {
                    clause.push_str(&format!(" OFFSET {}", offset));
                }
                clause
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(SqlDialect::Postgres.quote_identifier("Name"), "\"Name\"");
        assert_eq!(SqlDialect::Sqlite.quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(SqlDialect::SqlServer.quote_identifier("Name"), "[Name]");
        assert_eq!(SqlDialect::SqlServer.quote_identifier("a]b"), "[a]]b]");
    }

    #[test]
    fn test_literals_and_placeholders() {
        assert_eq!(SqlDialect::Postgres.placeholder(1), "$1");
        assert_eq!(SqlDialect::SqlServer.placeholder(2), "@p2");
        assert_eq!(SqlDialect::Sqlite.placeholder(3), "?3");

        assert_eq!(SqlDialect::Postgres.boolean_literal(true), "TRUE");
        assert_eq!(SqlDialect::SqlServer.boolean_literal(false), "0");
        assert_eq!(SqlDialect::Postgres.string_literal("O'Neil"), "'O''Neil'");
        assert_eq!(SqlDialect::SqlServer.string_literal("x"), "N'x'");
    }

    #[test]
    fn test_non_finite_literals() {
        assert_eq!(
            SqlDialect::Postgres.non_finite_literal(f64::INFINITY),
            Some("'Infinity'::float8")
        );
        assert_eq!(SqlDialect::Sqlite.non_finite_literal(f64::NEG_INFINITY), Some("-9e999"));
        assert_eq!(SqlDialect::Sqlite.non_finite_literal(f64::NAN), Some("NULL"));
        assert_eq!(SqlDialect::SqlServer.non_finite_literal(f64::NAN), None);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(SqlDialect::Postgres.type_name(DataType::Double), "DOUBLE PRECISION");
        assert_eq!(SqlDialect::SqlServer.type_name(DataType::Boolean), "BIT");
        assert_eq!(SqlDialect::Sqlite.type_name(DataType::Int64), "INTEGER");
    }

    #[test]
    fn test_paging_clause() {
        assert_eq!(SqlDialect::Postgres.paging_clause(true, None, None), "");
        assert_eq!(
            SqlDialect::Postgres.paging_clause(true, Some(20), Some(10)),
            " LIMIT 10 OFFSET 20"
        );
        assert_eq!(SqlDialect::Postgres.paging_clause(false, Some(5), None), " OFFSET 5");
        assert_eq!(
            SqlDialect::Sqlite.paging_clause(false, Some(5), None),
            " LIMIT -1 OFFSET 5"
        );
        assert_eq!(
            SqlDialect::SqlServer.paging_clause(true, None, Some(10)),
            " OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"
        );
        assert_eq!(
            SqlDialect::SqlServer.paging_clause(false, Some(5), None),
            " ORDER BY (SELECT NULL) OFFSET 5 ROWS"
        );
    }
}
