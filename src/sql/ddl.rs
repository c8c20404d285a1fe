//! `CREATE TABLE` generation from model metadata.

use crate::model::{KeyConstraint, KeyKind, Model};
use crate::sql::SqlDialect;
use anyhow::{bail, Context, Result};
use log::debug;

fn constraint(key: &KeyConstraint, dialect: SqlDialect) -> Result<String> {
    let mut sql = format!("CONSTRAINT {} ", dialect.quote_identifier(&key.name));
    sql.push_str(match key.kind {
        KeyKind::Primary => "PRIMARY KEY",
        KeyKind::Unique => "UNIQUE",
    });

    let sql_server = dialect == SqlDialect::SqlServer;
    if sql_server {
        sql.push_str(if key.clustered {
            " CLUSTERED"
        } else {
            " NONCLUSTERED"
        });
    }

    let mut columns = Vec::with_capacity(key.columns.len());
    for sort in &key.columns {
        sort.column.id().with_context(|| {
            format!(
                "Key {} references computed column {}",
                key.name,
                sort.column.name()
            )
        })?;
        let name = dialect.quote_identifier(sort.column.name());
        if sql_server {
            columns.push(format!("{} {}", name, sort.direction.as_str()));
        } else {
            columns.push(name);
        }
    }
    sql.push_str(&format!(" ({})", columns.join(", ")));
    Ok(sql)
}

/// `CREATE TABLE` for the stored columns and keys of `model`
pub fn create_table(model: &Model, table_name: &str, dialect: SqlDialect) -> Result<String> {
    if table_name.trim().is_empty() {
        bail!("Table name for model {} is empty", model.name());
    }
    if model.columns().is_empty() {
        bail!("Model {} has no columns", model.name());
    }

    let mut lines = Vec::new();
    for (ordinal, column) in model.columns().iter().enumerate() {
        if !column.is_stored() {
            bail!("Column {} of model {} is not stored", column.name(), model.name());
        }
        let mut line = format!(
            "    {} {}",
            dialect.quote_identifier(column.name()),
            dialect.type_name(column.data_type())
        );
        if model.is_primary_key_column(ordinal) {
            line.push_str(" NOT NULL");
        }
        lines.push(line);
    }

    for key in model.primary_key().into_iter().chain(model.unique_constraints()) {
        lines.push(format!("    {}", constraint(key, dialect)?));
    }

    debug!(
        "Generated DDL for table {} ({} columns)",
        table_name,
        model.columns().len()
    );
    Ok(format!(
        "CREATE TABLE {} (\n{}\n);",
        dialect.quote_identifier(table_name),
        lines.join(",\n")
    ))
}
