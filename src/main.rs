//! vibeorm - prints DDL and generated SQL for a sample sales model

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, ValueEnum};
use vibeorm::column::{count_rows, Column};
use vibeorm::data::ColumnValue;
use vibeorm::model::Model;
use vibeorm::query::{DbSelectStatement, SelectBuilder};
use vibeorm::sql::{create_table, to_sql, SqlDialect};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Dialect {
    Postgres,
    SqlServer,
    Sqlite,
}

impl From<Dialect> for SqlDialect {
    fn from(dialect: Dialect) -> Self {
        match dialect {
            Dialect::Postgres => SqlDialect::Postgres,
            Dialect::SqlServer => SqlDialect::SqlServer,
            Dialect::Sqlite => SqlDialect::Sqlite,
        }
    }
}

/// vibeorm - typed query composition over a sample sales model
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SQL dialect to generate
    #[arg(long, value_enum, default_value = "postgres")]
    dialect: Dialect,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Keep nested queries as subqueries instead of flattening them
    #[arg(long)]
    no_inline: bool,
}

struct SalesModels {
    product: Model,
    detail: Model,
}

fn sales_models() -> Result<SalesModels> {
    let mut product = Model::new("Product");
    let product_id = product.add_column::<i32>("ProductID");
    let number = product.add_column::<String>("ProductNumber");
    product.add_column::<String>("Name");
    product.add_column::<f64>("ListPrice");
    product.set_primary_key("PK_Product_ProductID", vec![product_id.asc()], true)?;
    product.add_unique_constraint("AK_Product_ProductNumber", vec![number.asc()], false)?;

    let mut detail = Model::new("SalesOrderDetail");
    let order_id = detail.add_column::<i32>("SalesOrderID");
    let detail_id = detail.add_column::<i32>("SalesOrderDetailID");
    detail.add_column::<i32>("ProductID");
    detail.add_column::<i32>("OrderQty");
    detail.add_column::<f64>("UnitPrice");
    detail.set_primary_key(
        "PK_SalesOrderDetail",
        vec![order_id.asc(), detail_id.asc()],
        true,
    )?;

    Ok(SalesModels { product, detail })
}

fn column<T: ColumnValue>(model: &Model, name: &str) -> Result<Column<T>> {
    let column = model
        .column_by_name(name)
        .with_context(|| format!("Unknown column {} in {}", name, model.name()))?;
    Ok(column.typed::<T>()?)
}

fn print_statement(title: &str, statement: &DbSelectStatement, dialect: SqlDialect) -> Result<()> {
    let generated = to_sql(statement, dialect).context("Failed to generate SQL")?;
    println!("-- {}", title);
    println!("{};", generated.sql);
    for (i, param) in generated.params.iter().enumerate() {
        println!("--   {} = {:?}", dialect.placeholder(i + 1), param);
    }
    println!();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let dialect = SqlDialect::from(args.dialect);
    let models = sales_models()?;

    for model in [&models.product, &models.detail] {
        let ddl = create_table(model, model.name(), dialect)
            .with_context(|| format!("Failed to generate DDL for {}", model.name()))?;
        println!("{}\n", ddl);
    }

    let detail = &models.detail;
    let order_id = column::<i32>(detail, "SalesOrderID")?;
    let qty = column::<i32>(detail, "OrderQty")?;
    let price = column::<f64>(detail, "UnitPrice")?;

    let lines = SelectBuilder::from_model(detail)
        .select("SalesOrderID", &order_id)
        .select("Qty", &qty)
        .select("Price", &price)
        .filter(&qty.greater_than_or_equal(&Column::param("minQty", Some(1))))
        .build("OrderLine")
        .context("Failed to build order lines")?;

    let line_qty: Column<i32> = lines.column("Qty")?;
    let line_price: Column<f64> = lines.column("Price")?;
    let line_total = &line_price * &line_qty.cast::<f64>();
    let totals = SelectBuilder::from_query(&lines)
        .select("SalesOrderID", &lines.column::<i32>("SalesOrderID")?)
        .select("LineTotal", &line_total)
        .filter(&line_total.greater_than(&Column::value(100.0)))
        .order_by(line_total.desc())
        .build("LineTotal")
        .context("Failed to build line totals")?;

    let statement = totals.statement();
    match statement.inline_subquery() {
        Some(flat) if !args.no_inline => print_statement("Line totals", &flat, dialect)?,
        _ => print_statement("Line totals", statement, dialect)?,
    }

    let summary = SelectBuilder::from_model(detail)
        .select("SalesOrderID", &order_id)
        .select("TotalQty", &qty.sum())
        .select("Lines", &count_rows(detail))
        .group_by(&order_id)
        .having(&qty.sum().greater_than(&Column::value(1)))
        .build("OrderSummary")
        .context("Failed to build order summary")?;
    print_statement("Order summary", summary.statement(), dialect)?;

    Ok(())
}
