use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};

use super::HandlerContext;

const GOLD_SALES_SQL: &str = "SELECT SUM(units * price) FROM tickets WHERE type = 'Gold'";
const SAMPLE_COUNT_SQL: &str = "SELECT COUNT(*) FROM sample_table";

fn open_read_only(path: &Path) -> Result<Connection> {
    if !path.exists() {
        bail!("database not found: {}", path.display());
    }
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("open {}", path.display()))
}

/// Render a scalar the way the result files expect; NULL becomes `0`.
fn format_scalar(value: &Value) -> Result<String> {
    Ok(match value {
        Value::Null => "0".to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Real(x) if x.fract() == 0.0 && x.is_finite() => format!("{x:.1}"),
        Value::Real(x) => x.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(_) => bail!("unexpected blob result"),
    })
}

fn query_scalar(conn: &Connection, sql: &str) -> Result<String> {
    let value: Value = conn
        .query_row(sql, [], |row| row.get(0))
        .with_context(|| format!("query `{sql}`"))?;
    format_scalar(&value)
}

pub(super) fn gold_ticket_sales(ctx: &HandlerContext<'_>) -> Result<String> {
    let conn = open_read_only(&ctx.data_root.resolve("ticket-sales.db")?)?;
    let total = query_scalar(&conn, GOLD_SALES_SQL)?;
    ctx.data_root.write("ticket-sales-gold.txt", &total)?;
    Ok(format!("A10 executed: Total Gold ticket sales = {total}."))
}

pub(super) fn sample_row_count(ctx: &HandlerContext<'_>) -> Result<String> {
    let conn = open_read_only(&ctx.data_root.resolve("sample.db")?)?;
    let count = query_scalar(&conn, SAMPLE_COUNT_SQL)?;
    ctx.data_root.write("sample-row-count.txt", &count)?;
    Ok(format!("B5 executed: sample_table has {count} rows."))
}
