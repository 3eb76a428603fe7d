use std::io::Read;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use super::HandlerContext;

/// Rows whose `active` column is `true` (any case), as header-keyed objects.
pub(crate) fn filter_active<R: Read>(reader: R) -> Result<Vec<Map<String, Value>>> {
    let mut csv = csv::Reader::from_reader(reader);
    let headers = csv.headers().context("read csv header")?.clone();
    let mut rows = Vec::new();
    for record in csv.records() {
        let record = record.context("read csv record")?;
        let row: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), Value::String(value.to_string())))
            .collect();
        let active = row.get("active").and_then(Value::as_str).unwrap_or("");
        if active.eq_ignore_ascii_case("true") {
            rows.push(row);
        }
    }
    Ok(rows)
}

pub(super) fn filter_sample_csv(ctx: &HandlerContext<'_>) -> Result<String> {
    let raw = ctx.data_root.read_to_string("sample.csv")?;
    let rows = filter_active(raw.as_bytes()).context("filter sample.csv")?;
    let payload = serde_json::to_string(&rows).context("serialize filtered rows")?;
    ctx.data_root.write("filtered-sample.json", &payload)?;
    Ok("B10 executed: CSV filtered to JSON.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_only_active_rows() {
        let csv = "id,name,active\n1,ann,true\n2,bob,false\n3,cy,TRUE\n4,dee,\n";
        let rows = filter_active(csv.as_bytes()).expect("filter");
        let ids: Vec<&str> = rows
            .iter()
            .map(|row| row["id"].as_str().expect("id"))
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(
            Value::Object(rows[0].clone()),
            json!({"id": "1", "name": "ann", "active": "true"})
        );
    }

    #[test]
    fn missing_active_column_keeps_nothing() {
        let rows = filter_active("id,name\n1,ann\n".as_bytes()).expect("filter");
        assert!(rows.is_empty());
    }
}
