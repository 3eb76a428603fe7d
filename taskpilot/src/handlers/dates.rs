use anyhow::Result;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};

use super::HandlerContext;

const DATE_FORMATS: &[&str] = &["%d-%b-%Y", "%b %d, %Y", "%Y-%m-%d"];
const DATETIME_FORMATS: &[&str] = &["%Y/%m/%d %H:%M:%S"];

/// Parse one line in any accepted format. Unparseable lines yield `None`.
fn parse_date(line: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(line, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(line, fmt).ok())
                .map(|dt| dt.date())
        })
}

pub(crate) fn count_wednesdays(text: &str) -> usize {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(parse_date)
        .filter(|date| date.weekday() == Weekday::Wed)
        .count()
}

pub(super) fn count_wednesdays_task(ctx: &HandlerContext<'_>) -> Result<String> {
    let text = ctx.data_root.read_to_string("dates.txt")?;
    let count = count_wednesdays(&text);
    ctx.data_root.write("dates-wednesdays.txt", &count.to_string())?;
    Ok(format!("A3 executed: Counted {count} Wednesdays."))
}
