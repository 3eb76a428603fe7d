use anyhow::{Context, Result, bail};
use serde_json::Value;

use super::HandlerContext;

fn name_field<'a>(contact: &'a Value, field: &str) -> &'a str {
    contact.get(field).and_then(Value::as_str).unwrap_or("")
}

/// Sort by `last_name` then `first_name`, case-insensitively. Missing names sort first.
pub(crate) fn sort_contacts(contacts: &mut [Value]) {
    contacts.sort_by_cached_key(|contact| {
        (
            name_field(contact, "last_name").to_lowercase(),
            name_field(contact, "first_name").to_lowercase(),
        )
    });
}

pub(super) fn sort_contacts_task(ctx: &HandlerContext<'_>) -> Result<String> {
    let raw = ctx.data_root.read_to_string("contacts.json")?;
    let parsed: Value = serde_json::from_str(&raw).context("parse contacts.json")?;
    let Value::Array(mut contacts) = parsed else {
        bail!("contacts.json must contain a JSON array");
    };
    sort_contacts(&mut contacts);
    let payload = serde_json::to_string(&contacts).context("serialize sorted contacts")?;
    ctx.data_root.write("contacts-sorted.json", &payload)?;
    Ok("A4 executed: Contacts sorted.".to_string())
}
