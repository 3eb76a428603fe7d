//! Fixed-handler catalog: canonical task keys mapped to zero-argument actions.
//!
//! The classifier prompt is rendered from [`CATALOG`], so adding an entry here
//! is enough to make it both describable and dispatchable.

use anyhow::Result;

use crate::io::config::AgentConfig;
use crate::io::data_root::DataRoot;
use crate::io::llm::LlmClient;
use crate::io::prompt::CatalogLine;

mod commands;
mod contacts;
mod csv_filter;
mod dates;
mod docs;
mod extract;
mod image_resize;
mod logs;
mod markdown;
mod sqlite;

/// Everything a handler may touch.
pub struct HandlerContext<'a> {
    pub data_root: &'a DataRoot,
    pub llm: &'a dyn LlmClient,
    pub config: &'a AgentConfig,
}

/// A handler returns a human-readable message or a descriptive error.
pub type HandlerFn = fn(&HandlerContext<'_>) -> Result<String>;

/// One dispatchable catalog entry.
pub struct CatalogEntry {
    pub key: &'static str,
    pub description: &'static str,
    pub run: HandlerFn,
}

impl std::fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

pub const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        key: "a1",
        description: "Run the datagen.py script to generate data files.",
        run: commands::run_datagen,
    },
    CatalogEntry {
        key: "a2",
        description: "Format /data/format.md using Prettier.",
        run: commands::format_markdown,
    },
    CatalogEntry {
        key: "a3",
        description: "Count the number of Wednesdays in /data/dates.txt and write the number to /data/dates-wednesdays.txt.",
        run: dates::count_wednesdays_task,
    },
    CatalogEntry {
        key: "a4",
        description: "Sort the contacts in /data/contacts.json by last_name then first_name.",
        run: contacts::sort_contacts_task,
    },
    CatalogEntry {
        key: "a5",
        description: "Write the first line of the 10 most recent .log files in /data/logs/ to /data/logs-recent.txt.",
        run: logs::recent_log_heads_task,
    },
    CatalogEntry {
        key: "a6",
        description: "Create an index for Markdown files in /data/docs/ mapping each filename to its first H1.",
        run: docs::index_docs_task,
    },
    CatalogEntry {
        key: "a7",
        description: "Extract the sender's email from /data/email.txt.",
        run: extract::email_sender,
    },
    CatalogEntry {
        key: "a8",
        description: "Extract the credit card number from /data/credit-card.png.",
        run: extract::credit_card_number,
    },
    CatalogEntry {
        key: "a9",
        description: "Find the most similar pair of comments in /data/comments.txt.",
        run: extract::similar_comments,
    },
    CatalogEntry {
        key: "a10",
        description: "Calculate total sales of \"Gold\" tickets from /data/ticket-sales.db.",
        run: sqlite::gold_ticket_sales,
    },
    CatalogEntry {
        key: "b5",
        description: "Count the rows of sample_table in /data/sample.db and write the count to /data/sample-row-count.txt.",
        run: sqlite::sample_row_count,
    },
    CatalogEntry {
        key: "b7",
        description: "Resize /data/credit-card.png to half its size and save it as /data/credit-card-resized.png.",
        run: image_resize::resize_credit_card,
    },
    CatalogEntry {
        key: "b8",
        description: "Transcribe an audio file.",
        run: transcribe_audio,
    },
    CatalogEntry {
        key: "b9",
        description: "Convert /data/format.md from Markdown to HTML in /data/format.html.",
        run: markdown::render_format_md,
    },
    CatalogEntry {
        key: "b10",
        description: "Filter /data/sample.csv to rows where active is true and write them as JSON to /data/filtered-sample.json.",
        run: csv_filter::filter_sample_csv,
    },
];

/// Look up a catalog entry by its canonical key.
pub fn find(key: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|entry| entry.key == key)
}

pub fn keys() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|entry| entry.key)
}

/// Catalog lines for the classifier prompt.
pub fn catalog_lines() -> Vec<CatalogLine<'static>> {
    CATALOG
        .iter()
        .map(|entry| CatalogLine {
            key: entry.key,
            description: entry.description,
        })
        .collect()
}

// Audio transcription has no backend; the handler only acknowledges the request.
fn transcribe_audio(_ctx: &HandlerContext<'_>) -> Result<String> {
    Ok("B8 executed: Audio transcription simulated.".to_string())
}
