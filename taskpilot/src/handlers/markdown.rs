use anyhow::{Result, bail};
use pulldown_cmark::{Parser, html};

use super::HandlerContext;

pub(crate) fn markdown_to_html(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new(markdown));
    out
}

pub(super) fn render_format_md(ctx: &HandlerContext<'_>) -> Result<String> {
    if !ctx.data_root.exists("format.md")? {
        bail!("format.md not found under {}", ctx.data_root.path().display());
    }
    let markdown = ctx.data_root.read_to_string("format.md")?;
    ctx.data_root.write("format.html", &markdown_to_html(&markdown))?;
    Ok("B9 executed: Markdown converted to HTML.".to_string())
}
