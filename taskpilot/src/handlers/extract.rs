//! Handlers that delegate the actual extraction to the LLM.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::HandlerContext;
use crate::io::llm::{DEFAULT_SYSTEM_MESSAGE, query};

/// Wrap a handler instruction in the fixed task framing.
fn handler_prompt(task: &str) -> String {
    format!(
        "Task: {task}\nData: No additional data provided.\n\
         Process this task and return ONLY the final output."
    )
}

fn ask(ctx: &HandlerContext<'_>, task: &str) -> Result<String> {
    let response = query(
        ctx.llm,
        DEFAULT_SYSTEM_MESSAGE,
        &handler_prompt(task),
        ctx.config.llm.handler_max_tokens,
    )?;
    Ok(response)
}

pub(super) fn email_sender(ctx: &HandlerContext<'_>) -> Result<String> {
    let email = ctx.data_root.read_to_string("email.txt")?;
    let task = format!(
        "Extract the sender's email address from the following email message:\n\n{email}\n\n\
         Return only the email address."
    );
    let sender = ask(ctx, &task).context("extract sender")?;
    ctx.data_root.write("email-sender.txt", &sender)?;
    Ok("A7 executed: Sender email extracted.".to_string())
}

pub(super) fn credit_card_number(ctx: &HandlerContext<'_>) -> Result<String> {
    let image = ctx.data_root.read_bytes("credit-card.png")?;
    let encoded = STANDARD.encode(&image);
    let task = format!(
        "The following is a base64-encoded PNG image of a credit card:\n{encoded}\n\n\
         Extract the credit card number and return it without spaces."
    );
    let response = ask(ctx, &task).context("extract card number")?;
    let number: String = response.split_whitespace().collect();
    ctx.data_root.write("credit-card.txt", &number)?;
    Ok("A8 executed: Credit card number extracted.".to_string())
}

pub(super) fn similar_comments(ctx: &HandlerContext<'_>) -> Result<String> {
    let raw = ctx.data_root.read_to_string("comments.txt")?;
    let comments: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let task = format!(
        "Given the following comments, find the most similar pair and return them \
         on two separate lines, nothing else:\n\n{}",
        comments.join("\n")
    );
    let pair = ask(ctx, &task).context("find similar comments")?;
    ctx.data_root.write("comments-similar.txt", &pair)?;
    Ok("A9 executed: Similar comments identified.".to_string())
}
