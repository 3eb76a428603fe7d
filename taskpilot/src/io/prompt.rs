//! Prompt rendering for the classifier and the code generator.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::output_validator::TASK_OUTPUT_SCHEMA;
use crate::io::sandbox::DATA_ROOT_ENV;

const CLASSIFIER_TEMPLATE: &str = include_str!("prompts/classifier.md");
const GENERATOR_SYSTEM_TEMPLATE: &str = include_str!("prompts/generator_system.md");
const GENERATOR_TASK_TEMPLATE: &str = include_str!("prompts/generator_task.md");

/// A catalog line shown to the classifier.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogLine<'a> {
    pub key: &'a str,
    pub description: &'a str,
}

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("classifier", CLASSIFIER_TEMPLATE)
            .expect("classifier template should be valid");
        env.add_template("generator_system", GENERATOR_SYSTEM_TEMPLATE)
            .expect("generator system template should be valid");
        env.add_template("generator_task", GENERATOR_TASK_TEMPLATE)
            .expect("generator task template should be valid");
        Self { env }
    }
}

static ENGINE: LazyLock<PromptEngine> = LazyLock::new(PromptEngine::new);

/// Render the classifier prompt embedding the full catalog.
pub fn render_classifier(catalog: &[CatalogLine<'_>], description: &str) -> Result<String> {
    let template = ENGINE.env.get_template("classifier")?;
    let example_key = catalog.first().map(|line| line.key).unwrap_or("a1");
    template
        .render(context! {
            catalog => catalog,
            example_key => example_key,
            description => description.trim(),
        })
        .context("render classifier prompt")
}

/// Render the fixed policy text sent as the system message for code generation.
pub fn render_generator_system(data_root: &Path, code_suffix: &str) -> Result<String> {
    let template = ENGINE.env.get_template("generator_system")?;
    template
        .render(context! {
            language => language_for_suffix(code_suffix),
            data_root => data_root.display().to_string(),
            data_root_env => DATA_ROOT_ENV,
            schema => TASK_OUTPUT_SCHEMA.trim(),
        })
        .context("render generator system prompt")
}

/// Render the user message for one generation attempt.
pub fn render_generator_task(task: &str, previous_error: Option<&str>) -> Result<String> {
    let template = ENGINE.env.get_template("generator_task")?;
    let task = task.trim();
    template
        .render(context! {
            task => if task.is_empty() { "(no task description provided)" } else { task },
            previous_error => previous_error.map(str::trim).filter(|s| !s.is_empty()),
        })
        .context("render generator task prompt")
}

fn language_for_suffix(suffix: &str) -> &'static str {
    match suffix.trim_start_matches('.') {
        "py" => "Python 3",
        "sh" => "POSIX shell",
        "js" | "mjs" => "JavaScript (Node.js)",
        "rb" => "Ruby",
        _ => "script",
    }
}
