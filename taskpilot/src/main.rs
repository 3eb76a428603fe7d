//! LLM-backed task-execution agent.
//!
//! `run` classifies a description onto the fixed handler catalog; `generate`
//! asks the LLM for a program and retries until it prints a valid result.
//! Both work inside the configured data root.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use taskpilot::dispatch::{UnresolvedTask, classify, run_task};
use taskpilot::exit_codes;
use taskpilot::generate::{GenerationOutcome, TaskExecutionFailed, run_generated_task};
use taskpilot::io::config::{AgentConfig, DEFAULT_CONFIG_PATH, load_config};
use taskpilot::io::data_root::DataRoot;
use taskpilot::io::llm::ChatCompletionsClient;
use taskpilot::io::sandbox::ProcessSandbox;
use taskpilot::logging;

#[derive(Parser)]
#[command(
    name = "taskpilot",
    version,
    about = "LLM-backed task-execution agent"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the data root from the config file.
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the catalog key the classifier picks for a description.
    Classify { description: String },
    /// Classify a description and run the matching handler.
    Run { description: String },
    /// Generate, execute, and validate code for a task until it succeeds.
    Generate { task: String },
    /// Print a file under the data root.
    Read { path: String },
}

fn main() {
    logging::init("warn");
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<UnresolvedTask>().is_some() {
        exit_codes::UNRESOLVED
    } else if err.downcast_ref::<TaskExecutionFailed>().is_some() {
        exit_codes::EXHAUSTED
    } else {
        exit_codes::INVALID
    }
}

fn run(cli: Cli) -> Result<i32> {
    let mut cfg = load_config(&cli.config)?;
    if let Some(root) = cli.data_root {
        cfg.data_root = root;
    }
    match cli.command {
        Command::Classify { description } => cmd_classify(&cfg, &description),
        Command::Run { description } => cmd_run(&cfg, &description),
        Command::Generate { task } => cmd_generate(&cfg, &task),
        Command::Read { path } => cmd_read(&cfg, &path),
    }
}

fn llm_client(cfg: &AgentConfig) -> Result<ChatCompletionsClient> {
    ChatCompletionsClient::from_config(&cfg.llm).context("build llm client")
}

fn cmd_classify(cfg: &AgentConfig, description: &str) -> Result<i32> {
    let llm = llm_client(cfg)?;
    let key = classify(&llm, cfg, description)?;
    println!("{key}");
    if taskpilot::handlers::find(&key).is_none() {
        return Ok(exit_codes::UNRESOLVED);
    }
    Ok(exit_codes::OK)
}

fn cmd_run(cfg: &AgentConfig, description: &str) -> Result<i32> {
    let llm = llm_client(cfg)?;
    let run = run_task(&llm, cfg, description)?;
    println!("{}", json!({ "status": "success", "message": run.message }));
    Ok(exit_codes::OK)
}

fn cmd_generate(cfg: &AgentConfig, task: &str) -> Result<i32> {
    let llm = llm_client(cfg)?;
    let sandbox = ProcessSandbox::from_config(&cfg.generation, &cfg.data_root);
    match run_generated_task(&llm, &sandbox, cfg, task) {
        Ok(outcome) => {
            print_json(&generation_report(&outcome))?;
            Ok(exit_codes::OK)
        }
        Err(err) => {
            if let Some(failed) = err.downcast_ref::<TaskExecutionFailed>() {
                print_json(&json!({
                    "detail": "Task execution failed after maximum retries.",
                    "last_error": failed.last_error,
                    "code": failed.last_code,
                    "attempts": failed.attempts,
                }))?;
            }
            Err(err)
        }
    }
}

fn generation_report(outcome: &GenerationOutcome) -> serde_json::Value {
    json!({
        "status": outcome.output.status.as_str(),
        "message": outcome.output.result,
        "output": outcome.output,
        "code": outcome.code,
        "attempts": outcome.attempts,
    })
}

fn cmd_read(cfg: &AgentConfig, path: &str) -> Result<i32> {
    let root = DataRoot::new(&cfg.data_root);
    let content = root.read_to_string(path)?;
    print!("{content}");
    Ok(exit_codes::OK)
}

/// Print `value` as pretty JSON on stdout.
fn print_json(value: &serde_json::Value) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}
