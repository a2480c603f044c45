//! Ask the language model to explain a failed Docker build.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::llm::LanguageModel;

const DEBUG_PROMPT: &str =
    "Debug the following logs which were generated during building a Docker image: \n";

pub fn debug_prompt(logs: &str) -> String {
    format!("{}{}", DEBUG_PROMPT, logs)
}

pub async fn debug_logs(model: &dyn LanguageModel, logs: &str) -> Result<String> {
    model.complete(&debug_prompt(logs)).await
}

/// Log text from `path`, or from stdin when `path` is `-`. Empty input is
/// an error.
pub async fn read_logs(path: &Path) -> Result<String> {
    let logs = if path == Path::new("-") {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("Failed to read logs from stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read log file: {}", path.display()))?
    };

    if logs.trim().is_empty() {
        anyhow::bail!("log input is empty");
    }
    Ok(logs)
}

/// Read `path` (or stdin for `-`) and print the model's diagnosis.
pub async fn run_debug_logs(model: &dyn LanguageModel, path: &Path) -> Result<()> {
    let logs = read_logs(path).await?;
    println!("{}", debug_logs(model, &logs).await?);
    Ok(())
}
