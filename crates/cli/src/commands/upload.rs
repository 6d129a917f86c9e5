//! `ragdesk upload`: Ingest one file for an assistant.

use std::path::Path;

use ragdesk_core::{AssistantCatalog, Error};

use crate::runtime::Runtime;

pub async fn run(
    config: Option<&Path>,
    assistant: &str,
    file: &Path,
    owner: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::load(config).await?;
    let settings = rt
        .catalog
        .load(assistant)
        .await?
        .ok_or_else(|| Error::AssistantNotFound(assistant.to_string()))?;

    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| format!("Not a file: {}", file.display()))?;
    let content = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;

    let outcome = rt
        .ingestor()
        .for_assistant(&settings)?
        .add_document(assistant, &filename, &content, owner)
        .await?;

    if outcome.embedded {
        println!("📄 {filename}: {} chunk(s) embedded", outcome.chunks);
    } else {
        println!("📄 {filename}: already embedded ({} chunk(s))", outcome.chunks);
    }
    println!("   id:     {}", outcome.document.id);
    println!("   status: {}", outcome.document.status);
    Ok(())
}
