//! `ragdesk documents` / `ragdesk delete-document`: Document management.

use std::path::Path;

use crate::runtime::Runtime;

pub async fn list(
    config: Option<&Path>,
    assistant: &str,
    owner: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::load(config).await?;
    let documents = rt.ingestor().list_documents(assistant, owner).await?;

    if documents.is_empty() {
        println!("No documents for '{assistant}'.");
        return Ok(());
    }

    println!("📚 Documents for '{assistant}'");
    println!();
    for doc in documents {
        println!(
            "  {}  {:<10}  {}  {}  (owner: {})",
            doc.id,
            doc.status,
            doc.created_at.format("%Y-%m-%d %H:%M"),
            doc.filename,
            doc.owner.as_deref().unwrap_or("shared"),
        );
    }
    Ok(())
}

pub async fn delete(
    config: Option<&Path>,
    assistant: &str,
    id: &str,
    owner: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::load(config).await?;
    let document = rt.ingestor().delete_document(assistant, id, owner).await?;
    println!("🗑️  Deleted {} ({})", document.filename, document.id);
    Ok(())
}
