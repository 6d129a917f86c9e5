//! `ragdesk ingest`: Embed each assistant's data directory.

use std::path::Path;

use ragdesk_core::AssistantCatalog;
use ragdesk_core::Error;

use crate::runtime::Runtime;

pub async fn run(config: Option<&Path>, assistant: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::load(config).await?;
    let data_dir = rt.config.paths.data_dir.clone();
    let ingestor = rt.ingestor();

    let results = match assistant {
        Some(name) => {
            let assistant = rt
                .catalog
                .load(&name)
                .await?
                .ok_or_else(|| Error::AssistantNotFound(name.clone()))?;
            let report = ingestor
                .for_assistant(&assistant)?
                .load_and_embed_documents(&name, &data_dir.join(&name))
                .await;
            vec![(name, report)]
        }
        None => ingestor.ingest_all(rt.catalog.as_ref(), &data_dir).await?,
    };

    if results.is_empty() {
        println!("No assistants found in {}", rt.config.paths.configs_dir.display());
        return Ok(());
    }

    let mut failed = 0;
    for (name, result) in results {
        match result {
            Ok(report) if report.skipped => {
                println!("  ⏭️  {name}: already embedded");
            }
            Ok(report) => {
                println!(
                    "  ✅ {name}: {} document(s), {} chunk(s)",
                    report.documents.len(),
                    report.chunk_count()
                );
                for failure in &report.failures {
                    println!("     ❌ {}: {}", failure.filename, failure.error);
                    failed += 1;
                }
            }
            Err(e) => {
                println!("  ❌ {name}: {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} ingestion failure(s)").into());
    }
    Ok(())
}
