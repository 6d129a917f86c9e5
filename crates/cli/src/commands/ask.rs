//! `ragdesk ask`: Answer a question through the RAG pipeline.

use std::path::Path;

use crate::runtime::Runtime;

pub async fn run(
    config: Option<&Path>,
    assistant: &str,
    user: &str,
    question: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::load(config).await?;
    let pipeline = rt.pipeline();
    let answer = pipeline.process_query(question, assistant, user).await;
    pipeline.shutdown().await;
    let answer = answer?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    println!("{}", answer.answer);
    if !answer.sources.is_empty() {
        println!();
        println!("📚 Sources:");
        for source in &answer.sources {
            println!("   - {source}");
        }
    }
    if let Some(confidence) = answer.confidence {
        println!("🎯 Confidence: {:.0}%", confidence * 100.0);
    }
    Ok(())
}
