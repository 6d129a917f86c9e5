//! `ragdesk doctor`: Diagnose system health.

use std::path::Path;

use ragdesk_config::AppConfig;
use ragdesk_core::AssistantCatalog;

use crate::runtime::Runtime;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 ragdesk Doctor - System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let config = match AppConfig::load(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Cannot continue without a valid config.");
            return Ok(());
        }
    };

    if config.has_api_key() || config.provider == "ollama" {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key configured; set RAGDESK_API_KEY or api_key in ragdesk.toml");
        issues += 1;
    }

    let catalog = config.catalog();
    match catalog.names().await {
        Ok(names) if names.is_empty() => {
            println!("  ⚠️  No assistants in {}", catalog.dir().display());
            issues += 1;
        }
        Ok(names) => {
            println!("  ✅ {} assistant(s): {}", names.len(), names.join(", "));
            for name in &names {
                if let Err(e) = catalog.load(name).await {
                    println!("     ❌ {name}: {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ❌ Assistant catalog unreadable: {e}");
            issues += 1;
        }
    }

    if config.paths.data_dir.is_dir() {
        println!("  ✅ Data directory {}", config.paths.data_dir.display());
    } else {
        println!("  ⚠️  No data directory at {}", config.paths.data_dir.display());
        issues += 1;
    }

    match Runtime::build(config).await {
        Ok(rt) => {
            println!("  ✅ Store '{}' reachable", rt.documents.name());
            match rt.provider.health_check().await {
                Ok(true) => println!("  ✅ Provider '{}' reachable", rt.provider.name()),
                Ok(false) => {
                    println!("  ⚠️  Provider '{}' answered with an error", rt.provider.name());
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Provider '{}' unreachable: {e}", rt.provider.name());
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ❌ Runtime setup failed: {e}");
            issues += 1;
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
