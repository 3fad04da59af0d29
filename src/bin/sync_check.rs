use clario::config::ClarioConfig;
use clario::core::date::Clock;
use clario::core::principal::Principal;
use clario::store::migrate;
use clario::sync::{Collection, RemoteSync};

#[tokio::main]
async fn main() {
    match systemd_journal_logger::JournalLog::new() {
        Ok(journal) => {
            if let Err(e) = journal
                .with_syslog_identifier("clario-sync-check".to_string())
                .install()
            {
                eprintln!("Could not install journal logger: {}", e);
            }
        }
        Err(e) => eprintln!("Journal logging unavailable: {}", e),
    }
    log::set_max_level(log::LevelFilter::Info);

    let Some(principal_id) = std::env::args().nth(1) else {
        eprintln!("Usage: sync_check <principal id>");
        std::process::exit(2);
    };

    let config = ClarioConfig::load();
    println!("=== Remote document check for {} ===\n", principal_id);

    let sync = match RemoteSync::connect(&config.store).await {
        Ok(sync) => sync,
        Err(e) => {
            println!("Could not open store: {}", e);
            return;
        }
    };
    let clock = Clock::System;

    for collection in [Collection::UserData, Collection::LegacyUsers] {
        println!("--- {} ---", collection);
        let raw = match sync.store().fetch(collection, &principal_id).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                println!("  (no document)\n");
                continue;
            }
            Err(e) => {
                println!("  Error: {}\n", e);
                continue;
            }
        };

        let keys: Vec<&str> = raw
            .as_object()
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default();
        println!("  Top-level fields: {}", keys.join(", "));

        let doc = match collection {
            Collection::UserData => {
                migrate::normalize(raw.clone(), &clock).map_err(|e| e.to_string())
            }
            Collection::LegacyUsers => {
                let principal = Principal::new(principal_id.clone(), String::new());
                migrate::migrate_legacy(&raw, &principal, &clock).map_err(|e| e.to_string())
            }
        };
        match doc {
            Ok(doc) => {
                println!("  Profile: {} <{}>", doc.profile.name, doc.profile.email);
                println!("  Language: {}", doc.preferences.language);
                println!("  Tasks: {}", doc.tasks.len());
                println!("  Projects: {}", doc.projects.len());
                println!("  Daily tasks: {}", doc.daily_tasks.len());
                println!("  Activity entries: {}", doc.activity_log.len());
                let orphaned = doc
                    .tasks
                    .iter()
                    .filter_map(|t| t.project_id.as_deref())
                    .filter(|id| !doc.projects.iter().any(|p| p.id == *id))
                    .count();
                if orphaned > 0 {
                    println!("  Tasks pointing at missing projects: {}", orphaned);
                }
            }
            Err(e) => println!("  Does not load: {}", e),
        }
        println!();
    }

    println!("=== Done ===");
}
