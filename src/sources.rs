use anyhow::Result;

use crate::config::Config;
use crate::ytmusic::load_headers;

/// One integration row of `hub sources`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationStatus {
    pub name: &'static str,
    pub status: String,
    /// Whether the integration feeds the aggregated context.
    pub in_context: bool,
}

pub fn integration_status(config: &Config) -> Vec<IntegrationStatus> {
    let enabled = |name: &str| config.aggregator.sources.iter().any(|s| s.eq_ignore_ascii_case(name));

    let notes = if config.notes.dir.is_dir() {
        "OK".to_string()
    } else {
        format!("EMPTY ({} does not exist)", config.notes.dir.display())
    };

    let steam = if config.steam.is_configured() {
        "OK"
    } else {
        "NOT CONFIGURED"
    };
    // Same header parse the assistant runs at startup.
    let (ytmusic, ytmusic_ready) = match load_headers(&config.ytmusic) {
        Ok(Some(_)) => ("OK".to_string(), true),
        Ok(None) => ("NOT CONFIGURED".to_string(), false),
        Err(err) => (format!("DISABLED ({})", err), false),
    };
    let github = match (config.github.summary_repo(), &config.github.token) {
        (Some(_), Some(_)) => "OK",
        (Some(_), None) => "OK (anonymous)",
        (None, _) => "NO REPO",
    };

    vec![
        IntegrationStatus {
            name: "notes",
            status: notes,
            in_context: false,
        },
        IntegrationStatus {
            name: "steam",
            status: steam.to_string(),
            in_context: config.steam.is_configured() && enabled("steam"),
        },
        IntegrationStatus {
            name: "ytmusic",
            status: ytmusic,
            in_context: ytmusic_ready && enabled("ytmusic"),
        },
        IntegrationStatus {
            name: "github",
            status: github.to_string(),
            in_context: config.github.summary_repo().is_some() && enabled("github"),
        },
        IntegrationStatus {
            name: "llm",
            status: format!("{} ({})", config.llm.base_url, config.llm.model),
            in_context: false,
        },
    ]
}

pub fn list_sources(config: &Config) -> Result<()> {
    println!("{:<12} {:<8} STATUS", "INTEGRATION", "CONTEXT");
    for row in integration_status(config) {
        println!("{:<12} {:<8} {}", row.name, row.in_context, row.status);
    }
    Ok(())
}
