use anyhow::Result;

use crate::config::Config;

/// Whether a connector has everything it needs to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStatus {
    pub name: &'static str,
    pub status: String,
    pub ready: bool,
}

fn status(name: &'static str, missing: Vec<&str>) -> SourceStatus {
    if missing.is_empty() {
        SourceStatus {
            name,
            status: "OK".to_string(),
            ready: true,
        }
    } else {
        SourceStatus {
            name,
            status: format!("NOT CONFIGURED (missing {})", missing.join(", ")),
            ready: false,
        }
    }
}

pub fn source_statuses(config: &Config) -> Vec<SourceStatus> {
    let confluence = &config.connectors.confluence;
    let mut missing = Vec::new();
    if confluence.base_url.is_none() {
        missing.push("CONFLUENCE_DOMAIN");
    }
    if confluence.username.is_none() {
        missing.push("CONFLUENCE_USERNAME");
    }
    if confluence.password.is_none() {
        missing.push("CONFLUENCE_PASSWORD");
    }
    let confluence = status("confluence", missing);

    let github = &config.connectors.github;
    let mut missing = Vec::new();
    if github.token.is_none() {
        missing.push("GITHUB_TOKEN");
    }
    if github.organization.is_none() {
        missing.push("connectors.github.organization");
    }
    let github = status("github", missing);

    let slack = status(
        "slack",
        if config.slack.token.is_none() {
            vec!["SLACK_TOKEN"]
        } else {
            Vec::new()
        },
    );

    vec![confluence, github, slack]
}

pub fn list_sources(config: &Config) -> Result<()> {
    println!("{:<16} {:<12} READY", "CONNECTOR", "STATUS");
    for source in source_statuses(config) {
        println!("{:<16} {:<12} {}", source.name, source.status, source.ready);
    }
    Ok(())
}
