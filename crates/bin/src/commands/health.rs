//! Health probe for a running Ulpan server.

use std::time::Duration;

use serde::Deserialize;

use crate::cli::HealthArgs;

#[derive(Deserialize)]
struct HealthReport {
    #[serde(default)]
    status: String,
    #[serde(default)]
    store: String,
}

/// Probe the server's `/health` endpoint and report the result.
///
/// Exits non-zero when the server is unreachable, answers with a failure
/// status, or reports anything other than healthy.
pub async fn run(args: &HealthArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut url = args.url.trim_end_matches('/').to_string();
    if !url.ends_with("/health") {
        url.push_str("/health");
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout))
        .build()?;

    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            eprintln!("unhealthy: failed to connect to {url}: {e}");
            std::process::exit(1);
        }
    };
    if !response.status().is_success() {
        eprintln!(
            "unhealthy: server returned HTTP status {}",
            response.status()
        );
        std::process::exit(1);
    }

    let report: HealthReport = response.json().await?;
    if report.status != "healthy" {
        eprintln!("unhealthy: server reported status '{}'", report.status);
        std::process::exit(1);
    }

    println!("healthy (store: {})", report.store);
    Ok(())
}
