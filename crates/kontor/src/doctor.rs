// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kontor doctor` command implementation.
//!
//! Runs diagnostic checks against the Kontor environment to identify
//! configuration issues, storage problems, and missing credentials.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use kontor_config::model::KontorConfig;
use kontor_core::KontorError;
use kontor_vault::resolve_master_key;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed successfully.
    Pass,
    /// Check passed with a warning.
    Warn,
    /// Check failed.
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check.
    pub name: String,
    /// Check status.
    pub status: CheckStatus,
    /// Human-readable message.
    pub message: String,
    /// Duration the check took.
    pub duration: Duration,
}

fn result(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> CheckResult {
    CheckResult {
        name: name.to_string(),
        status,
        message: message.into(),
        duration: start.elapsed(),
    }
}

/// Run the `kontor doctor` command.
///
/// Runs quick diagnostic checks. With `--deep`, runs additional intensive
/// checks. With `--plain`, disables colored output.
pub async fn run_doctor(
    config: &KontorConfig,
    deep: bool,
    plain: bool,
) -> Result<(), KontorError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let mut results = Vec::new();

    // Quick checks (always run)
    results.push(check_config().await);
    results.push(check_database(&config.storage.database_path).await);
    results.push(check_vault_key(config));
    results.push(check_llm_settings(&config.storage.database_path).await);
    results.push(check_gateway_endpoint(config).await);

    // Deep checks (only with --deep)
    if deep {
        results.push(check_db_integrity(&config.storage.database_path).await);
        results.push(check_disk_space(&config.storage.database_path).await);
    }

    // Print results
    println!();
    println!("  kontor doctor");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    let mut warn_count = 0;

    for result in &results {
        let duration_ms = result.duration.as_millis();
        let line;

        match result.status {
            CheckStatus::Pass => {
                if use_color {
                    use colored::Colorize;
                    let symbol = "✓".green().to_string();
                    line = format!(
                        "    {symbol} {:<20} {} ({duration_ms}ms)",
                        result.name, result.message
                    );
                } else {
                    line = format!(
                        "    [OK]   {:<20} {} ({duration_ms}ms)",
                        result.name, result.message
                    );
                }
            }
            CheckStatus::Warn => {
                warn_count += 1;
                if use_color {
                    use colored::Colorize;
                    let symbol = "!".yellow().to_string();
                    line = format!(
                        "    {symbol} {:<20} {} ({duration_ms}ms)",
                        result.name,
                        result.message.yellow()
                    );
                } else {
                    line = format!(
                        "    [WARN] {:<20} {} ({duration_ms}ms)",
                        result.name, result.message
                    );
                }
            }
            CheckStatus::Fail => {
                fail_count += 1;
                if use_color {
                    use colored::Colorize;
                    let symbol = "✗".red().to_string();
                    line = format!(
                        "    {symbol} {:<20} {} ({duration_ms}ms)",
                        result.name,
                        result.message.red()
                    );
                } else {
                    line = format!(
                        "    [FAIL] {:<20} {} ({duration_ms}ms)",
                        result.name, result.message
                    );
                }
            }
        }
        println!("{line}");
    }

    println!("  {}", "-".repeat(50));
    if fail_count > 0 {
        println!("  {fail_count} check(s) failed, {warn_count} warning(s).");
    } else if warn_count > 0 {
        println!("  All checks passed with {warn_count} warning(s).");
    } else {
        println!("  All checks passed.");
    }
    println!();

    if fail_count > 0 {
        return Err(KontorError::Config(format!(
            "{fail_count} doctor check(s) failed"
        )));
    }
    Ok(())
}

/// Check configuration loads without errors.
async fn check_config() -> CheckResult {
    let start = Instant::now();
    match kontor_config::load_and_validate() {
        Ok(_) => result("Configuration", CheckStatus::Pass, "valid", start),
        Err(errors) => result(
            "Configuration",
            CheckStatus::Fail,
            format!("{} error(s)", errors.len()),
            start,
        ),
    }
}

/// Check database file exists and can be opened.
async fn check_database(db_path: &str) -> CheckResult {
    let start = Instant::now();
    let path = std::path::Path::new(db_path);

    if !path.exists() {
        return result(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => {
            let query_result: Result<(), tokio_rusqlite::Error> = conn
                .call(|conn| {
                    conn.execute_batch("SELECT 1")?;
                    Ok(())
                })
                .await;
            match query_result {
                Ok(()) => result("Database", CheckStatus::Pass, "connected", start),
                Err(e) => result(
                    "Database",
                    CheckStatus::Fail,
                    format!("query failed: {e}"),
                    start,
                ),
            }
        }
        Err(e) => result(
            "Database",
            CheckStatus::Fail,
            format!("open failed: {e}"),
            start,
        ),
    }
}

/// Check the vault master key resolves.
fn check_vault_key(config: &KontorConfig) -> CheckResult {
    let start = Instant::now();
    match resolve_master_key(&config.vault) {
        Ok(_) => result("Vault key", CheckStatus::Pass, "resolved", start),
        Err(e) => result("Vault key", CheckStatus::Fail, e.to_string(), start),
    }
}

/// Check whether any tenant has an LLM provider configured.
async fn check_llm_settings(db_path: &str) -> CheckResult {
    let start = Instant::now();
    if !std::path::Path::new(db_path).exists() {
        return result(
            "LLM settings",
            CheckStatus::Warn,
            "database not found (skipped)",
            start,
        );
    }

    let count: Result<i64, tokio_rusqlite::Error> =
        match tokio_rusqlite::Connection::open(db_path).await {
            Ok(conn) => {
                conn.call(|conn| {
                    let n = conn.query_row("SELECT COUNT(*) FROM llm_settings", [], |row| {
                        row.get(0)
                    })?;
                    Ok(n)
                })
                .await
            }
            Err(e) => {
                return result(
                    "LLM settings",
                    CheckStatus::Fail,
                    format!("open failed: {e}"),
                    start,
                );
            }
        };

    match count {
        Ok(0) => result(
            "LLM settings",
            CheckStatus::Warn,
            "no tenant has a provider configured",
            start,
        ),
        Ok(n) => result(
            "LLM settings",
            CheckStatus::Pass,
            format!("{n} tenant(s) configured"),
            start,
        ),
        Err(e) => result(
            "LLM settings",
            CheckStatus::Fail,
            format!("query failed: {e}"),
            start,
        ),
    }
}

/// Check the gateway health endpoint of a running instance.
async fn check_gateway_endpoint(config: &KontorConfig) -> CheckResult {
    let start = Instant::now();
    let url = format!(
        "http://{}:{}/healthz",
        config.server.host, config.server.port
    );

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            return result(
                "Gateway",
                CheckStatus::Fail,
                format!("HTTP client error: {e}"),
                start,
            );
        }
    };

    match client.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => {
            result("Gateway", CheckStatus::Pass, "reachable", start)
        }
        Ok(resp) => result(
            "Gateway",
            CheckStatus::Warn,
            format!("status {}", resp.status()),
            start,
        ),
        Err(_) => result(
            "Gateway",
            CheckStatus::Warn,
            format!("not reachable at {url} (server may not be running)"),
            start,
        ),
    }
}

/// Deep check: SQLite integrity check.
async fn check_db_integrity(db_path: &str) -> CheckResult {
    let start = Instant::now();
    if !std::path::Path::new(db_path).exists() {
        return result(
            "DB integrity",
            CheckStatus::Warn,
            "database not found (skipped)",
            start,
        );
    }

    match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => {
            let rows: Result<Vec<String>, tokio_rusqlite::Error> = conn
                .call(|conn| {
                    let mut stmt = conn.prepare("PRAGMA integrity_check")?;
                    let rows: Vec<String> = stmt
                        .query_map([], |row| row.get(0))?
                        .filter_map(|r| r.ok())
                        .collect();
                    Ok(rows)
                })
                .await;
            match rows {
                Ok(rows) if rows.len() == 1 && rows[0] == "ok" => {
                    result("DB integrity", CheckStatus::Pass, "ok", start)
                }
                Ok(rows) => result(
                    "DB integrity",
                    CheckStatus::Fail,
                    format!("{} issue(s) found", rows.len()),
                    start,
                ),
                Err(e) => result(
                    "DB integrity",
                    CheckStatus::Fail,
                    format!("check failed: {e}"),
                    start,
                ),
            }
        }
        Err(e) => result(
            "DB integrity",
            CheckStatus::Fail,
            format!("open failed: {e}"),
            start,
        ),
    }
}

/// Deep check: database size as a storage heuristic.
async fn check_disk_space(db_path: &str) -> CheckResult {
    let start = Instant::now();
    let path = std::path::Path::new(db_path);

    if path.exists() {
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let size_mb = size as f64 / (1024.0 * 1024.0);
        result(
            "Disk space",
            CheckStatus::Pass,
            format!("DB size: {size_mb:.1} MB"),
            start,
        )
    } else {
        let parent = path.parent().unwrap_or(std::path::Path::new("."));
        match std::fs::metadata(parent) {
            Ok(_) => result("Disk space", CheckStatus::Pass, "directory accessible", start),
            Err(e) => result(
                "Disk space",
                CheckStatus::Warn,
                format!("cannot access: {e}"),
                start,
            ),
        }
    }
}
