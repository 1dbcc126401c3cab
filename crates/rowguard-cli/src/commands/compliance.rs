//! `rowguard compliance` - audit RLS coverage and write the report artifact.
//!
//! Findings, per-schema introspection failures, bad overrides and an
//! unusable database URL are all reported, never turned into a non-zero
//! exit status. Only an unreadable config file stops the command, in `main`.

use std::path::PathBuf;

use chrono::Utc;
use rowguard_adapter_pg::{PgCatalogIntrospector, connect_pool_lazy};
use rowguard_compliance::{
    ComplianceAuditor, ComplianceReport, IntrospectionError, SchemaReport, log_findings, render,
};
use rowguard_core::{ComplianceConfig, RowguardConfig};

/// Apply command-line overrides on top of the configured audit settings.
fn effective_config(
    mut config: ComplianceConfig,
    schemas: Vec<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<ComplianceConfig> {
    if !schemas.is_empty() {
        config.schemas = schemas;
    }
    if let Some(output) = output {
        config.report_path = output;
    }
    config.validate()?;
    Ok(config)
}

/// Like [`effective_config`], but falls back to the file's settings.
fn resolve_config(
    base: ComplianceConfig,
    schemas: Vec<String>,
    output: Option<PathBuf>,
) -> ComplianceConfig {
    match effective_config(base.clone(), schemas, output) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring invalid compliance overrides");
            eprintln!("⚠️  Ignoring invalid overrides: {}", e);
            base
        }
    }
}

/// A report in which every schema failed for the same reason.
fn unreachable_report(schemas: &[String], message: &str) -> ComplianceReport {
    let schemas = schemas
        .iter()
        .map(|schema| {
            SchemaReport::errored(
                schema.clone(),
                IntrospectionError::Query {
                    schema: schema.clone(),
                    message: message.to_string(),
                },
            )
        })
        .collect();
    ComplianceReport::new(Utc::now(), schemas)
}

pub async fn run(
    config: RowguardConfig,
    schemas: Vec<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let compliance = resolve_config(config.compliance.clone(), schemas, output);
    tracing::info!(
        upstream = %config.upstream.display_target(),
        schemas = ?compliance.schemas,
        "Running RLS compliance audit"
    );

    let report = match connect_pool_lazy(&config.upstream) {
        Ok(pool) => {
            let introspector = PgCatalogIntrospector::new(pool);
            ComplianceAuditor::from_config(&introspector, &compliance)
                .run()
                .await
        }
        Err(e) => {
            tracing::error!(error = %e, "Invalid upstream connection settings");
            unreachable_report(&compliance.schemas, &e.to_string())
        }
    };

    log_findings(&report);
    println!("{}", render(&report));
    write_report(&report, &compliance);

    Ok(())
}

fn write_report(report: &ComplianceReport, config: &ComplianceConfig) {
    match report.write_artifact(&config.report_path) {
        Ok(()) => println!("📄 Report written to {}", config.report_path.display()),
        Err(e) => {
            tracing::warn!(error = %e, path = %config.report_path.display(), "Failed to write compliance report");
            eprintln!("⚠️  Could not write report: {}", e);
        }
    }
}
