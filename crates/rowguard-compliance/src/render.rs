//! Human-readable rendering of a compliance report.

use std::fmt::Write;

use crate::classify::ComplianceStatus;
use crate::report::{ComplianceReport, OverallStatus, SchemaReport, TableResult};

fn status_icon(status: ComplianceStatus) -> &'static str {
    match status {
        ComplianceStatus::Protected => "✅",
        ComplianceStatus::Partial => "⚠️ ",
        ComplianceStatus::Unprotected => "❌",
    }
}

fn overall_icon(status: OverallStatus) -> &'static str {
    match status {
        OverallStatus::Excellent => "🟢",
        OverallStatus::Good => "🟡",
        OverallStatus::Critical => "🔴",
    }
}

fn table_line(out: &mut String, result: &TableResult) {
    let detail = if !result.row_filtering_enabled {
        "RLS disabled".to_string()
    } else if result.policies.is_empty() {
        "RLS enabled, no policies".to_string()
    } else {
        format!(
            "{} {} ({})",
            result.policy_count,
            if result.policy_count == 1 { "policy" } else { "policies" },
            result.policies.join(", ")
        )
    };
    let forced = if result.force_row_filtering { " [forced]" } else { "" };
    let _ = writeln!(
        out,
        "  {} {:<32} {:<12} {}{}",
        status_icon(result.status),
        result.table,
        result.status.to_string(),
        detail,
        forced
    );
}

fn schema_section(out: &mut String, schema: &SchemaReport) {
    let _ = writeln!(out, "\n📂 Schema: {}", schema.schema);
    let _ = writeln!(out, "{}", "─".repeat(60));

    if let Some(err) = &schema.error {
        let _ = writeln!(out, "  ❌ Introspection failed: {}", err);
        return;
    }
    if schema.results.is_empty() {
        let _ = writeln!(out, "  (no tables)");
    }
    for result in &schema.results {
        table_line(out, result);
    }

    let s = &schema.summary;
    let _ = writeln!(
        out,
        "  Summary: {} protected, {} partial, {} unprotected of {} tables ({}%)",
        s.protected,
        s.partial,
        s.unprotected,
        s.total_tables,
        s.compliance_percentage()
    );
}

/// Render the report as console text.
pub fn render(report: &ComplianceReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "🔍 Row-level security compliance report ({})",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "{}", "═".repeat(60));

    let errored = report.errored_schemas().count();
    if report.nothing_audited() {
        let _ = writeln!(
            out,
            "⚠️  NO TABLES WERE AUDITED: all {} configured schemas failed introspection",
            errored
        );
    } else if errored > 0 {
        let _ = writeln!(
            out,
            "⚠️  Incomplete audit: {} of {} schemas failed introspection",
            errored,
            report.schemas.len()
        );
    }

    for schema in &report.schemas {
        schema_section(&mut out, schema);
    }

    let t = &report.totals;
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "═".repeat(60));
    let _ = writeln!(
        out,
        "📊 Total: {} tables, {} protected, {} partial, {} unprotected",
        t.total_tables, t.protected, t.partial, t.unprotected
    );
    let _ = writeln!(out, "   Compliance: {}%", t.compliance_percentage());
    if report.nothing_audited() {
        let _ = writeln!(out, "⚪ Overall status: {} (nothing audited)", report.overall_status);
    } else {
        let _ = writeln!(
            out,
            "{} Overall status: {}{}",
            overall_icon(report.overall_status),
            report.overall_status,
            if report.audit_complete { "" } else { " (incomplete audit)" }
        );
    }

    if !report.recommendations.is_empty() {
        let _ = writeln!(out, "\n💡 Recommendations:");
        for (i, line) in report.recommendations.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, line);
        }
    }
    out
}
