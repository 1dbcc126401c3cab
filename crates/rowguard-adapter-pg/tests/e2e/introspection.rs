//! Catalog introspection and compliance tests against a real Postgres.

use super::common::*;
use rowguard_compliance::{
    CatalogSource, ClassificationThresholds, ComplianceAuditor, ComplianceStatus,
    IntrospectionError, OverallStatus,
};

pub async fn test_policy_records(ctx: &TestContext) {
    println!("  🧪 test_policy_records");

    let introspector = ctx.admin_introspector();
    assert!(introspector.schema_exists("community").await.unwrap());
    assert!(!introspector.schema_exists("nope").await.unwrap());

    let records = introspector.policy_records("community").await.unwrap();
    let tables: Vec<&str> = records.iter().map(|r| r.table.as_str()).collect();
    assert_eq!(tables, vec!["cache", "notifications", "posts"]);

    let posts = &records[2];
    assert!(posts.row_filtering_enabled);
    assert!(posts.force_row_filtering);
    assert_eq!(posts.policies, vec!["posts_modify", "posts_select"]);

    let cache = &records[0];
    assert!(!cache.row_filtering_enabled);
    assert!(cache.policies.is_empty());

    println!("     ✓ Tables and policies read in name order");
}

pub async fn test_community_audit(ctx: &TestContext) {
    println!("  🧪 test_community_audit");

    let introspector = ctx.admin_introspector();
    let report = ComplianceAuditor::new(
        &introspector,
        vec!["community".to_string()],
        ClassificationThresholds::default(),
    )
    .run()
    .await;

    let schema = report.schema("community").unwrap();
    let statuses: Vec<ComplianceStatus> = schema.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            ComplianceStatus::Unprotected,
            ComplianceStatus::Partial,
            ComplianceStatus::Protected
        ]
    );
    assert_eq!(schema.summary.compliance_percentage(), 33);
    assert_eq!(report.overall_status, OverallStatus::Good);

    println!("     ✓ community audits to 1/1/1 (33%)");
}

pub async fn test_unreadable_schemas_recorded(ctx: &TestContext) {
    println!("  🧪 test_unreadable_schemas_recorded");

    let introspector = ctx.app_introspector().await;
    let report = ComplianceAuditor::new(
        &introspector,
        vec![
            "restricted".to_string(),
            "missing".to_string(),
            "community".to_string(),
        ],
        ClassificationThresholds::default(),
    )
    .run()
    .await;

    assert_eq!(
        report.schema("restricted").unwrap().error,
        Some(IntrospectionError::PermissionDenied("restricted".to_string()))
    );
    assert_eq!(
        report.schema("missing").unwrap().error,
        Some(IntrospectionError::SchemaNotFound("missing".to_string()))
    );
    assert_eq!(report.schema("community").unwrap().summary.total_tables, 3);

    println!("     ✓ Bad schemas are recorded and the run continues");
}

pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n📦 Introspection tests");
    test_policy_records(ctx).await;
    test_community_audit(ctx).await;
    test_unreadable_schemas_recorded(ctx).await;
}
