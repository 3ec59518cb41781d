use metric_field_sync_lib::{
    init_tracing, FieldKind, FieldSpec, FieldSynchronizer, MissingIdPolicy, SqliteHost, SyncSettings, TableHost,
};
use std::path::Path;
use std::sync::Arc;

async fn seeded_host(path: &Path) -> SqliteHost {
    let host = SqliteHost::new(path).expect("open host");
    let metrics = host.ensure_table("Metrics").expect("metrics table");
    let check_in = host.ensure_table("Check-In Form").expect("check-in table");
    host.create_field(&check_in, "Week", FieldSpec::comments())
        .await
        .expect("seed week field");
    host.create_field(&check_in, "churn_status", FieldSpec::status())
        .await
        .expect("seed churn status");
    for (name, id) in [("Revenue", "rev"), ("Churn", "churn"), ("Pipeline", "pipe")] {
        host.insert_record(&metrics, name, &serde_json::json!({ "Id": id, "Owner": "ops" }))
            .expect("metric record");
    }
    host
}

#[tokio::test]
async fn sync_fills_check_in_form_and_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("base.db");
    let host = Arc::new(seeded_host(&path).await);

    let sync = FieldSynchronizer::new(host.clone(), SyncSettings::default()).expect("synchronizer");
    let before = sync.coverage().await.expect("coverage");
    assert!(!before.is_complete());

    let report = sync.sync_tables().await.expect("sync");
    assert_eq!(
        report.created_fields,
        vec!["rev_status", "rev_comments", "churn_comments", "pipe_status", "pipe_comments"]
    );
    assert!(report.skipped_records.is_empty());

    let check_in = host.table("Check-In Form").await.expect("table");
    let fields = host.fields(&check_in).expect("fields");
    assert_eq!(fields[0].name, "Week");
    assert_eq!(fields.len(), 7);
    for field in &fields[1..] {
        let expected = if field.name.ends_with("_status") {
            FieldKind::SingleSelect
        } else {
            FieldKind::MultilineText
        };
        assert_eq!(field.spec.kind(), expected, "{}", field.name);
    }
    drop(sync);
    drop(host);

    let host = Arc::new(SqliteHost::new(&path).expect("reopen"));
    let sync = FieldSynchronizer::new(host, SyncSettings::default()).expect("synchronizer");
    let again = sync.sync_tables().await.expect("second sync");
    assert!(again.is_noop());
    assert_eq!(again.missing_status, 0);
    assert_eq!(again.missing_comments, 0);
    assert!(sync.coverage().await.expect("coverage").is_complete());
}

#[tokio::test]
async fn settings_from_yaml_drive_table_and_column_names() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = SqliteHost::new(&dir.path().join("base.db")).expect("open host");
    let kpis = host.ensure_table("KPIs").expect("kpi table");
    let weekly = host.ensure_table("Weekly Review").expect("weekly table");
    host.insert_record(&kpis, "Revenue", &serde_json::json!({ "Key": "rev" }))
        .expect("record");
    host.insert_record(&kpis, "Unkeyed", &serde_json::json!({ "Key": null }))
        .expect("record");

    let settings = SyncSettings::from_yaml_str(
        "metricsTable: KPIs\ntargetTable: Weekly Review\nidColumn: Key\nmissingIdPolicy: skip\n",
    )
    .expect("settings");
    assert_eq!(settings.missing_id_policy, MissingIdPolicy::Skip);

    let host = Arc::new(host);
    let sync = FieldSynchronizer::new(host.clone(), settings).expect("synchronizer");
    let report = sync.sync_tables().await.expect("sync");

    assert_eq!(report.target_table, "Weekly Review");
    assert_eq!(report.created_fields, vec!["rev_status", "rev_comments"]);
    assert_eq!(report.skipped_records.len(), 1);
    assert_eq!(report.skipped_records[0].name, "Unkeyed");
    assert_eq!(host.fields(&weekly).expect("fields").len(), 2);

    let serialized = serde_json::to_value(&report).expect("serialize report");
    assert_eq!(serialized["createdFields"][0], "rev_status");
}

#[test]
fn init_tracing_writes_under_logs_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    init_tracing(dir.path()).expect("install subscriber");
    tracing::info!("metric field sync test log line");
    assert!(dir.path().join("logs").is_dir());
}
