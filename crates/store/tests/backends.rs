//! Runs the table lifecycle against real servers when a URL is provided:
//! `DWLOG_TEST_POSTGRES_URL=postgres://... DWLOG_TEST_MYSQL_URL=mysql://... cargo test`.

use dwlog_core::config::Config;
use dwlog_core::model::log::Document;
use dwlog_core::query::{DocumentMode, PageRequest};
use dwlog_core::severity::Severity;
use dwlog_store::{CreateOutcome, Dialect, DropOutcome, LogEntry, Store};
use serde_json::json;

async fn open(env_key: &str) -> Option<Store> {
    let url = std::env::var(env_key).ok()?;
    let cfg = Config {
        database_url: url,
        max_connections: 2,
        ..Config::default()
    };
    Some(Store::open(&cfg).await.unwrap())
}

async fn exercise(store: Store, dialect: Dialect) {
    assert_eq!(store.dialect(), dialect);
    let _ = store.drop_table(true).await.unwrap();

    assert!(!store.table_exists().await);
    assert_eq!(store.create_table().await.unwrap(), CreateOutcome::Created);
    assert_eq!(
        store.create_table().await.unwrap(),
        CreateOutcome::AlreadyExists
    );

    let mut context = Document::new();
    context.insert("order_id".into(), json!(17));
    let writer = store.writer();
    writer
        .write_entry(
            &LogEntry::new("payments", Severity::Warning, "contains FOO here")
                .with_context(context.clone()),
        )
        .await;
    writer
        .write_entry(&LogEntry::new("app", Severity::Info, "bar"))
        .await;
    writer
        .write_entry(&LogEntry::new("app", Severity::Info, "100% done"))
        .await;

    let all = store.find_page(&PageRequest::default()).await.unwrap();
    assert_eq!(all.total, 3);
    assert_eq!(all.records[0].message, "100% done");

    let search = store
        .find_page(&PageRequest {
            search: Some("foo".into()),
            documents: DocumentMode::Decoded,
            ..PageRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(search.total, 1);
    assert_eq!(search.records[0].context.to_document(), context);
    assert_eq!(search.records[0].level, 300);

    let percent = store
        .find_page(&PageRequest {
            search: Some("%".into()),
            ..PageRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(percent.total, 1);

    let level = store
        .find_page(&PageRequest {
            level: Some("info".into()),
            limit: 1,
            page: 2,
            ..PageRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(level.total, 2);
    assert_eq!(level.records.len(), 1);
    assert_eq!(level.records[0].message, "bar");

    assert_eq!(store.distinct_channels().await.unwrap(), ["app", "payments"]);
    let levels = store.distinct_levels().await.unwrap();
    assert_eq!(levels.len(), 2);
    assert_eq!(levels[0].level_name, "info");

    assert_eq!(
        store.drop_table(false).await.unwrap(),
        DropOutcome::NotConfirmed
    );
    assert_eq!(store.drop_table(true).await.unwrap(), DropOutcome::Dropped);
    assert!(!store.table_exists().await);
    store.close().await;
}

#[tokio::test]
async fn postgres_lifecycle() {
    let Some(store) = open("DWLOG_TEST_POSTGRES_URL").await else {
        return;
    };
    exercise(store, Dialect::Postgres).await;
}

#[tokio::test]
async fn mysql_lifecycle() {
    let Some(store) = open("DWLOG_TEST_MYSQL_URL").await else {
        return;
    };
    exercise(store, Dialect::MySql).await;
}
