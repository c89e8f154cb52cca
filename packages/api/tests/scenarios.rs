use std::time::Duration;

use api::auth::DurableSession;
use api::{
    Credentials, Dashboard, FileSessionStore, MemoryIdentities, MemorySessionStore,
    SessionLifecycle, SessionStore,
};
use chrono::{TimeDelta, Utc};
use ledger::{
    ExpenseForm, ExpenseRecord, Identity, LedgerCache, LedgerConfig, LedgerApi, LoadOutcome,
    MemoryLedger, Role, SelectionState,
};

const TTL: Duration = Duration::from_secs(1800);

fn ana() -> Identity {
    Identity {
        id: "2".to_string(),
        display_name: "Ana".to_string(),
        email: "ana@example.com".to_string(),
        role: Role::Standard,
        monthly_income: 3000.0,
    }
}

fn identities() -> MemoryIdentities {
    let identities = MemoryIdentities::new();
    identities.insert(ana(), "secret");
    identities
}

fn record(id: &str, amount: f64, date: &str) -> ExpenseRecord {
    ExpenseRecord {
        id: id.to_string(),
        description: format!("item {id}"),
        category: "General".to_string(),
        amount,
        date: date.to_string(),
        month: ledger::canonical_month(date).unwrap(),
        owner_id: "2".to_string(),
    }
}

async fn dashboard(
    ledger: MemoryLedger,
) -> Dashboard<MemoryLedger, MemoryIdentities, MemorySessionStore> {
    let session = SessionLifecycle::new(identities(), MemorySessionStore::new(), TTL);
    let mut dashboard = Dashboard::new(session, ledger, LedgerConfig::default())
        .with_selection(SelectionState::new("6", Some(2024)));
    dashboard
        .login(&Credentials::new("ana@example.com", "secret"))
        .await
        .unwrap();
    dashboard
}

#[tokio::test]
async fn lunch_expense_shows_in_june_total() {
    let ledger = MemoryLedger::with_records(vec![record("a", 20.0, "2024-06-01")]);
    let mut dashboard = dashboard(ledger.clone()).await;
    let before = dashboard.month_view().total;

    let created = dashboard
        .add_expense(&ExpenseForm {
            description: "Lunch".to_string(),
            category: "Food".to_string(),
            amount: "45.50".to_string(),
            date: "2024-06-10".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(created.month, "6");
    assert_eq!(created.owner_id, "2");
    assert!(ledger.records().iter().any(|r| r.id == created.id));

    let view = dashboard.month_view();
    assert!(view.records.iter().any(|r| r.id == created.id));
    assert!((view.total - before - 45.50).abs() < 1e-9);
    assert_eq!(dashboard.format_currency(view.total), "R$ 65,50");
}

#[tokio::test]
async fn deleting_last_record_on_last_page_snaps_back() {
    let records = (1..=6)
        .map(|day| record(&format!("r{day}"), 1.0, &format!("2024-06-{day:02}")))
        .collect();
    let mut dashboard = dashboard(MemoryLedger::with_records(records)).await;

    assert_eq!(dashboard.month_view().total_pages, 2);
    dashboard.next_page();
    let view = dashboard.month_view();
    assert_eq!(view.page, 2);
    assert_eq!(view.records.len(), 1);

    let last = view.records[0].id.clone();
    dashboard.delete_expense(&last).await.unwrap();

    let view = dashboard.month_view();
    assert_eq!(view.total_pages, 1);
    assert_eq!(view.page, 1);
    assert_eq!(view.records.len(), 5);
}

#[tokio::test]
async fn failed_delete_leaves_everything_in_place() {
    let ledger = MemoryLedger::with_records(vec![record("a", 5.0, "2024-06-01")]);
    let mut dashboard = dashboard(ledger.clone()).await;
    ledger.fail_next(503);

    assert!(dashboard.delete_expense("a").await.is_err());
    assert!(dashboard.error().is_some());
    assert_eq!(dashboard.ledger().records().len(), 1);
    assert_eq!(dashboard.identity(), Some(ana()));
}

#[tokio::test]
async fn load_resolving_after_logout_is_discarded() {
    let ledger = MemoryLedger::with_records(vec![record("a", 5.0, "2024-06-01")]);
    let mut cache = LedgerCache::new(ledger.clone());

    let ticket = cache.begin_load(Some(&ana())).unwrap();
    let fetched = ledger.list(ticket.owner_id()).await;
    cache.clear();

    assert_eq!(cache.finish_load(ticket, fetched), LoadOutcome::Stale);
    assert!(cache.records().is_empty());
    assert_eq!(cache.error(), None);
}

#[tokio::test]
async fn session_survives_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let token = {
        let store = FileSessionStore::new(dir.path().to_path_buf());
        let mut session = SessionLifecycle::new(identities(), store, TTL);
        session
            .login(&Credentials::new("ana@example.com", "secret"))
            .await
            .unwrap();
        session.token().unwrap()
    };

    // Lose the mirror; restore rebuilds it from the durable record.
    std::fs::remove_file(dir.path().join("session.cookie")).unwrap();

    let store = FileSessionStore::new(dir.path().to_path_buf());
    let mut session = SessionLifecycle::new(identities(), store.clone(), TTL);
    assert_eq!(session.restore().unwrap(), Some(ana()));
    assert_eq!(session.token(), Some(token.clone()));
    assert_eq!(store.read_mirror().unwrap().map(|m| m.token), Some(token));
}

#[tokio::test]
async fn expired_session_is_cleared_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileSessionStore::new(dir.path().to_path_buf());
    let record = DurableSession {
        identity: ana(),
        token: "old".to_string(),
        expires_at: Some((Utc::now() - TimeDelta::hours(1)).to_rfc3339()),
    };
    store
        .write_record(&serde_json::to_string(&record).unwrap())
        .unwrap();
    std::fs::write(dir.path().join("session.cookie"), "{}").unwrap();

    let mut session = SessionLifecycle::new(identities(), store, TTL);
    assert_eq!(session.restore().unwrap(), None);
    assert!(!dir.path().join("session.json").exists());
    assert!(!dir.path().join("session.cookie").exists());
}
