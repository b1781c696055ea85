//! sea-orm stores against an in-memory SQLite database.

use chrono::{Duration, Utc};
use sea_orm::DatabaseConnection;
use serde_json::json;
use uuid::Uuid;

use loan_servicing::domain::{
    AuditAction, AuditContext, Loan, LoanApplication, LoanStatus, NewUser, Otp, User,
};
use loan_servicing::errors::AppError;
use loan_servicing::infra::repositories::{
    ActivityLogRepository, ActivityLogStore, LoanRepository, LoanStore, OtpRepository, OtpStore,
    TokenRepository, TokenStore, UserRepository, UserStore,
};
use loan_servicing::infra::Database;
use loan_servicing::types::{LoanListQuery, PageRequest};

async fn connection() -> DatabaseConnection {
    let database = Database::connect_url("sqlite::memory:", 1).await.unwrap();
    database.run_migrations().await.unwrap();
    database.get_connection()
}

async fn borrower(db: &DatabaseConnection, username: &str, phone: &str) -> User {
    UserStore::new(db.clone())
        .create(NewUser::borrower(
            username.to_string(),
            phone.to_string(),
            "hash".to_string(),
        ))
        .await
        .unwrap()
}

fn application(amount: u64) -> LoanApplication {
    LoanApplication::from_payload(&json!({"amount": amount, "termMonths": 12})).unwrap()
}

#[tokio::test]
async fn test_one_pending_loan_per_user_is_enforced_by_the_index() {
    let db = connection().await;
    let user = borrower(&db, "bob", "+15551234567").await;
    let loans = LoanStore::new(db.clone());

    loans
        .create(Loan::submit(user.id, application(150_000), Utc::now()))
        .await
        .unwrap();
    let err = loans
        .create(Loan::submit(user.id, application(200_000), Utc::now()))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_cancelled_loan_frees_the_pending_slot() {
    let db = connection().await;
    let user = borrower(&db, "bob", "+15551234567").await;
    let loans = LoanStore::new(db.clone());

    let mut first = loans
        .create(Loan::submit(user.id, application(150_000), Utc::now()))
        .await
        .unwrap();
    first.cancel_by_owner(Utc::now()).unwrap();
    loans.save(first).await.unwrap();

    assert!(loans.find_pending_for_user(user.id).await.unwrap().is_none());
    loans
        .create(Loan::submit(user.id, application(150_000), Utc::now()))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_admin_listing_filters_and_sorts() {
    let db = connection().await;
    let loans = LoanStore::new(db.clone());
    let amounts = [("ann", 120_000), ("ben", 450_000), ("cat", 900_000)];
    for (i, (name, amount)) in amounts.iter().enumerate() {
        let user = borrower(&db, name, &format!("+1555000000{}", i)).await;
        loans
            .create(Loan::submit(user.id, application(*amount), Utc::now()))
            .await
            .unwrap();
    }

    let filter = LoanListQuery {
        min_amount: Some("200000".into()),
        sort: Some("-loan_amount".into()),
        ..Default::default()
    }
    .into_filter()
    .unwrap();
    let page = loans.list_with_borrowers(filter).await.unwrap();

    assert_eq!(page.total, 2);
    let names: Vec<_> = page
        .items
        .iter()
        .map(|(_, borrower)| borrower.as_ref().unwrap().username.clone())
        .collect();
    assert_eq!(names, ["cat", "ben"]);

    let filter = LoanListQuery {
        search: Some("+15550000000".into()),
        ..Default::default()
    }
    .into_filter()
    .unwrap();
    let page = loans.list_with_borrowers(filter).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].0.loan_amount, 120_000.0);
}

#[tokio::test]
async fn test_user_listing_pagination() {
    let db = connection().await;
    for i in 0..25 {
        borrower(&db, &format!("user{:02}", i), &format!("+1555100{:04}", i)).await;
    }

    let filter = loan_servicing::types::UserListQuery {
        page: Some("3".into()),
        per_page: Some("10".into()),
        ..Default::default()
    }
    .into_filter()
    .unwrap();
    let page = UserStore::new(db.clone()).list(filter).await.unwrap();

    assert_eq!(page.items.len(), 5);
    assert_eq!(page.total, 25);
    assert_eq!(page.pages, 3);
}

#[tokio::test]
async fn test_latest_otp_wins_and_issuing_is_audited() {
    let db = connection().await;
    let admin = UserStore::new(db.clone())
        .create(NewUser::admin(
            "root".into(),
            "root@admin.test".into(),
            "hash".into(),
        ))
        .await
        .unwrap();
    let customer = borrower(&db, "bob", "+15551234567").await;
    let otps = OtpStore::new(db.clone());
    let audit = AuditContext::new(admin.id, Some("127.0.0.1".into()));

    let now = Utc::now();
    for (offset, length) in [(0, 6), (1, 8)] {
        let otp = Otp::issue(customer.id, length, now + Duration::seconds(offset)).unwrap();
        otps.issue(
            otp,
            audit
                .entry(AuditAction::OtpGenerate, "issued")
                .customer(customer.id),
        )
        .await
        .unwrap();
    }

    let latest = otps.latest_for_user(customer.id).await.unwrap().unwrap();
    assert_eq!(latest.otp_code.len(), 8);
    assert!(otps.latest_for_user(Uuid::new_v4()).await.unwrap().is_none());

    let logs = ActivityLogStore::new(db.clone())
        .list(PageRequest::new(None, None, 10))
        .await
        .unwrap();
    assert_eq!(logs.total, 2);
    assert_eq!(logs.items[0].action, AuditAction::OtpGenerate);
    assert_eq!(logs.items[0].ip_address.as_deref(), Some("127.0.0.1"));
}

#[tokio::test]
async fn test_decision_and_audit_commit_together() {
    let db = connection().await;
    let admin = UserStore::new(db.clone())
        .create(NewUser::admin(
            "root".into(),
            "root@admin.test".into(),
            "hash".into(),
        ))
        .await
        .unwrap();
    let user = borrower(&db, "bob", "+15551234567").await;
    let loans = LoanStore::new(db.clone());
    let mut loan = loans
        .create(Loan::submit(user.id, application(150_000), Utc::now()))
        .await
        .unwrap();

    loan.decide(loan_servicing::domain::LoanAction::Approve, Utc::now())
        .unwrap();
    let entry = AuditContext::new(admin.id, None)
        .entry(AuditAction::LoanStatusUpdate, "approved")
        .loan(loan.id);
    loans.save_with_audit(loan.clone(), entry).await.unwrap();

    let stored = loans.find_by_id(loan.id).await.unwrap().unwrap();
    assert_eq!(stored.status, LoanStatus::Approved);
    assert!(stored.due_date.is_some());

    let logs = ActivityLogStore::new(db)
        .list(PageRequest::new(None, None, 10))
        .await
        .unwrap();
    assert_eq!(logs.total, 1);
    assert_eq!(logs.items[0].loan_id, Some(loan.id));
}

#[tokio::test]
async fn test_token_blocklist() {
    let db = connection().await;
    let tokens = TokenStore::new(db);

    assert!(!tokens.is_revoked("jti-1").await.unwrap());
    tokens.revoke("jti-1").await.unwrap();
    assert!(tokens.is_revoked("jti-1").await.unwrap());
    assert!(!tokens.is_revoked("jti-2").await.unwrap());
}

#[tokio::test]
async fn test_huge_page_number_returns_an_empty_page() {
    let db = connection().await;
    borrower(&db, "alice", "+15551000001").await;

    let filter = loan_servicing::types::UserListQuery {
        page: Some(i64::MAX.to_string()),
        per_page: Some("10".into()),
        ..Default::default()
    }
    .into_filter()
    .unwrap();
    let page = UserStore::new(db).list(filter).await.unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_search_wildcards_match_literally() {
    let db = connection().await;
    borrower(&db, "alice", "+15551000001").await;
    borrower(&db, "bob", "+15551000002").await;
    borrower(&db, "ca_rl", "+15551000003").await;
    let users = UserStore::new(db);

    let search = |term: &str| {
        loan_servicing::types::UserListQuery {
            search: Some(term.to_string()),
            ..Default::default()
        }
        .into_filter()
        .unwrap()
    };

    assert_eq!(users.list(search("%")).await.unwrap().total, 0);
    assert_eq!(users.list(search("b_b")).await.unwrap().total, 0);
    let underscored = users.list(search("a_r")).await.unwrap();
    assert_eq!(underscored.total, 1);
    assert_eq!(underscored.items[0].username, "ca_rl");
}
