//! PostgreSQL credential store tests.
//!
//! Run against `IDP_TEST_DATABASE_URL` (or `DATABASE_URL`); skipped when
//! neither is set or the database is unreachable.

use std::sync::Arc;
use std::time::Duration;

use idp_core::models::{Application, NewAdmin, NewApplication, NewUser, PageRequest};
use idp_core::store::{CredentialStore, PgCredentialStore, RefreshTokenWrite, StoreError};
use idp_core::uuid::new_id;
use sqlx::postgres::PgPoolOptions;

async fn pg_store() -> Option<Arc<PgCredentialStore>> {
    let Ok(url) = std::env::var("IDP_TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL"))
    else {
        eprintln!("skipping pg-tests: no database url");
        return None;
    };
    let pool = match PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(20))
        .connect(&url)
        .await
    {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("skipping pg-tests: cannot connect to postgres: {err}");
            return None;
        }
    };
    idp_core::migrate::migrate(&pool).await.expect("migrations");
    Some(Arc::new(PgCredentialStore::new(pool)))
}

/// A fresh admin + application; emails are unique per run so tests can share
/// one database.
async fn tenant(store: &PgCredentialStore) -> Application {
    let admin = store
        .create_admin(NewAdmin {
            email: format!("{}@pg-tests.example", new_id()),
            password_hash: "hash".into(),
            first_name: "Ada".into(),
            last_name: "Admin".into(),
        })
        .await
        .expect("create admin");
    store
        .create_application(NewApplication {
            name: "shop".into(),
            description: "pg tests".into(),
            admin_id: admin.id,
        })
        .await
        .expect("create application")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_issue_persists_exactly_one_token() {
    let Some(store) = pg_store().await else {
        return;
    };
    let app = tenant(&store).await;

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..16 {
        let (store, app_id) = (store.clone(), app.id.clone());
        tasks.spawn(async move {
            let token = format!("token-{i}");
            store
                .store_refresh_token(&app_id, &token, RefreshTokenWrite::IssueNew)
                .await
                .map(|_| token)
        });
    }
    let results = tasks.join_all().await;
    let issued: Vec<&String> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(issued.len(), 1, "{results:?}");
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, StoreError::Conflict(_)))
    );

    let stored = store.get_application(&app.id).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_ref(), Some(issued[0]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rotation_leaves_one_of_the_written_tokens() {
    let Some(store) = pg_store().await else {
        return;
    };
    let app = tenant(&store).await;
    store
        .store_refresh_token(&app.id, "first", RefreshTokenWrite::IssueNew)
        .await
        .unwrap();

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..16 {
        let (store, app_id) = (store.clone(), app.id.clone());
        tasks.spawn(async move {
            store
                .store_refresh_token(&app_id, &format!("rotated-{i}"), RefreshTokenWrite::Rotate)
                .await
        });
    }
    for result in tasks.join_all().await {
        result.expect("rotation");
    }

    let stored = store.get_application(&app.id).await.unwrap().unwrap();
    let token = stored.refresh_token.expect("live token");
    assert!(token.starts_with("rotated-"), "{token}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_user_creation_is_unique_per_application() {
    let Some(store) = pg_store().await else {
        return;
    };
    let app = tenant(&store).await;

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..16 {
        let (store, app_id) = (store.clone(), app.id.clone());
        tasks.spawn(async move {
            store
                .create_user(NewUser {
                    email: "uma@example.com".into(),
                    password_hash: "hash".into(),
                    first_name: "Uma".into(),
                    last_name: "User".into(),
                    application_id: app_id,
                })
                .await
        });
    }
    let results = tasks.join_all().await;
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1, "{results:?}");
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, StoreError::Conflict(_)))
    );

    let users = store
        .list_users(&app.id, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(users.total, 1);
}

#[tokio::test]
async fn deleting_admin_cascades_to_applications_and_users() {
    let Some(store) = pg_store().await else {
        return;
    };
    let app = tenant(&store).await;
    let user = store
        .create_user(NewUser {
            email: "uma@example.com".into(),
            password_hash: "hash".into(),
            first_name: "Uma".into(),
            last_name: "User".into(),
            application_id: app.id.clone(),
        })
        .await
        .unwrap();

    store.delete_admin(&app.admin_id).await.unwrap();
    assert!(store.get_application(&app.id).await.unwrap().is_none());
    assert!(store.get_user(&app.id, &user.id).await.unwrap().is_none());
}
