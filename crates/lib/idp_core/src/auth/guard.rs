//! Tenant ownership guard.
//!
//! Binds a resolved principal to the applications it may act on. A target
//! application that does not exist and one owned by someone else produce the
//! same `Forbidden`, so callers cannot probe for other tenants' ids.

use tracing::debug;

use super::AuthError;
use crate::models::Application;
use crate::store::CredentialStore;

const NOT_ACCESSIBLE: &str = "application not accessible";

/// Require that `admin_id` owns `application_id`; returns the application.
pub async fn ensure_owner(
    store: &dyn CredentialStore,
    admin_id: &str,
    application_id: &str,
) -> Result<Application, AuthError> {
    match store.get_application(application_id).await? {
        Some(app) if app.admin_id == admin_id => Ok(app),
        Some(_) => {
            debug!(admin_id, application_id, "ownership check failed: not owner");
            Err(AuthError::Forbidden(NOT_ACCESSIBLE.into()))
        }
        None => {
            debug!(admin_id, application_id, "ownership check failed: no such application");
            Err(AuthError::Forbidden(NOT_ACCESSIBLE.into()))
        }
    }
}

/// Require that an access-token principal targets its own application.
pub fn ensure_tenant(
    principal_application_id: &str,
    target_application_id: &str,
) -> Result<(), AuthError> {
    if principal_application_id == target_application_id {
        Ok(())
    } else {
        debug!(
            principal_application_id,
            target_application_id, "tenant check failed"
        );
        Err(AuthError::Forbidden(NOT_ACCESSIBLE.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewAdmin, NewApplication};
    use crate::store::MemoryCredentialStore;
    use crate::uuid::new_id;

    async fn admin(store: &MemoryCredentialStore, email: &str) -> String {
        store
            .create_admin(NewAdmin {
                email: email.into(),
                password_hash: "hash".into(),
                first_name: "F".into(),
                last_name: "L".into(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn owner_is_admitted() {
        let store = MemoryCredentialStore::new();
        let m1 = admin(&store, "m1@x.com").await;
        let a1 = store
            .create_application(NewApplication {
                name: "a1".into(),
                description: String::new(),
                admin_id: m1.clone(),
            })
            .await
            .unwrap();
        let app = ensure_owner(&store, &m1, &a1.id).await.unwrap();
        assert_eq!(app.id, a1.id);
    }

    #[tokio::test]
    async fn other_admin_is_forbidden() {
        let store = MemoryCredentialStore::new();
        let m1 = admin(&store, "m1@x.com").await;
        let m2 = admin(&store, "m2@x.com").await;
        let a1 = store
            .create_application(NewApplication {
                name: "a1".into(),
                description: String::new(),
                admin_id: m1,
            })
            .await
            .unwrap();
        assert!(matches!(
            ensure_owner(&store, &m2, &a1.id).await,
            Err(AuthError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn missing_application_looks_like_forbidden() {
        let store = MemoryCredentialStore::new();
        let m1 = admin(&store, "m1@x.com").await;
        let missing = ensure_owner(&store, &m1, &new_id()).await.unwrap_err();
        assert_eq!(missing.to_string(), "Forbidden: application not accessible");
    }

    #[test]
    fn tenant_must_match() {
        let a = new_id();
        assert!(ensure_tenant(&a, &a).is_ok());
        assert!(matches!(
            ensure_tenant(&a, &new_id()),
            Err(AuthError::Forbidden(_))
        ));
    }
}
