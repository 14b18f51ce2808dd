use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    CredentialStore, RefreshTokenWrite, StoreError, admin_not_found, application_not_found,
    refresh_token_exists, user_not_found,
};
use crate::models::{
    Admin, AdminPatch, AdminWithPassword, Application, ApplicationPatch, NewAdmin,
    NewApplication, NewUser, Page, PageRequest, User, UserPatch, UserWithPassword,
};
use crate::uuid::new_id;

#[derive(Debug, Default)]
struct Tables {
    // Keyed by UUIDv7 id, so iteration order is creation order.
    admins: BTreeMap<String, AdminWithPassword>,
    applications: BTreeMap<String, Application>,
    users: BTreeMap<String, UserWithPassword>,
}

/// In-memory credential store.
///
/// Intended for tests/dev. A single write lock per call gives every method
/// the same all-or-nothing behaviour as a database transaction.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tables: RwLock<Tables>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T: Clone>(items: impl Iterator<Item = T>, page: PageRequest) -> Page<T> {
    let all: Vec<T> = items.collect();
    let total = all.len() as i64;
    let items = all
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect();
    Page { items, total }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn health(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_admin(&self, new_admin: NewAdmin) -> Result<Admin, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .admins
            .values()
            .any(|a| a.admin.email == new_admin.email)
        {
            return Err(StoreError::Conflict(format!(
                "admin with email {} already exists",
                new_admin.email
            )));
        }
        let now = Utc::now();
        let admin = Admin {
            id: new_id(),
            email: new_admin.email,
            first_name: new_admin.first_name,
            last_name: new_admin.last_name,
            created_at: now,
            updated_at: now,
        };
        tables.admins.insert(
            admin.id.clone(),
            AdminWithPassword {
                admin: admin.clone(),
                password_hash: new_admin.password_hash,
            },
        );
        Ok(admin)
    }

    async fn get_admin(&self, id: &str) -> Result<Option<Admin>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.admins.get(id).map(|a| a.admin.clone()))
    }

    async fn find_admin_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AdminWithPassword>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .admins
            .values()
            .find(|a| a.admin.email == email)
            .cloned())
    }

    async fn update_admin(&self, id: &str, patch: AdminPatch) -> Result<Admin, StoreError> {
        let mut tables = self.tables.write().await;
        let entry = tables.admins.get_mut(id).ok_or_else(|| admin_not_found(id))?;
        if let Some(first_name) = patch.first_name {
            entry.admin.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            entry.admin.last_name = last_name;
        }
        if let Some(password_hash) = patch.password_hash {
            entry.password_hash = password_hash;
        }
        entry.admin.updated_at = Utc::now();
        Ok(entry.admin.clone())
    }

    async fn delete_admin(&self, id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.admins.remove(id).ok_or_else(|| admin_not_found(id))?;
        let owned: Vec<String> = tables
            .applications
            .values()
            .filter(|app| app.admin_id == id)
            .map(|app| app.id.clone())
            .collect();
        tables.applications.retain(|_, app| app.admin_id != id);
        tables
            .users
            .retain(|_, u| !owned.contains(&u.user.application_id));
        Ok(())
    }

    async fn create_application(
        &self,
        new_application: NewApplication,
    ) -> Result<Application, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.admins.contains_key(&new_application.admin_id) {
            return Err(admin_not_found(&new_application.admin_id));
        }
        let now = Utc::now();
        let app = Application {
            id: new_id(),
            name: new_application.name,
            description: new_application.description,
            admin_id: new_application.admin_id,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        tables.applications.insert(app.id.clone(), app.clone());
        Ok(app)
    }

    async fn get_application(&self, id: &str) -> Result<Option<Application>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.applications.get(id).cloned())
    }

    async fn list_applications(
        &self,
        admin_id: &str,
        page: PageRequest,
    ) -> Result<Page<Application>, StoreError> {
        let tables = self.tables.read().await;
        Ok(paginate(
            tables
                .applications
                .values()
                .filter(|app| app.admin_id == admin_id)
                .cloned(),
            page,
        ))
    }

    async fn update_application(
        &self,
        id: &str,
        patch: ApplicationPatch,
    ) -> Result<Application, StoreError> {
        let mut tables = self.tables.write().await;
        let app = tables
            .applications
            .get_mut(id)
            .ok_or_else(|| application_not_found(id))?;
        if let Some(name) = patch.name {
            app.name = name;
        }
        if let Some(description) = patch.description {
            app.description = description;
        }
        app.updated_at = Utc::now();
        Ok(app.clone())
    }

    async fn delete_application(&self, id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .applications
            .remove(id)
            .ok_or_else(|| application_not_found(id))?;
        tables.users.retain(|_, u| u.user.application_id != id);
        Ok(())
    }

    async fn store_refresh_token(
        &self,
        application_id: &str,
        token: &str,
        mode: RefreshTokenWrite,
    ) -> Result<Application, StoreError> {
        let mut tables = self.tables.write().await;
        let app = tables
            .applications
            .get_mut(application_id)
            .ok_or_else(|| application_not_found(application_id))?;
        if mode == RefreshTokenWrite::IssueNew && app.has_refresh_token() {
            return Err(refresh_token_exists(application_id));
        }
        app.refresh_token = Some(token.to_string());
        app.updated_at = Utc::now();
        Ok(app.clone())
    }

    async fn clear_refresh_token(&self, application_id: &str) -> Result<Application, StoreError> {
        let mut tables = self.tables.write().await;
        let app = tables
            .applications
            .get_mut(application_id)
            .ok_or_else(|| application_not_found(application_id))?;
        app.refresh_token = None;
        app.updated_at = Utc::now();
        Ok(app.clone())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.applications.contains_key(&new_user.application_id) {
            return Err(application_not_found(&new_user.application_id));
        }
        if tables.users.values().any(|u| {
            u.user.application_id == new_user.application_id && u.user.email == new_user.email
        }) {
            return Err(StoreError::Conflict(format!(
                "user with email {} already exists in this application",
                new_user.email
            )));
        }
        let now = Utc::now();
        let user = User {
            id: new_id(),
            email: new_user.email,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            application_id: new_user.application_id,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(
            user.id.clone(),
            UserWithPassword {
                user: user.clone(),
                password_hash: new_user.password_hash,
            },
        );
        Ok(user)
    }

    async fn get_user(
        &self,
        application_id: &str,
        user_id: &str,
    ) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .get(user_id)
            .filter(|u| u.user.application_id == application_id)
            .map(|u| u.user.clone()))
    }

    async fn find_user_by_email(
        &self,
        application_id: &str,
        email: &str,
    ) -> Result<Option<UserWithPassword>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.user.application_id == application_id && u.user.email == email)
            .cloned())
    }

    async fn list_users(
        &self,
        application_id: &str,
        page: PageRequest,
    ) -> Result<Page<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(paginate(
            tables
                .users
                .values()
                .filter(|u| u.user.application_id == application_id)
                .map(|u| u.user.clone()),
            page,
        ))
    }

    async fn update_user(
        &self,
        application_id: &str,
        user_id: &str,
        patch: UserPatch,
    ) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        let entry = tables
            .users
            .get_mut(user_id)
            .filter(|u| u.user.application_id == application_id)
            .ok_or_else(|| user_not_found(user_id))?;
        if let Some(first_name) = patch.first_name {
            entry.user.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            entry.user.last_name = last_name;
        }
        if let Some(password_hash) = patch.password_hash {
            entry.password_hash = password_hash;
        }
        entry.user.updated_at = Utc::now();
        Ok(entry.user.clone())
    }

    async fn delete_user(&self, application_id: &str, user_id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        match tables.users.get(user_id) {
            Some(u) if u.user.application_id == application_id => {
                tables.users.remove(user_id);
                Ok(())
            }
            _ => Err(user_not_found(user_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_admin(email: &str) -> NewAdmin {
        NewAdmin {
            email: email.into(),
            password_hash: "hash".into(),
            first_name: "Ada".into(),
            last_name: "Admin".into(),
        }
    }

    fn new_user(application_id: &str, email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "hash".into(),
            first_name: "Una".into(),
            last_name: "User".into(),
            application_id: application_id.into(),
        }
    }

    async fn seeded() -> (MemoryCredentialStore, Admin, Application) {
        let store = MemoryCredentialStore::new();
        let admin = store.create_admin(new_admin("a@x.com")).await.unwrap();
        let app = store
            .create_application(NewApplication {
                name: "app".into(),
                description: "desc".into(),
                admin_id: admin.id.clone(),
            })
            .await
            .unwrap();
        (store, admin, app)
    }

    #[tokio::test]
    async fn admin_email_is_globally_unique() {
        let (store, _, _) = seeded().await;
        assert!(matches!(
            store.create_admin(new_admin("a@x.com")).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn user_email_is_unique_per_application() {
        let (store, admin, a1) = seeded().await;
        let a2 = store
            .create_application(NewApplication {
                name: "other".into(),
                description: String::new(),
                admin_id: admin.id.clone(),
            })
            .await
            .unwrap();

        store.create_user(new_user(&a1.id, "e@x.com")).await.unwrap();
        assert!(matches!(
            store.create_user(new_user(&a1.id, "e@x.com")).await,
            Err(StoreError::Conflict(_))
        ));
        assert!(store.create_user(new_user(&a2.id, "e@x.com")).await.is_ok());
    }

    #[tokio::test]
    async fn refresh_token_issue_conflicts_until_cleared() {
        let (store, _, app) = seeded().await;
        store
            .store_refresh_token(&app.id, "one", RefreshTokenWrite::IssueNew)
            .await
            .unwrap();
        assert!(matches!(
            store
                .store_refresh_token(&app.id, "two", RefreshTokenWrite::IssueNew)
                .await,
            Err(StoreError::Conflict(_))
        ));

        let cleared = store.clear_refresh_token(&app.id).await.unwrap();
        assert!(!cleared.has_refresh_token());
        let stored = store
            .store_refresh_token(&app.id, "two", RefreshTokenWrite::IssueNew)
            .await
            .unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn rotate_replaces_existing_token() {
        let (store, _, app) = seeded().await;
        store
            .store_refresh_token(&app.id, "one", RefreshTokenWrite::IssueNew)
            .await
            .unwrap();
        let rotated = store
            .store_refresh_token(&app.id, "two", RefreshTokenWrite::Rotate)
            .await
            .unwrap();
        assert_eq!(rotated.refresh_token.as_deref(), Some("two"));
        assert!(rotated.updated_at >= app.updated_at);
    }

    #[tokio::test]
    async fn listing_is_scoped_and_paginated() {
        let (store, admin, _) = seeded().await;
        let other = store.create_admin(new_admin("b@x.com")).await.unwrap();
        for i in 0..3 {
            store
                .create_application(NewApplication {
                    name: format!("app-{i}"),
                    description: String::new(),
                    admin_id: admin.id.clone(),
                })
                .await
                .unwrap();
        }
        store
            .create_application(NewApplication {
                name: "theirs".into(),
                description: String::new(),
                admin_id: other.id.clone(),
            })
            .await
            .unwrap();

        let page = store
            .list_applications(&admin.id, PageRequest::new(1, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.items.len(), 2);
        assert!(page.items.iter().all(|a| a.admin_id == admin.id));
        assert_eq!(page.items[0].name, "app-0");
    }

    #[tokio::test]
    async fn deleting_admin_cascades() {
        let (store, admin, app) = seeded().await;
        let user = store.create_user(new_user(&app.id, "u@x.com")).await.unwrap();
        store.delete_admin(&admin.id).await.unwrap();
        assert!(store.get_application(&app.id).await.unwrap().is_none());
        assert!(store.get_user(&app.id, &user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn users_are_addressed_within_their_application() {
        let (store, admin, app) = seeded().await;
        let other = store
            .create_application(NewApplication {
                name: "other".into(),
                description: String::new(),
                admin_id: admin.id.clone(),
            })
            .await
            .unwrap();
        let user = store.create_user(new_user(&app.id, "u@x.com")).await.unwrap();

        assert!(store.get_user(&other.id, &user.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_user(&other.id, &user.id).await,
            Err(StoreError::NotFound(_))
        ));
        let patched = store
            .update_user(
                &app.id,
                &user.id,
                UserPatch {
                    first_name: Some("New".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.first_name, "New");
        assert_eq!(patched.last_name, "User");
    }
}
