use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    job_not_found, parse_status, resolve_job_options, shop_not_found, Store, StoreBackend,
    StoreError,
};
use crate::models::user::normalize_email;
use crate::models::{CreatePrintJob, CreateShop, CreateUser, PrintJob, Shop, User};

/// Identifier of the shop seeded for local development
pub const DEMO_SHOP_ID: &str = "test-shop";
pub const DEMO_SHOP_NAME: &str = "Test Xerox Center";

/// In-memory store. Suitable for development and testing.
///
/// All collections live behind one lock, so every write (including owner
/// registration, which touches two collections) is atomic. Data is lost on
/// restart and is not shared between processes.
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    /// shop_id -> shop
    shops: HashMap<String, Shop>,
    /// user id -> user
    users: HashMap<Uuid, User>,
    /// job id -> (insertion sequence, job)
    jobs: HashMap<Uuid, (u64, PrintJob)>,
    next_seq: u64,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Creates a store holding the `test-shop` demo shop
    pub fn with_demo_shop() -> Self {
        let now = Utc::now();
        let shop = Shop {
            id: Uuid::new_v4(),
            shop_id: DEMO_SHOP_ID.to_string(),
            name: DEMO_SHOP_NAME.to_string(),
            email: None,
            phone: None,
            address: None,
            created_at: now,
            updated_at: now,
        };

        let mut inner = Inner::default();
        inner.shops.insert(shop.shop_id.clone(), shop);

        Self {
            inner: RwLock::new(inner),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn insert_shop(&mut self, data: CreateShop) -> Result<Shop, StoreError> {
        if self.shops.contains_key(&data.shop_id) {
            return Err(StoreError::Conflict("Shop ID already exists".to_string()));
        }

        let now = Utc::now();
        let shop = Shop {
            id: Uuid::new_v4(),
            shop_id: data.shop_id,
            name: data.name,
            email: data.email,
            phone: data.phone,
            address: data.address,
            created_at: now,
            updated_at: now,
        };
        self.shops.insert(shop.shop_id.clone(), shop.clone());
        Ok(shop)
    }

    fn find_user_by_email(&self, email: &str) -> Option<&User> {
        let email = normalize_email(email);
        self.users.values().find(|u| u.email == email)
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Memory
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_shop(&self, data: CreateShop) -> Result<Shop, StoreError> {
        self.inner.write().await.insert_shop(data)
    }

    async fn find_shop(&self, shop_id: &str) -> Result<Option<Shop>, StoreError> {
        Ok(self.inner.read().await.shops.get(shop_id).cloned())
    }

    async fn upsert_shop(&self, shop_id: &str, name: Option<String>) -> Result<Shop, StoreError> {
        let mut inner = self.inner.write().await;

        if let Some(shop) = inner.shops.get_mut(shop_id) {
            if let Some(name) = name {
                shop.name = name;
            }
            shop.updated_at = Utc::now();
            return Ok(shop.clone());
        }

        let name = name.unwrap_or_else(|| shop_id.to_string());
        inner.insert_shop(CreateShop::named(shop_id, name))
    }

    async fn delete_shop(&self, shop_id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;

        let Some(shop) = inner.shops.remove(shop_id) else {
            return Ok(false);
        };

        inner.jobs.retain(|_, (_, job)| job.shop_ref != shop.id);
        inner.users.retain(|_, user| user.shop_id != shop.shop_id);
        debug!(shop_id, "Deleted shop and its jobs");
        Ok(true)
    }

    async fn register_owner(
        &self,
        user: CreateUser,
        shop: CreateShop,
    ) -> Result<(User, Shop), StoreError> {
        let mut inner = self.inner.write().await;

        if inner.find_user_by_email(&user.email).is_some() {
            return Err(StoreError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        // Both checks pass before either insert, so a failure leaves nothing behind.
        let shop = inner.insert_shop(shop)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: normalize_email(&user.email),
            password_hash: user.password_hash,
            shop_name: user.shop_name,
            location: user.location,
            shop_id: user.shop_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());

        Ok((user, shop))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.find_user_by_email(email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn create_job(&self, data: CreatePrintJob) -> Result<PrintJob, StoreError> {
        let (copies, print_type) = resolve_job_options(&data)?;

        let mut inner = self.inner.write().await;

        let shop_id = inner
            .shops
            .values()
            .find(|s| s.id == data.shop_ref)
            .map(|s| s.shop_id.clone())
            .ok_or_else(|| StoreError::Validation("Referenced shop does not exist".to_string()))?;

        let now = Utc::now();
        let job = PrintJob {
            id: Uuid::new_v4(),
            shop_id,
            shop_ref: data.shop_ref,
            student_name: data.student_name,
            file_original_name: data.file_original_name,
            file_path: data.file_path,
            file_size_bytes: data.file_size_bytes,
            file_content_type: data
                .file_content_type
                .unwrap_or_else(|| crate::models::print_job::DEFAULT_CONTENT_TYPE.to_string()),
            copies,
            print_type,
            status: Default::default(),
            created_at: now,
            updated_at: now,
        };

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.jobs.insert(job.id, (seq, job.clone()));

        Ok(job)
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<PrintJob>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .jobs
            .get(&id)
            .map(|(_, job)| job.clone()))
    }

    async fn list_jobs_by_shop(&self, shop_id: &str) -> Result<Vec<PrintJob>, StoreError> {
        let inner = self.inner.read().await;

        let shop = inner.shops.get(shop_id).ok_or_else(shop_not_found)?;

        let mut matching: Vec<&(u64, PrintJob)> = inner
            .jobs
            .values()
            .filter(|(_, job)| job.shop_ref == shop.id)
            .collect();

        matching.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| seq_b.cmp(seq_a))
        });

        Ok(matching.into_iter().map(|(_, job)| job.clone()).collect())
    }

    async fn set_job_status(&self, id: Uuid, status: &str) -> Result<PrintJob, StoreError> {
        let status = parse_status(status)?;

        let mut inner = self.inner.write().await;
        let (_, job) = inner.jobs.get_mut(&id).ok_or_else(job_not_found)?;

        job.status = status;
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.jobs.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobStatus, PrintType};

    async fn store_with_shop() -> (MemoryStore, Shop) {
        let store = MemoryStore::new();
        let shop = store
            .create_shop(CreateShop::named("shop-abc123", "Acme Prints"))
            .await
            .unwrap();
        (store, shop)
    }

    fn new_job(shop: &Shop, name: &str) -> CreatePrintJob {
        CreatePrintJob {
            shop_ref: shop.id,
            student_name: "Asha".to_string(),
            file_original_name: name.to_string(),
            file_path: format!("/uploads/{name}"),
            file_size_bytes: 128,
            file_content_type: Some("application/pdf".to_string()),
            copies: None,
            print_type: None,
        }
    }

    #[tokio::test]
    async fn test_demo_shop_seeded() {
        let store = MemoryStore::with_demo_shop();
        let shop = store.find_shop(DEMO_SHOP_ID).await.unwrap().unwrap();
        assert_eq!(shop.name, DEMO_SHOP_NAME);
        assert!(MemoryStore::new().find_shop(DEMO_SHOP_ID).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_shop_duplicate_conflicts() {
        let (store, _) = store_with_shop().await;
        let err = store
            .create_shop(CreateShop::named("shop-abc123", "Other"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_upsert_shop() {
        let store = MemoryStore::new();

        let created = store.upsert_shop("corner", None).await.unwrap();
        assert_eq!(created.name, "corner");

        let renamed = store
            .upsert_shop("corner", Some("Corner Copies".to_string()))
            .await
            .unwrap();
        assert_eq!(renamed.id, created.id);
        assert_eq!(renamed.name, "Corner Copies");

        let unchanged = store.upsert_shop("corner", None).await.unwrap();
        assert_eq!(unchanged.name, "Corner Copies");
    }

    #[tokio::test]
    async fn test_create_job_defaults() {
        let (store, shop) = store_with_shop().await;
        let job = store.create_job(new_job(&shop, "a.pdf")).await.unwrap();

        assert_eq!(job.copies, 1);
        assert_eq!(job.print_type, PrintType::Bw);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.shop_id, "shop-abc123");
    }

    #[tokio::test]
    async fn test_create_job_unknown_shop_writes_nothing() {
        let (store, shop) = store_with_shop().await;
        let mut data = new_job(&shop, "a.pdf");
        data.shop_ref = Uuid::new_v4();

        let err = store.create_job(data).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.list_jobs_by_shop("shop-abc123").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_job_rejects_zero_copies() {
        let (store, shop) = store_with_shop().await;
        let mut data = new_job(&shop, "a.pdf");
        data.copies = Some(0);

        assert!(matches!(
            store.create_job(data).await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (store, shop) = store_with_shop().await;
        let first = store.create_job(new_job(&shop, "first.pdf")).await.unwrap();
        let second = store.create_job(new_job(&shop, "second.pdf")).await.unwrap();
        let third = store.create_job(new_job(&shop, "third.pdf")).await.unwrap();

        let ids: Vec<Uuid> = store
            .list_jobs_by_shop("shop-abc123")
            .await
            .unwrap()
            .iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
    }

    #[tokio::test]
    async fn test_list_unknown_shop_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.list_jobs_by_shop("nope").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_is_shop_scoped() {
        let (store, shop) = store_with_shop().await;
        let other = store
            .create_shop(CreateShop::named("shop-ffffff", "Other"))
            .await
            .unwrap();
        store.create_job(new_job(&shop, "mine.pdf")).await.unwrap();
        store.create_job(new_job(&other, "theirs.pdf")).await.unwrap();

        let jobs = store.list_jobs_by_shop("shop-abc123").await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].file_original_name, "mine.pdf");
    }

    #[tokio::test]
    async fn test_status_round_trip() {
        let (store, shop) = store_with_shop().await;
        let job = store.create_job(new_job(&shop, "a.pdf")).await.unwrap();

        let done = store.set_job_status(job.id, "completed").await.unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert!(done.updated_at >= job.updated_at);

        let back = store.set_job_status(job.id, "pending").await.unwrap();
        assert_eq!(back.status, JobStatus::Pending);
        assert_eq!(
            PrintJob {
                updated_at: job.updated_at,
                ..back
            },
            job
        );
    }

    #[tokio::test]
    async fn test_invalid_status_leaves_record_unchanged() {
        let (store, shop) = store_with_shop().await;
        let job = store.create_job(new_job(&shop, "a.pdf")).await.unwrap();

        let err = store.set_job_status(job.id, "bogus").await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(store.find_job(job.id).await.unwrap(), Some(job));
    }

    #[tokio::test]
    async fn test_set_status_unknown_job() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.set_job_status(Uuid::new_v4(), "completed").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_job() {
        let (store, shop) = store_with_shop().await;
        let job = store.create_job(new_job(&shop, "a.pdf")).await.unwrap();

        assert!(store.delete_job(job.id).await.unwrap());
        assert!(!store.delete_job(job.id).await.unwrap());
        assert!(!store.delete_job(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_shop_cascades() {
        let (store, shop) = store_with_shop().await;
        let job = store.create_job(new_job(&shop, "a.pdf")).await.unwrap();

        assert!(store.delete_shop("shop-abc123").await.unwrap());
        assert!(store.find_job(job.id).await.unwrap().is_none());
        assert!(!store.delete_shop("shop-abc123").await.unwrap());
    }

    #[tokio::test]
    async fn test_register_owner_atomic() {
        let store = MemoryStore::new();
        let user = CreateUser {
            email: "Owner@Acme.test".to_string(),
            password_hash: "hash".to_string(),
            shop_name: "Acme Prints".to_string(),
            location: "Main Street".to_string(),
            shop_id: "shop-000001".to_string(),
        };

        let (created, shop) = store
            .register_owner(user.clone(), CreateShop::named("shop-000001", "Acme Prints"))
            .await
            .unwrap();
        assert_eq!(created.email, "owner@acme.test");
        assert_eq!(shop.shop_id, created.shop_id);

        // Same email, fresh shop id: rejected, and the second shop is not created
        let dup = CreateUser {
            shop_id: "shop-000002".to_string(),
            ..user
        };
        let err = store
            .register_owner(dup, CreateShop::named("shop-000002", "Acme Again"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.find_shop("shop-000002").await.unwrap().is_none());

        let found = store.find_user_by_email("OWNER@acme.test").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(created.id));
    }
}
