use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    job_not_found, parse_status, resolve_job_options, shop_not_found, Store, StoreBackend,
    StoreError,
};
use crate::db::migrations::run_migrations;
use crate::db::pool::{create_pool, health_check, DatabaseConfig};
use crate::models::{CreatePrintJob, CreateShop, CreateUser, PrintJob, Shop, User};

/// Durable store backed by PostgreSQL
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing pool; the schema must already be migrated
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects, applies pending migrations and returns the store
    pub async fn connect(config: DatabaseConfig) -> Result<Self, StoreError> {
        let pool = create_pool(config).await?;
        run_migrations(&pool)
            .await
            .map_err(|e| StoreError::Database(sqlx::Error::Migrate(Box::new(e))))?;

        info!("Postgres store ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PostgresStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Postgres
    }

    async fn ping(&self) -> Result<(), StoreError> {
        health_check(&self.pool).await?;
        Ok(())
    }

    async fn create_shop(&self, data: CreateShop) -> Result<Shop, StoreError> {
        Ok(Shop::create(&self.pool, data).await?)
    }

    async fn find_shop(&self, shop_id: &str) -> Result<Option<Shop>, StoreError> {
        Ok(Shop::find_by_shop_id(&self.pool, shop_id).await?)
    }

    async fn upsert_shop(&self, shop_id: &str, name: Option<String>) -> Result<Shop, StoreError> {
        Ok(Shop::upsert(&self.pool, shop_id, name).await?)
    }

    async fn delete_shop(&self, shop_id: &str) -> Result<bool, StoreError> {
        Ok(Shop::delete(&self.pool, shop_id).await?)
    }

    async fn register_owner(
        &self,
        user: CreateUser,
        shop: CreateShop,
    ) -> Result<(User, Shop), StoreError> {
        let mut tx = self.pool.begin().await?;

        let shop = Shop::create(&mut *tx, shop).await?;
        let user = User::create(&mut *tx, user).await?;

        tx.commit().await?;
        debug!(user_id = %user.id, shop_id = %shop.shop_id, "Registered shop owner");

        Ok((user, shop))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn create_job(&self, data: CreatePrintJob) -> Result<PrintJob, StoreError> {
        let (copies, print_type) = resolve_job_options(&data)?;
        Ok(PrintJob::create(&self.pool, data, copies, print_type).await?)
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<PrintJob>, StoreError> {
        Ok(PrintJob::find_by_id(&self.pool, id).await?)
    }

    async fn list_jobs_by_shop(&self, shop_id: &str) -> Result<Vec<PrintJob>, StoreError> {
        let shop = Shop::find_by_shop_id(&self.pool, shop_id)
            .await?
            .ok_or_else(shop_not_found)?;

        Ok(PrintJob::list_by_shop(&self.pool, shop.id).await?)
    }

    async fn set_job_status(&self, id: Uuid, status: &str) -> Result<PrintJob, StoreError> {
        let status = parse_status(status)?;

        PrintJob::set_status(&self.pool, id, status)
            .await?
            .ok_or_else(job_not_found)
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(PrintJob::delete(&self.pool, id).await?)
    }
}
