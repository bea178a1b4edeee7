/// Shop model and database operations
///
/// A shop is a print-service location. Students reach it through a short,
/// shareable identifier (`shop-1a2b3c`) that is encoded into the shop's QR
/// code; the surrogate `id` is what print jobs reference.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE shops (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     shop_id VARCHAR(64) NOT NULL UNIQUE,
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(255),
///     phone VARCHAR(64),
///     address TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use snap2print_shared::models::shop::{generate_shop_id, CreateShop, Shop};
/// use snap2print_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let shop = Shop::create(&pool, CreateShop::named(generate_shop_id(), "Acme Prints")).await?;
/// let found = Shop::find_by_shop_id(&pool, &shop.shop_id).await?;
/// assert!(found.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

/// Prefix of every generated shop identifier
pub const SHOP_ID_PREFIX: &str = "shop-";

/// Print shop record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    /// Surrogate key referenced by print jobs
    pub id: Uuid,

    /// Shareable identifier, unique and immutable
    pub shop_id: String,

    /// Display name
    pub name: String,

    /// Owner contact details (set when the shop is created through registration)
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a shop
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateShop {
    pub shop_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl CreateShop {
    /// Shop with a name and no contact details
    pub fn named(shop_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            shop_id: shop_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Generates a fresh `shop-xxxxxx` identifier from 3 random bytes
pub fn generate_shop_id() -> String {
    let mut bytes = [0u8; 3];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}{}", SHOP_ID_PREFIX, hex::encode(bytes))
}

const SHOP_COLUMNS: &str = "id, shop_id, name, email, phone, address, created_at, updated_at";

impl Shop {
    /// Inserts a new shop
    ///
    /// # Errors
    ///
    /// Fails with a unique violation when `shop_id` is already taken.
    pub async fn create<'e, E>(executor: E, data: CreateShop) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO shops (shop_id, name, email, phone, address) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {SHOP_COLUMNS}"
        );

        sqlx::query_as::<_, Shop>(&sql)
            .bind(data.shop_id)
            .bind(data.name)
            .bind(data.email)
            .bind(data.phone)
            .bind(data.address)
            .fetch_one(executor)
            .await
    }

    /// Finds a shop by its shareable identifier
    pub async fn find_by_shop_id<'e, E>(executor: E, shop_id: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {SHOP_COLUMNS} FROM shops WHERE shop_id = $1");

        sqlx::query_as::<_, Shop>(&sql)
            .bind(shop_id)
            .fetch_optional(executor)
            .await
    }

    /// Creates the shop if missing, otherwise updates its name
    ///
    /// A missing name falls back to the identifier on insert and leaves the
    /// stored name untouched on update.
    pub async fn upsert<'e, E>(
        executor: E,
        shop_id: &str,
        name: Option<String>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO shops (shop_id, name) VALUES ($1, COALESCE($2, $1)) \
             ON CONFLICT (shop_id) DO UPDATE \
             SET name = COALESCE($2, shops.name), updated_at = NOW() \
             RETURNING {SHOP_COLUMNS}"
        );

        sqlx::query_as::<_, Shop>(&sql)
            .bind(shop_id)
            .bind(name)
            .fetch_one(executor)
            .await
    }

    /// Deletes a shop; its print jobs and owner account go with it
    ///
    /// Returns true if a shop was deleted.
    pub async fn delete<'e, E>(executor: E, shop_id: &str) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM shops WHERE shop_id = $1")
            .bind(shop_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
