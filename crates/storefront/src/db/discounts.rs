//! Discount code and discount settings repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use timberline_core::{DiscountCode, DiscountCodeId, DiscountKind, DiscountSettings};

use super::RepositoryError;

/// Repository for discount database operations.
pub struct DiscountRepository<'a> {
    pool: &'a PgPool,
}

#[derive(sqlx::FromRow)]
struct DiscountCodeRow {
    id: Uuid,
    code: String,
    kind: String,
    value: Decimal,
    max_uses: Option<i32>,
    current_uses: i32,
    active: bool,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct SettingsRow {
    percentage: Decimal,
    active: bool,
}

impl TryFrom<DiscountCodeRow> for DiscountCode {
    type Error = RepositoryError;

    fn try_from(row: DiscountCodeRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<DiscountKind>()
            .map_err(RepositoryError::DataCorruption)?;
        Ok(Self {
            id: DiscountCodeId::from_uuid(row.id),
            code: row.code,
            kind,
            value: row.value,
            max_uses: row.max_uses,
            current_uses: row.current_uses,
            active: row.active,
            expires_at: row.expires_at,
        })
    }
}

/// Fields for a new discount code.
#[derive(Debug, Clone)]
pub struct NewDiscountCode {
    pub code: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub max_uses: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

const CODE_COLUMNS: &str =
    "id, code, kind, value, max_uses, current_uses, active, expires_at";

impl<'a> DiscountRepository<'a> {
    /// Create a new discount repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find a discount code, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored kind is unknown.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>, RepositoryError> {
        let row: Option<DiscountCodeRow> = sqlx::query_as(&format!(
            "SELECT {CODE_COLUMNS} FROM discount_codes WHERE LOWER(code) = LOWER($1)"
        ))
        .bind(code.trim())
        .fetch_optional(self.pool)
        .await?;

        row.map(DiscountCode::try_from).transpose()
    }

    /// Find a discount code by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored kind is unknown.
    pub async fn find_by_id(
        &self,
        id: DiscountCodeId,
    ) -> Result<Option<DiscountCode>, RepositoryError> {
        let row: Option<DiscountCodeRow> = sqlx::query_as(&format!(
            "SELECT {CODE_COLUMNS} FROM discount_codes WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        row.map(DiscountCode::try_from).transpose()
    }

    /// All discount codes, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<DiscountCode>, RepositoryError> {
        sqlx::query_as::<_, DiscountCodeRow>(&format!(
            "SELECT {CODE_COLUMNS} FROM discount_codes ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(DiscountCode::try_from)
        .collect()
    }

    /// Create a discount code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code already exists (ignoring case).
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewDiscountCode) -> Result<DiscountCode, RepositoryError> {
        let row: DiscountCodeRow = sqlx::query_as(&format!(
            r"
            INSERT INTO discount_codes (code, kind, value, max_uses, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CODE_COLUMNS}
            "
        ))
        .bind(new.code.trim())
        .bind(new.kind.as_str())
        .bind(new.value)
        .bind(new.max_uses)
        .bind(new.expires_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(format!("discount code {} already exists", new.code));
            }
            RepositoryError::Database(e)
        })?;

        DiscountCode::try_from(row)
    }

    /// Deactivate a code so it can no longer be applied.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such code exists.
    pub async fn deactivate(&self, code: &str) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE discount_codes SET active = FALSE WHERE LOWER(code) = LOWER($1)")
                .bind(code.trim())
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Get the card-payment discount settings, if configured.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored percentage is out of range.
    pub async fn get_settings(&self) -> Result<Option<DiscountSettings>, RepositoryError> {
        let row: Option<SettingsRow> =
            sqlx::query_as("SELECT percentage, active FROM discount_settings WHERE id = 1")
                .fetch_optional(self.pool)
                .await?;

        row.map(|r| {
            DiscountSettings::new(r.percentage, r.active)
                .map_err(|e| RepositoryError::DataCorruption(e.to_string()))
        })
        .transpose()
    }

    /// Create or replace the card-payment discount settings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_settings(&self, settings: DiscountSettings) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO discount_settings (id, percentage, active)
            VALUES (1, $1, $2)
            ON CONFLICT (id) DO UPDATE
            SET percentage = EXCLUDED.percentage, active = EXCLUDED.active, updated_at = NOW()
            ",
        )
        .bind(settings.percentage)
        .bind(settings.active)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
