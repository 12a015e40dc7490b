use crate::domain::{models::business::{Business, Service}, ports::BusinessRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresBusinessRepo {
    pool: PgPool,
}

impl PostgresBusinessRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn with_services(&self, business: Option<Business>) -> Result<Option<Business>, AppError> {
        let Some(mut business) = business else {
            return Ok(None);
        };
        business.services = sqlx::query_as::<_, Service>(
            "SELECT * FROM services WHERE business_id = $1 ORDER BY name ASC",
        )
            .bind(&business.id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(Some(business))
    }
}

#[async_trait]
impl BusinessRepository for PostgresBusinessRepo {
    async fn create(&self, business: &Business) -> Result<Business, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let mut created = sqlx::query_as::<_, Business>(
            "INSERT INTO businesses (id, messaging_address, name, address, phone, email, description, timezone, open_hour, close_hour, calendar_id, booking_enabled, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING *"
        )
            .bind(&business.id).bind(&business.messaging_address).bind(&business.name).bind(&business.address)
            .bind(&business.phone).bind(&business.email).bind(&business.description).bind(&business.timezone)
            .bind(business.open_hour).bind(business.close_hour).bind(&business.calendar_id)
            .bind(business.booking_enabled).bind(business.created_at)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;

        for service in &business.services {
            let saved = sqlx::query_as::<_, Service>(
                "INSERT INTO services (id, business_id, name, duration_minutes, created_at) VALUES ($1, $2, $3, $4, $5) RETURNING *"
            )
                .bind(&service.id).bind(&created.id).bind(&service.name)
                .bind(service.duration_minutes).bind(service.created_at)
                .fetch_one(&mut *tx).await.map_err(AppError::Database)?;
            created.services.push(saved);
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Business>, AppError> {
        let business = sqlx::query_as::<_, Business>("SELECT * FROM businesses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        self.with_services(business).await
    }

    async fn find_by_messaging_address(&self, address: &str) -> Result<Option<Business>, AppError> {
        let business = sqlx::query_as::<_, Business>("SELECT * FROM businesses WHERE messaging_address = $1")
            .bind(address)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        self.with_services(business).await
    }
}
