use crate::domain::{models::{booking::Booking, slot::Buffers}, ports::BookingRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use chrono::{DateTime, Utc};

pub struct SqliteBookingRepo {
    pool: SqlitePool,
}

impl SqliteBookingRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Confirms a pending row inside `tx`. The write comes first so SQLite takes
    /// the write lock before the overlap check reads.
    ///
    /// Holds of other customers block the slot only when created earlier, so two
    /// racing commits never reject each other.
    async fn confirm_in(tx: &mut Transaction<'_, Sqlite>, id: &str, calendar_ref: &str, buffers: Buffers, now: DateTime<Utc>) -> Result<Booking, AppError> {
        let confirmed = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = 'confirmed', external_calendar_ref = ?, confirmed_at = ?, expires_at = NULL
             WHERE id = ? AND status = 'pending'
             RETURNING *"
        )
            .bind(calendar_ref).bind(now).bind(id)
            .fetch_optional(&mut **tx).await.map_err(AppError::Database)?
            .ok_or_else(|| AppError::Conflict(format!("Booking {} is no longer pending", id)))?;

        let overlapping = sqlx::query(
            "SELECT COUNT(*) as count FROM bookings
             WHERE business_id = ? AND id != ? AND start_at < ? AND end_at > ?
               AND (status = 'confirmed'
                    OR (status = 'pending' AND customer_id != ? AND expires_at > ?
                        AND (created_at < ? OR (created_at = ? AND id < ?))))"
        )
            .bind(&confirmed.business_id).bind(&confirmed.id)
            .bind(confirmed.end_at + buffers.before).bind(confirmed.start_at - buffers.after)
            .bind(&confirmed.customer_id).bind(now)
            .bind(confirmed.created_at).bind(confirmed.created_at).bind(&confirmed.id)
            .fetch_one(&mut **tx).await.map_err(AppError::Database)?
            .get::<i64, _>("count");

        if overlapping > 0 {
            return Err(AppError::SlotUnavailable(format!(
                "{} {} was taken concurrently", confirmed.date, confirmed.time.format("%H:%M")
            )));
        }
        Ok(confirmed)
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepo {
    async fn create(&self, booking: &Booking) -> Result<Booking, AppError> {
        sqlx::query_as::<_, Booking>(
            "INSERT INTO bookings (id, customer_id, customer_name, business_id, service_id, service_name, booking_date, booking_time, duration_minutes, start_at, end_at, status, external_calendar_ref, created_at, confirmed_at, cancelled_at, expires_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&booking.id).bind(&booking.customer_id).bind(&booking.customer_name).bind(&booking.business_id)
            .bind(&booking.service_id).bind(&booking.service_name).bind(booking.date).bind(booking.time)
            .bind(booking.duration_minutes).bind(booking.start_at).bind(booking.end_at).bind(booking.status.as_str())
            .bind(&booking.external_calendar_ref).bind(booking.created_at).bind(booking.confirmed_at)
            .bind(booking.cancelled_at).bind(booking.expires_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?").bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
    async fn list_for_customer(&self, business_id: &str, customer_id: &str) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE business_id = ? AND customer_id = ? ORDER BY created_at DESC").bind(business_id).bind(customer_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
    async fn list_confirmed_for_customer(&self, business_id: &str, customer_id: &str) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE business_id = ? AND customer_id = ? AND status = 'confirmed' ORDER BY confirmed_at DESC, created_at DESC").bind(business_id).bind(customer_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
    async fn find_latest_pending(&self, business_id: &str, customer_id: &str, now: DateTime<Utc>) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE business_id = ? AND customer_id = ? AND status = 'pending' AND (expires_at IS NULL OR expires_at > ?) ORDER BY created_at DESC LIMIT 1"
        ).bind(business_id).bind(customer_id).bind(now).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
    async fn list_active_in_range(&self, business_id: &str, start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE business_id = ? AND start_at < ? AND end_at > ?
             AND (status = 'confirmed' OR (status = 'pending' AND expires_at > ?)) ORDER BY start_at ASC"
        ).bind(business_id).bind(end).bind(start).bind(now).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
    async fn supersede_confirmed(&self, business_id: &str, customer_id: &str, now: DateTime<Utc>) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = 'superseded', cancelled_at = ? WHERE business_id = ? AND customer_id = ? AND status = 'confirmed' RETURNING *"
        ).bind(now).bind(business_id).bind(customer_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
    async fn supersede(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("UPDATE bookings SET status = 'superseded', cancelled_at = ? WHERE id = ? AND status = 'confirmed' RETURNING *").bind(now).bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
    async fn confirm(&self, id: &str, calendar_ref: &str, buffers: Buffers, now: DateTime<Utc>) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let confirmed = Self::confirm_in(&mut tx, id, calendar_ref, buffers, now).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(confirmed)
    }
    async fn replace_confirmed(&self, old_id: &str, new_id: &str, calendar_ref: &str, buffers: Buffers, now: DateTime<Utc>) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let result = sqlx::query("UPDATE bookings SET status = 'superseded', cancelled_at = ? WHERE id = ? AND status = 'confirmed'").bind(now).bind(old_id).execute(&mut *tx).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 { return Err(AppError::Conflict(format!("Booking {} is no longer confirmed", old_id))); }
        let confirmed = Self::confirm_in(&mut tx, new_id, calendar_ref, buffers, now).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(confirmed)
    }
    async fn cancel(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("UPDATE bookings SET status = 'cancelled', cancelled_at = ?, expires_at = NULL WHERE id = ? AND status IN ('pending', 'confirmed') RETURNING *").bind(now).bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
    async fn release_calendar_ref(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE bookings SET external_calendar_ref = NULL WHERE id = ? AND status IN ('cancelled', 'superseded')").bind(id).execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }
    async fn expire_pending(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE bookings SET status = 'cancelled', cancelled_at = ? WHERE status = 'pending' AND expires_at < ?").bind(now).bind(now).execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }
    async fn list_stale_calendar_refs(&self, limit: i64) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE status IN ('cancelled', 'superseded') AND external_calendar_ref IS NOT NULL ORDER BY cancelled_at ASC LIMIT ?"
        ).bind(limit).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}
