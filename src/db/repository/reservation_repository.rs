use chrono::{NaiveDate, NaiveDateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{
    BookedReservation, CopySeatingOutcome, Reservation, ReservationStatus, UpdateReservation,
};
use crate::error::{AppError, AppResult};
use crate::i18n;

const SELECT_RESERVATION: &str = r#"
    SELECT id, slot_id, stand_id, stand_code, client_id, client_name,
           status, source, notes, created_at, updated_at
    FROM schedule_reservations
"#;

/// Repository for per-stand reservation rows.
///
/// Implementation notes:
/// - Booking uses an atomic single-statement conditional UPDATE:
///   `UPDATE ... WHERE id = ? AND status = 'available' RETURNING ...`.
///   At most one concurrent caller observes the committed booking; the
///   others get no row back ("already taken").
/// - Capacity back-fill inserts placeholders with
///   `ON CONFLICT(slot_id, stand_id) DO NOTHING`, so it is idempotent and
///   safe against concurrent back-fills of the same slot.
pub struct ReservationRepository;

impl ReservationRepository {
    /// Back-fill one 'available' placeholder per active stand that has no
    /// reservation row for this slot yet. Returns the number of rows
    /// inserted; safe to call arbitrarily often.
    pub async fn ensure_slot_capacity(pool: &SqlitePool, slot_id: &str) -> AppResult<i64> {
        let missing: Vec<(i64, String)> = sqlx::query_as(
            r#"
            SELECT s.id, s.code
            FROM stands s
            WHERE s.is_active = 1
              AND NOT EXISTS (
                  SELECT 1 FROM schedule_reservations r
                  WHERE r.slot_id = ? AND r.stand_id = s.id
              )
            ORDER BY s.id
            "#,
        )
        .bind(slot_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        let mut inserted = 0i64;
        for (stand_id, stand_code) in missing {
            let id = Uuid::new_v4().to_string();
            let now = Utc::now().naive_utc();

            let result = sqlx::query(
                r#"
                INSERT INTO schedule_reservations (
                    id, slot_id, stand_id, stand_code, client_id, client_name,
                    status, source, notes, created_at, updated_at
                ) VALUES (?, ?, ?, ?, NULL, NULL, 'available', NULL, NULL, ?, ?)
                ON CONFLICT(slot_id, stand_id) WHERE stand_id IS NOT NULL DO NOTHING
                "#,
            )
            .bind(&id)
            .bind(slot_id)
            .bind(stand_id)
            .bind(&stand_code)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

            inserted += result.rows_affected() as i64;
        }

        Ok(inserted)
    }

    /// Run `ensure_slot_capacity` for every slot of a week. Returns the
    /// total number of placeholders inserted.
    pub async fn sync_week_capacity(pool: &SqlitePool, week_id: &str) -> AppResult<i64> {
        let slot_ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM schedule_slots WHERE week_id = ?")
                .bind(week_id)
                .fetch_all(pool)
                .await
                .map_err(AppError::Database)?;

        let mut inserted = 0i64;
        for slot_id in slot_ids {
            inserted += Self::ensure_slot_capacity(pool, &slot_id).await?;
        }

        Ok(inserted)
    }

    /// The sole booking primitive. Claims the reservation only if it is still
    /// 'available'; returns None when another caller won the race (or the
    /// row is in any non-available state).
    pub async fn book_available(
        pool: &SqlitePool,
        reservation_id: &str,
        client_id: i64,
        client_name: &str,
        source: Option<&str>,
        notes: Option<&str>,
    ) -> AppResult<Option<Reservation>> {
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE schedule_reservations
            SET client_id = ?, client_name = ?, status = 'booked',
                source = ?, notes = ?, updated_at = ?
            WHERE id = ? AND status = 'available'
            RETURNING id, slot_id, stand_id, stand_code, client_id, client_name,
                      status, source, notes, created_at, updated_at
            "#,
        )
        .bind(client_id)
        .bind(client_name)
        .bind(source)
        .bind(notes)
        .bind(now)
        .bind(reservation_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Reset a reservation to its 'available' placeholder. The row itself is
    /// kept so the historical stand mapping survives. Returns the updated
    /// row, or None when the reservation does not exist.
    pub async fn clear(pool: &SqlitePool, reservation_id: &str) -> AppResult<Option<Reservation>> {
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE schedule_reservations
            SET client_id = NULL, client_name = NULL, status = 'available',
                source = NULL, notes = NULL, updated_at = ?
            WHERE id = ?
            RETURNING id, slot_id, stand_id, stand_code, client_id, client_name,
                      status, source, notes, created_at, updated_at
            "#,
        )
        .bind(now)
        .bind(reservation_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Reset every reservation of a slot to the available placeholder, then
    /// re-synchronize capacity. Returns the number of rows cleared.
    pub async fn clear_for_slot(pool: &SqlitePool, slot_id: &str) -> AppResult<i64> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE schedule_reservations
            SET client_id = NULL, client_name = NULL, status = 'available',
                source = NULL, notes = NULL, updated_at = ?
            WHERE slot_id = ?
            "#,
        )
        .bind(now)
        .bind(slot_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Self::ensure_slot_capacity(pool, slot_id).await?;

        Ok(result.rows_affected() as i64)
    }

    /// Direct admin edit. Fields left as None keep their current values.
    /// Setting the status to 'available' always drops the client, keeping
    /// the "available has no client" invariant.
    pub async fn update(
        pool: &SqlitePool,
        reservation_id: &str,
        update: UpdateReservation,
    ) -> AppResult<Reservation> {
        let current = Self::find_by_id(pool, reservation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.reservation")))?;

        let status = update
            .status
            .map(|s| s.as_str().to_string())
            .unwrap_or(current.status);
        let (client_id, client_name) = if status == ReservationStatus::Available.as_str() {
            (None, None)
        } else {
            (
                update.client_id.or(current.client_id),
                update.client_name.or(current.client_name),
            )
        };
        let source = update.source.or(current.source);
        let notes = update.notes.or(current.notes);
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE schedule_reservations
            SET client_id = ?, client_name = ?, status = ?, source = ?, notes = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, slot_id, stand_id, stand_code, client_id, client_name,
                      status, source, notes, created_at, updated_at
            "#,
        )
        .bind(client_id)
        .bind(client_name)
        .bind(&status)
        .bind(source)
        .bind(notes)
        .bind(now)
        .bind(reservation_id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Remove a reservation row entirely (admin path for legacy rows).
    /// Returns false when the reservation does not exist.
    pub async fn delete(pool: &SqlitePool, reservation_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM schedule_reservations WHERE id = ?")
            .bind(reservation_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id(
        pool: &SqlitePool,
        reservation_id: &str,
    ) -> AppResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, Reservation>(&format!("{SELECT_RESERVATION} WHERE id = ?"))
            .bind(reservation_id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn list_for_slot(pool: &SqlitePool, slot_id: &str) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, Reservation>(&format!(
            "{SELECT_RESERVATION} WHERE slot_id = ? ORDER BY stand_id, stand_code"
        ))
        .bind(slot_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Booked reservations on a calendar date, joined with their slot's time
    /// window. Cancelled slots are excluded. This is the matcher's candidate
    /// query.
    pub async fn booked_on_date(
        pool: &SqlitePool,
        date: NaiveDate,
    ) -> AppResult<Vec<BookedReservation>> {
        let rows = sqlx::query_as::<_, BookedReservation>(
            r#"
            SELECT r.id AS reservation_id, r.slot_id, r.stand_id,
                   r.client_id, r.client_name,
                   s.slot_date, s.start_time, s.end_time
            FROM schedule_reservations r
            JOIN schedule_slots s ON s.id = r.slot_id
            WHERE r.status = 'booked' AND s.slot_date = ? AND s.is_cancelled = 0
            ORDER BY s.start_time, r.stand_id
            "#,
        )
        .bind(date)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Booked reservations whose slot starts within `[from, to]` (local
    /// time). Used by the auto-assignment loop.
    pub async fn booked_starting_within(
        pool: &SqlitePool,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> AppResult<Vec<BookedReservation>> {
        let rows = sqlx::query_as::<_, BookedReservation>(
            r#"
            SELECT r.id AS reservation_id, r.slot_id, r.stand_id,
                   r.client_id, r.client_name,
                   s.slot_date, s.start_time, s.end_time
            FROM schedule_reservations r
            JOIN schedule_slots s ON s.id = r.slot_id
            WHERE r.status = 'booked'
              AND s.is_cancelled = 0
              AND s.slot_date BETWEEN ? AND ?
            ORDER BY s.slot_date, s.start_time
            "#,
        )
        .bind(from.date())
        .bind(to.date())
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        // The date filter is coarse; narrow to the exact window here.
        Ok(rows
            .into_iter()
            .filter(|r| {
                let start = r.slot_date.and_time(r.start_time);
                start >= from && start <= to
            })
            .collect())
    }

    /// For every stand present in the target slot, copy the source slot's
    /// assignment for the same stand, or reset to available when the source
    /// has none. Reports stands assigned in the source but absent from the
    /// target.
    pub async fn copy_slot_seating(
        pool: &SqlitePool,
        source_slot_id: &str,
        target_slot_id: &str,
    ) -> AppResult<CopySeatingOutcome> {
        let source_rows = Self::list_for_slot(pool, source_slot_id).await?;
        let target_rows = Self::list_for_slot(pool, target_slot_id).await?;

        let mut updated = 0i64;
        let mut cleared = 0i64;

        for target in &target_rows {
            let Some(stand_id) = target.stand_id else {
                continue;
            };

            let source = source_rows
                .iter()
                .find(|r| r.stand_id == Some(stand_id) && r.client_id.is_some());

            match source {
                Some(src) => {
                    Self::update(
                        pool,
                        &target.id,
                        UpdateReservation {
                            client_id: src.client_id,
                            client_name: src.client_name.clone(),
                            status: ReservationStatus::from_str(&src.status),
                            source: src.source.clone(),
                            notes: src.notes.clone(),
                        },
                    )
                    .await?;
                    updated += 1;
                }
                None => {
                    if target.client_id.is_some() {
                        Self::clear(pool, &target.id).await?;
                        cleared += 1;
                    }
                }
            }
        }

        let target_stands: Vec<i64> = target_rows.iter().filter_map(|r| r.stand_id).collect();
        let missing_stands: Vec<i64> = source_rows
            .iter()
            .filter(|r| r.client_id.is_some())
            .filter_map(|r| r.stand_id)
            .filter(|stand_id| !target_stands.contains(stand_id))
            .collect();

        Ok(CopySeatingOutcome {
            updated,
            cleared,
            missing_stands,
        })
    }
}
