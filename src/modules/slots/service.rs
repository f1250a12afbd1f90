use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;
use tracing::{info, instrument};
use trainhub_cache::{RedisCache, invalidate};
use trainhub_core::AppError;
use trainhub_models::{OrganizationId, SessionId, SlotId};

use crate::metrics::track_slots_generated;
use crate::modules::sessions::model::Session;
use crate::modules::sessions::service::SessionService;
use crate::utils::auth_helpers::ensure_in_scope;

use super::generator::plan_slots;
use super::model::{
    CreateSlotDto, DeleteSlotsResponse, GenerateSlotsDto, GenerateSlotsResponse, SessionSlot,
    UpdateSlotDto,
};

fn map_slot_conflict(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::conflict(anyhow::anyhow!(
            "A slot already exists for this date and time slot"
        ));
    }
    AppError::from(e)
}

fn check_slot_fits(
    session: &Session,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<(), AppError> {
    if !session.contains_date(date) {
        return Err(AppError::bad_request(anyhow::anyhow!(
            "Slot date must be within the session dates"
        )));
    }
    if start_time >= end_time {
        return Err(AppError::bad_request(anyhow::anyhow!(
            "Slot start time must be before its end time"
        )));
    }
    Ok(())
}

pub struct SlotService;

impl SlotService {
    /// Loads a slot together with its session, hiding slots outside `scope`.
    pub async fn load_slot(
        db: &PgPool,
        id: SlotId,
        scope: Option<OrganizationId>,
    ) -> Result<(SessionSlot, Session), AppError> {
        let slot = sqlx::query_as::<_, SessionSlot>("SELECT * FROM session_slots WHERE id = $1")
            .bind(id.into_inner())
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Slot not found")))?;

        let session = SessionService::load_session(db, slot.session_id, None).await?;
        ensure_in_scope(scope, session.organization_id, "Slot")?;

        Ok((slot, session))
    }

    #[instrument(skip(db))]
    pub async fn get_session_slots(
        db: &PgPool,
        session_id: SessionId,
        scope: Option<OrganizationId>,
    ) -> Result<Vec<SessionSlot>, AppError> {
        SessionService::load_session(db, session_id, scope).await?;

        let slots = sqlx::query_as::<_, SessionSlot>(
            r#"
            SELECT * FROM session_slots
            WHERE session_id = $1
            ORDER BY date, start_time
            "#,
        )
        .bind(session_id.into_inner())
        .fetch_all(db)
        .await?;

        Ok(slots)
    }

    /// Expands the template over the requested range and inserts every slot
    /// that does not exist yet.
    #[instrument(skip(db, cache, dto), fields(session.id = %session_id, template = ?dto.time_slot_type))]
    pub async fn generate_slots(
        db: &PgPool,
        cache: Option<&RedisCache>,
        session_id: SessionId,
        scope: Option<OrganizationId>,
        dto: GenerateSlotsDto,
    ) -> Result<GenerateSlotsResponse, AppError> {
        let session = SessionService::load_session(db, session_id, scope).await?;

        let start = dto.start_date.unwrap_or(session.start_date);
        let end = dto.end_date.unwrap_or(session.end_date);

        if !session.contains_date(start) || !session.contains_date(end) {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Generation range must lie within the session dates"
            )));
        }

        let planned = plan_slots(&dto, start, end)?;
        SessionService::ensure_staff(db, session.organization_id, &[dto.teacher_id]).await?;

        let location = dto.location.clone().or_else(|| session.location.clone());
        let teacher_id = dto.teacher_id.or(session.teacher_id).map(|id| id.into_inner());
        let capacity_max = dto.capacity_max.or(session.capacity_max);

        let mut tx = db.begin().await?;

        if dto.replace_existing {
            let removed = sqlx::query("DELETE FROM session_slots WHERE session_id = $1")
                .bind(session_id.into_inner())
                .execute(&mut *tx)
                .await?;
            info!(removed = removed.rows_affected(), "Existing slots replaced");
        }

        let mut created = Vec::with_capacity(planned.len());
        for slot in &planned {
            let inserted = sqlx::query_as::<_, SessionSlot>(
                r#"
                INSERT INTO session_slots
                    (session_id, date, time_slot, start_time, end_time, location, teacher_id, capacity_max)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (session_id, date, time_slot) DO NOTHING
                RETURNING *
                "#,
            )
            .bind(session_id.into_inner())
            .bind(slot.date)
            .bind(slot.time_slot)
            .bind(slot.start_time)
            .bind(slot.end_time)
            .bind(&location)
            .bind(teacher_id)
            .bind(capacity_max)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(inserted) = inserted {
                created.push(inserted);
            }
        }

        tx.commit().await?;

        let skipped = planned.len() - created.len();
        track_slots_generated(created.len());
        invalidate::session(
            cache,
            session.organization_id.into_inner(),
            Some(session_id.into_inner()),
        )
        .await;
        info!(created = created.len(), skipped, "Slots generated");

        Ok(GenerateSlotsResponse {
            created: created.len(),
            skipped,
            slots: created,
        })
    }

    #[instrument(skip(db, cache, dto), fields(session.id = %session_id))]
    pub async fn create_slot(
        db: &PgPool,
        cache: Option<&RedisCache>,
        session_id: SessionId,
        scope: Option<OrganizationId>,
        dto: CreateSlotDto,
    ) -> Result<SessionSlot, AppError> {
        let session = SessionService::load_session(db, session_id, scope).await?;
        check_slot_fits(&session, dto.date, dto.start_time, dto.end_time)?;
        SessionService::ensure_staff(db, session.organization_id, &[dto.teacher_id]).await?;

        let slot = sqlx::query_as::<_, SessionSlot>(
            r#"
            INSERT INTO session_slots
                (session_id, date, time_slot, start_time, end_time, location, teacher_id, capacity_max)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(session_id.into_inner())
        .bind(dto.date)
        .bind(dto.time_slot)
        .bind(dto.start_time)
        .bind(dto.end_time)
        .bind(dto.location.or(session.location))
        .bind(dto.teacher_id.or(session.teacher_id).map(|id| id.into_inner()))
        .bind(dto.capacity_max.or(session.capacity_max))
        .fetch_one(db)
        .await
        .map_err(map_slot_conflict)?;

        invalidate::session(
            cache,
            session.organization_id.into_inner(),
            Some(session_id.into_inner()),
        )
        .await;

        Ok(slot)
    }

    #[instrument(skip(db, cache, dto), fields(slot.id = %id))]
    pub async fn update_slot(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: SlotId,
        scope: Option<OrganizationId>,
        dto: UpdateSlotDto,
    ) -> Result<SessionSlot, AppError> {
        let (existing, session) = Self::load_slot(db, id, scope).await?;

        check_slot_fits(
            &session,
            dto.date.unwrap_or(existing.date),
            dto.start_time.unwrap_or(existing.start_time),
            dto.end_time.unwrap_or(existing.end_time),
        )?;
        SessionService::ensure_staff(db, session.organization_id, &[dto.teacher_id]).await?;

        let slot = sqlx::query_as::<_, SessionSlot>(
            r#"
            UPDATE session_slots SET
                date = COALESCE($2, date),
                time_slot = COALESCE($3, time_slot),
                start_time = COALESCE($4, start_time),
                end_time = COALESCE($5, end_time),
                location = COALESCE($6, location),
                teacher_id = COALESCE($7, teacher_id),
                capacity_max = COALESCE($8, capacity_max),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id.into_inner())
        .bind(dto.date)
        .bind(dto.time_slot)
        .bind(dto.start_time)
        .bind(dto.end_time)
        .bind(dto.location)
        .bind(dto.teacher_id.map(|id| id.into_inner()))
        .bind(dto.capacity_max)
        .fetch_one(db)
        .await
        .map_err(map_slot_conflict)?;

        invalidate::session(
            cache,
            session.organization_id.into_inner(),
            Some(session.id.into_inner()),
        )
        .await;

        Ok(slot)
    }

    #[instrument(skip(db, cache), fields(slot.id = %id))]
    pub async fn delete_slot(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: SlotId,
        scope: Option<OrganizationId>,
    ) -> Result<(), AppError> {
        let (slot, session) = Self::load_slot(db, id, scope).await?;

        sqlx::query("DELETE FROM session_slots WHERE id = $1")
            .bind(slot.id.into_inner())
            .execute(db)
            .await?;

        invalidate::session(
            cache,
            session.organization_id.into_inner(),
            Some(session.id.into_inner()),
        )
        .await;

        Ok(())
    }

    #[instrument(skip(db, cache), fields(session.id = %session_id))]
    pub async fn delete_session_slots(
        db: &PgPool,
        cache: Option<&RedisCache>,
        session_id: SessionId,
        scope: Option<OrganizationId>,
    ) -> Result<DeleteSlotsResponse, AppError> {
        let session = SessionService::load_session(db, session_id, scope).await?;

        let result = sqlx::query("DELETE FROM session_slots WHERE session_id = $1")
            .bind(session_id.into_inner())
            .execute(db)
            .await?;

        invalidate::session(
            cache,
            session.organization_id.into_inner(),
            Some(session_id.into_inner()),
        )
        .await;
        info!(deleted = result.rows_affected(), "Session slots deleted");

        Ok(DeleteSlotsResponse {
            deleted: result.rows_affected(),
        })
    }
}
