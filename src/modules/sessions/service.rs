use chrono::{NaiveDate, NaiveTime};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, instrument, warn};
use trainhub_cache::{RedisCache, hash_filters, invalidate, keys};
use trainhub_core::{AppError, PaginationMeta};
use trainhub_models::formations::FormationSummary;
use trainhub_models::organizations::DEFAULT_CURRENCY;
use trainhub_models::{FormationId, OrganizationId, ProgramId, SessionId, UserId};
use uuid::Uuid;

use crate::utils::auth_helpers::ensure_in_scope;

use super::model::{
    CreateSessionDto, DEFAULT_TIMEZONE, PaginatedSessionsResponse, Session, SessionCapacity,
    SessionDetail, SessionFilterParams, SessionStatus, SessionWithStats, UpdateSessionDto,
};

/// Date and time ordering shared by create and update.
pub fn validate_schedule(
    start_date: NaiveDate,
    end_date: NaiveDate,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
) -> Result<(), AppError> {
    if end_date < start_date {
        return Err(AppError::bad_request(anyhow::anyhow!(
            "End date must be on or after start date"
        )));
    }

    if let (Some(start), Some(end)) = (start_time, end_time)
        && end <= start
    {
        return Err(AppError::bad_request(anyhow::anyhow!(
            "End time must be after start time"
        )));
    }

    Ok(())
}

pub struct SessionService;

impl SessionService {
    /// Loads a session, hiding sessions outside `scope`.
    pub async fn load_session(
        db: &PgPool,
        id: SessionId,
        scope: Option<OrganizationId>,
    ) -> Result<Session, AppError> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(id.into_inner())
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Session not found")))?;

        ensure_in_scope(scope, session.organization_id, "Session")?;

        Ok(session)
    }

    /// Enrollments currently holding a seat.
    pub async fn active_enrollment_count(
        conn: &mut PgConnection,
        session_id: SessionId,
    ) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM enrollments
            WHERE session_id = $1 AND status IN ('confirmed', 'pending')
            "#,
        )
        .bind(session_id.into_inner())
        .fetch_one(conn)
        .await?;
        Ok(count)
    }

    async fn ensure_formation(
        db: &PgPool,
        organization_id: OrganizationId,
        formation_id: FormationId,
    ) -> Result<(), AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM formations WHERE id = $1 AND organization_id = $2)",
        )
        .bind(formation_id.into_inner())
        .bind(organization_id.into_inner())
        .fetch_one(db)
        .await?;

        if !exists {
            return Err(AppError::not_found(anyhow::anyhow!("Formation not found")));
        }
        Ok(())
    }

    /// Trainer and managers must be staff of the session's organization.
    pub(crate) async fn ensure_staff(
        db: &PgPool,
        organization_id: OrganizationId,
        staff: &[Option<UserId>],
    ) -> Result<(), AppError> {
        let ids: Vec<Uuid> = staff.iter().flatten().map(|id| id.into_inner()).collect();
        if ids.is_empty() {
            return Ok(());
        }

        let found = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE id = ANY($1) AND organization_id = $2",
        )
        .bind(&ids)
        .bind(organization_id.into_inner())
        .fetch_one(db)
        .await?;

        let mut distinct = ids.clone();
        distinct.sort();
        distinct.dedup();

        if found != distinct.len() as i64 {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Trainer and managers must belong to the session's organization"
            )));
        }
        Ok(())
    }

    async fn replace_programs(
        conn: &mut PgConnection,
        organization_id: OrganizationId,
        session_id: SessionId,
        program_ids: &[ProgramId],
    ) -> Result<(), AppError> {
        let ids: Vec<Uuid> = program_ids.iter().map(|id| id.into_inner()).collect();

        let found = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM programs WHERE id = ANY($1) AND organization_id = $2",
        )
        .bind(&ids)
        .bind(organization_id.into_inner())
        .fetch_one(&mut *conn)
        .await?;

        let mut distinct = ids.clone();
        distinct.sort();
        distinct.dedup();

        if found != distinct.len() as i64 {
            return Err(AppError::not_found(anyhow::anyhow!("Program not found")));
        }

        sqlx::query("DELETE FROM session_programs WHERE session_id = $1")
            .bind(session_id.into_inner())
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO session_programs (session_id, program_id)
            SELECT $1, UNNEST($2::uuid[])
            "#,
        )
        .bind(session_id.into_inner())
        .bind(&distinct)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    #[instrument(skip(db, cache, dto), fields(session.name = %dto.name, db.operation = "INSERT", db.table = "sessions"))]
    pub async fn create_session(
        db: &PgPool,
        cache: Option<&RedisCache>,
        organization_id: OrganizationId,
        dto: CreateSessionDto,
    ) -> Result<SessionDetail, AppError> {
        validate_schedule(dto.start_date, dto.end_date, dto.start_time, dto.end_time)?;
        Self::ensure_formation(db, organization_id, dto.formation_id).await?;
        Self::ensure_staff(
            db,
            organization_id,
            &[dto.teacher_id, dto.manager1_id, dto.manager2_id],
        )
        .await?;

        let mut tx = db.begin().await?;

        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions
                (organization_id, formation_id, name, code, start_date, end_date, start_time,
                 end_time, location, capacity_max, teacher_id, manager1_id, manager2_id,
                 inter_entreprise, sous_traitance, timezone, price, currency, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING *
            "#,
        )
        .bind(organization_id.into_inner())
        .bind(dto.formation_id.into_inner())
        .bind(dto.name.trim())
        .bind(dto.code)
        .bind(dto.start_date)
        .bind(dto.end_date)
        .bind(dto.start_time)
        .bind(dto.end_time)
        .bind(dto.location)
        .bind(dto.capacity_max)
        .bind(dto.teacher_id.map(|id| id.into_inner()))
        .bind(dto.manager1_id.map(|id| id.into_inner()))
        .bind(dto.manager2_id.map(|id| id.into_inner()))
        .bind(dto.inter_entreprise.unwrap_or(true))
        .bind(dto.sous_traitance.unwrap_or(false))
        .bind(dto.timezone.unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()))
        .bind(dto.price)
        .bind(
            dto.currency
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        )
        .bind(dto.status.unwrap_or_default())
        .fetch_one(&mut *tx)
        .await?;

        if !dto.program_ids.is_empty() {
            Self::replace_programs(&mut tx, organization_id, session.id, &dto.program_ids).await?;
        }

        tx.commit().await?;

        invalidate::session(cache, organization_id.into_inner(), None).await;
        info!(session.id = %session.id, "Session created");

        Self::get_session(db, None, session.id, None).await
    }

    #[instrument(skip(db, cache), fields(db.operation = "SELECT", db.table = "sessions"))]
    pub async fn get_sessions(
        db: &PgPool,
        cache: Option<&RedisCache>,
        organization_id: OrganizationId,
        filters: SessionFilterParams,
    ) -> Result<PaginatedSessionsResponse, AppError> {
        let cache_key = keys::sessions::list(organization_id.into_inner(), &hash_filters(&filters));

        if let Some(cache) = cache
            && let Some(page) = cache.get::<PaginatedSessionsResponse>(&cache_key).await
        {
            debug!("Session list found in cache");
            return Ok(page);
        }

        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();
        let search = filters.search.as_ref().map(|s| format!("%{}%", s));

        let sessions = sqlx::query_as::<_, SessionWithStats>(
            r#"
            SELECT
                s.*,
                f.name AS formation_name,
                COUNT(e.id) FILTER (WHERE e.status IN ('confirmed', 'pending')) AS enrolled_count,
                CASE WHEN s.capacity_max IS NULL THEN NULL
                     ELSE GREATEST(
                        s.capacity_max - COUNT(e.id) FILTER (WHERE e.status IN ('confirmed', 'pending')),
                        0
                     )
                END::bigint AS available_spots
            FROM sessions s
            INNER JOIN formations f ON f.id = s.formation_id
            LEFT JOIN enrollments e ON e.session_id = s.id
            WHERE s.organization_id = $1
              AND ($2::session_status IS NULL OR s.status = $2)
              AND ($3::uuid IS NULL OR s.formation_id = $3)
              AND ($4::date IS NULL OR s.end_date >= $4)
              AND ($5::date IS NULL OR s.start_date <= $5)
              AND ($6::text IS NULL OR s.name ILIKE $6 OR s.code ILIKE $6 OR s.location ILIKE $6)
            GROUP BY s.id, f.name
            ORDER BY s.start_date DESC, s.name
            LIMIT $7 OFFSET $8
            "#,
        )
        .bind(organization_id.into_inner())
        .bind(filters.status)
        .bind(filters.formation_id)
        .bind(filters.from)
        .bind(filters.to)
        .bind(&search)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM sessions s
            WHERE s.organization_id = $1
              AND ($2::session_status IS NULL OR s.status = $2)
              AND ($3::uuid IS NULL OR s.formation_id = $3)
              AND ($4::date IS NULL OR s.end_date >= $4)
              AND ($5::date IS NULL OR s.start_date <= $5)
              AND ($6::text IS NULL OR s.name ILIKE $6 OR s.code ILIKE $6 OR s.location ILIKE $6)
            "#,
        )
        .bind(organization_id.into_inner())
        .bind(filters.status)
        .bind(filters.formation_id)
        .bind(filters.from)
        .bind(filters.to)
        .bind(&search)
        .fetch_one(db)
        .await?;

        let page = PaginatedSessionsResponse {
            data: sessions,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        };

        if let Some(cache) = cache
            && let Err(e) = cache.set(&cache_key, &page).await
        {
            warn!(error = %e, "Failed to cache session list");
        }

        Ok(page)
    }

    #[instrument(skip(db, cache), fields(session.id = %id, db.operation = "SELECT", db.table = "sessions"))]
    pub async fn get_session(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: SessionId,
        scope: Option<OrganizationId>,
    ) -> Result<SessionDetail, AppError> {
        let cache_key = keys::sessions::by_id(id.into_inner());

        if let Some(cache) = cache
            && let Some(detail) = cache.get::<SessionDetail>(&cache_key).await
        {
            debug!("Session found in cache");
            ensure_in_scope(scope, detail.session.organization_id, "Session")?;
            return Ok(detail);
        }

        let session = Self::load_session(db, id, scope).await?;

        let formation = sqlx::query_as::<_, FormationSummary>(
            "SELECT id, name, code, duration_hours, price FROM formations WHERE id = $1",
        )
        .bind(session.formation_id.into_inner())
        .fetch_one(db)
        .await?;

        let program_ids = sqlx::query_scalar::<_, ProgramId>(
            "SELECT program_id FROM session_programs WHERE session_id = $1 ORDER BY program_id",
        )
        .bind(id.into_inner())
        .fetch_all(db)
        .await?;

        let mut conn = db.acquire().await?;
        let enrolled_count = Self::active_enrollment_count(&mut conn, id).await?;

        let slot_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM session_slots WHERE session_id = $1")
                .bind(id.into_inner())
                .fetch_one(&mut *conn)
                .await?;

        let capacity = SessionCapacity::compute(session.capacity_max, enrolled_count);
        let detail = SessionDetail {
            session,
            formation,
            program_ids,
            enrolled_count,
            available_spots: capacity.available_spots,
            slot_count,
        };

        if let Some(cache) = cache
            && let Err(e) = cache.set(&cache_key, &detail).await
        {
            warn!(error = %e, "Failed to cache session");
        }

        Ok(detail)
    }

    #[instrument(skip(db, cache, dto), fields(session.id = %id, db.operation = "UPDATE", db.table = "sessions"))]
    pub async fn update_session(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: SessionId,
        scope: Option<OrganizationId>,
        dto: UpdateSessionDto,
    ) -> Result<SessionDetail, AppError> {
        let existing = Self::load_session(db, id, scope).await?;
        let organization_id = existing.organization_id;

        validate_schedule(
            dto.start_date.unwrap_or(existing.start_date),
            dto.end_date.unwrap_or(existing.end_date),
            dto.start_time.or(existing.start_time),
            dto.end_time.or(existing.end_time),
        )?;

        if let Some(formation_id) = dto.formation_id {
            Self::ensure_formation(db, organization_id, formation_id).await?;
        }
        Self::ensure_staff(
            db,
            organization_id,
            &[dto.teacher_id, dto.manager1_id, dto.manager2_id],
        )
        .await?;

        let mut tx = db.begin().await?;

        // Serializes against concurrent enrollments while the capacity is checked.
        sqlx::query("SELECT id FROM sessions WHERE id = $1 FOR UPDATE")
            .bind(id.into_inner())
            .execute(&mut *tx)
            .await?;

        if let Some(capacity_max) = dto.capacity_max {
            let active = Self::active_enrollment_count(&mut tx, id).await?;
            if i64::from(capacity_max) < active {
                return Err(AppError::bad_request(anyhow::anyhow!(
                    "Capacity cannot be lower than the {} active enrollments",
                    active
                )));
            }
        }

        sqlx::query(
            r#"
            UPDATE sessions SET
                name = COALESCE($2, name),
                code = COALESCE($3, code),
                formation_id = COALESCE($4, formation_id),
                start_date = COALESCE($5, start_date),
                end_date = COALESCE($6, end_date),
                start_time = COALESCE($7, start_time),
                end_time = COALESCE($8, end_time),
                location = COALESCE($9, location),
                capacity_max = COALESCE($10, capacity_max),
                teacher_id = COALESCE($11, teacher_id),
                manager1_id = COALESCE($12, manager1_id),
                manager2_id = COALESCE($13, manager2_id),
                inter_entreprise = COALESCE($14, inter_entreprise),
                sous_traitance = COALESCE($15, sous_traitance),
                timezone = COALESCE($16, timezone),
                price = COALESCE($17, price),
                currency = COALESCE($18, currency),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.into_inner())
        .bind(dto.name.map(|n| n.trim().to_string()))
        .bind(dto.code)
        .bind(dto.formation_id.map(|id| id.into_inner()))
        .bind(dto.start_date)
        .bind(dto.end_date)
        .bind(dto.start_time)
        .bind(dto.end_time)
        .bind(dto.location)
        .bind(dto.capacity_max)
        .bind(dto.teacher_id.map(|id| id.into_inner()))
        .bind(dto.manager1_id.map(|id| id.into_inner()))
        .bind(dto.manager2_id.map(|id| id.into_inner()))
        .bind(dto.inter_entreprise)
        .bind(dto.sous_traitance)
        .bind(dto.timezone)
        .bind(dto.price)
        .bind(dto.currency.map(|c| c.to_uppercase()))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        invalidate::session(cache, organization_id.into_inner(), Some(id.into_inner())).await;

        Self::get_session(db, None, id, None).await
    }

    #[instrument(skip(db, cache), fields(session.id = %id))]
    pub async fn update_status(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: SessionId,
        scope: Option<OrganizationId>,
        status: SessionStatus,
    ) -> Result<Session, AppError> {
        let existing = Self::load_session(db, id, scope).await?;

        let session = sqlx::query_as::<_, Session>(
            "UPDATE sessions SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id.into_inner())
        .bind(status)
        .fetch_one(db)
        .await?;

        invalidate::session(
            cache,
            session.organization_id.into_inner(),
            Some(id.into_inner()),
        )
        .await;
        info!(from = %existing.status, to = %status, "Session status changed");

        Ok(session)
    }

    #[instrument(skip(db, cache, program_ids), fields(session.id = %id, programs = program_ids.len()))]
    pub async fn set_programs(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: SessionId,
        scope: Option<OrganizationId>,
        program_ids: Vec<ProgramId>,
    ) -> Result<SessionDetail, AppError> {
        let session = Self::load_session(db, id, scope).await?;

        let mut tx = db.begin().await?;
        Self::replace_programs(&mut tx, session.organization_id, id, &program_ids).await?;
        tx.commit().await?;

        invalidate::session(
            cache,
            session.organization_id.into_inner(),
            Some(id.into_inner()),
        )
        .await;

        Self::get_session(db, None, id, None).await
    }

    /// Deletes a session with its slots and enrollments. Sessions with
    /// recorded payments or issued invoices are kept.
    #[instrument(skip(db, cache), fields(session.id = %id, db.operation = "DELETE", db.table = "sessions"))]
    pub async fn delete_session(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: SessionId,
        scope: Option<OrganizationId>,
    ) -> Result<(), AppError> {
        let session = Self::load_session(db, id, scope).await?;

        let has_financial_records = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM payments p
                INNER JOIN enrollments e ON e.id = p.enrollment_id
                WHERE e.session_id = $1
            ) OR EXISTS(
                SELECT 1 FROM invoices i
                INNER JOIN enrollments e ON e.id = i.enrollment_id
                WHERE e.session_id = $1
            )
            "#,
        )
        .bind(id.into_inner())
        .fetch_one(db)
        .await?;

        if has_financial_records {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Cannot delete a session with recorded payments"
            )));
        }

        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id.into_inner())
            .execute(db)
            .await?;

        invalidate::session(
            cache,
            session.organization_id.into_inner(),
            Some(id.into_inner()),
        )
        .await;
        info!("Session deleted");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_end_date_before_start_date_is_rejected() {
        let err = validate_schedule(date(2025, 3, 14), date(2025, 3, 10), None, None).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.error.to_string(), "End date must be on or after start date");
    }

    #[test]
    fn test_single_day_session_is_valid() {
        assert!(validate_schedule(date(2025, 3, 10), date(2025, 3, 10), None, None).is_ok());
    }

    #[test]
    fn test_times_must_be_ordered_when_both_set() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0);
        let five = NaiveTime::from_hms_opt(17, 0, 0);
        let d = date(2025, 3, 10);

        assert!(validate_schedule(d, d, nine, five).is_ok());
        assert!(validate_schedule(d, d, five, nine).is_err());
        assert!(validate_schedule(d, d, nine, nine).is_err());
        assert!(validate_schedule(d, d, five, None).is_ok());
    }
}
