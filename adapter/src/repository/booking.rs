use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveTime};
use derive_new::new;
use uuid::Uuid;

use kernel::model::{
    booking::{
        event::{ApproveBooking, BookingTransition, CancelBooking, CreateBooking, RejectBooking},
        schedule::{self, BookingHold, DayAvailability, Slot},
        status::SideEffect,
        Booking, BookingFilter, BookingStatus,
    },
    building::Building,
    id::{BookingId, BuildingId, PaymentId},
    list::{ListOptions, PaginatedList},
};
use kernel::repository::booking::BookingRepository;
use shared::error::{AppError, AppResult};

use crate::database::{
    model::{
        booking::{BookingRow, CompletedRow, HoldRow, PaginatedBookingRow},
        building::BuildingRow,
    },
    set_transaction_serializable, ConnectionPool,
};
use crate::repository::{insert_booking_event, status_strings};

#[derive(new)]
pub struct BookingRepositoryImpl {
    db: ConnectionPool,
}

// 予約・決済・返金を 1 スナップショットで読むための共通 SELECT。
// 一覧側はこれに COUNT(*) OVER() を足して総件数も同時に取る。
const SELECT_BOOKING: &str = r#"
    b.booking_id,
    b.building_id,
    b.borrower_id,
    b.activity_name,
    b.start_date,
    b.end_date,
    b.start_time,
    b.end_time,
    b.status,
    b.attachment_ref,
    b.created_at,
    b.updated_at,
    p.payment_id AS payment_id,
    p.amount AS payment_amount,
    p.status AS payment_status,
    p.external_ref AS payment_external_ref,
    p.created_at AS payment_created_at,
    p.updated_at AS payment_updated_at,
    r.refund_id AS refund_id,
    r.amount AS refund_amount,
    r.status AS refund_status,
    r.reason AS refund_reason,
    r.external_ref AS refund_external_ref,
    r.refund_date AS refund_date
FROM bookings AS b
LEFT JOIN payments AS p ON p.booking_id = b.booking_id
LEFT JOIN refunds AS r ON r.payment_id = p.payment_id
"#;

#[async_trait]
impl BookingRepository for BookingRepositoryImpl {
    // 予約申請を行う
    async fn submit(
        &self,
        event: CreateBooking,
        active_hold: &[BookingStatus],
    ) -> AppResult<BookingTransition> {
        let mut tx = self.db.begin().await?;

        // 衝突チェックと INSERT を分離できない古典的な check-then-act なので、
        // トランザクション分離レベルを SERIALIZABLE に設定する
        set_transaction_serializable(&mut tx).await?;

        // 事前のチェックとして、以下を調べる。
        // - 指定の建物 ID をもつ建物が存在するか
        // - 存在した場合、その期間・時間帯が既存の占有予約と重なっていないか
        let rental_price = {
            //
            // ① 建物の存在確認 ＋ 料金の取得
            //
            let building = sqlx::query_as::<_, (i64,)>(
                r#"
                SELECT rental_price
                FROM buildings
                WHERE building_id = $1
                "#,
            )
            .bind(event.building_id.raw())
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

            let Some((rental_price,)) = building else {
                return Err(AppError::EntityNotFound(format!(
                    "建物（{}）が見つかりませんでした。",
                    event.building_id
                )));
            };

            //
            // ② 希望スロットが占有予約と重なっていないか確認
            //    判定そのものは kernel の衝突判定に委譲する
            //
            let holds = fetch_holds(
                &mut tx,
                event.building_id.raw(),
                event.slot.start_date,
                event.slot.end_date,
                active_hold,
                None,
            )
            .await?;

            let conflicts = schedule::find_conflicts(&event.slot, &holds, active_hold);
            if !conflicts.is_empty() {
                let held = conflicts
                    .iter()
                    .map(|c| c.booking_id.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(AppError::SlotConflictError(format!(
                    "建物（{}）は指定時間帯にすでに予約が存在します（衝突: {held}）。",
                    event.building_id
                )));
            }

            rental_price
        };

        // 予約本体を PENDING で作成する
        let booking_id = BookingId::new();
        let res = sqlx::query(
            r#"
                INSERT INTO bookings
                (booking_id, building_id, borrower_id, activity_name,
                start_date, end_date, start_time, end_time, status, attachment_ref)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(booking_id.raw())
        .bind(event.building_id.raw())
        .bind(event.borrower_id.raw())
        .bind(&event.activity_name)
        .bind(event.slot.start_date)
        .bind(event.slot.end_date)
        .bind(event.slot.start_time)
        .bind(event.slot.end_time)
        .bind(BookingStatus::Pending.to_string())
        .bind(event.attachment_ref.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No booking record has been created".into(),
            ));
        }

        // 決済レコード（PENDING）を同一トランザクションで作成する。
        // 料金は 1 日あたりの利用料 × 日数。
        let amount = rental_price * event.slot.day_count();
        let res = sqlx::query(
            r#"
                INSERT INTO payments (payment_id, booking_id, amount, status)
                VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(PaymentId::new().raw())
        .bind(booking_id.raw())
        .bind(amount)
        .bind(kernel::model::payment::PaymentStatus::Pending.to_string())
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No payment record has been created".into(),
            ));
        }

        let side_effect = SideEffect::for_transition(None, BookingStatus::Pending);
        insert_booking_event(
            &mut tx,
            booking_id.raw(),
            None,
            BookingStatus::Pending,
            side_effect,
            None,
        )
        .await?;

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(BookingTransition {
            booking_id,
            borrower_id: event.borrower_id,
            from: None,
            to: BookingStatus::Pending,
            side_effect,
        })
    }

    async fn find_by_id(&self, booking_id: BookingId) -> AppResult<Booking> {
        let sql = format!("SELECT {SELECT_BOOKING} WHERE b.booking_id = $1");
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(booking_id.raw())
            .fetch_optional(self.db.inner_ref())
            .await
            .map_err(AppError::SpecificOperationError)?;

        match row {
            Some(row) => Booking::try_from(row),
            None => Err(AppError::EntityNotFound(format!(
                "予約（{booking_id}）が見つかりませんでした。"
            ))),
        }
    }

    async fn list(
        &self,
        filter: BookingFilter,
        options: ListOptions,
    ) -> AppResult<PaginatedList<Booking>> {
        // 未指定の条件は NULL を渡して素通しにする
        let sql = format!(
            r#"
            SELECT COUNT(*) OVER() AS total, {SELECT_BOOKING}
            WHERE ($1::uuid IS NULL OR b.building_id = $1)
              AND ($2::uuid IS NULL OR b.borrower_id = $2)
              AND ($3::varchar IS NULL OR b.status = $3)
              AND ($4::date IS NULL OR b.end_date >= $4)
              AND ($5::date IS NULL OR b.start_date <= $5)
            ORDER BY b.created_at DESC, b.booking_id ASC
            LIMIT $6 OFFSET $7
            "#
        );
        let rows = sqlx::query_as::<_, PaginatedBookingRow>(&sql)
            .bind(filter.building_id.map(|id| id.raw()))
            .bind(filter.borrower_id.map(|id| id.raw()))
            .bind(filter.status.map(|s| s.to_string()))
            .bind(filter.date_from)
            .bind(filter.date_to)
            .bind(options.limit)
            .bind(options.offset())
            .fetch_all(self.db.inner_ref())
            .await
            .map_err(AppError::SpecificOperationError)?;

        let total = rows.first().map(|r| r.total).unwrap_or(0);
        let items = rows
            .into_iter()
            .map(|r| Booking::try_from(r.row))
            .collect::<AppResult<Vec<Booking>>>()?;

        Ok(PaginatedList {
            total,
            page: options.page,
            limit: options.limit,
            items,
        })
    }

    // 管理者承認を行う
    async fn approve(
        &self,
        event: ApproveBooking,
        active_hold: &[BookingStatus],
    ) -> AppResult<BookingTransition> {
        let mut tx = self.db.begin().await?;

        // 最初の衝突チェックから承認までには時間が経っているため、
        // ここでも SERIALIZABLE で現在の占有状況に対して再チェックする
        set_transaction_serializable(&mut tx).await?;

        let current = fetch_hold_by_id(&mut tx, event.booking_id).await?;
        current
            .status
            .ensure_transition(BookingStatus::Approved)?;

        // 自分自身を除いた占有予約に対して再チェック。
        // 先に別の予約が APPROVED になっていれば、ここで衝突エラーになる。
        let holds = fetch_holds(
            &mut tx,
            current.building_id,
            current.hold.slot.start_date,
            current.hold.slot.end_date,
            active_hold,
            Some(event.booking_id.raw()),
        )
        .await?;

        if schedule::has_conflict(&current.hold.slot, &holds, active_hold) {
            return Err(AppError::SlotConflictError(format!(
                "予約（{}）のスロットは別の予約で確保済みのため承認できません。",
                event.booking_id
            )));
        }

        update_status(
            &mut tx,
            event.booking_id.raw(),
            current.status,
            BookingStatus::Approved,
        )
        .await?;

        let side_effect =
            SideEffect::for_transition(Some(current.status), BookingStatus::Approved);
        insert_booking_event(
            &mut tx,
            event.booking_id.raw(),
            Some(current.status),
            BookingStatus::Approved,
            side_effect,
            Some(&format!("approved_by={}", event.approved_by)),
        )
        .await?;

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(BookingTransition {
            booking_id: event.booking_id,
            borrower_id: current.hold.borrower_id,
            from: Some(current.status),
            to: BookingStatus::Approved,
            side_effect,
        })
    }

    // 管理者却下を行う（理由つき）
    async fn reject(&self, event: RejectBooking) -> AppResult<BookingTransition> {
        let mut tx = self.db.begin().await?;

        let current = fetch_hold_by_id(&mut tx, event.booking_id).await?;
        current
            .status
            .ensure_transition(BookingStatus::Rejected)?;

        update_status(
            &mut tx,
            event.booking_id.raw(),
            current.status,
            BookingStatus::Rejected,
        )
        .await?;

        let side_effect =
            SideEffect::for_transition(Some(current.status), BookingStatus::Rejected);
        insert_booking_event(
            &mut tx,
            event.booking_id.raw(),
            Some(current.status),
            BookingStatus::Rejected,
            side_effect,
            Some(&event.reason),
        )
        .await?;

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(BookingTransition {
            booking_id: event.booking_id,
            borrower_id: current.hold.borrower_id,
            from: Some(current.status),
            to: BookingStatus::Rejected,
            side_effect,
        })
    }

    // 取消を行う
    async fn cancel(&self, event: CancelBooking) -> AppResult<BookingTransition> {
        let mut tx = self.db.begin().await?;

        let current = fetch_hold_by_id(&mut tx, event.booking_id).await?;

        // 利用者本人は自分の予約しか取り消せない。
        // APPROVED の取消は管理者のオーバーライドのみ。
        if !event.is_admin {
            if current.hold.borrower_id != event.cancelled_by {
                return Err(AppError::ForbiddenOperation);
            }
            if current.status == BookingStatus::Approved {
                return Err(AppError::ForbiddenOperation);
            }
        }

        current
            .status
            .ensure_transition(BookingStatus::Cancelled)?;

        // 開始後の取消は不可
        let now = Local::now().naive_local();
        let starts_at = current.hold.slot.start_date.and_time(current.hold.slot.start_time);
        if starts_at <= now {
            return Err(AppError::UnprocessableEntity(format!(
                "予約（{}）は開始時刻を過ぎているため取り消せません。",
                event.booking_id
            )));
        }

        update_status(
            &mut tx,
            event.booking_id.raw(),
            current.status,
            BookingStatus::Cancelled,
        )
        .await?;

        let side_effect =
            SideEffect::for_transition(Some(current.status), BookingStatus::Cancelled);
        insert_booking_event(
            &mut tx,
            event.booking_id.raw(),
            Some(current.status),
            BookingStatus::Cancelled,
            side_effect,
            Some(&format!("cancelled_by={}", event.cancelled_by)),
        )
        .await?;

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(BookingTransition {
            booking_id: event.booking_id,
            borrower_id: current.hold.borrower_id,
            from: Some(current.status),
            to: BookingStatus::Cancelled,
            side_effect,
        })
    }

    // 終了時刻を過ぎた APPROVED の予約をまとめて COMPLETED にする
    async fn complete_elapsed(
        &self,
        today: NaiveDate,
        now: NaiveTime,
    ) -> AppResult<Vec<BookingTransition>> {
        let mut tx = self.db.begin().await?;

        let rows = sqlx::query_as::<_, CompletedRow>(
            r#"
                UPDATE bookings
                SET status = $1, updated_at = now()
                WHERE status = $2
                  AND (end_date < $3 OR (end_date = $3 AND end_time <= $4))
                RETURNING booking_id, borrower_id
            "#,
        )
        .bind(BookingStatus::Completed.to_string())
        .bind(BookingStatus::Approved.to_string())
        .bind(today)
        .bind(now)
        .fetch_all(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let side_effect =
            SideEffect::for_transition(Some(BookingStatus::Approved), BookingStatus::Completed);
        let mut transitions = Vec::with_capacity(rows.len());
        for row in rows {
            insert_booking_event(
                &mut tx,
                row.booking_id,
                Some(BookingStatus::Approved),
                BookingStatus::Completed,
                side_effect,
                None,
            )
            .await?;
            transitions.push(BookingTransition {
                booking_id: row.booking_id.into(),
                borrower_id: row.borrower_id.into(),
                from: Some(BookingStatus::Approved),
                to: BookingStatus::Completed,
                side_effect,
            });
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(transitions)
    }

    // 建物の月間カレンダーを返す
    async fn month_schedule(
        &self,
        building_id: BuildingId,
        year: i32,
        month: u32,
        active_hold: &[BookingStatus],
    ) -> AppResult<Vec<DayAvailability>> {
        let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
            return Err(AppError::UnprocessableEntity(format!(
                "不正な年月です: {year}-{month}"
            )));
        };
        // 翌月 1 日の前日 = 月末
        let last = match month {
            12 => NaiveDate::from_ymd_opt(year + 1, 1, 1),
            _ => NaiveDate::from_ymd_opt(year, month + 1, 1),
        }
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| {
            AppError::UnprocessableEntity(format!("不正な年月です: {year}-{month}"))
        })?;

        let exists = sqlx::query_as::<_, (Uuid,)>(
            "SELECT building_id FROM buildings WHERE building_id = $1",
        )
        .bind(building_id.raw())
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;
        if exists.is_none() {
            return Err(AppError::EntityNotFound(format!(
                "建物（{building_id}）が見つかりませんでした。"
            )));
        }

        let rows = sqlx::query_as::<_, HoldRow>(
            r#"
                SELECT booking_id, building_id, borrower_id, status,
                       start_date, end_date, start_time, end_time
                FROM bookings
                WHERE building_id = $1
                  AND status = ANY($2)
                  AND start_date <= $3
                  AND end_date >= $4
            "#,
        )
        .bind(building_id.raw())
        .bind(status_strings(active_hold))
        .bind(last)
        .bind(first)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let holds = rows
            .into_iter()
            .map(BookingHold::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        // 日別の判定はカレンダー・空き検索・書き込みで共通の kernel 側ロジック
        Ok(schedule::month_availability(year, month, &holds, active_hold))
    }

    // 指定スロットに衝突のない建物を横断検索する
    async fn search_available_buildings(
        &self,
        slot: Slot,
        active_hold: &[BookingStatus],
    ) -> AppResult<Vec<Building>> {
        let building_rows = sqlx::query_as::<_, BuildingRow>(
            r#"
                SELECT building_id, building_name, building_type, capacity,
                       rental_price, location, facilities, managers
                FROM buildings
                ORDER BY building_name ASC
            "#,
        )
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let hold_rows = sqlx::query_as::<_, HoldRow>(
            r#"
                SELECT booking_id, building_id, borrower_id, status,
                       start_date, end_date, start_time, end_time
                FROM bookings
                WHERE status = ANY($1)
                  AND start_date <= $2
                  AND end_date >= $3
            "#,
        )
        .bind(status_strings(active_hold))
        .bind(slot.end_date)
        .bind(slot.start_date)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        // 建物ごとに占有スロットをまとめ、衝突のない建物だけ残す
        let mut holds_by_building: HashMap<Uuid, Vec<BookingHold>> = HashMap::new();
        for row in hold_rows {
            let building_id = row.building_id;
            holds_by_building
                .entry(building_id)
                .or_default()
                .push(BookingHold::try_from(row)?);
        }

        let mut available = Vec::new();
        for row in building_rows {
            let holds = holds_by_building
                .get(&row.building_id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            if !schedule::has_conflict(&slot, holds, active_hold) {
                available.push(Building::try_from(row)?);
            }
        }

        Ok(available)
    }
}

// 承認・却下・取消で共通して使う、現在ステータス付きの 1 件読み取り
struct CurrentBooking {
    building_id: Uuid,
    status: BookingStatus,
    hold: BookingHold,
}

async fn fetch_hold_by_id(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    booking_id: BookingId,
) -> AppResult<CurrentBooking> {
    let row = sqlx::query_as::<_, HoldRow>(
        r#"
            SELECT booking_id, building_id, borrower_id, status,
                   start_date, end_date, start_time, end_time
            FROM bookings
            WHERE booking_id = $1
        "#,
    )
    .bind(booking_id.raw())
    .fetch_optional(&mut **tx)
    .await
    .map_err(AppError::SpecificOperationError)?;

    let Some(row) = row else {
        return Err(AppError::EntityNotFound(format!(
            "予約（{booking_id}）が見つかりませんでした。"
        )));
    };

    let building_id = row.building_id;
    let hold = BookingHold::try_from(row)?;
    Ok(CurrentBooking {
        building_id,
        status: hold.status,
        hold,
    })
}

async fn fetch_holds(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    building_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    active_hold: &[BookingStatus],
    exclude: Option<Uuid>,
) -> AppResult<Vec<BookingHold>> {
    let rows = sqlx::query_as::<_, HoldRow>(
        r#"
            SELECT booking_id, building_id, borrower_id, status,
                   start_date, end_date, start_time, end_time
            FROM bookings
            WHERE building_id = $1
              AND status = ANY($2)
              AND start_date <= $3
              AND end_date >= $4
              AND ($5::uuid IS NULL OR booking_id <> $5)
        "#,
    )
    .bind(building_id)
    .bind(status_strings(active_hold))
    .bind(end_date)
    .bind(start_date)
    .bind(exclude)
    .fetch_all(&mut **tx)
    .await
    .map_err(AppError::SpecificOperationError)?;

    rows.into_iter().map(BookingHold::try_from).collect()
}

// 旧ステータスを WHERE 句で固定した上で更新する。
// 同時更新で別の遷移が先に入っていた場合は 0 行更新となりエラーになる。
async fn update_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    booking_id: Uuid,
    from: BookingStatus,
    to: BookingStatus,
) -> AppResult<()> {
    let res = sqlx::query(
        r#"
            UPDATE bookings
            SET status = $1, updated_at = now()
            WHERE booking_id = $2 AND status = $3
        "#,
    )
    .bind(to.to_string())
    .bind(booking_id)
    .bind(from.to_string())
    .execute(&mut **tx)
    .await
    .map_err(AppError::SpecificOperationError)?;

    if res.rows_affected() < 1 {
        return Err(AppError::NoRowsAffectedError(
            "No booking status has been updated".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use kernel::model::id::UserId;

    fn time(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    async fn register_building(pool: &sqlx::PgPool) -> anyhow::Result<BuildingId> {
        let building_id = BuildingId::new();
        sqlx::query(
            r#"
                INSERT INTO buildings
                (building_id, building_name, building_type, capacity,
                rental_price, location, facilities, managers)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(building_id.raw())
        .bind("第一会館")
        .bind("hall")
        .bind(120)
        .bind(50_000i64)
        .bind("1-2-3 Chiyoda")
        .bind(vec!["projector".to_string(), "wifi".to_string()])
        .bind(serde_json::json!([{"name": "管理 太郎", "phone": "03-0000-0000"}]))
        .execute(pool)
        .await?;
        Ok(building_id)
    }

    fn submit_event(
        building_id: BuildingId,
        borrower_id: UserId,
        day: &str,
        from: &str,
        to: &str,
    ) -> CreateBooking {
        CreateBooking::new(
            building_id,
            borrower_id,
            "体育館リハーサル".into(),
            date(day),
            None,
            time(from),
            time(to),
            None,
            date("2030-01-01"),
        )
        .unwrap()
    }

    async fn insert_booking_with_status(
        pool: &sqlx::PgPool,
        building_id: BuildingId,
        borrower_id: UserId,
        day: &str,
        from: &str,
        to: &str,
        status: BookingStatus,
    ) -> anyhow::Result<BookingId> {
        let booking_id = BookingId::new();
        sqlx::query(
            r#"
                INSERT INTO bookings
                (booking_id, building_id, borrower_id, activity_name,
                start_date, end_date, start_time, end_time, status)
                VALUES ($1, $2, $3, $4, $5, $5, $6, $7, $8)
            "#,
        )
        .bind(booking_id.raw())
        .bind(building_id.raw())
        .bind(borrower_id.raw())
        .bind("演劇練習")
        .bind(date(day))
        .bind(time(from))
        .bind(time(to))
        .bind(status.to_string())
        .execute(pool)
        .await?;
        Ok(booking_id)
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn submit_creates_pending_booking_and_payment(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let building_id = register_building(&pool).await?;
        let borrower_id = UserId::new();

        let transition = repo
            .submit(
                submit_event(building_id, borrower_id, "2030-06-10", "09:00", "11:00"),
                &BookingStatus::ACTIVE_HOLD,
            )
            .await?;

        assert_eq!(transition.to, BookingStatus::Pending);
        assert_eq!(transition.side_effect, SideEffect::PaymentCreated);

        let booking = repo.find_by_id(transition.booking_id).await?;
        assert_eq!(booking.status, BookingStatus::Pending);

        // 単日予約なので決済金額は 1 日ぶんの料金
        let payment = booking.payment.expect("payment row should exist");
        assert_eq!(payment.amount, 50_000);
        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn overlapping_submission_is_rejected_without_partial_writes(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let building_id = register_building(&pool).await?;

        repo.submit(
            submit_event(building_id, UserId::new(), "2030-06-10", "09:00", "11:00"),
            &BookingStatus::ACTIVE_HOLD,
        )
        .await?;

        let res = repo
            .submit(
                submit_event(building_id, UserId::new(), "2030-06-10", "10:00", "12:00"),
                &BookingStatus::ACTIVE_HOLD,
            )
            .await;
        assert!(matches!(res, Err(AppError::SlotConflictError(_))));

        // 失敗した申請が予約・決済のどちらの行も残していないこと
        let (bookings,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings")
            .fetch_one(&pool)
            .await?;
        let (payments,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payments")
            .fetch_one(&pool)
            .await?;
        assert_eq!(bookings, 1);
        assert_eq!(payments, 1);
        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn adjacent_submission_is_accepted(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let building_id = register_building(&pool).await?;

        repo.submit(
            submit_event(building_id, UserId::new(), "2030-06-10", "09:00", "11:00"),
            &BookingStatus::ACTIVE_HOLD,
        )
        .await?;

        // 既存予約の終了時刻ちょうどから始まる申請は通る（半開区間）
        let res = repo
            .submit(
                submit_event(building_id, UserId::new(), "2030-06-10", "11:00", "12:00"),
                &BookingStatus::ACTIVE_HOLD,
            )
            .await;
        assert!(res.is_ok());
        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn approval_revalidates_against_current_holds(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let building_id = register_building(&pool).await?;
        let admin = UserId::new();

        // 同一スロットを狙う 2 件の PROCESSING をフィクスチャとして直接投入する
        let x = insert_booking_with_status(
            &pool,
            building_id,
            UserId::new(),
            "2030-06-10",
            "09:00",
            "11:00",
            BookingStatus::Processing,
        )
        .await?;
        let y = insert_booking_with_status(
            &pool,
            building_id,
            UserId::new(),
            "2030-06-10",
            "10:00",
            "12:00",
            BookingStatus::Processing,
        )
        .await?;

        // 先勝ち: X の承認は通る
        let approved = repo
            .approve(ApproveBooking::new(x, admin), &BookingStatus::ACTIVE_HOLD)
            .await?;
        assert_eq!(approved.to, BookingStatus::Approved);

        // Y の承認は再チェックで弾かれ、ステータスは PROCESSING のまま
        let res = repo
            .approve(ApproveBooking::new(y, admin), &BookingStatus::ACTIVE_HOLD)
            .await;
        assert!(matches!(res, Err(AppError::SlotConflictError(_))));

        let booking = repo.find_by_id(y).await?;
        assert_eq!(booking.status, BookingStatus::Processing);
        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn illegal_transition_leaves_state_untouched(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let building_id = register_building(&pool).await?;
        let admin = UserId::new();

        // PENDING の予約は承認できない（PROCESSING を経由する必要がある）
        let pending = insert_booking_with_status(
            &pool,
            building_id,
            UserId::new(),
            "2030-06-10",
            "09:00",
            "11:00",
            BookingStatus::Pending,
        )
        .await?;

        let res = repo
            .approve(
                ApproveBooking::new(pending, admin),
                &BookingStatus::ACTIVE_HOLD,
            )
            .await;
        assert!(matches!(
            res,
            Err(AppError::StateTransitionError { .. })
        ));

        let booking = repo.find_by_id(pending).await?;
        assert_eq!(booking.status, BookingStatus::Pending);
        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn listing_paginates_consistently(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let building_id = register_building(&pool).await?;
        let borrower_id = UserId::new();

        // 日をずらして 25 件投入する
        for day in 1..=25 {
            insert_booking_with_status(
                &pool,
                building_id,
                borrower_id,
                &format!("2030-07-{day:02}"),
                "09:00",
                "11:00",
                BookingStatus::Pending,
            )
            .await?;
        }

        let page = repo
            .list(
                BookingFilter::default(),
                ListOptions { page: 2, limit: 10 },
            )
            .await?;

        assert_eq!(page.items.len(), 10);
        assert_eq!(page.total, 25);
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages(), 3);
        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn cancelled_holds_release_the_slot(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let building_id = register_building(&pool).await?;
        let borrower_id = UserId::new();

        let transition = repo
            .submit(
                submit_event(building_id, borrower_id, "2030-06-10", "09:00", "11:00"),
                &BookingStatus::ACTIVE_HOLD,
            )
            .await?;

        repo.cancel(CancelBooking::new(transition.booking_id, borrower_id, false))
            .await?;

        // 取消済みの予約は占有から外れるので、同じスロットを再度取れる
        let res = repo
            .submit(
                submit_event(building_id, UserId::new(), "2030-06-10", "09:00", "11:00"),
                &BookingStatus::ACTIVE_HOLD,
            )
            .await;
        assert!(res.is_ok());
        Ok(())
    }
}
