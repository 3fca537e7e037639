use async_trait::async_trait;
use derive_new::new;
use uuid::Uuid;

use kernel::model::{
    booking::{event::BookingTransition, status::SideEffect, BookingStatus},
    id::{BookingId, PaymentId, RefundId},
    payment::{
        event::{ConfirmPayment, RequestRefund, SettleRefund},
        refund_allowed, Payment, PaymentStatus, Refund, RefundStatus,
    },
};
use kernel::repository::payment::PaymentRepository;
use shared::error::{AppError, AppResult};

use crate::database::{
    model::payment::{BookingPaymentRow, PaymentRow, RefundRow},
    ConnectionPool,
};
use crate::repository::insert_booking_event;

#[derive(new)]
pub struct PaymentRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl PaymentRepository for PaymentRepositoryImpl {
    async fn find_by_booking_id(&self, booking_id: BookingId) -> AppResult<Payment> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
                SELECT payment_id, booking_id, amount, status, external_ref,
                       created_at, updated_at
                FROM payments
                WHERE booking_id = $1
            "#,
        )
        .bind(booking_id.raw())
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        match row {
            Some(row) => Payment::try_from(row),
            None => Err(AppError::EntityNotFound(format!(
                "予約（{booking_id}）に対応する決済が見つかりませんでした。"
            ))),
        }
    }

    async fn set_external_ref(&self, payment_id: PaymentId, external_ref: &str) -> AppResult<()> {
        let res = sqlx::query(
            r#"
                UPDATE payments
                SET external_ref = $1, updated_at = now()
                WHERE payment_id = $2
            "#,
        )
        .bind(external_ref)
        .bind(payment_id.raw())
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound(format!(
                "決済（{payment_id}）が見つかりませんでした。"
            )));
        }
        Ok(())
    }

    // 入金確定 Webhook を適用する
    async fn confirm(&self, event: ConfirmPayment) -> AppResult<Option<BookingTransition>> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
                SELECT payment_id, booking_id, amount, status, external_ref,
                       created_at, updated_at
                FROM payments
                WHERE external_ref = $1
            "#,
        )
        .bind(&event.external_ref)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let Some(row) = row else {
            return Err(AppError::EntityNotFound(format!(
                "参照（{}）に対応する決済が見つかりませんでした。",
                event.external_ref
            )));
        };
        let payment = Payment::try_from(row)?;

        // Webhook は再送されうるので、PENDING 以外には適用せず黙って受け流す
        if payment.status != PaymentStatus::Pending {
            return Ok(None);
        }

        match event.status {
            PaymentStatus::Paid => (),
            PaymentStatus::Failed | PaymentStatus::Expired => {
                // 決済側だけ倒して終了。予約は PENDING のまま残り、
                // 利用者は再度支払いを試みるか取り消すかを選べる。
                update_payment_status(&mut tx, payment.payment_id.raw(), event.status).await?;
                tx.commit().await.map_err(AppError::TransactionError)?;
                return Ok(None);
            }
            other => {
                return Err(AppError::UnprocessableEntity(format!(
                    "入金確定通知が不正なステータスを含んでいます: {other}"
                )));
            }
        }

        update_payment_status(&mut tx, payment.payment_id.raw(), PaymentStatus::Paid).await?;

        // 予約を PENDING -> PROCESSING へ。予約が既に取り消されている場合は
        // 決済だけ PAID として残し、返金フローに委ねる。
        let booking = sqlx::query_as::<_, (Uuid, String)>(
            r#"
                SELECT booking_id, status
                FROM bookings
                WHERE booking_id = $1
            "#,
        )
        .bind(payment.booking_id.raw())
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let status: BookingStatus = booking.1.parse().map_err(|_| {
            AppError::ConversionEntityError(format!("不正な bookings.status 値: {}", booking.1))
        })?;

        let transition = if status == BookingStatus::Pending {
            status.ensure_transition(BookingStatus::Processing)?;
            let res = sqlx::query(
                r#"
                    UPDATE bookings
                    SET status = $1, updated_at = now()
                    WHERE booking_id = $2 AND status = $3
                "#,
            )
            .bind(BookingStatus::Processing.to_string())
            .bind(payment.booking_id.raw())
            .bind(BookingStatus::Pending.to_string())
            .execute(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;
            if res.rows_affected() < 1 {
                return Err(AppError::NoRowsAffectedError(
                    "No booking status has been updated".into(),
                ));
            }

            let side_effect =
                SideEffect::for_transition(Some(BookingStatus::Pending), BookingStatus::Processing);
            insert_booking_event(
                &mut tx,
                payment.booking_id.raw(),
                Some(BookingStatus::Pending),
                BookingStatus::Processing,
                side_effect,
                Some(&format!("external_ref={}", event.external_ref)),
            )
            .await?;

            let (borrower_id,): (Uuid,) =
                sqlx::query_as("SELECT borrower_id FROM bookings WHERE booking_id = $1")
                    .bind(payment.booking_id.raw())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(AppError::SpecificOperationError)?;

            Some(BookingTransition {
                booking_id: payment.booking_id,
                borrower_id: borrower_id.into(),
                from: Some(BookingStatus::Pending),
                to: BookingStatus::Processing,
                side_effect,
            })
        } else {
            None
        };

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(transition)
    }

    // 返金申請を行う。決済 1 件につき返金は最大 1 件（冪等）。
    async fn request_refund(&self, event: RequestRefund) -> AppResult<Refund> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, BookingPaymentRow>(
            r#"
                SELECT b.status AS booking_status,
                       p.payment_id, p.booking_id, p.amount, p.status,
                       p.external_ref, p.created_at, p.updated_at
                FROM bookings AS b
                INNER JOIN payments AS p ON p.booking_id = b.booking_id
                WHERE b.booking_id = $1
            "#,
        )
        .bind(event.booking_id.raw())
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let Some(row) = row else {
            return Err(AppError::EntityNotFound(format!(
                "予約（{}）に対応する決済が見つかりませんでした。",
                event.booking_id
            )));
        };
        let booking_status: BookingStatus = row.booking_status.parse().map_err(|_| {
            AppError::ConversionEntityError(format!(
                "不正な bookings.status 値: {}",
                row.booking_status
            ))
        })?;
        let payment = Payment::try_from(row.payment)?;

        // 既に返金があればそれを返す
        if let Some(existing) = fetch_refund_by_payment(&mut tx, payment.payment_id.raw()).await? {
            return Ok(existing);
        }

        // 返金は却下・取消済みかつ支払済みの予約に対してのみ
        if !refund_allowed(booking_status, payment.status) {
            return Err(AppError::UnprocessableEntity(format!(
                "予約（{}）は返金できる状態ではありません（予約: {}, 決済: {}）。",
                event.booking_id, booking_status, payment.status
            )));
        }

        // 全額返金。UNIQUE(payment_id) との併用で二重作成を防ぎ、
        // 競合時は先に入った行を返す。
        let refund_id = RefundId::new();
        let res = sqlx::query(
            r#"
                INSERT INTO refunds (refund_id, payment_id, amount, status, reason)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (payment_id) DO NOTHING
            "#,
        )
        .bind(refund_id.raw())
        .bind(payment.payment_id.raw())
        .bind(payment.amount)
        .bind(RefundStatus::Pending.to_string())
        .bind(&event.reason)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let refund = if res.rows_affected() < 1 {
            fetch_refund_by_payment(&mut tx, payment.payment_id.raw())
                .await?
                .ok_or_else(|| {
                    AppError::NoRowsAffectedError("No refund record has been created".into())
                })?
        } else {
            Refund {
                refund_id,
                payment_id: payment.payment_id,
                amount: payment.amount,
                status: RefundStatus::Pending,
                reason: event.reason,
                external_ref: None,
                refund_date: None,
            }
        };

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(refund)
    }

    async fn mark_refund_processing(
        &self,
        refund_id: RefundId,
        external_ref: &str,
    ) -> AppResult<()> {
        update_refund(
            self.db.inner_ref(),
            refund_id,
            RefundStatus::Pending,
            RefundStatus::Processing,
            Some(external_ref),
        )
        .await
    }

    async fn mark_refund_failed(&self, refund_id: RefundId) -> AppResult<()> {
        update_refund(
            self.db.inner_ref(),
            refund_id,
            RefundStatus::Pending,
            RefundStatus::Failed,
            None,
        )
        .await
    }

    // 返金確定 Webhook を適用する
    async fn settle_refund(&self, event: SettleRefund) -> AppResult<Refund> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, RefundRow>(
            r#"
                SELECT refund_id, payment_id, amount, status, reason,
                       external_ref, refund_date
                FROM refunds
                WHERE refund_id = $1
            "#,
        )
        .bind(event.refund_id.raw())
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let Some(row) = row else {
            return Err(AppError::EntityNotFound(format!(
                "返金（{}）が見つかりませんでした。",
                event.refund_id
            )));
        };
        let refund = Refund::try_from(row)?;

        // 終端に達した返金には再適用しない（Webhook の再送対策）
        if matches!(
            refund.status,
            RefundStatus::Completed | RefundStatus::Failed
        ) {
            return Ok(refund);
        }

        if event.succeeded {
            let res = sqlx::query(
                r#"
                    UPDATE refunds
                    SET status = $1, refund_date = now(), updated_at = now()
                    WHERE refund_id = $2
                "#,
            )
            .bind(RefundStatus::Completed.to_string())
            .bind(event.refund_id.raw())
            .execute(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;
            if res.rows_affected() < 1 {
                return Err(AppError::NoRowsAffectedError(
                    "No refund record has been updated".into(),
                ));
            }

            // 返金完了と同時に決済を STOPPED で凍結する
            update_payment_status(&mut tx, refund.payment_id.raw(), PaymentStatus::Stopped)
                .await?;

            // 金銭の動きの確定は予約の遷移ではないが、監査用に journal へ残す
            let booking = sqlx::query_as::<_, (Uuid, String)>(
                r#"
                    SELECT b.booking_id, b.status
                    FROM bookings AS b
                    INNER JOIN payments AS p ON p.booking_id = b.booking_id
                    WHERE p.payment_id = $1
                "#,
            )
            .bind(refund.payment_id.raw())
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;
            let status: BookingStatus = booking.1.parse().map_err(|_| {
                AppError::ConversionEntityError(format!(
                    "不正な bookings.status 値: {}",
                    booking.1
                ))
            })?;
            insert_booking_event(
                &mut tx,
                booking.0,
                Some(status),
                status,
                SideEffect::RefundSettled,
                Some(&format!("refund_id={}", event.refund_id)),
            )
            .await?;
        } else {
            let res = sqlx::query(
                r#"
                    UPDATE refunds
                    SET status = $1, updated_at = now()
                    WHERE refund_id = $2
                "#,
            )
            .bind(RefundStatus::Failed.to_string())
            .bind(event.refund_id.raw())
            .execute(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;
            if res.rows_affected() < 1 {
                return Err(AppError::NoRowsAffectedError(
                    "No refund record has been updated".into(),
                ));
            }
        }

        let settled = fetch_refund_by_payment(&mut tx, refund.payment_id.raw())
            .await?
            .ok_or_else(|| {
                AppError::EntityNotFound(format!(
                    "返金（{}）が見つかりませんでした。",
                    event.refund_id
                ))
            })?;

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(settled)
    }

    async fn find_refund_by_payment_id(&self, payment_id: PaymentId) -> AppResult<Option<Refund>> {
        let row = sqlx::query_as::<_, RefundRow>(
            r#"
                SELECT refund_id, payment_id, amount, status, reason,
                       external_ref, refund_date
                FROM refunds
                WHERE payment_id = $1
            "#,
        )
        .bind(payment_id.raw())
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.map(Refund::try_from).transpose()
    }
}

async fn fetch_refund_by_payment(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    payment_id: Uuid,
) -> AppResult<Option<Refund>> {
    let row = sqlx::query_as::<_, RefundRow>(
        r#"
            SELECT refund_id, payment_id, amount, status, reason,
                   external_ref, refund_date
            FROM refunds
            WHERE payment_id = $1
        "#,
    )
    .bind(payment_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(AppError::SpecificOperationError)?;

    row.map(Refund::try_from).transpose()
}

async fn update_payment_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    payment_id: Uuid,
    to: PaymentStatus,
) -> AppResult<()> {
    let res = sqlx::query(
        r#"
            UPDATE payments
            SET status = $1, updated_at = now()
            WHERE payment_id = $2
        "#,
    )
    .bind(to.to_string())
    .bind(payment_id)
    .execute(&mut **tx)
    .await
    .map_err(AppError::SpecificOperationError)?;

    if res.rows_affected() < 1 {
        return Err(AppError::NoRowsAffectedError(
            "No payment record has been updated".into(),
        ));
    }
    Ok(())
}

// 旧ステータスを固定して返金レコードを更新する
async fn update_refund(
    pool: &sqlx::PgPool,
    refund_id: RefundId,
    from: RefundStatus,
    to: RefundStatus,
    external_ref: Option<&str>,
) -> AppResult<()> {
    let res = sqlx::query(
        r#"
            UPDATE refunds
            SET status = $1,
                external_ref = COALESCE($2::text, external_ref),
                updated_at = now()
            WHERE refund_id = $3 AND status = $4
        "#,
    )
    .bind(to.to_string())
    .bind(external_ref)
    .bind(refund_id.raw())
    .bind(from.to_string())
    .execute(pool)
    .await
    .map_err(AppError::SpecificOperationError)?;

    if res.rows_affected() < 1 {
        return Err(AppError::NoRowsAffectedError(format!(
            "返金（{refund_id}）を {from} から {to} へ更新できませんでした。"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use kernel::model::id::{BuildingId, UserId};

    async fn fixture_cancelled_paid_booking(
        pool: &sqlx::PgPool,
    ) -> anyhow::Result<(BookingId, PaymentId)> {
        let building_id = BuildingId::new();
        sqlx::query(
            r#"
                INSERT INTO buildings
                (building_id, building_name, building_type, capacity,
                rental_price, location, facilities, managers)
                VALUES ($1, '旧講堂', 'hall', 80, 30000, 'Minato', '{}', '[]')
            "#,
        )
        .bind(building_id.raw())
        .execute(pool)
        .await?;

        let booking_id = BookingId::new();
        sqlx::query(
            r#"
                INSERT INTO bookings
                (booking_id, building_id, borrower_id, activity_name,
                start_date, end_date, start_time, end_time, status)
                VALUES ($1, $2, $3, '合唱練習', $4, $4, '09:00', '11:00', $5)
            "#,
        )
        .bind(booking_id.raw())
        .bind(building_id.raw())
        .bind(UserId::new().raw())
        .bind("2030-06-10".parse::<NaiveDate>()?)
        .bind(BookingStatus::Cancelled.to_string())
        .execute(pool)
        .await?;

        let payment_id = PaymentId::new();
        sqlx::query(
            r#"
                INSERT INTO payments (payment_id, booking_id, amount, status, external_ref)
                VALUES ($1, $2, 30000, $3, 'pay-001')
            "#,
        )
        .bind(payment_id.raw())
        .bind(booking_id.raw())
        .bind(PaymentStatus::Paid.to_string())
        .execute(pool)
        .await?;

        Ok((booking_id, payment_id))
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn refund_request_is_idempotent_per_payment(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = PaymentRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let (booking_id, _) = fixture_cancelled_paid_booking(&pool).await?;

        let requester = UserId::new();
        let first = repo
            .request_refund(RequestRefund::new(
                booking_id,
                requester,
                "行事中止のため".into(),
            ))
            .await?;
        let second = repo
            .request_refund(RequestRefund::new(
                booking_id,
                requester,
                "二重クリック".into(),
            ))
            .await?;

        // 2 回目の申請は同じ返金を返し、新しい行は作られない
        assert_eq!(first.refund_id, second.refund_id);
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM refunds")
            .fetch_one(&pool)
            .await?;
        assert_eq!(count, 1);
        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn refund_requires_paid_payment(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = PaymentRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let (booking_id, payment_id) = fixture_cancelled_paid_booking(&pool).await?;

        // 決済を未払いへ戻すと返金は申請できない
        sqlx::query("UPDATE payments SET status = $1 WHERE payment_id = $2")
            .bind(PaymentStatus::Pending.to_string())
            .bind(payment_id.raw())
            .execute(&pool)
            .await?;

        let res = repo
            .request_refund(RequestRefund::new(
                booking_id,
                UserId::new(),
                "理由".into(),
            ))
            .await;
        assert!(matches!(res, Err(AppError::UnprocessableEntity(_))));
        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn completed_refund_stops_payment(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = PaymentRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let (booking_id, payment_id) = fixture_cancelled_paid_booking(&pool).await?;

        let refund = repo
            .request_refund(RequestRefund::new(
                booking_id,
                UserId::new(),
                "行事中止のため".into(),
            ))
            .await?;
        repo.mark_refund_processing(refund.refund_id, "refund-001")
            .await?;

        let settled = repo
            .settle_refund(SettleRefund::new(refund.refund_id, true))
            .await?;
        assert_eq!(settled.status, RefundStatus::Completed);
        assert!(settled.refund_date.is_some());

        let payment = repo.find_by_booking_id(booking_id).await?;
        assert_eq!(payment.status, PaymentStatus::Stopped);
        let _ = payment_id;
        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn payment_confirmation_moves_booking_to_processing(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = PaymentRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let (booking_id, payment_id) = fixture_cancelled_paid_booking(&pool).await?;

        // フィクスチャを PENDING/PENDING に巻き戻して Webhook を適用する
        sqlx::query("UPDATE bookings SET status = $1 WHERE booking_id = $2")
            .bind(BookingStatus::Pending.to_string())
            .bind(booking_id.raw())
            .execute(&pool)
            .await?;
        sqlx::query("UPDATE payments SET status = $1 WHERE payment_id = $2")
            .bind(PaymentStatus::Pending.to_string())
            .bind(payment_id.raw())
            .execute(&pool)
            .await?;

        let transition = repo
            .confirm(ConfirmPayment::new("pay-001".into(), PaymentStatus::Paid))
            .await?
            .expect("booking should transition");
        assert_eq!(transition.to, BookingStatus::Processing);

        // 再送された Webhook は何も変更しない
        let replay = repo
            .confirm(ConfirmPayment::new("pay-001".into(), PaymentStatus::Paid))
            .await?;
        assert!(replay.is_none());
        Ok(())
    }
}
