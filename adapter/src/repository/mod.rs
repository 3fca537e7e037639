pub mod booking;
pub mod building;
pub mod health;
pub mod payment;

use shared::error::{AppError, AppResult};
use uuid::Uuid;

use kernel::model::{
    booking::status::{BookingStatus, SideEffect},
    id::EventId,
};

// ステータス集合を SQL の ANY($n) に渡せる形へ変換する
pub(crate) fn status_strings(statuses: &[BookingStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.to_string()).collect()
}

// 状態遷移の記録。ステータス更新と同一トランザクション内で必ず 1 行書く。
// from_status が NULL の行は予約の新規作成を表す。
pub(crate) async fn insert_booking_event(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    booking_id: Uuid,
    from: Option<BookingStatus>,
    to: BookingStatus,
    side_effect: SideEffect,
    note: Option<&str>,
) -> AppResult<()> {
    let res = sqlx::query(
        r#"
            INSERT INTO booking_events
            (event_id, booking_id, from_status, to_status, side_effect, note)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(EventId::new().raw())
    .bind(booking_id)
    .bind(from.map(|s| s.to_string()))
    .bind(to.to_string())
    .bind(side_effect.to_string())
    .bind(note)
    .execute(&mut **tx)
    .await
    .map_err(AppError::SpecificOperationError)?;

    if res.rows_affected() < 1 {
        return Err(AppError::NoRowsAffectedError(
            "No booking_events record has been created".into(),
        ));
    }
    Ok(())
}
