use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use shared::error::AppError;
use sqlx::FromRow;
use uuid::Uuid;

use kernel::model::booking::{
    schedule::{BookingHold, Slot},
    Booking, BookingStatus,
};
use kernel::model::payment::{Payment, PaymentStatus, Refund, RefundStatus};

// 予約 1 件ぶんのレコード。payments / refunds を LEFT JOIN して
// 同一スナップショットで読むため、決済・返金のカラムも持つ。
#[derive(FromRow)]
pub struct BookingRow {
    pub booking_id: Uuid,
    pub building_id: Uuid,
    pub borrower_id: Uuid,
    pub activity_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: String,
    pub attachment_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub payment_id: Option<Uuid>,
    pub payment_amount: Option<i64>,
    pub payment_status: Option<String>,
    pub payment_external_ref: Option<String>,
    pub payment_created_at: Option<DateTime<Utc>>,
    pub payment_updated_at: Option<DateTime<Utc>>,
    pub refund_id: Option<Uuid>,
    pub refund_amount: Option<i64>,
    pub refund_status: Option<String>,
    pub refund_reason: Option<String>,
    pub refund_external_ref: Option<String>,
    pub refund_date: Option<DateTime<Utc>>,
}

// DB 上のステータス文字列は列挙型へ変換できなければエラーにする。
// 欠損扱いで読み飛ばすと一覧の件数やページ数が狂うため。
fn parse_status<T: std::str::FromStr>(value: &str, column: &str) -> Result<T, AppError> {
    value
        .parse()
        .map_err(|_| AppError::ConversionEntityError(format!("不正な {column} 値: {value}")))
}

impl TryFrom<BookingRow> for Booking {
    type Error = AppError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status: BookingStatus = parse_status(&row.status, "bookings.status")?;

        let payment = match (row.payment_id, row.payment_amount, row.payment_status) {
            (Some(payment_id), Some(amount), Some(ref payment_status)) => Some(Payment {
                payment_id: payment_id.into(),
                booking_id: row.booking_id.into(),
                amount,
                status: parse_status::<PaymentStatus>(payment_status, "payments.status")?,
                external_ref: row.payment_external_ref,
                created_at: row.payment_created_at.unwrap_or(row.created_at),
                updated_at: row.payment_updated_at.unwrap_or(row.updated_at),
            }),
            _ => None,
        };

        let refund = match (row.refund_id, row.refund_amount, row.refund_status) {
            (Some(refund_id), Some(amount), Some(ref refund_status)) => Some(Refund {
                refund_id: refund_id.into(),
                payment_id: row
                    .payment_id
                    .map(Into::into)
                    .ok_or_else(|| {
                        AppError::ConversionEntityError(
                            "決済のない返金レコードが存在します".into(),
                        )
                    })?,
                amount,
                status: parse_status::<RefundStatus>(refund_status, "refunds.status")?,
                reason: row.refund_reason.unwrap_or_default(),
                external_ref: row.refund_external_ref,
                refund_date: row.refund_date,
            }),
            _ => None,
        };

        Ok(Booking {
            booking_id: row.booking_id.into(),
            building_id: row.building_id.into(),
            borrower_id: row.borrower_id.into(),
            activity_name: row.activity_name,
            slot: Slot {
                start_date: row.start_date,
                end_date: row.end_date,
                start_time: row.start_time,
                end_time: row.end_time,
            },
            status,
            attachment_ref: row.attachment_ref,
            created_at: row.created_at,
            updated_at: row.updated_at,
            payment,
            refund,
        })
    }
}

// 一覧取得用。ウィンドウ関数で総件数を同じスナップショットから得る
#[derive(FromRow)]
pub struct PaginatedBookingRow {
    pub total: i64,
    #[sqlx(flatten)]
    pub row: BookingRow,
}

// 衝突判定に渡す占有スロットの射影
#[derive(FromRow)]
pub struct HoldRow {
    pub booking_id: Uuid,
    pub building_id: Uuid,
    pub borrower_id: Uuid,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl TryFrom<HoldRow> for BookingHold {
    type Error = AppError;

    fn try_from(row: HoldRow) -> Result<Self, Self::Error> {
        Ok(BookingHold {
            booking_id: row.booking_id.into(),
            borrower_id: row.borrower_id.into(),
            status: parse_status(&row.status, "bookings.status")?,
            slot: Slot {
                start_date: row.start_date,
                end_date: row.end_date,
                start_time: row.start_time,
                end_time: row.end_time,
            },
        })
    }
}

// 完了スイープの UPDATE ... RETURNING で返る最小限のカラム
#[derive(FromRow)]
pub struct CompletedRow {
    pub booking_id: Uuid,
    pub borrower_id: Uuid,
}
