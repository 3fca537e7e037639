use chrono::{DateTime, Utc};
use shared::error::AppError;
use sqlx::FromRow;
use uuid::Uuid;

use kernel::model::payment::{Payment, PaymentStatus, Refund, RefundStatus};

#[derive(FromRow)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub booking_id: Uuid,
    pub amount: i64,
    pub status: String,
    pub external_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = AppError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status: PaymentStatus = row.status.parse().map_err(|_| {
            AppError::ConversionEntityError(format!("不正な payments.status 値: {}", row.status))
        })?;
        Ok(Payment {
            payment_id: row.payment_id.into(),
            booking_id: row.booking_id.into(),
            amount: row.amount,
            status,
            external_ref: row.external_ref,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// 返金可否の判定に使う、予約ステータスと決済の同時読み取り
#[derive(FromRow)]
pub struct BookingPaymentRow {
    pub booking_status: String,
    #[sqlx(flatten)]
    pub payment: PaymentRow,
}

#[derive(FromRow)]
pub struct RefundRow {
    pub refund_id: Uuid,
    pub payment_id: Uuid,
    pub amount: i64,
    pub status: String,
    pub reason: String,
    pub external_ref: Option<String>,
    pub refund_date: Option<DateTime<Utc>>,
}

impl TryFrom<RefundRow> for Refund {
    type Error = AppError;

    fn try_from(row: RefundRow) -> Result<Self, Self::Error> {
        let status: RefundStatus = row.status.parse().map_err(|_| {
            AppError::ConversionEntityError(format!("不正な refunds.status 値: {}", row.status))
        })?;
        Ok(Refund {
            refund_id: row.refund_id.into(),
            payment_id: row.payment_id.into(),
            amount: row.amount,
            status,
            reason: row.reason,
            external_ref: row.external_ref,
            refund_date: row.refund_date,
        })
    }
}
