use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::model::{
    booking::status::BookingStatus,
    id::{BookingId, PaymentId, RefundId},
};

pub mod event;

#[derive(Debug, Clone)]
pub struct Payment {
    pub payment_id: PaymentId,
    pub booking_id: BookingId,
    pub amount: i64,
    pub status: PaymentStatus,
    pub external_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Expired,
    Stopped,
}

impl PaymentStatus {
    // 終端状態に入った決済は返金フロー以外から変更できない
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PaymentStatus::Failed | PaymentStatus::Expired | PaymentStatus::Stopped
        )
    }
}

#[derive(Debug, Clone)]
pub struct Refund {
    pub refund_id: RefundId,
    pub payment_id: PaymentId,
    pub amount: i64,
    pub status: RefundStatus,
    pub reason: String,
    pub external_ref: Option<String>,
    pub refund_date: Option<DateTime<Utc>>,
}

// NO_REFUND は「返金レコードが存在しない」ことを表す報告用の状態で、
// 永続化されるのは残りの 4 状態のみ。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    NoRefund,
    Pending,
    Processing,
    Completed,
    Failed,
}

// 返金を新規に受け付けられる条件。
// 予約が却下または取消済みで、決済が支払済みの場合のみ。
pub fn refund_allowed(booking_status: BookingStatus, payment_status: PaymentStatus) -> bool {
    matches!(
        booking_status,
        BookingStatus::Rejected | BookingStatus::Cancelled
    ) && payment_status == PaymentStatus::Paid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refund_requires_rejected_or_cancelled_and_paid() {
        assert!(refund_allowed(BookingStatus::Rejected, PaymentStatus::Paid));
        assert!(refund_allowed(BookingStatus::Cancelled, PaymentStatus::Paid));

        assert!(!refund_allowed(BookingStatus::Approved, PaymentStatus::Paid));
        assert!(!refund_allowed(BookingStatus::Pending, PaymentStatus::Paid));
        assert!(!refund_allowed(
            BookingStatus::Rejected,
            PaymentStatus::Pending
        ));
        assert!(!refund_allowed(
            BookingStatus::Cancelled,
            PaymentStatus::Stopped
        ));
    }

    #[test]
    fn terminal_payment_statuses() {
        assert!(PaymentStatus::Stopped.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(PaymentStatus::Expired.is_terminal());
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(!PaymentStatus::Paid.is_terminal());
    }
}
