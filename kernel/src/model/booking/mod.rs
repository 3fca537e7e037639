use chrono::{DateTime, NaiveDate, Utc};

use crate::model::{
    id::{BookingId, BuildingId, UserId},
    payment::{Payment, Refund},
};

pub mod event;
pub mod schedule;
pub mod status;

pub use schedule::Slot;
pub use status::BookingStatus;

#[derive(Debug)]
pub struct Booking {
    pub booking_id: BookingId,
    pub building_id: BuildingId,
    pub borrower_id: UserId,
    pub activity_name: String,
    pub slot: Slot,
    pub status: BookingStatus,
    pub attachment_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    // 一覧・詳細の読み取りで決済状態を同一スナップショットとして返すため、
    // 予約と同時に取得する
    pub payment: Option<Payment>,
    pub refund: Option<Refund>,
}

// 一覧取得の絞り込み条件。未指定のフィールドは条件に含めない。
#[derive(Debug, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub building_id: Option<BuildingId>,
    pub borrower_id: Option<UserId>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}
