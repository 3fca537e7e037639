use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use garde::Validate;
use kernel::model::{
    booking::{Booking, BookingFilter, BookingStatus},
    id::{BookingId, BuildingId, PaymentId, RefundId, UserId},
    list::{ListOptions, PaginatedList},
    payment::{Payment, PaymentStatus, Refund, RefundStatus},
};
use serde::{Deserialize, Serialize};

use super::PaginationResponse;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[garde(length(min = 3, max = 200))]
    pub activity_name: String,
    #[garde(skip)]
    pub start_date: NaiveDate,
    // 省略時は単日予約
    #[garde(skip)]
    pub end_date: Option<NaiveDate>,
    #[garde(skip)]
    pub start_time: NaiveTime,
    #[garde(skip)]
    pub end_time: NaiveTime,
    #[garde(dive)]
    pub attachment: Option<AttachmentPayload>,
}

// 申請書類。content は base64 エンコードされたバイト列
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentPayload {
    #[garde(length(min = 1, max = 255))]
    pub file_name: String,
    #[garde(length(min = 1))]
    pub content_type: String,
    #[garde(length(min = 1))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RejectBookingRequest {
    #[garde(length(min = 1, max = 500))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefundBookingRequest {
    #[garde(length(min = 1, max = 500))]
    pub reason: String,
}

// 一覧の絞り込みクエリ。管理者用は全件、利用者用は本人の予約に固定される
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookingListQuery {
    #[garde(range(min = 1))]
    pub page: Option<i64>,
    #[garde(range(min = 1, max = 100))]
    pub limit: Option<i64>,
    #[garde(skip)]
    pub status: Option<BookingStatus>,
    #[garde(skip)]
    pub building_id: Option<BuildingId>,
    #[garde(skip)]
    pub borrower_id: Option<UserId>,
    #[garde(skip)]
    pub date_from: Option<NaiveDate>,
    #[garde(skip)]
    pub date_to: Option<NaiveDate>,
}

impl BookingListQuery {
    pub fn options(&self) -> ListOptions {
        ListOptions {
            page: self.page.unwrap_or(1),
            limit: self.limit.unwrap_or(20),
        }
    }

    pub fn filter(&self) -> BookingFilter {
        BookingFilter {
            status: self.status,
            building_id: self.building_id,
            borrower_id: self.borrower_id,
            date_from: self.date_from,
            date_to: self.date_to,
        }
    }
}

// 決済ゲートウェイからの入金確定 Webhook
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallbackRequest {
    pub external_ref: String,
    pub status: PaymentStatus,
}

// 返金確定 Webhook
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundCallbackRequest {
    pub refund_id: RefundId,
    pub succeeded: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub booking_id: BookingId,
    pub building_id: BuildingId,
    pub borrower_id: UserId,
    pub activity_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: BookingStatus,
    pub attachment_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub payment: Option<PaymentResponse>,
    // 返金レコードがない場合は NO_REFUND として報告する
    pub refund_status: RefundStatus,
    pub refund: Option<RefundResponse>,
}

impl From<Booking> for BookingResponse {
    fn from(value: Booking) -> Self {
        let Booking {
            booking_id,
            building_id,
            borrower_id,
            activity_name,
            slot,
            status,
            attachment_ref,
            created_at,
            updated_at,
            payment,
            refund,
        } = value;
        Self {
            booking_id,
            building_id,
            borrower_id,
            activity_name,
            start_date: slot.start_date,
            end_date: slot.end_date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            status,
            attachment_ref,
            created_at,
            updated_at,
            payment: payment.map(PaymentResponse::from),
            refund_status: refund
                .as_ref()
                .map(|r| r.status)
                .unwrap_or(RefundStatus::NoRefund),
            refund: refund.map(RefundResponse::from),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub payment_id: PaymentId,
    pub amount: i64,
    pub status: PaymentStatus,
    pub external_ref: Option<String>,
}

impl From<Payment> for PaymentResponse {
    fn from(value: Payment) -> Self {
        Self {
            payment_id: value.payment_id,
            amount: value.amount,
            status: value.status,
            external_ref: value.external_ref,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    pub refund_id: RefundId,
    pub amount: i64,
    pub status: RefundStatus,
    pub reason: String,
    pub external_ref: Option<String>,
    pub refund_date: Option<DateTime<Utc>>,
}

impl From<Refund> for RefundResponse {
    fn from(value: Refund) -> Self {
        Self {
            refund_id: value.refund_id,
            amount: value.amount,
            status: value.status,
            reason: value.reason,
            external_ref: value.external_ref,
            refund_date: value.refund_date,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedBookingResponse {
    pub data: Vec<BookingResponse>,
    pub pagination: PaginationResponse,
}

impl From<PaginatedList<Booking>> for PaginatedBookingResponse {
    fn from(value: PaginatedList<Booking>) -> Self {
        let pagination = PaginationResponse::from(&value);
        Self {
            data: value.items.into_iter().map(BookingResponse::from).collect(),
            pagination,
        }
    }
}

// 申請直後のレスポンス。利用者を支払いページへ誘導する
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedBookingResponse {
    pub booking_id: BookingId,
    pub status: BookingStatus,
    pub payment_url: String,
}
