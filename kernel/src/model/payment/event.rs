use derive_new::new;

use crate::model::{
    id::{BookingId, RefundId, UserId},
    payment::PaymentStatus,
};

// 決済ゲートウェイからの非同期通知（Webhook）を正規化したイベント。
// external_ref は create_payment 時にゲートウェイが発行した参照。
#[derive(Debug, new)]
pub struct ConfirmPayment {
    pub external_ref: String,
    pub status: PaymentStatus,
}

#[derive(Debug, new)]
pub struct RequestRefund {
    pub booking_id: BookingId,
    pub requested_by: UserId,
    pub reason: String,
}

// 返金の確定通知。succeeded=false は FAILED 終端。
#[derive(Debug, new)]
pub struct SettleRefund {
    pub refund_id: RefundId,
    pub succeeded: bool,
}
