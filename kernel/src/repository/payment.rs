use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{
    booking::event::BookingTransition,
    id::{BookingId, PaymentId, RefundId},
    payment::{
        event::{ConfirmPayment, RequestRefund, SettleRefund},
        Payment, Refund,
    },
};

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn find_by_booking_id(&self, booking_id: BookingId) -> AppResult<Payment>;
    // create_payment 呼び出し後にゲートウェイ参照を書き戻す
    async fn set_external_ref(&self, payment_id: PaymentId, external_ref: &str) -> AppResult<()>;
    // 入金確定 Webhook。決済を PAID にし、同一トランザクションで
    // 予約を PENDING -> PROCESSING に進める。
    // PAID 以外（FAILED / EXPIRED）の場合は決済側だけ倒し、None を返す。
    async fn confirm(&self, event: ConfirmPayment) -> AppResult<Option<BookingTransition>>;
    // 返金申請。決済 1 件につき返金は最大 1 件で、
    // 既に存在する場合は新規作成せずその返金を返す（冪等）。
    async fn request_refund(&self, event: RequestRefund) -> AppResult<Refund>;
    // ゲートウェイへの返金依頼が通ったら PROCESSING へ進める
    async fn mark_refund_processing(
        &self,
        refund_id: RefundId,
        external_ref: &str,
    ) -> AppResult<()>;
    // リトライ上限まで失敗した返金を FAILED で確定する（要手動対応）
    async fn mark_refund_failed(&self, refund_id: RefundId) -> AppResult<()>;
    // 返金確定 Webhook。COMPLETED なら同一トランザクションで決済を STOPPED にする
    async fn settle_refund(&self, event: SettleRefund) -> AppResult<Refund>;
    async fn find_refund_by_payment_id(&self, payment_id: PaymentId) -> AppResult<Option<Refund>>;
}
