use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{attachment::AttachmentUpload, id::UserId};

// 決済ゲートウェイが発行する支払いハンドル。
// payment_url は利用者を誘導する支払いページ、external_ref は
// 以後の Webhook・返金依頼で使う参照。
#[derive(Debug, Clone)]
pub struct PaymentHandle {
    pub external_ref: String,
    pub payment_url: String,
}

// 外部の決済ゲートウェイ。確定通知は同期戻り値ではなく
// Webhook（api::handler::webhook）経由で届く。
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment(&self, amount: i64, reference: &str) -> AppResult<PaymentHandle>;
    // 戻り値は返金の external_ref。実装側で有限回リトライし、
    // それでも失敗する場合は GatewayError を返す。
    async fn create_refund(
        &self,
        payment_ref: &str,
        amount: i64,
        reason: &str,
    ) -> AppResult<String>;
}

// 通知ディスパッチャ。コアから見れば fire-and-forget で、
// 失敗しても業務処理には影響させない。
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(&self, user_id: UserId, event_type: &str, payload: serde_json::Value);
}

// 添付書類の保管先。store はバリデーション済みのアップロードを受け取り、
// 予約に保存する参照文字列を返す。
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn store(&self, upload: AttachmentUpload) -> AppResult<String>;
}
