use axum::{extract::State, http::StatusCode, Json};

use kernel::model::payment::event::{ConfirmPayment, SettleRefund};
use registry::AppRegistry;
use shared::error::AppResult;

use crate::{
    handler::notify_transition,
    model::booking::{PaymentCallbackRequest, RefundCallbackRequest},
};

// 決済ゲートウェイからの入金確定通知。
// 署名検証などの転送路の認証は前段のゲートウェイ層で行う前提。
pub async fn payment_callback(
    State(registry): State<AppRegistry>,
    Json(req): Json<PaymentCallbackRequest>,
) -> AppResult<StatusCode> {
    tracing::info!(external_ref = %req.external_ref, status = %req.status, "payment callback received");

    let transition = registry
        .payment_repository()
        .confirm(ConfirmPayment::new(req.external_ref, req.status))
        .await?;

    // 予約が PROCESSING に進んだ場合のみ通知する
    if let Some(transition) = transition {
        notify_transition(&registry, &transition).await;
    }

    Ok(StatusCode::OK)
}

// 返金の確定通知
pub async fn refund_callback(
    State(registry): State<AppRegistry>,
    Json(req): Json<RefundCallbackRequest>,
) -> AppResult<StatusCode> {
    registry
        .payment_repository()
        .settle_refund(SettleRefund::new(req.refund_id, req.succeeded))
        .await?;

    Ok(StatusCode::OK)
}
