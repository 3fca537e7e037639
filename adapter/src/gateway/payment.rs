use async_trait::async_trait;
use serde::Deserialize;

use kernel::gateway::{PaymentGateway, PaymentHandle};
use shared::{
    config::GatewayConfig,
    error::{AppError, AppResult},
};

// 決済ゲートウェイの REST クライアント。
// 確定通知は同期レスポンスではなく Webhook 経由で届く前提。
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
}

impl HttpPaymentGateway {
    pub fn new(cfg: &GatewayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            max_retries: cfg.max_retries,
        }
    }
}

#[derive(Deserialize)]
struct CreatePaymentResponse {
    external_ref: String,
    payment_url: String,
}

#[derive(Deserialize)]
struct CreateRefundResponse {
    refund_ref: String,
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_payment(&self, amount: i64, reference: &str) -> AppResult<PaymentHandle> {
        let url = format!("{}/payments", self.base_url);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "amount": amount, "reference": reference }))
            .send()
            .await
            .map_err(|e| AppError::GatewayError(e.to_string()))?;

        if !res.status().is_success() {
            return Err(AppError::GatewayError(format!(
                "create_payment が HTTP {} を返しました",
                res.status()
            )));
        }

        let body: CreatePaymentResponse = res
            .json()
            .await
            .map_err(|e| AppError::GatewayError(e.to_string()))?;

        Ok(PaymentHandle {
            external_ref: body.external_ref,
            payment_url: body.payment_url,
        })
    }

    // 返金依頼は有限回リトライする。使い切ったら GatewayError を返し、
    // 呼び出し側が返金を FAILED にして手動対応へ回す。
    async fn create_refund(
        &self,
        payment_ref: &str,
        amount: i64,
        reason: &str,
    ) -> AppResult<String> {
        let url = format!("{}/refunds", self.base_url);
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            let res = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&serde_json::json!({
                    "payment_ref": payment_ref,
                    "amount": amount,
                    "reason": reason,
                }))
                .send()
                .await;

            match res {
                Ok(res) if res.status().is_success() => {
                    let body: CreateRefundResponse = res
                        .json()
                        .await
                        .map_err(|e| AppError::GatewayError(e.to_string()))?;
                    return Ok(body.refund_ref);
                }
                Ok(res) => {
                    last_error = format!("HTTP {}", res.status());
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            tracing::warn!(
                attempt,
                max_retries = self.max_retries,
                error = %last_error,
                "create_refund retrying"
            );
        }

        Err(AppError::GatewayError(format!(
            "create_refund が {} 回失敗しました: {last_error}",
            self.max_retries
        )))
    }
}
