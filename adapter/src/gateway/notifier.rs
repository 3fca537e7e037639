use async_trait::async_trait;

use kernel::gateway::NotificationDispatcher;
use kernel::model::id::UserId;
use shared::config::NotifierConfig;

// 遷移イベントを外部の通知サービスへ中継する。
// コアから見れば fire-and-forget。送信失敗はログに残すだけで、
// 業務処理には一切影響させない。
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(cfg: &NotifierConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: cfg.webhook_url.clone(),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookNotifier {
    async fn notify(&self, user_id: UserId, event_type: &str, payload: serde_json::Value) {
        let Some(url) = self.webhook_url.clone() else {
            // 通知先未設定の環境（開発など）ではログのみ
            tracing::info!(%user_id, event_type, %payload, "notification (no webhook configured)");
            return;
        };

        let client = self.client.clone();
        let event_type = event_type.to_string();
        let body = serde_json::json!({
            "userId": user_id,
            "eventType": event_type,
            "payload": payload,
        });

        // 応答を待たずに切り離す
        tokio::spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(res) if res.status().is_success() => {}
                Ok(res) => {
                    tracing::warn!(status = %res.status(), event_type, "notification delivery failed");
                }
                Err(e) => {
                    tracing::warn!(error = %e, event_type, "notification delivery failed");
                }
            }
        });
    }
}
