use anyhow::Result;

pub struct AppConfig {
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    pub notifier: NotifierConfig,
    pub attachment: AttachmentConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        let database = DatabaseConfig {
            host: std::env::var("DATABASE_HOST")?,
            port: std::env::var("DATABASE_PORT")?.parse()?,
            username: std::env::var("DATABASE_USERNAME")?,
            password: std::env::var("DATABASE_PASSWORD")?,
            database: std::env::var("DATABASE_NAME")?,
        };
        let gateway = GatewayConfig {
            base_url: std::env::var("PAYMENT_GATEWAY_URL")?,
            api_key: std::env::var("PAYMENT_GATEWAY_API_KEY")?,
            max_retries: std::env::var("PAYMENT_GATEWAY_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
        };
        let notifier = NotifierConfig {
            // 未設定の場合は通知をログ出力のみにする
            webhook_url: std::env::var("NOTIFY_WEBHOOK_URL").ok(),
        };
        let attachment = AttachmentConfig {
            root_dir: std::env::var("ATTACHMENT_DIR")
                .unwrap_or_else(|_| "/var/lib/venue-booking/attachments".into()),
        };
        Ok(Self {
            database,
            gateway,
            notifier,
            attachment,
        })
    }
}

pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: String,
    pub max_retries: u32,
}

pub struct NotifierConfig {
    pub webhook_url: Option<String>,
}

pub struct AttachmentConfig {
    pub root_dir: String,
}
