use async_trait::async_trait;
use uuid::Uuid;

use kernel::gateway::AttachmentStore;
use kernel::model::attachment::AttachmentUpload;
use shared::{
    config::AttachmentConfig,
    error::{AppError, AppResult},
};

// 添付書類をローカルディスクへ保存する実装。
// 返す参照はファイル名のみで、エンジン側は中身を解釈しない。
pub struct FsAttachmentStore {
    root_dir: std::path::PathBuf,
}

impl FsAttachmentStore {
    pub fn new(cfg: &AttachmentConfig) -> Self {
        Self {
            root_dir: std::path::PathBuf::from(&cfg.root_dir),
        }
    }
}

#[async_trait]
impl AttachmentStore for FsAttachmentStore {
    async fn store(&self, upload: AttachmentUpload) -> AppResult<String> {
        tokio::fs::create_dir_all(&self.root_dir)
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("添付保存先を作成できません: {e}")))?;

        // 元のファイル名は参照に含めず、衝突しない名前を採番する
        let extension = std::path::Path::new(&upload.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let reference = format!("att-{}.{extension}", Uuid::new_v4());

        let path = self.root_dir.join(&reference);
        tokio::fs::write(&path, &upload.content)
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("添付を保存できません: {e}")))?;

        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_validated_upload_and_returns_reference() -> anyhow::Result<()> {
        let dir = std::env::temp_dir().join(format!("attachments-{}", Uuid::new_v4()));
        let store = FsAttachmentStore {
            root_dir: dir.clone(),
        };

        let upload = AttachmentUpload::new(
            "申請書.pdf".into(),
            "application/pdf".into(),
            b"%PDF-1.7".to_vec(),
        )?;
        let reference = store.store(upload).await?;

        assert!(reference.starts_with("att-"));
        assert!(reference.ends_with(".pdf"));
        let saved = tokio::fs::read(dir.join(&reference)).await?;
        assert_eq!(saved, b"%PDF-1.7");

        tokio::fs::remove_dir_all(dir).await?;
        Ok(())
    }
}
