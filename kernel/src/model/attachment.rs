use shared::error::{AppError, AppResult};

// 添付できるファイルサイズの上限（5 MiB）
pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

// 申請書類として受け付ける MIME タイプ
const DOCUMENT_MIME_TYPES: [&str; 4] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

// バリデーション済みの添付アップロード。
// エンジンは中身を検査しない。サイズと種別の確認だけを行い、あとは保存先の参照を持ち回る。
#[derive(Debug)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl AttachmentUpload {
    pub fn new(file_name: String, content_type: String, content: Vec<u8>) -> AppResult<Self> {
        let mut violations: Vec<String> = Vec::new();

        if !DOCUMENT_MIME_TYPES.contains(&content_type.as_str()) {
            violations.push(format!(
                "attachment: 書類形式のファイルのみ添付できます（{content_type} は不可）"
            ));
        }
        if content.is_empty() {
            violations.push("attachment: 空のファイルは添付できません".into());
        }
        if content.len() > MAX_ATTACHMENT_BYTES {
            violations.push("attachment: ファイルサイズは 5MB 以下にしてください".into());
        }

        if !violations.is_empty() {
            return Err(AppError::UnprocessableEntity(violations.join("; ")));
        }

        Ok(Self {
            file_name,
            content_type,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_small_pdf() {
        let upload =
            AttachmentUpload::new("申請書.pdf".into(), "application/pdf".into(), vec![1; 1024]);
        assert!(upload.is_ok());
    }

    #[test]
    fn rejects_images() {
        let upload = AttachmentUpload::new("写真.png".into(), "image/png".into(), vec![1; 1024]);
        assert!(upload.is_err());
    }

    #[test]
    fn rejects_oversized_files() {
        let upload = AttachmentUpload::new(
            "大きい.pdf".into(),
            "application/pdf".into(),
            vec![0; MAX_ATTACHMENT_BYTES + 1],
        );
        assert!(upload.is_err());
    }

    #[test]
    fn boundary_size_is_accepted() {
        let upload = AttachmentUpload::new(
            "ちょうど.pdf".into(),
            "application/pdf".into(),
            vec![0; MAX_ATTACHMENT_BYTES],
        );
        assert!(upload.is_ok());
    }
}
