use axum::{extract::FromRequestParts, http::request::Parts};

use kernel::model::{id::UserId, role::Role};
use shared::error::AppError;

// 認証自体は前段（API ゲートウェイ等）で済んでいる前提で、
// 検証済みのユーザー ID とロールをヘッダーから受け取る。
// セッション管理はこのサービスの責務ではない。
pub struct AuthorizedUser {
    user_id: UserId,
    role: Role,
}

impl AuthorizedUser {
    pub fn id(&self) -> UserId {
        self.user_id
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthorizedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<UserId>().ok())
            .ok_or(AppError::UnauthenticatedError)?;

        // ロールヘッダーがない場合は一般ユーザー扱い
        let role = parts
            .headers
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<Role>().ok())
            .unwrap_or_default();

        Ok(Self { user_id, role })
    }
}
