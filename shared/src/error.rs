use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    UnprocessableEntity(String),
    #[error("{0}")]
    EntityNotFound(String),
    #[error("{0}")]
    ValidationError(#[from] garde::Report),
    // 指定スロットがすでに押さえられている場合のエラー
    #[error("{0}")]
    SlotConflictError(String),
    // 状態遷移表にない遷移が要求された場合のエラー
    #[error("遷移 {from} -> {to} は許可されていません")]
    StateTransitionError { from: String, to: String },
    #[error("決済ゲートウェイの呼び出しに失敗しました: {0}")]
    GatewayError(String),
    #[error("トランザクション処理中にエラーが発生しました")]
    TransactionError(#[source] sqlx::Error),
    #[error("データベース処理中にエラーが発生しました")]
    SpecificOperationError(#[source] sqlx::Error),
    #[error("{0}")]
    NoRowsAffectedError(String),
    #[error("{0}")]
    ConversionEntityError(String),
    #[error("認証情報が不足しています")]
    UnauthenticatedError,
    #[error("この操作を行う権限がありません")]
    ForbiddenOperation,
    #[error("{0}")]
    ExternalServiceError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status_code = match self {
            AppError::UnprocessableEntity(_) | AppError::ValidationError(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::EntityNotFound(_) => StatusCode::NOT_FOUND,
            AppError::SlotConflictError(_) | AppError::StateTransitionError { .. } => {
                StatusCode::CONFLICT
            }
            AppError::GatewayError(_) | AppError::ExternalServiceError(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::UnauthenticatedError => StatusCode::UNAUTHORIZED,
            AppError::ForbiddenOperation => StatusCode::FORBIDDEN,
            AppError::TransactionError(_)
            | AppError::SpecificOperationError(_)
            | AppError::NoRowsAffectedError(_)
            | AppError::ConversionEntityError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // 5xx 系はサーバー側の障害なので、原因チェーンごとログに残す
        if status_code.is_server_error() {
            tracing::error!(
                error.cause_chain = ?self,
                error.message = %self,
                "Unexpected error happened"
            );
        } else {
            tracing::warn!(
                error.cause_chain = ?self,
                error.message = %self,
                "Request failed"
            );
        }

        (status_code, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
