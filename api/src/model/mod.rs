use kernel::model::list::PaginatedList;
use serde::Serialize;

pub mod availability;
pub mod booking;
pub mod building;

// 一覧系レスポンスで共通のページネーション情報
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResponse {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items_per_page: i64,
}

impl<T> From<&PaginatedList<T>> for PaginationResponse {
    fn from(value: &PaginatedList<T>) -> Self {
        Self {
            current_page: value.page,
            total_pages: value.total_pages(),
            total_items: value.total,
            items_per_page: value.limit,
        }
    }
}
