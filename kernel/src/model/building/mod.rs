use crate::model::id::BuildingId;

pub mod event;

#[derive(Debug, Clone)]
pub struct Building {
    pub building_id: BuildingId,
    pub building_name: String,
    pub building_type: String,
    pub capacity: i32,
    // 1 日あたりの利用料（最小通貨単位）
    pub rental_price: i64,
    pub location: String,
    pub facilities: Vec<String>,
    pub managers: Vec<BuildingManager>,
}

// 建物に紐づく管理者連絡先。状態機械のアクターではない。
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingManager {
    pub name: String,
    pub phone: String,
}
