use shared::error::AppError;
use sqlx::FromRow;
use uuid::Uuid;

use kernel::model::building::{Building, BuildingManager};

#[derive(FromRow)]
pub struct BuildingRow {
    pub building_id: Uuid,
    pub building_name: String,
    pub building_type: String,
    pub capacity: i32,
    pub rental_price: i64,
    pub location: String,
    pub facilities: Vec<String>,
    // managers は JSONB カラム
    pub managers: serde_json::Value,
}

impl TryFrom<BuildingRow> for Building {
    type Error = AppError;

    fn try_from(row: BuildingRow) -> Result<Self, Self::Error> {
        let managers: Vec<BuildingManager> =
            serde_json::from_value(row.managers).map_err(|e| {
                AppError::ConversionEntityError(format!("managers カラムの形式が不正です: {e}"))
            })?;
        Ok(Building {
            building_id: row.building_id.into(),
            building_name: row.building_name,
            building_type: row.building_type,
            capacity: row.capacity,
            rental_price: row.rental_price,
            location: row.location,
            facilities: row.facilities,
            managers,
        })
    }
}

#[derive(FromRow)]
pub struct PaginatedBuildingRow {
    pub total: i64,
    #[sqlx(flatten)]
    pub row: BuildingRow,
}
