use chrono::{NaiveDate, NaiveTime};
use garde::Validate;
use kernel::model::{booking::schedule::DayAvailability, id::BuildingId};
use serde::{Deserialize, Serialize};

use super::building::BuildingResponse;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CalendarQuery {
    #[garde(range(min = 2000, max = 2100))]
    pub year: i32,
    #[garde(range(min = 1, max = 12))]
    pub month: u32,
}

// 日付 + 時間帯で空いている建物を探すクエリ
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    #[garde(skip)]
    pub date: NaiveDate,
    #[garde(skip)]
    pub start_time: NaiveTime,
    #[garde(skip)]
    pub end_time: NaiveTime,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarResponse {
    pub building_id: BuildingId,
    pub year: i32,
    pub month: u32,
    pub days: Vec<DayAvailability>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableBuildingsResponse {
    pub items: Vec<BuildingResponse>,
}
