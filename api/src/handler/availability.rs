use axum::{
    extract::{Path, Query, State},
    Json,
};
use garde::Validate;

use kernel::model::{booking::schedule::Slot, id::BuildingId};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::{
        availability::{
            AvailabilityQuery, AvailableBuildingsResponse, CalendarQuery, CalendarResponse,
        },
        building::BuildingResponse,
    },
};

// 建物の月間カレンダーを返す
pub async fn building_calendar(
    _user: AuthorizedUser,
    Path(building_id): Path<BuildingId>,
    Query(query): Query<CalendarQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<CalendarResponse>> {
    query.validate(&())?;

    let days = registry
        .booking_repository()
        .month_schedule(building_id, query.year, query.month, registry.active_hold())
        .await?;

    Ok(Json(CalendarResponse {
        building_id,
        year: query.year,
        month: query.month,
        days,
    }))
}

// 指定の日付・時間帯に空いている建物を横断検索する
pub async fn search_available_buildings(
    _user: AuthorizedUser,
    Query(query): Query<AvailabilityQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<AvailableBuildingsResponse>> {
    query.validate(&())?;
    if query.end_time <= query.start_time {
        return Err(AppError::UnprocessableEntity(
            "endTime: 開始時刻より後の時刻を指定してください".into(),
        ));
    }

    let slot = Slot::single_day(query.date, query.start_time, query.end_time);
    let buildings = registry
        .booking_repository()
        .search_available_buildings(slot, registry.active_hold())
        .await?;

    Ok(Json(AvailableBuildingsResponse {
        items: buildings.into_iter().map(BuildingResponse::from).collect(),
    }))
}
