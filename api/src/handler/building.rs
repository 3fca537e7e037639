use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use garde::Validate;

use kernel::model::id::BuildingId;
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::building::{
        BuildingListQuery, BuildingResponse, CreateBuildingRequest, PaginatedBuildingResponse,
        UpdateBuildingRequest,
    },
};

pub async fn register_building(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateBuildingRequest>,
) -> AppResult<StatusCode> {
    if !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }
    req.validate(&())?;

    registry
        .building_repository()
        .create(req.into())
        .await
        .map(|_| StatusCode::CREATED)
}

pub async fn show_building_list(
    _user: AuthorizedUser,
    Query(query): Query<BuildingListQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<PaginatedBuildingResponse>> {
    query.validate(&())?;

    registry
        .building_repository()
        .find_all(query.options())
        .await
        .map(PaginatedBuildingResponse::from)
        .map(Json)
}

pub async fn show_building(
    _user: AuthorizedUser,
    Path(building_id): Path<BuildingId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<BuildingResponse>> {
    registry
        .building_repository()
        .find_by_id(building_id)
        .await
        .and_then(|building| match building {
            Some(building) => Ok(Json(building.into())),
            None => Err(AppError::EntityNotFound(format!(
                "建物（{building_id}）が見つかりませんでした。"
            ))),
        })
}

pub async fn update_building(
    user: AuthorizedUser,
    Path(building_id): Path<BuildingId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<UpdateBuildingRequest>,
) -> AppResult<StatusCode> {
    if !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }
    req.validate(&())?;

    registry
        .building_repository()
        .update(req.into_event(building_id))
        .await
        .map(|_| StatusCode::OK)
}
