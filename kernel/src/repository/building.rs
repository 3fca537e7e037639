use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{
    building::{
        event::{CreateBuilding, UpdateBuilding},
        Building,
    },
    id::BuildingId,
    list::{ListOptions, PaginatedList},
};

#[async_trait]
pub trait BuildingRepository: Send + Sync {
    async fn create(&self, event: CreateBuilding) -> AppResult<BuildingId>;
    async fn find_all(&self, options: ListOptions) -> AppResult<PaginatedList<Building>>;
    async fn find_by_id(&self, building_id: BuildingId) -> AppResult<Option<Building>>;
    async fn update(&self, event: UpdateBuilding) -> AppResult<()>;
}
