use garde::Validate;
use kernel::model::{
    building::{
        event::{CreateBuilding, UpdateBuilding},
        Building, BuildingManager,
    },
    id::BuildingId,
    list::{ListOptions, PaginatedList},
};
use serde::{Deserialize, Serialize};

use super::PaginationResponse;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBuildingRequest {
    #[garde(length(min = 1, max = 255))]
    pub building_name: String,
    #[garde(length(min = 1, max = 64))]
    pub building_type: String,
    #[garde(range(min = 1))]
    pub capacity: i32,
    #[garde(range(min = 0))]
    pub rental_price: i64,
    #[garde(length(min = 1))]
    pub location: String,
    #[garde(skip)]
    #[serde(default)]
    pub facilities: Vec<String>,
    #[garde(skip)]
    #[serde(default)]
    pub managers: Vec<BuildingManager>,
}

impl From<CreateBuildingRequest> for CreateBuilding {
    fn from(value: CreateBuildingRequest) -> Self {
        let CreateBuildingRequest {
            building_name,
            building_type,
            capacity,
            rental_price,
            location,
            facilities,
            managers,
        } = value;
        CreateBuilding {
            building_name,
            building_type,
            capacity,
            rental_price,
            location,
            facilities,
            managers,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBuildingRequest {
    #[garde(length(min = 1, max = 255))]
    pub building_name: Option<String>,
    #[garde(length(min = 1, max = 64))]
    pub building_type: Option<String>,
    #[garde(range(min = 1))]
    pub capacity: Option<i32>,
    #[garde(range(min = 0))]
    pub rental_price: Option<i64>,
    #[garde(length(min = 1))]
    pub location: Option<String>,
    #[garde(skip)]
    pub facilities: Option<Vec<String>>,
    #[garde(skip)]
    pub managers: Option<Vec<BuildingManager>>,
}

impl UpdateBuildingRequest {
    pub fn into_event(self, building_id: BuildingId) -> UpdateBuilding {
        let UpdateBuildingRequest {
            building_name,
            building_type,
            capacity,
            rental_price,
            location,
            facilities,
            managers,
        } = self;
        UpdateBuilding {
            building_id,
            building_name,
            building_type,
            capacity,
            rental_price,
            location,
            facilities,
            managers,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BuildingListQuery {
    #[garde(range(min = 1))]
    pub page: Option<i64>,
    #[garde(range(min = 1, max = 100))]
    pub limit: Option<i64>,
}

impl BuildingListQuery {
    pub fn options(&self) -> ListOptions {
        ListOptions {
            page: self.page.unwrap_or(1),
            limit: self.limit.unwrap_or(20),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingResponse {
    pub building_id: BuildingId,
    pub building_name: String,
    pub building_type: String,
    pub capacity: i32,
    pub rental_price: i64,
    pub location: String,
    pub facilities: Vec<String>,
    pub managers: Vec<BuildingManager>,
}

impl From<Building> for BuildingResponse {
    fn from(value: Building) -> Self {
        let Building {
            building_id,
            building_name,
            building_type,
            capacity,
            rental_price,
            location,
            facilities,
            managers,
        } = value;
        Self {
            building_id,
            building_name,
            building_type,
            capacity,
            rental_price,
            location,
            facilities,
            managers,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedBuildingResponse {
    pub data: Vec<BuildingResponse>,
    pub pagination: PaginationResponse,
}

impl From<PaginatedList<Building>> for PaginatedBuildingResponse {
    fn from(value: PaginatedList<Building>) -> Self {
        let pagination = PaginationResponse::from(&value);
        Self {
            data: value
                .items
                .into_iter()
                .map(BuildingResponse::from)
                .collect(),
            pagination,
        }
    }
}
