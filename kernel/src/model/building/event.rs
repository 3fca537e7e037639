use crate::model::{building::BuildingManager, id::BuildingId};

pub struct CreateBuilding {
    pub building_name: String,
    pub building_type: String,
    pub capacity: i32,
    pub rental_price: i64,
    pub location: String,
    pub facilities: Vec<String>,
    pub managers: Vec<BuildingManager>,
}

#[derive(Debug)]
pub struct UpdateBuilding {
    pub building_id: BuildingId,
    pub building_name: Option<String>,
    pub building_type: Option<String>,
    pub capacity: Option<i32>,
    pub rental_price: Option<i64>,
    pub location: Option<String>,
    pub facilities: Option<Vec<String>>,
    pub managers: Option<Vec<BuildingManager>>,
}
