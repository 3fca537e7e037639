use axum::{
    routing::{get, post, put},
    Router,
};
use registry::AppRegistry;

use crate::handler::{
    availability::{building_calendar, search_available_buildings},
    booking::submit_booking,
    building::{register_building, show_building, show_building_list, update_building},
};

pub fn build_building_routers() -> Router<AppRegistry> {
    let buildings_routers = Router::new()
        .route("/", post(register_building))
        .route("/", get(show_building_list))
        // ":building_id" より先にマッチさせる
        .route("/available", get(search_available_buildings))
        .route("/:building_id", get(show_building))
        .route("/:building_id", put(update_building))
        .route("/:building_id/calendar", get(building_calendar))
        .route("/:building_id/bookings", post(submit_booking));

    Router::new().nest("/buildings", buildings_routers)
}
