use axum::{
    routing::{get, post},
    Router,
};
use registry::AppRegistry;

use crate::handler::{
    booking::{
        approve_booking, cancel_booking, reject_booking, request_booking_refund, show_booking,
        show_booking_list, show_my_bookings,
    },
    webhook::{payment_callback, refund_callback},
};

pub fn build_booking_routers() -> Router<AppRegistry> {
    let bookings_routers = Router::new()
        .route("/", get(show_booking_list))
        .route("/me", get(show_my_bookings))
        .route("/:booking_id", get(show_booking))
        .route("/:booking_id/approve", post(approve_booking))
        .route("/:booking_id/reject", post(reject_booking))
        .route("/:booking_id/cancel", post(cancel_booking))
        .route("/:booking_id/refund", post(request_booking_refund));

    // ゲートウェイからの非同期確定通知
    let webhook_routers = Router::new()
        .route("/payments", post(payment_callback))
        .route("/refunds", post(refund_callback));

    Router::new()
        .nest("/bookings", bookings_routers)
        .nest("/webhooks", webhook_routers)
}
