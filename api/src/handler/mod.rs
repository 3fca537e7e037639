use kernel::model::booking::event::BookingTransition;
use registry::AppRegistry;

pub mod availability;
pub mod booking;
pub mod building;
pub mod health;
pub mod webhook;

// 確定した遷移を通知ディスパッチャへ渡す。
// 配送はディスパッチャ側で切り離されるため、ここでは完了を待たない。
pub(crate) async fn notify_transition(registry: &AppRegistry, transition: &BookingTransition) {
    registry
        .notification_dispatcher()
        .notify(
            transition.borrower_id,
            &transition.event_type(),
            serde_json::json!({
                "bookingId": transition.booking_id,
                "from": transition.from,
                "to": transition.to,
            }),
        )
        .await;
}
