use std::sync::Arc;

use adapter::database::ConnectionPool;
use adapter::gateway::{
    attachment::FsAttachmentStore, notifier::WebhookNotifier, payment::HttpPaymentGateway,
};
use adapter::repository::{
    booking::BookingRepositoryImpl, building::BuildingRepositoryImpl,
    health::HealthCheckRepositoryImpl, payment::PaymentRepositoryImpl,
};
use kernel::gateway::{AttachmentStore, NotificationDispatcher, PaymentGateway};
use kernel::model::booking::BookingStatus;
use kernel::repository::{
    booking::BookingRepository, building::BuildingRepository, health::HealthCheckRepository,
    payment::PaymentRepository,
};
use shared::config::AppConfig;

#[derive(Clone)]
pub struct AppRegistry {
    health_check_repository: Arc<dyn HealthCheckRepository>,
    booking_repository: Arc<dyn BookingRepository>,
    building_repository: Arc<dyn BuildingRepository>,
    payment_repository: Arc<dyn PaymentRepository>,
    payment_gateway: Arc<dyn PaymentGateway>,
    notification_dispatcher: Arc<dyn NotificationDispatcher>,
    attachment_store: Arc<dyn AttachmentStore>,
    // 占有扱いにするステータス集合。衝突判定へ常にこれを渡す
    active_hold: Arc<Vec<BookingStatus>>,
}

impl AppRegistry {
    pub fn new(pool: ConnectionPool, app_config: AppConfig) -> Self {
        let health_check_repository = Arc::new(HealthCheckRepositoryImpl::new(pool.clone()));
        let booking_repository = Arc::new(BookingRepositoryImpl::new(pool.clone()));
        let building_repository = Arc::new(BuildingRepositoryImpl::new(pool.clone()));
        let payment_repository = Arc::new(PaymentRepositoryImpl::new(pool.clone()));
        let payment_gateway = Arc::new(HttpPaymentGateway::new(&app_config.gateway));
        let notification_dispatcher = Arc::new(WebhookNotifier::new(&app_config.notifier));
        let attachment_store = Arc::new(FsAttachmentStore::new(&app_config.attachment));
        Self {
            health_check_repository,
            booking_repository,
            building_repository,
            payment_repository,
            payment_gateway,
            notification_dispatcher,
            attachment_store,
            active_hold: Arc::new(BookingStatus::ACTIVE_HOLD.to_vec()),
        }
    }

    pub fn health_check_repository(&self) -> Arc<dyn HealthCheckRepository> {
        self.health_check_repository.clone()
    }

    pub fn booking_repository(&self) -> Arc<dyn BookingRepository> {
        self.booking_repository.clone()
    }

    pub fn building_repository(&self) -> Arc<dyn BuildingRepository> {
        self.building_repository.clone()
    }

    pub fn payment_repository(&self) -> Arc<dyn PaymentRepository> {
        self.payment_repository.clone()
    }

    pub fn payment_gateway(&self) -> Arc<dyn PaymentGateway> {
        self.payment_gateway.clone()
    }

    pub fn notification_dispatcher(&self) -> Arc<dyn NotificationDispatcher> {
        self.notification_dispatcher.clone()
    }

    pub fn attachment_store(&self) -> Arc<dyn AttachmentStore> {
        self.attachment_store.clone()
    }

    pub fn active_hold(&self) -> &[BookingStatus] {
        &self.active_hold
    }
}
