use std::sync::Arc;

use application::{
    AdmissionController, AffinityService, LocalMessageBroadcaster, MessageService,
    NotificationService,
};

#[derive(Clone)]
pub struct AppState {
    pub affinity_service: Arc<AffinityService>,
    pub message_service: Arc<MessageService>,
    pub notification_service: Arc<NotificationService>,
    pub admission: Arc<AdmissionController>,
    /// WebSocket 订阅从这里取流；跨节点部署时由 Redis 桥接任务灌入
    pub broadcaster: Arc<LocalMessageBroadcaster>,
}

impl AppState {
    pub fn new(
        affinity_service: Arc<AffinityService>,
        message_service: Arc<MessageService>,
        notification_service: Arc<NotificationService>,
        admission: Arc<AdmissionController>,
        broadcaster: Arc<LocalMessageBroadcaster>,
    ) -> Self {
        Self {
            affinity_service,
            message_service,
            notification_service,
            admission,
            broadcaster,
        }
    }
}
