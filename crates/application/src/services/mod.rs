pub mod affinity_service;
pub mod message_service;
pub mod notification_service;

#[cfg(test)]
mod affinity_service_tests;

pub use affinity_service::{AffinityService, AffinityServiceDependencies, LikeRequest};
pub use message_service::{MessageService, MessageServiceDependencies, SendMessageRequest};
pub use notification_service::{NotificationService, NotificationServiceDependencies};
