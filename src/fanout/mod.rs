mod analytics;
mod notifications;
mod realtime;

pub use analytics::{AnalyticsHandler, AnalyticsStore};
pub use notifications::{NewNotification, NotificationHandler, NotificationStore};
pub use realtime::{RealtimeEvent, RealtimeHub};
