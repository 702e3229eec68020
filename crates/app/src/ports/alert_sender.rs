//! Alert sender port: one-way, best-effort notifications.

use std::future::Future;
use std::sync::Arc;

use adrules_domain::alert::Alert;

/// Delivers an [`Alert`] somewhere a human will see it.
///
/// Sending never fails from the caller's point of view: implementations log
/// and swallow their own transport errors.
pub trait AlertSender {
    fn send(&self, alert: Alert) -> impl Future<Output = ()> + Send;
}

impl<T: AlertSender + Send + Sync> AlertSender for Arc<T> {
    fn send(&self, alert: Alert) -> impl Future<Output = ()> + Send {
        (**self).send(alert)
    }
}

/// `None` means no sender is configured; alerts are dropped silently.
impl<T: AlertSender + Send + Sync> AlertSender for Option<T> {
    fn send(&self, alert: Alert) -> impl Future<Output = ()> + Send {
        async move {
            if let Some(sender) = self {
                sender.send(alert).await;
            }
        }
    }
}
