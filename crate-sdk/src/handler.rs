use async_trait::async_trait;
use std::future::{ready, Future};
use types::UnreadCount;

/// what one poll produced
#[derive(Debug, Clone)]
pub enum PollEvent {
    /// the unread message count for the watched branch
    UnreadMessages(UnreadCount),

    /// the unread notification count for the watched branch
    UnreadNotifications(UnreadCount),

    /// the fetch failed; whatever was last displayed stays as-is
    Error(String),
}

/// receives counts as they are polled; every method defaults to a no-op, so
/// a display only implements what it renders
#[allow(unused_variables)]
pub trait CountHandler: Send {
    type Error: Send;

    fn unread_messages(
        &mut self,
        count: UnreadCount,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        ready(Ok(()))
    }

    fn unread_notifications(
        &mut self,
        count: UnreadCount,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        ready(Ok(()))
    }

    fn error(&mut self, err: String) -> impl Future<Output = Result<(), Self::Error>> + Send {
        ready(Ok(()))
    }
}

/// the absent-display case: counts are fetched and dropped
pub struct EmptyHandler;

impl CountHandler for EmptyHandler {
    type Error = ();
}

#[async_trait]
pub trait ErasedHandler: Send {
    async fn handle(&mut self, event: PollEvent);
}

#[async_trait]
impl<T, E> ErasedHandler for T
where
    T: CountHandler<Error = E>,
{
    async fn handle(&mut self, event: PollEvent) {
        let _ = match event {
            PollEvent::UnreadMessages(count) => self.unread_messages(count).await,
            PollEvent::UnreadNotifications(count) => self.unread_notifications(count).await,
            PollEvent::Error(err) => self.error(err).await,
        };
    }
}
