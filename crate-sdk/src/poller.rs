use std::time::Duration;

use anyhow::Result;
use reqwest::Url;
use tokio::time::MissedTickBehavior;
use tracing::warn;
use types::{BranchName, SessionToken};

use crate::handler::{EmptyHandler, ErasedHandler, PollEvent};
use crate::http::Http;

const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

/// control message for a running [`Poller`]
#[derive(Debug)]
pub enum PollerCommand {
    /// fetch now instead of waiting for the next tick
    Refresh,

    /// make [`Poller::run`] return
    Stop,
}

/// periodically fetches the unread count for one branch and hands it to the
/// handler
///
/// the first fetch happens as soon as `run` is called, later ones on a fixed
/// period. a failed fetch is logged and skipped; the loop only ends through
/// the controller.
pub struct Poller {
    handler: Box<dyn ErasedHandler>,
    http: Http,
    branch: BranchName,
    period: Duration,
    notifications: bool,
    controller: Option<tokio::sync::mpsc::Receiver<PollerCommand>>,
}

impl Poller {
    pub fn new(token: SessionToken, branch: BranchName) -> Self {
        Self {
            handler: Box::new(EmptyHandler),
            http: Http::new(token),
            branch,
            period: DEFAULT_PERIOD,
            notifications: false,
            controller: None,
        }
    }

    pub fn with_base_url(self, base_url: Url) -> Self {
        Self {
            http: self.http.with_base_url(base_url),
            ..self
        }
    }

    pub fn with_handler(self, handler: Box<dyn ErasedHandler>) -> Self {
        Self { handler, ..self }
    }

    pub fn with_period(self, period: Duration) -> Self {
        Self { period, ..self }
    }

    /// also poll the notification count endpoint on every tick
    pub fn with_notifications(self, notifications: bool) -> Self {
        Self {
            notifications,
            ..self
        }
    }

    pub fn with_controller(self, commands: tokio::sync::mpsc::Receiver<PollerCommand>) -> Self {
        Self {
            controller: Some(commands),
            ..self
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            if let Some(controller) = &mut self.controller {
                tokio::select! {
                    _ = interval.tick() => {}
                    cmd = controller.recv() => match cmd {
                        Some(PollerCommand::Refresh) => {}
                        // a closed controller counts as a stop
                        Some(PollerCommand::Stop) | None => return Ok(()),
                    },
                }
            } else {
                interval.tick().await;
            }
            self.tick().await;
        }
    }

    // ticks run to completion before the next one fires, so two fetches are
    // never in flight at once and the display can't see out of order counts
    async fn tick(&mut self) {
        match self.http.unread_message_count(&self.branch).await {
            Ok(count) => self.handler.handle(PollEvent::UnreadMessages(count)).await,
            Err(err) => {
                warn!("failed to fetch unread message count: {err}");
                self.handler.handle(PollEvent::Error(err.to_string())).await;
            }
        }

        if self.notifications {
            match self.http.unread_notification_count(&self.branch).await {
                Ok(count) => {
                    self.handler
                        .handle(PollEvent::UnreadNotifications(count))
                        .await
                }
                Err(err) => {
                    warn!("failed to fetch unread notification count: {err}");
                    self.handler.handle(PollEvent::Error(err.to_string())).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::{ready, Future};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum::Router;
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use types::UnreadCount;

    use crate::handler::CountHandler;

    use super::*;

    const TICK: Duration = Duration::from_secs(60);
    const WAIT: Duration = Duration::from_secs(5);

    /// forwards every event out of the poller task
    struct Recorder {
        events: mpsc::UnboundedSender<PollEvent>,
    }

    impl CountHandler for Recorder {
        type Error = ();

        fn unread_messages(
            &mut self,
            count: UnreadCount,
        ) -> impl Future<Output = Result<(), ()>> + Send {
            let _ = self.events.send(PollEvent::UnreadMessages(count));
            ready(Ok(()))
        }

        fn unread_notifications(
            &mut self,
            count: UnreadCount,
        ) -> impl Future<Output = Result<(), ()>> + Send {
            let _ = self.events.send(PollEvent::UnreadNotifications(count));
            ready(Ok(()))
        }

        fn error(&mut self, err: String) -> impl Future<Output = Result<(), ()>> + Send {
            let _ = self.events.send(PollEvent::Error(err));
            ready(Ok(()))
        }
    }

    async fn serve(app: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/").parse().unwrap()
    }

    fn counting_app(count: u64) -> (Router, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = {
            let hits = hits.clone();
            Router::new().fallback(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    axum::Json(UnreadCount { count })
                }
            })
        };
        (app, hits)
    }

    fn poller(base: Url) -> Poller {
        Poller::new(
            "sekrit".to_string().into(),
            "fairview".to_string().into(),
        )
        .with_base_url(base)
        .with_period(TICK)
    }

    #[tokio::test]
    async fn first_tick_is_immediate_and_stop_ends_the_loop() {
        let (app, _) = counting_app(5);
        let base = serve(app).await;

        let (control, commands) = mpsc::channel(8);
        let (events, mut recorded) = mpsc::unbounded_channel();
        let task = tokio::spawn(
            poller(base)
                .with_handler(Box::new(Recorder { events }))
                .with_controller(commands)
                .run(),
        );

        let event = timeout(WAIT, recorded.recv()).await.unwrap().unwrap();
        assert!(matches!(
            event,
            PollEvent::UnreadMessages(UnreadCount { count: 5 })
        ));
        // nothing else until the next tick, a minute away
        assert!(recorded.try_recv().is_err());

        control.send(PollerCommand::Stop).await.unwrap();
        timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    }

    #[tokio::test]
    async fn refresh_forces_a_tick() {
        let (app, _) = counting_app(2);
        let base = serve(app).await;

        let (control, commands) = mpsc::channel(8);
        let (events, mut recorded) = mpsc::unbounded_channel();
        let task = tokio::spawn(
            poller(base)
                .with_handler(Box::new(Recorder { events }))
                .with_controller(commands)
                .run(),
        );

        timeout(WAIT, recorded.recv()).await.unwrap().unwrap();
        control.send(PollerCommand::Refresh).await.unwrap();
        let event = timeout(WAIT, recorded.recv()).await.unwrap().unwrap();
        assert!(matches!(
            event,
            PollEvent::UnreadMessages(UnreadCount { count: 2 })
        ));

        control.send(PollerCommand::Stop).await.unwrap();
        timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    }

    #[tokio::test]
    async fn notifications_are_polled_when_enabled() {
        let (app, _) = counting_app(1);
        let base = serve(app).await;

        let (control, commands) = mpsc::channel(8);
        let (events, mut recorded) = mpsc::unbounded_channel();
        let task = tokio::spawn(
            poller(base)
                .with_notifications(true)
                .with_handler(Box::new(Recorder { events }))
                .with_controller(commands)
                .run(),
        );

        let first = timeout(WAIT, recorded.recv()).await.unwrap().unwrap();
        let second = timeout(WAIT, recorded.recv()).await.unwrap().unwrap();
        assert!(matches!(first, PollEvent::UnreadMessages(_)));
        assert!(matches!(second, PollEvent::UnreadNotifications(_)));

        control.send(PollerCommand::Stop).await.unwrap();
        timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    }

    #[tokio::test]
    async fn a_failing_fetch_does_not_kill_the_loop() {
        let app = Router::new().fallback(|| async { StatusCode::INTERNAL_SERVER_ERROR });
        let base = serve(app).await;

        let (control, commands) = mpsc::channel(8);
        let (events, mut recorded) = mpsc::unbounded_channel();
        let task = tokio::spawn(
            poller(base)
                .with_handler(Box::new(Recorder { events }))
                .with_controller(commands)
                .run(),
        );

        let event = timeout(WAIT, recorded.recv()).await.unwrap().unwrap();
        assert!(matches!(event, PollEvent::Error(_)));

        // still alive: a refresh produces another failed tick
        control.send(PollerCommand::Refresh).await.unwrap();
        let event = timeout(WAIT, recorded.recv()).await.unwrap().unwrap();
        assert!(matches!(event, PollEvent::Error(_)));

        control.send(PollerCommand::Stop).await.unwrap();
        timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    }

    #[tokio::test]
    async fn no_handler_still_polls() {
        let (app, hits) = counting_app(4);
        let base = serve(app).await;

        let (control, commands) = mpsc::channel(8);
        let task = tokio::spawn(poller(base).with_controller(commands).run());

        timeout(WAIT, async {
            while hits.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        control.send(PollerCommand::Stop).await.unwrap();
        timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    }
}
