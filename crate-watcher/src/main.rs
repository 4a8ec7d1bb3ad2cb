use std::str::FromStr;
use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use sdk::{Client, CountHandler, Poller, PollerCommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use types::UnreadCount;

use crate::config::Config;

mod config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config: Config = figment::Figment::new()
        .merge(Toml::file("watcher.toml"))
        .merge(Env::raw())
        .extract()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_str(&config.rust_log)?)
        .init();

    info!("watching branch {:?}", config.branch);

    let mut client = Client::new(config.token.into(), config.branch.into());
    client.http = if let Some(base_url) = &config.base_url {
        client.http.with_base_url(base_url.parse()?)
    } else {
        client.http
    };
    client.poller = if let Some(base_url) = &config.base_url {
        client.poller.with_base_url(base_url.parse()?)
    } else {
        client.poller
    };
    client.poller = if let Some(secs) = config.period_secs {
        client.poller.with_period(Duration::from_secs(secs))
    } else {
        client.poller
    };

    let (control, commands) = tokio::sync::mpsc::channel(100);
    let poller: Poller = client
        .poller
        .with_notifications(config.notifications)
        .with_handler(Box::new(Handle {
            messages: None,
            notifications: None,
        }))
        .with_controller(commands);

    let mut task = tokio::spawn(poller.run());

    tokio::select! {
        res = &mut task => res??,
        _ = tokio::signal::ctrl_c() => {
            info!("stopping");
            let _ = control.send(PollerCommand::Stop).await;
            task.await??;
        }
    }

    Ok(())
}

/// renders the counters on the terminal
///
/// the counter only shows up while there is something unread; at zero it
/// disappears from the info level, like a hidden badge
struct Handle {
    messages: Option<UnreadCount>,
    notifications: Option<UnreadCount>,
}

impl CountHandler for Handle {
    type Error = anyhow::Error;

    async fn unread_messages(&mut self, count: UnreadCount) -> Result<(), Self::Error> {
        if self.messages != Some(count) {
            if count.visible() {
                info!("{count} unread messages");
            } else {
                debug!("no unread messages");
            }
            self.messages = Some(count);
        }
        Ok(())
    }

    async fn unread_notifications(&mut self, count: UnreadCount) -> Result<(), Self::Error> {
        if self.notifications != Some(count) {
            if count.visible() {
                info!("{count} unread notifications");
            } else {
                debug!("no unread notifications");
            }
            self.notifications = Some(count);
        }
        Ok(())
    }
}
