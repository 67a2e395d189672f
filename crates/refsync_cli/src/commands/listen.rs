//! Listen command implementation.

use refsync_engine::{
    ChannelConfig, ConnectionState, LibraryChanged, NotificationChannel, WebSocketConnector,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Runs the listen command until interrupted.
pub fn run(url: &str, api_key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(listen(url, api_key))
}

async fn listen(url: &str, api_key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let channel = NotificationChannel::spawn(ChannelConfig::new(url), WebSocketConnector::new());
    let mut events = channel.subscribe();
    let mut status = channel.watch_status();

    // A failed first attempt keeps retrying in the background.
    if let Err(e) = channel.connect(api_key).await {
        warn!(error = %e, "initial connection failed");
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => println!("{}", format_event(&event)),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "dropped notifications"),
                Err(RecvError::Closed) => break,
            },
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                if current.state == ConnectionState::Disconnected && current.retry_count > 0 {
                    info!(retry_count = current.retry_count, "waiting to reconnect");
                }
            }
            _ = &mut shutdown => {
                info!("interrupted");
                break;
            }
        }
    }

    channel.disconnect(Some(api_key.to_string())).await?;
    Ok(())
}

fn format_event(event: &LibraryChanged) -> String {
    let library = event
        .library
        .as_ref()
        .map_or_else(|| "-".to_string(), ToString::to_string);
    match event.version {
        Some(version) => format!("{:?} {} @ {}", event.change, library, version),
        None => format!("{:?} {}", event.change, library),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refsync_protocol::LibraryChange;
    use refsync_store::LibraryId;

    #[test]
    fn formats_events() {
        let event = LibraryChanged {
            library: Some(LibraryId::new("g7")),
            change: LibraryChange::Updated,
            version: Some(12),
        };
        assert_eq!(format_event(&event), "Updated g7 @ 12");

        let event = LibraryChanged {
            library: None,
            change: LibraryChange::Added,
            version: None,
        };
        assert_eq!(format_event(&event), "Added -");
    }
}
