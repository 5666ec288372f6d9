use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, warn};

use crate::event::RoomEvent;

use super::types::TransportAction;

/// Longest silence the remote service allows before it pings us
pub const KEEPALIVE_PERIOD: Duration = Duration::from_secs(12);

/// Something that yields inbound transport events one at a time
#[async_trait]
pub trait EventSource: Send {
    /// The next event, or `None` once the connection is closed
    async fn next_event(&mut self) -> Option<RoomEvent>;
}

#[async_trait]
impl EventSource for mpsc::UnboundedReceiver<RoomEvent> {
    async fn next_event(&mut self) -> Option<RoomEvent> {
        self.recv().await
    }
}

/// Reads JSON encoded events, one per line, and interleaves keep-alives
pub struct LineEventSource<R> {
    lines: Lines<R>,
    keepalive: Interval,
}

impl<R> LineEventSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R, keepalive_period: Duration) -> Self {
        let mut keepalive = interval_at(Instant::now() + keepalive_period, keepalive_period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            lines: reader.lines(),
            keepalive,
        }
    }
}

#[async_trait]
impl<R> EventSource for LineEventSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_event(&mut self) -> Option<RoomEvent> {
        loop {
            tokio::select! {
                line = self.lines.next_line() => match line {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<RoomEvent>(line) {
                            Ok(event) => return Some(event),
                            Err(e) => {
                                warn!(error = %e, "Skipping malformed event line");
                            }
                        }
                    }
                    Ok(None) => {
                        debug!("Event stream closed");
                        return None;
                    }
                    Err(e) => {
                        error!(error = %e, "Failed reading event stream");
                        return None;
                    }
                },
                _ = self.keepalive.tick() => return Some(RoomEvent::KeepAlive),
            }
        }
    }
}

/// Write every outbound action as a JSON line until the channel closes
pub async fn forward_actions<W>(
    mut receiver: mpsc::UnboundedReceiver<TransportAction>,
    mut writer: W,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(action) = receiver.recv().await {
        let mut line = serde_json::to_string(&action)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
