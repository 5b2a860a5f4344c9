//! Trait abstraction for telemetry message sources to enable testing

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{Result, TelemetryError};
use crate::message::protocol::{Heartbeat, Message};

/// Pull interface over a stream of decoded telemetry messages
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSource: Send {
    /// Wait for the next message; `None` once the source is closed
    async fn recv(&mut self) -> Option<Message>;

    /// Return the next message if one is already pending
    fn try_recv(&mut self) -> Option<Message>;
}

/// Message source fed by a background reader through a bounded channel
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<Message>,
}

impl ChannelSource {
    /// Create a source and the sender the reader pushes into
    pub fn channel(capacity: usize) -> (mpsc::Sender<Message>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    fn try_recv(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }
}

/// Wait for the first HEARTBEAT from the flight controller
///
/// Messages of other kinds received while waiting are discarded.
///
/// # Errors
///
/// - `HeartbeatTimeout` if nothing arrives within `timeout`
/// - `SourceClosed` if the source ends first
pub async fn await_heartbeat<S>(source: &mut S, timeout: Duration) -> Result<Heartbeat>
where
    S: MessageSource + ?Sized,
{
    let wait = async {
        loop {
            match source.recv().await {
                Some(Message::Heartbeat(heartbeat)) => return Ok(heartbeat),
                Some(other) => debug!("Discarding {} before heartbeat", other.kind()),
                None => return Err(TelemetryError::SourceClosed),
            }
        }
    };

    let heartbeat = tokio::time::timeout(timeout, wait)
        .await
        .map_err(|_| TelemetryError::HeartbeatTimeout(timeout))??;

    info!("Heartbeat received (custom_mode {})", heartbeat.custom_mode);
    Ok(heartbeat)
}

/// Wait for the first HEARTBEAT unless `shutdown` resolves first
///
/// # Returns
///
/// * `Result<Option<Heartbeat>>` - The heartbeat, or `None` if shutdown won
///
/// # Errors
///
/// Same as [`await_heartbeat`]
pub async fn await_heartbeat_or_shutdown<S, F>(
    source: &mut S,
    timeout: Duration,
    shutdown: F,
) -> Result<Option<Heartbeat>>
where
    S: MessageSource + ?Sized,
    F: Future<Output = ()>,
{
    tokio::select! {
        biased;

        _ = shutdown => {
            info!("Shutdown requested while waiting for heartbeat");
            Ok(None)
        }

        result = await_heartbeat(source, timeout) => result.map(Some),
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted source replaying a fixed list of messages, then closing
    pub struct ScriptedSource {
        pub messages: VecDeque<Message>,
        pub try_recv_calls: usize,
    }

    impl ScriptedSource {
        pub fn new(messages: Vec<Message>) -> Self {
            Self {
                messages: messages.into(),
                try_recv_calls: 0,
            }
        }
    }

    #[async_trait]
    impl MessageSource for ScriptedSource {
        async fn recv(&mut self) -> Option<Message> {
            self.messages.pop_front()
        }

        fn try_recv(&mut self) -> Option<Message> {
            self.try_recv_calls += 1;
            self.messages.pop_front()
        }
    }
}
