//! Redis pub/sub broker.
//!
//! Publishing goes through a [`ConnectionManager`]; subscriptions are Redis
//! pattern subscriptions (`PSUBSCRIBE`) on a dedicated pub/sub connection.
//! Several local handlers may share one pattern; the pattern is subscribed
//! on the server while at least one handler holds it.
//!
//! A supervisor task owns the pub/sub stream. When the connection drops it
//! marks the broker disconnected, waits the configured delay and reconnects,
//! re-issuing `PSUBSCRIBE` for every pattern that still has handlers. It
//! retries forever and exits once the broker itself is dropped.
//!
//! Redis glob `*` also matches dots, so a pattern may match subjects with
//! extra segments. Consumers re-validate the subject they receive.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::RwLock;
use redis::aio::{ConnectionManager, PubSubSink, PubSubStream};
use redis::{AsyncCommands, Client, Msg};
use tokio::sync::Mutex;

use super::broker::{BrokerMessage, MessageBroker, MessageHandler, SubscriptionHandle};
use crate::config::RedisSettings;
use crate::domain::BusError;

/// Broker backed by Redis pub/sub.
pub struct RedisBroker {
    inner: Arc<Inner>,
}

struct Inner {
    client: Client,
    reconnect_delay: Duration,
    connected: AtomicBool,
    next_id: AtomicU64,
    publisher: RwLock<Option<ConnectionManager>>,
    /// Pub/sub command half. Held across `PSUBSCRIBE`/`PUNSUBSCRIBE`; every
    /// change to `handlers` is made while holding it, so the table always
    /// mirrors the server-side patterns.
    sink: Mutex<Option<PubSubSink>>,
    /// Pattern -> handlers sharing it. Never held across an await.
    handlers: RwLock<HashMap<String, Vec<(u64, MessageHandler)>>>,
}

impl RedisBroker {
    /// Create the broker and start its connection supervisor.
    ///
    /// Returns immediately; the first connection attempt happens in the
    /// background and [`MessageBroker::is_connected`] reports `false` until
    /// it succeeds.
    pub fn connect(settings: &RedisSettings) -> Result<Self, redis::RedisError> {
        let client = Client::open(settings.url.as_str())?;
        let inner = Arc::new(Inner::new(client, settings.reconnect_delay()));

        tokio::spawn(supervise(Arc::downgrade(&inner)));

        Ok(Self { inner })
    }
}

/// Connection supervisor loop.
async fn supervise(weak: Weak<Inner>) {
    loop {
        let Some(inner) = weak.upgrade() else {
            return;
        };

        match establish(&inner).await {
            Ok(stream) => {
                inner.connected.store(true, Ordering::SeqCst);
                tracing::info!("Connected to Redis message bus");
                drop(inner);

                listen(&weak, stream).await;

                let Some(inner) = weak.upgrade() else {
                    return;
                };
                inner.connected.store(false, Ordering::SeqCst);
                inner.publisher.write().take();
                *inner.sink.lock().await = None;
                tracing::warn!(
                    delay_secs = inner.reconnect_delay.as_secs(),
                    "Redis message bus connection lost, reconnecting"
                );
                let delay = inner.reconnect_delay;
                drop(inner);
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                let delay = inner.reconnect_delay;
                tracing::error!(
                    error = %err,
                    delay_secs = delay.as_secs(),
                    "Failed to connect to Redis message bus"
                );
                drop(inner);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Open both connections and restore every live pattern subscription.
async fn establish(inner: &Inner) -> Result<PubSubStream, redis::RedisError> {
    let publisher = ConnectionManager::new(inner.client.clone()).await?;
    let (mut sink, stream) = inner.client.get_async_pubsub().await?.split();

    let mut slot = inner.sink.lock().await;
    let patterns: Vec<String> = inner.handlers.read().keys().cloned().collect();
    for pattern in &patterns {
        sink.psubscribe(pattern).await?;
    }
    if !patterns.is_empty() {
        tracing::info!(patterns = patterns.len(), "Restored bus subscriptions");
    }
    *slot = Some(sink);
    *inner.publisher.write() = Some(publisher);

    Ok(stream)
}

/// Pump the pub/sub stream until it ends or the broker is dropped.
async fn listen(weak: &Weak<Inner>, mut stream: PubSubStream) {
    while let Some(msg) = stream.next().await {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        inner.dispatch(&msg);
    }
}

impl Inner {
    fn new(client: Client, reconnect_delay: Duration) -> Self {
        Self {
            client,
            reconnect_delay,
            connected: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            publisher: RwLock::new(None),
            sink: Mutex::new(None),
            handlers: RwLock::new(HashMap::new()),
        }
    }

    fn dispatch(&self, msg: &Msg) {
        let Ok(pattern) = msg.get_pattern::<String>() else {
            return;
        };
        self.deliver(&pattern, msg.get_channel_name(), msg.get_payload_bytes());
    }

    /// Hand one message to every handler of `pattern`. Only the handler
    /// table is consulted, so delivery proceeds while a (un)subscribe is
    /// waiting on the server.
    fn deliver(&self, pattern: &str, channel: &str, payload: &[u8]) {
        let handlers: Vec<MessageHandler> = match self.handlers.read().get(pattern) {
            Some(entries) => entries.iter().map(|(_, h)| h.clone()).collect(),
            None => return,
        };

        let message = BrokerMessage::new(channel, payload.to_vec());
        for handler in handlers {
            handler(message.clone());
        }
    }
}

#[async_trait]
impl MessageBroker for RedisBroker {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError> {
        let Some(mut conn) = self.inner.publisher.read().clone() else {
            return Err(BusError::NotConnected);
        };

        let _receivers: i64 = conn
            .publish(subject, payload)
            .await
            .map_err(|e| BusError::Publish {
                subject: subject.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn subscribe(
        &self,
        pattern: &str,
        handler: MessageHandler,
    ) -> Result<SubscriptionHandle, BusError> {
        let mut guard = self.inner.sink.lock().await;
        let Some(sink) = guard.as_mut() else {
            return Err(BusError::NotConnected);
        };

        let known = self.inner.handlers.read().contains_key(pattern);
        if !known {
            sink.psubscribe(pattern)
                .await
                .map_err(|e| BusError::Subscribe {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })?;
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .handlers
            .write()
            .entry(pattern.to_string())
            .or_default()
            .push((id, handler));

        Ok(SubscriptionHandle::new(id, pattern))
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), BusError> {
        let mut guard = self.inner.sink.lock().await;

        let last_holder_gone = {
            let mut handlers = self.inner.handlers.write();
            let Some(entries) = handlers.get_mut(handle.pattern()) else {
                return Ok(());
            };
            entries.retain(|(id, _)| *id != handle.id());
            let empty = entries.is_empty();
            if empty {
                handlers.remove(handle.pattern());
            }
            empty
        };
        if !last_holder_gone {
            return Ok(());
        }

        // Without a sink there is nothing to cancel server-side; the pattern
        // is simply not restored on reconnect.
        if let Some(sink) = guard.as_mut() {
            sink.punsubscribe(handle.pattern())
                .await
                .map_err(|e| BusError::Subscribe {
                    pattern: handle.pattern().to_string(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }
}
