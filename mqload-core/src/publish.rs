use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::{BrokerConfig, BrokerScheme};
#[cfg(not(feature = "amqp"))]
use crate::error::Error;
use crate::error::{ConnectError, PublishError, Result};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a worker hands to the broker for a single message.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub destination_id: u64,
    pub routing_key: String,
    pub body: Bytes,
    pub content_type: &'static str,
    pub persistent: bool,
}

/// A single worker's session with the broker. Not shared between workers.
pub trait Publisher: Send {
    fn publish(
        &mut self,
        req: PublishRequest,
    ) -> BoxFuture<'_, std::result::Result<(), PublishError>>;

    fn close(self: Box<Self>) -> BoxFuture<'static, ()>;
}

/// Opens one [`Publisher`] per worker.
pub trait Connector: Send + Sync {
    fn connect(
        &self,
        worker_id: u64,
    ) -> BoxFuture<'_, std::result::Result<Box<dyn Publisher>, ConnectError>>;
}

/// Picks the sink implementation from the broker URL scheme.
pub fn connector_for(broker: &BrokerConfig) -> Result<Arc<dyn Connector>> {
    match broker.scheme()? {
        BrokerScheme::Discard => Ok(Arc::new(DiscardConnector::default())),
        #[cfg(feature = "amqp")]
        BrokerScheme::Amqp | BrokerScheme::Amqps => {
            Ok(Arc::new(crate::amqp::AmqpConnector::new(broker.clone())))
        }
        #[cfg(not(feature = "amqp"))]
        BrokerScheme::Amqp | BrokerScheme::Amqps => Err(Error::InvalidBrokerUrl(format!(
            "{} (built without the `amqp` feature)",
            broker.url
        ))),
    }
}

/// Accepts and drops every message. Measures harness overhead without a broker.
#[derive(Debug, Clone, Default)]
pub struct DiscardConnector {
    published: Arc<AtomicU64>,
}

impl DiscardConnector {
    pub fn published_total(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Connector for DiscardConnector {
    fn connect(
        &self,
        _worker_id: u64,
    ) -> BoxFuture<'_, std::result::Result<Box<dyn Publisher>, ConnectError>> {
        let published = self.published.clone();
        Box::pin(async move { Ok(Box::new(DiscardPublisher { published }) as Box<dyn Publisher>) })
    }
}

struct DiscardPublisher {
    published: Arc<AtomicU64>,
}

impl Publisher for DiscardPublisher {
    fn publish(
        &mut self,
        _req: PublishRequest,
    ) -> BoxFuture<'_, std::result::Result<(), PublishError>> {
        self.published.fetch_add(1, Ordering::Relaxed);
        Box::pin(async { Ok(()) })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }
}
