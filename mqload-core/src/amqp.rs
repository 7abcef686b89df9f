use lapin::options::{BasicPublishOptions, ConfirmSelectOptions};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};

use crate::config::BrokerConfig;
use crate::error::{ConnectError, PublishError};
use crate::publish::{BoxFuture, Connector, PublishRequest, Publisher};

const DELIVERY_MODE_TRANSIENT: u8 = 1;
const DELIVERY_MODE_PERSISTENT: u8 = 2;

/// AMQP 0-9-1 sink: one connection and one channel per worker.
#[derive(Debug, Clone)]
pub struct AmqpConnector {
    broker: BrokerConfig,
}

impl AmqpConnector {
    pub fn new(broker: BrokerConfig) -> Self {
        Self { broker }
    }
}

impl Connector for AmqpConnector {
    fn connect(&self, worker_id: u64) -> BoxFuture<'_, Result<Box<dyn Publisher>, ConnectError>> {
        Box::pin(async move {
            let conn = Connection::connect(&self.broker.url, ConnectionProperties::default())
                .await
                .map_err(|e| ConnectError(format!("worker {worker_id}: {e}")))?;

            let channel = conn
                .create_channel()
                .await
                .map_err(|e| ConnectError(format!("worker {worker_id}: channel: {e}")))?;

            if self.broker.confirm {
                channel
                    .confirm_select(ConfirmSelectOptions::default())
                    .await
                    .map_err(|e| ConnectError(format!("worker {worker_id}: confirm_select: {e}")))?;
            }

            Ok(Box::new(AmqpPublisher {
                conn,
                channel,
                exchange: self.broker.exchange.clone(),
                confirm: self.broker.confirm,
            }) as Box<dyn Publisher>)
        })
    }
}

struct AmqpPublisher {
    conn: Connection,
    channel: Channel,
    exchange: String,
    confirm: bool,
}

impl Publisher for AmqpPublisher {
    fn publish(&mut self, req: PublishRequest) -> BoxFuture<'_, Result<(), PublishError>> {
        Box::pin(async move {
            let delivery_mode = if req.persistent {
                DELIVERY_MODE_PERSISTENT
            } else {
                DELIVERY_MODE_TRANSIENT
            };
            let props = BasicProperties::default()
                .with_content_type(req.content_type.into())
                .with_delivery_mode(delivery_mode);

            let pending = self
                .channel
                .basic_publish(
                    &self.exchange,
                    &req.routing_key,
                    BasicPublishOptions::default(),
                    &req.body,
                    props,
                )
                .await
                .map_err(|e| PublishError(e.to_string()))?;

            if self.confirm {
                let confirmation = pending.await.map_err(|e| PublishError(e.to_string()))?;
                if confirmation.is_nack() {
                    return Err(PublishError(format!(
                        "broker nacked message for {}",
                        req.routing_key
                    )));
                }
            }

            Ok(())
        })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let _ = self.channel.close(200, "OK").await;
            let _ = self.conn.close(200, "OK").await;
        })
    }
}
