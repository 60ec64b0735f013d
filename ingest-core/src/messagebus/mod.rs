//! Message-bus adapter: AMQP 0-9-1 topic exchanges with reconnect.
//!
//! [`AmqpPublisher`] is the production [`crate::ports::EventPublisher`]
//! implementation. [`routing`] supplies the exchange names and the
//! per-component routing-key builders; `domain-events`' routing key is built
//! by `EventPublisher::publish_domain_event`'s default method instead, since
//! it only needs fields already on `DomainEventEnvelope`.

mod connection;
mod routing;

pub use connection::AmqpPublisher;
pub use routing::{
    close_order_routing_key, nfpm_transfer_routing_key, pool_price_routing_key,
    position_liquidity_routing_key, ALL_EXCHANGES, EXCHANGE_CLOSE_ORDER_EVENTS,
    EXCHANGE_DOMAIN_EVENTS, EXCHANGE_NFPM_TRANSFER_EVENTS, EXCHANGE_POOL_PRICES,
    EXCHANGE_POSITION_LIQUIDITY_EVENTS,
};
