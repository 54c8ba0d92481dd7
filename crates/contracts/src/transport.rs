//! Transport traits - publish/subscribe seam to the managed event stream
//!
//! The pipeline depends on this contract only, never on a concrete stream.

use bytes::Bytes;

use crate::TransportError;

/// Producer side of the event stream
///
/// `publish` may be called concurrently through a shared reference.
/// `close` consumes the handle, so a second close or a publish after close
/// cannot be expressed.
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Transport name (topic / stream name, used for logging)
    fn name(&self) -> &str;

    /// Hand one serialized reading to the stream
    async fn publish(&self, message: Bytes) -> Result<(), TransportError>;

    /// Release the handle
    async fn close(self) -> Result<(), TransportError>;
}

/// One message handed to the consumer
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Stream position, assigned when the transport accepts the message
    ///
    /// Starts at 1 and has no gaps: rejected publishes do not consume a
    /// number. A redelivery repeats the sequence of its first delivery.
    pub sequence: u64,

    /// Delivery attempt, starting at 1; values above 1 are redeliveries
    pub attempt: u32,

    /// Raw message body
    pub payload: Bytes,
}

/// Consumer side of the event stream
#[trait_variant::make(Subscription: Send)]
pub trait LocalSubscription {
    /// Next delivered message, `None` once the stream is closed and drained
    async fn next(&mut self) -> Option<Delivery>;
}

/// Lets a caller lend a subscription and inspect it afterwards
impl<S: Subscription> Subscription for &mut S {
    async fn next(&mut self) -> Option<Delivery> {
        (**self).next().await
    }
}
