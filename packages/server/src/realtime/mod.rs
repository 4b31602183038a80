pub mod cleanup;
pub mod gateway;
pub mod messages;
pub mod registry;
pub mod session;

pub use gateway::{AdmissionError, GatewayStatus, OpenConnection, RealtimeGateway};
pub use registry::{ConnectionId, SubscribeOutcome, SubscriptionRegistry};
