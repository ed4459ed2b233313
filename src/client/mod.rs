/// Client-side session handling
///
/// The outbound half of the token lifecycle: the gateway every portal
/// feature sends requests through, and the coordinator that keeps a
/// wave of expired-token failures down to a single refresh call.

mod coordinator;
mod gateway;

pub use coordinator::RefreshCoordinator;
pub use coordinator::RefreshFailure;
pub use gateway::GatewayError;
pub use gateway::SessionGateway;
