use campus_types::events::{GatewayCommand, GatewayEvent};

/// Outbound half of the realtime channel.
///
/// Emission is fire-and-forget: results are observed through later
/// [`GatewayEvent`]s. Implementations must drop commands while disconnected
/// rather than queue them.
pub trait Transport: Send + 'static {
    fn is_connected(&self) -> bool;

    fn emit(&self, command: GatewayCommand);
}

/// Inbound half of the realtime channel, delivered to the session driver.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    Event(GatewayEvent),
}
