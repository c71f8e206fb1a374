/// Adapters layer - Infrastructure implementations
///
/// This layer contains concrete implementations of the ports,
/// providing the actual integration with HTTP, child processes and the console.
pub mod outbound;
