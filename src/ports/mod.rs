/// Ports module defining interfaces for hexagonal architecture
///
/// Only outbound (driven) ports exist: the harness is driven by its CLI
/// directly through the application layer.
pub mod outbound;
