//! Connection lifecycle: the manager, its state machine, and its timers.

pub mod heartbeat;
pub mod manager;
pub mod reconnect;
pub mod state;

pub use heartbeat::HeartbeatScheduler;
pub use manager::ConnectionManager;
pub use reconnect::ReconnectScheduler;
pub use state::ConnectionState;
