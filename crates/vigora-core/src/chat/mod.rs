//! Chat management and the turn coordinator.

pub mod service;
pub mod turn;

pub use service::ChatService;
pub use turn::TurnCoordinator;
