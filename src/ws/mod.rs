pub mod connctx;
pub mod registry;
pub mod broadcaster;
pub mod coordinator;
pub mod hub;

pub use connctx::ConnectionId;
pub use hub::CollabHub;
