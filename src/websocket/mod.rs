pub mod handler;
pub mod msg_join_handler;
pub mod msg_leave_handler;
pub mod msg_update_handler;
pub mod msg_cursor_handler;
pub mod msg_ping_handler;

pub use handler::websocket_handler;
