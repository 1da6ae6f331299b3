//! fanmgr daemon internals
//!
//! The event loop and the OS plumbing it needs: an epoll wrapper, the
//! command FIFO and the shutdown signal flag. The `fanmgrd` binary wires
//! these to the controller from `fm-core`.

pub mod channel;
pub mod dispatcher;
pub mod epoll;
pub mod signals;
pub mod startup;

pub use channel::CommandChannel;
pub use dispatcher::Dispatcher;
pub use signals::shutdown_flag;
