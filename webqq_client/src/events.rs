//! Event callbacks delivered from the poll task.

use webqq_core::message::{DiscussMessage, FriendMessage, GroupMessage};

use crate::error::ClientError;

/// Which part of the poll machinery an error surfaced from, so handlers can
/// tell an interrupted exchange from a rejected round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
    /// The poll loop machinery itself, outside the exchange and dispatch
    /// phases of a round.
    PollLoop,

    /// The HTTP exchange of a poll round.
    PollIo,

    /// Validation and dispatch of a completed poll round.
    PollDispatch,
}

/// Receiver for inbound events.
///
/// All methods are invoked synchronously on the poll task, in server order;
/// they never run concurrently with each other. Default implementations do
/// nothing.
pub trait EventListener: Send + Sync + 'static {
    /// A private message arrived.
    fn on_message(&self, _message: FriendMessage) {}

    /// A group message arrived.
    fn on_group_message(&self, _message: GroupMessage) {}

    /// A discussion message arrived.
    fn on_discuss_message(&self, _message: DiscussMessage) {}

    /// A poll round failed. The loop keeps polling; aborts caused by an
    /// immediate stop are filtered out before this is called.
    fn on_error(&self, _error: &ClientError, _origin: ErrorOrigin) {}
}
