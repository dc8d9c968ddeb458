//! WAMP v1 protocol support.

mod message;
mod prefix;

pub use message::{
    PublishExclude, WampError, WampMessage, MSG_CALL, MSG_CALL_ERROR, MSG_CALL_RESULT, MSG_EVENT,
    MSG_PREFIX, MSG_PUBLISH, MSG_SUBSCRIBE, MSG_UNSUBSCRIBE, MSG_WELCOME, PROTOCOL_VERSION,
};
pub use prefix::PrefixMap;
