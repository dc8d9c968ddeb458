//! WAMP v1 message codec.
//!
//! Every message is a JSON array whose first element is the type code.

use serde_json::{json, Value};
use thiserror::Error;

pub const PROTOCOL_VERSION: u8 = 1;

pub const MSG_WELCOME: u64 = 0;
pub const MSG_PREFIX: u64 = 1;
pub const MSG_CALL: u64 = 2;
pub const MSG_CALL_RESULT: u64 = 3;
pub const MSG_CALL_ERROR: u64 = 4;
pub const MSG_SUBSCRIBE: u64 = 5;
pub const MSG_UNSUBSCRIBE: u64 = 6;
pub const MSG_PUBLISH: u64 = 7;
pub const MSG_EVENT: u64 = 8;

#[derive(Debug, Error, PartialEq)]
pub enum WampError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("WAMP message must be a non-empty JSON array")]
    NotAnArray,

    #[error("Unknown WAMP message type: {0}")]
    UnknownType(u64),

    #[error("Missing or invalid field {index} in message type {type_id}")]
    InvalidField { type_id: u64, index: usize },
}

/// Who is left out of a PUBLISH broadcast.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PublishExclude {
    #[default]
    None,
    /// The publishing session.
    Me,
    /// Explicit session ids.
    Sessions(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WampMessage {
    Welcome {
        session_id: String,
        protocol_version: u8,
        server_ident: String,
    },
    Prefix {
        prefix: String,
        uri: String,
    },
    Call {
        call_id: String,
        proc_uri: String,
        args: Vec<Value>,
    },
    CallResult {
        call_id: String,
        result: Value,
    },
    CallError {
        call_id: String,
        error_uri: String,
        description: String,
        details: Option<Value>,
    },
    Subscribe {
        topic_uri: String,
    },
    Unsubscribe {
        topic_uri: String,
    },
    Publish {
        topic_uri: String,
        event: Value,
        exclude: PublishExclude,
        eligible: Vec<String>,
    },
    Event {
        topic_uri: String,
        event: Value,
    },
}

impl WampMessage {
    pub fn type_id(&self) -> u64 {
        match self {
            WampMessage::Welcome { .. } => MSG_WELCOME,
            WampMessage::Prefix { .. } => MSG_PREFIX,
            WampMessage::Call { .. } => MSG_CALL,
            WampMessage::CallResult { .. } => MSG_CALL_RESULT,
            WampMessage::CallError { .. } => MSG_CALL_ERROR,
            WampMessage::Subscribe { .. } => MSG_SUBSCRIBE,
            WampMessage::Unsubscribe { .. } => MSG_UNSUBSCRIBE,
            WampMessage::Publish { .. } => MSG_PUBLISH,
            WampMessage::Event { .. } => MSG_EVENT,
        }
    }

    /// Whether only a server may send this message.
    pub fn is_server_message(&self) -> bool {
        matches!(
            self,
            WampMessage::Welcome { .. }
                | WampMessage::CallResult { .. }
                | WampMessage::CallError { .. }
                | WampMessage::Event { .. }
        )
    }

    pub fn decode(text: &str) -> Result<Self, WampError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| WampError::InvalidJson(e.to_string()))?;
        let Value::Array(items) = value else {
            return Err(WampError::NotAnArray);
        };
        let type_id = items
            .first()
            .and_then(Value::as_u64)
            .ok_or(WampError::NotAnArray)?;
        let fields = Fields { type_id, items: &items };

        let message = match type_id {
            MSG_WELCOME => WampMessage::Welcome {
                session_id: fields.string(1)?,
                protocol_version: fields.u8(2)?,
                server_ident: fields.string(3)?,
            },
            MSG_PREFIX => WampMessage::Prefix {
                prefix: fields.string(1)?,
                uri: fields.string(2)?,
            },
            MSG_CALL => WampMessage::Call {
                call_id: fields.string(1)?,
                proc_uri: fields.string(2)?,
                args: items.iter().skip(3).cloned().collect(),
            },
            MSG_CALL_RESULT => WampMessage::CallResult {
                call_id: fields.string(1)?,
                result: fields.value(2)?,
            },
            MSG_CALL_ERROR => WampMessage::CallError {
                call_id: fields.string(1)?,
                error_uri: fields.string(2)?,
                description: fields.string(3)?,
                details: items.get(4).cloned(),
            },
            MSG_SUBSCRIBE => WampMessage::Subscribe {
                topic_uri: fields.string(1)?,
            },
            MSG_UNSUBSCRIBE => WampMessage::Unsubscribe {
                topic_uri: fields.string(1)?,
            },
            MSG_PUBLISH => WampMessage::Publish {
                topic_uri: fields.string(1)?,
                event: fields.value(2)?,
                exclude: fields.exclude(3)?,
                eligible: fields.optional_strings(4)?,
            },
            MSG_EVENT => WampMessage::Event {
                topic_uri: fields.string(1)?,
                event: fields.value(2)?,
            },
            other => return Err(WampError::UnknownType(other)),
        };

        Ok(message)
    }

    pub fn encode(&self) -> String {
        let value = match self {
            WampMessage::Welcome {
                session_id,
                protocol_version,
                server_ident,
            } => json!([MSG_WELCOME, session_id, protocol_version, server_ident]),
            WampMessage::Prefix { prefix, uri } => json!([MSG_PREFIX, prefix, uri]),
            WampMessage::Call {
                call_id,
                proc_uri,
                args,
            } => {
                let mut items = vec![json!(MSG_CALL), json!(call_id), json!(proc_uri)];
                items.extend(args.iter().cloned());
                Value::Array(items)
            }
            WampMessage::CallResult { call_id, result } => json!([MSG_CALL_RESULT, call_id, result]),
            WampMessage::CallError {
                call_id,
                error_uri,
                description,
                details,
            } => match details {
                Some(details) => json!([MSG_CALL_ERROR, call_id, error_uri, description, details]),
                None => json!([MSG_CALL_ERROR, call_id, error_uri, description]),
            },
            WampMessage::Subscribe { topic_uri } => json!([MSG_SUBSCRIBE, topic_uri]),
            WampMessage::Unsubscribe { topic_uri } => json!([MSG_UNSUBSCRIBE, topic_uri]),
            WampMessage::Publish {
                topic_uri,
                event,
                exclude,
                eligible,
            } => {
                let mut items = vec![json!(MSG_PUBLISH), json!(topic_uri), event.clone()];
                match exclude {
                    PublishExclude::None if eligible.is_empty() => {}
                    PublishExclude::None => items.push(json!([])),
                    PublishExclude::Me => items.push(json!(true)),
                    PublishExclude::Sessions(ids) => items.push(json!(ids)),
                }
                if !eligible.is_empty() {
                    items.push(json!(eligible));
                }
                Value::Array(items)
            }
            WampMessage::Event { topic_uri, event } => json!([MSG_EVENT, topic_uri, event]),
        };

        value.to_string()
    }
}

struct Fields<'a> {
    type_id: u64,
    items: &'a [Value],
}

impl Fields<'_> {
    fn invalid(&self, index: usize) -> WampError {
        WampError::InvalidField {
            type_id: self.type_id,
            index,
        }
    }

    fn value(&self, index: usize) -> Result<Value, WampError> {
        self.items.get(index).cloned().ok_or_else(|| self.invalid(index))
    }

    /// Strings, and numbers for call ids some clients send unquoted.
    fn string(&self, index: usize) -> Result<String, WampError> {
        match self.items.get(index) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            _ => Err(self.invalid(index)),
        }
    }

    fn u8(&self, index: usize) -> Result<u8, WampError> {
        self.items
            .get(index)
            .and_then(Value::as_u64)
            .and_then(|n| u8::try_from(n).ok())
            .ok_or_else(|| self.invalid(index))
    }

    fn exclude(&self, index: usize) -> Result<PublishExclude, WampError> {
        match self.items.get(index) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(PublishExclude::None),
            Some(Value::Bool(true)) => Ok(PublishExclude::Me),
            Some(Value::Array(_)) => {
                let ids = self.optional_strings(index)?;
                if ids.is_empty() {
                    Ok(PublishExclude::None)
                } else {
                    Ok(PublishExclude::Sessions(ids))
                }
            }
            Some(_) => Err(self.invalid(index)),
        }
    }

    fn optional_strings(&self, index: usize) -> Result<Vec<String>, WampError> {
        match self.items.get(index) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(values)) => values
                .iter()
                .map(|v| v.as_str().map(str::to_string).ok_or_else(|| self.invalid(index)))
                .collect(),
            Some(_) => Err(self.invalid(index)),
        }
    }
}
