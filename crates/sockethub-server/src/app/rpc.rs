use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::connection::Connection;

/// Error returned to a caller as CALLERROR.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    pub uri: String,
    pub description: String,
    pub details: Option<Value>,
}

impl RpcError {
    pub fn new(uri: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            description: description.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Remote procedure bound to a URI.
pub trait RpcHandler: Send + Sync {
    fn call(&self, conn: &mut Connection, args: Vec<Value>) -> Result<Value, RpcError>;
}

impl<F> RpcHandler for F
where
    F: Fn(&mut Connection, Vec<Value>) -> Result<Value, RpcError> + Send + Sync,
{
    fn call(&self, conn: &mut Connection, args: Vec<Value>) -> Result<Value, RpcError> {
        self(conn, args)
    }
}

#[derive(Default, Clone)]
pub struct RpcRegistry {
    handlers: HashMap<String, Arc<dyn RpcHandler>>,
}

impl RpcRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, procedure: impl Into<String>, handler: Arc<dyn RpcHandler>) {
        self.handlers.insert(procedure.into(), handler);
    }

    pub fn get(&self, procedure: &str) -> Option<Arc<dyn RpcHandler>> {
        self.handlers.get(procedure).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::test_support::connection;
    use serde_json::json;

    #[test]
    fn test_closure_handler() {
        let mut registry = RpcRegistry::new();
        registry.register(
            "calc:add",
            Arc::new(|_conn: &mut Connection, args: Vec<Value>| -> Result<Value, RpcError> {
                let sum: i64 = args.iter().filter_map(Value::as_i64).sum();
                Ok(json!(sum))
            }),
        );

        let (mut conn, _rx) = connection("c1");
        let handler = registry.get("calc:add").unwrap();
        assert_eq!(handler.call(&mut conn, vec![json!(2), json!(3)]).unwrap(), json!(5));
        assert!(registry.get("calc:sub").is_none());
    }

    #[test]
    fn test_rpc_error_details() {
        let err = RpcError::new("calc:div", "division by zero").with_details(json!({"arg": 1}));
        assert_eq!(err.details, Some(json!({"arg": 1})));
    }
}
