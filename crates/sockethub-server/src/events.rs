//! Server lifecycle and client events.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;
use sockethub_runloop::RunLoop;
use tracing::debug;

use crate::connection::ConnectionId;

/// Dispatched once the server is bound, before the RunLoop starts.
#[derive(Clone)]
pub struct ServerLaunchedEvent {
    pub run_loop: Arc<RunLoop>,
    pub local_addr: SocketAddr,
    pub push_addr: Option<SocketAddr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Connected {
        conn_id: ConnectionId,
        remote_addr: SocketAddr,
    },
    Disconnected {
        conn_id: ConnectionId,
        remote_addr: SocketAddr,
    },
    Error {
        conn_id: ConnectionId,
        remote_addr: SocketAddr,
        message: String,
    },
    /// Handshake refused by the origin check.
    Rejected {
        remote_addr: SocketAddr,
        origin: Option<String>,
    },
}

impl ClientEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::Connected { .. } => "connected",
            ClientEvent::Disconnected { .. } => "disconnected",
            ClientEvent::Error { .. } => "error",
            ClientEvent::Rejected { .. } => "rejected",
        }
    }
}

/// Observer of server events. Client events are delivered on the RunLoop.
pub trait ServerEventListener: Send + Sync {
    fn on_server_launched(&self, _event: &ServerLaunchedEvent) {}

    fn on_client_event(&self, _event: &ClientEvent) {}
}

#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<Vec<Arc<dyn ServerEventListener>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn ServerEventListener>) {
        self.listeners.write().push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn dispatch_launched(&self, event: &ServerLaunchedEvent) {
        debug!(local_addr = %event.local_addr, "Dispatching server launched event");
        for listener in self.snapshot() {
            listener.on_server_launched(event);
        }
    }

    pub fn dispatch_client(&self, event: &ClientEvent) {
        debug!(kind = event.kind(), "Dispatching client event");
        for listener in self.snapshot() {
            listener.on_client_event(event);
        }
    }

    // Listeners may register other listeners while being notified.
    fn snapshot(&self) -> Vec<Arc<dyn ServerEventListener>> {
        self.listeners.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ServerEventListener for Recorder {
        fn on_client_event(&self, event: &ClientEvent) {
            self.events.lock().push(event.kind().to_string());
        }
    }

    #[test]
    fn test_dispatch_client_to_all_listeners() {
        let dispatcher = EventDispatcher::new();
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        dispatcher.add_listener(a.clone());
        dispatcher.add_listener(b.clone());
        assert_eq!(dispatcher.listener_count(), 2);

        dispatcher.dispatch_client(&ClientEvent::Rejected {
            remote_addr: ([127, 0, 0, 1], 1).into(),
            origin: Some("evil.example".to_string()),
        });

        assert_eq!(*a.events.lock(), vec!["rejected"]);
        assert_eq!(*b.events.lock(), vec!["rejected"]);
    }

    #[test]
    fn test_dispatch_launched() {
        struct Launched(Mutex<Option<SocketAddr>>);
        impl ServerEventListener for Launched {
            fn on_server_launched(&self, event: &ServerLaunchedEvent) {
                *self.0.lock() = Some(event.local_addr);
            }
        }

        let dispatcher = EventDispatcher::new();
        let listener = Arc::new(Launched(Mutex::new(None)));
        dispatcher.add_listener(listener.clone());

        let addr: SocketAddr = ([127, 0, 0, 1], 8080).into();
        dispatcher.dispatch_launched(&ServerLaunchedEvent {
            run_loop: Arc::new(RunLoop::default()),
            local_addr: addr,
            push_addr: None,
        });
        assert_eq!(*listener.0.lock(), Some(addr));
    }
}
