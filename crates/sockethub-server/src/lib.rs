//! WebSocket pub/sub server.
//!
//! Connections pass through a pipeline of stages before reaching a
//! [`WampApplication`]. All connection callbacks, periodic timers and push
//! deliveries run on one [`RunLoop`](sockethub_runloop::RunLoop).
//!
//! ```no_run
//! use std::sync::Arc;
//! use sockethub_runloop::{RunLoop, TopicPeriodicTimer, TopicTimerOptions};
//! use sockethub_server::{EventDispatcher, ServerOptions, TopicApplication, WebSocketServer};
//!
//! # async fn example() -> sockethub_server::ServerResult<()> {
//! let run_loop = Arc::new(RunLoop::default());
//! let events = Arc::new(EventDispatcher::new());
//! let timers = Arc::new(TopicPeriodicTimer::new(run_loop.clone(), TopicTimerOptions::default()));
//! let app = Arc::new(TopicApplication::new(timers, events.clone()));
//!
//! let server = WebSocketServer::new(ServerOptions::default(), run_loop, events, app);
//! server.launch("127.0.0.1", 8080, false).await
//! # }
//! ```

pub mod app;
pub mod connection;
pub mod error;
pub mod events;
pub mod listener;
pub mod origin;
pub mod pipeline;
pub mod server;
pub mod session;
pub mod wamp;

pub use app::{
    ApplicationHandler, ApplicationPushHandler, PushMessage, RpcError, RpcHandler, Topic,
    TopicApplication, TopicHandler, WampApplication,
};
pub use connection::{Connection, ConnectionId, ConnectionSender, Handshake, Outbound};
pub use error::{PipelineError, ServerError, ServerResult};
pub use events::{ClientEvent, EventDispatcher, ServerEventListener, ServerLaunchedEvent};
pub use origin::{OriginRegistry, DEFAULT_ALLOWED_ORIGINS};
pub use pipeline::{ConnectionHandler, Message, PipelineBuilder, Stage, StageFactory};
pub use server::{RunningServer, ServerOptions, WebSocketServer};
pub use session::{MemorySessionHandler, NullSessionHandler, Session, SessionHandler};
pub use wamp::{PublishExclude, WampMessage};
