//! Server bootstrap.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sockethub_config::Config;
use sockethub_runloop::periodic::schedule_periodic;
use sockethub_runloop::{
    CancellationToken, MemoryUsagePeriodic, Periodic, PeriodicRegistry, PushBridge, PushEndpoint,
    PushTransport, RunLoop, TimerHandle, TopicTimerOptions,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::app::{ApplicationHandler, ApplicationPushHandler, WampApplication};
use crate::error::{ServerError, ServerResult};
use crate::events::{EventDispatcher, ServerLaunchedEvent};
use crate::listener::{self, ListenerState};
use crate::origin::OriginRegistry;
use crate::pipeline::{PipelineBuilder, Stage};
use crate::session::{NullSessionHandler, SessionHandler};

/// How long open connections may drain once the RunLoop stops.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub name: String,
    pub origin_check: bool,
    pub path: String,
    pub max_message_size: usize,
    pub session_cookie: String,
    pub memory_usage_interval: Duration,
    pub push: PushTransport,
    pub topic_timers: TopicTimerOptions,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ServerOptions {
    pub fn from_config(config: &Config) -> Self {
        let push = if config.push.enabled {
            PushTransport::Tcp(PushEndpoint::new(config.push.host.clone(), config.push.port))
        } else {
            PushTransport::Null
        };

        Self {
            name: config.server.name.clone(),
            origin_check: config.origins.check,
            path: config.websocket.path.clone(),
            max_message_size: config.websocket.max_message_size,
            session_cookie: config.session.cookie_name.clone(),
            memory_usage_interval: Duration::from_secs(config.periodic.memory_usage_interval_secs),
            push,
            topic_timers: TopicTimerOptions {
                cancel_on_clear: config.topic_timers.cancel_on_clear,
                retain_empty_topics: config.topic_timers.retain_empty_topics,
            },
        }
    }

    /// Identity sent in the WAMP welcome.
    pub fn server_ident(&self) -> String {
        format!("{}/{}", self.name, env!("CARGO_PKG_VERSION"))
    }
}

/// WebSocket pub/sub server.
pub struct WebSocketServer {
    options: ServerOptions,
    run_loop: Arc<RunLoop>,
    events: Arc<EventDispatcher>,
    application: Arc<dyn WampApplication>,
    session_handler: Arc<dyn SessionHandler>,
    periodics: PeriodicRegistry,
    origins: OriginRegistry,
}

impl WebSocketServer {
    pub fn new(
        options: ServerOptions,
        run_loop: Arc<RunLoop>,
        events: Arc<EventDispatcher>,
        application: Arc<dyn WampApplication>,
    ) -> Self {
        Self {
            options,
            run_loop,
            events,
            application,
            session_handler: Arc::new(NullSessionHandler),
            periodics: PeriodicRegistry::new(),
            origins: OriginRegistry::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn run_loop(&self) -> &Arc<RunLoop> {
        &self.run_loop
    }

    pub fn events(&self) -> &Arc<EventDispatcher> {
        &self.events
    }

    pub fn set_session_handler(&mut self, handler: Arc<dyn SessionHandler>) {
        self.session_handler = handler;
    }

    pub fn add_periodic(&mut self, periodic: Arc<dyn Periodic>) {
        self.periodics.add_periodic(periodic);
    }

    pub fn add_origin(&mut self, origin: impl Into<String>) {
        self.origins.add_origin(origin);
    }

    pub fn periodics(&self) -> &PeriodicRegistry {
        &self.periodics
    }

    /// Bind, wire the pipeline and serve until the RunLoop stops.
    pub async fn launch(self, host: &str, port: u16, profile: bool) -> ServerResult<()> {
        self.start(host, port, profile).await?.run().await
    }

    /// Every startup step up to, but not including, entering the RunLoop.
    pub async fn start(mut self, host: &str, port: u16, profile: bool) -> ServerResult<RunningServer> {
        info!("Starting web socket");

        let addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        if profile && !self.periodics.contains(MemoryUsagePeriodic::NAME) {
            self.periodics
                .add_periodic_first(Arc::new(MemoryUsagePeriodic::new(self.options.memory_usage_interval)));
        }

        let mut scheduled = Vec::with_capacity(self.periodics.len());
        for periodic in self.periodics.periodics() {
            match schedule_periodic(&self.run_loop, periodic.clone()) {
                Ok(handle) => {
                    info!(
                        "Register periodic callback {}, executed each {} seconds",
                        periodic.display_name(),
                        format_seconds(periodic.timeout())
                    );
                    scheduled.push((periodic.display_name().to_string(), handle));
                }
                Err(e) => {
                    error!("Failed to register periodic {}: {}", periodic.display_name(), e);
                    self.rollback(&scheduled);
                    return Err(e.into());
                }
            }
        }

        let builder = self.build_pipeline();
        let innermost = Arc::new(ApplicationHandler::new(self.application.clone()));
        let pipeline = match builder.resolve(innermost) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                self.rollback(&scheduled);
                return Err(e);
            }
        };

        let push_bridge = match self.options.push.endpoint() {
            Some(endpoint) => {
                let handler = Arc::new(ApplicationPushHandler::new(self.application.clone()));
                match PushBridge::bind(endpoint, handler, &self.run_loop).await {
                    Ok(bridge) => {
                        info!("Push transport listening on {}", endpoint);
                        Some(bridge)
                    }
                    Err(e) => {
                        self.rollback(&scheduled);
                        return Err(e.into());
                    }
                }
            }
            None => None,
        };

        self.events.dispatch_launched(&ServerLaunchedEvent {
            run_loop: self.run_loop.clone(),
            local_addr,
            push_addr: push_bridge.as_ref().map(|b| b.local_addr()),
        });

        info!("Launching {} on {} PID: {}", self.options.name, local_addr, std::process::id());

        Ok(RunningServer {
            router: listener::router(
                ListenerState::new(self.run_loop.clone(), pipeline),
                &self.options.path,
            ),
            listener,
            local_addr,
            run_loop: self.run_loop,
            push_bridge,
            timers: scheduled,
        })
    }

    /// Stages are pushed innermost first.
    fn build_pipeline(&self) -> PipelineBuilder {
        let mut builder = PipelineBuilder::new();
        builder
            .push(Stage::Wamp {
                server_ident: self.options.server_ident(),
            })
            .push(Stage::Session {
                handler: self.session_handler.clone(),
                cookie_name: self.options.session_cookie.clone(),
            })
            .push(Stage::ConnectionTimer {
                run_loop: self.run_loop.clone(),
            })
            .push(Stage::WebSocket {
                max_message_size: self.options.max_message_size,
            });

        if self.options.origin_check {
            builder.push(Stage::OriginCheck {
                allowed_origins: self.origins.effective_origins(),
                events: self.events.clone(),
            });
        }
        builder
    }

    fn rollback(&self, scheduled: &[(String, TimerHandle)]) {
        for (_, handle) in scheduled {
            self.run_loop.cancel_timer(*handle);
        }
    }
}

/// A bound server that has not entered its RunLoop yet.
pub struct RunningServer {
    router: axum::Router,
    listener: TcpListener,
    local_addr: SocketAddr,
    run_loop: Arc<RunLoop>,
    push_bridge: Option<Arc<PushBridge>>,
    timers: Vec<(String, TimerHandle)>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn push_addr(&self) -> Option<SocketAddr> {
        self.push_bridge.as_ref().map(|b| b.local_addr())
    }

    pub fn run_loop(&self) -> &Arc<RunLoop> {
        &self.run_loop
    }

    /// Process-wide periodics by display name, in the order they were scheduled.
    pub fn periodic_timers(&self) -> &[(String, TimerHandle)] {
        &self.timers
    }

    /// Serve connections and run the RunLoop until it is stopped.
    pub async fn run(self) -> ServerResult<()> {
        let shutdown = CancellationToken::new();
        let serve_shutdown = shutdown.clone();
        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        let mut serve = tokio::spawn(async move {
            axum::serve(self.listener, app)
                .with_graceful_shutdown(async move { serve_shutdown.cancelled().await })
                .await
        });

        let result = self.run_loop.run().await;

        shutdown.cancel();
        if let Some(bridge) = &self.push_bridge {
            bridge.shutdown();
        }
        for (_, handle) in &self.timers {
            self.run_loop.cancel_timer(*handle);
        }
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut serve).await {
            Ok(Ok(Err(e))) => error!("WebSocket listener failed: {}", e),
            Ok(Err(e)) => error!("WebSocket listener task panicked: {}", e),
            Ok(Ok(Ok(()))) => {}
            Err(_) => {
                warn!("Open connections still draining after {:?}, aborting", SHUTDOWN_GRACE);
                serve.abort();
            }
        }
        info!("Server stopped");

        result.map_err(ServerError::from)
    }
}

/// Whole seconds print without decimals.
fn format_seconds(interval: Duration) -> String {
    if interval.subsec_nanos() == 0 {
        interval.as_secs().to_string()
    } else {
        format!("{:.3}", interval.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::TopicApplication;
    use sockethub_runloop::TopicPeriodicTimer;

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(Duration::from_secs(5)), "5");
        assert_eq!(format_seconds(Duration::from_millis(1500)), "1.500");
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.push.enabled = true;
        config.push.port = 6000;
        config.origins.check = true;

        let options = ServerOptions::from_config(&config);
        assert!(options.origin_check);
        assert_eq!(
            options.push,
            PushTransport::Tcp(PushEndpoint::new("127.0.0.1", 6000))
        );
        assert_eq!(options.memory_usage_interval, Duration::from_secs(5));
        assert!(options.server_ident().starts_with("SocketHub/"));
    }

    fn server(options: ServerOptions) -> WebSocketServer {
        let run_loop = Arc::new(RunLoop::default());
        let events = Arc::new(EventDispatcher::new());
        let timers = Arc::new(TopicPeriodicTimer::new(run_loop.clone(), TopicTimerOptions::default()));
        let app = Arc::new(TopicApplication::new(timers, events.clone()));
        WebSocketServer::new(options, run_loop, events, app)
    }

    #[test]
    fn test_pipeline_without_origin_check() {
        let builder = server(ServerOptions::default()).build_pipeline();
        assert_eq!(
            builder.stage_names(),
            vec!["websocket", "connection-timer", "session", "wamp"]
        );
    }

    #[test]
    fn test_pipeline_with_origin_check() {
        let options = ServerOptions {
            origin_check: true,
            ..ServerOptions::default()
        };
        let builder = server(options).build_pipeline();
        assert_eq!(
            builder.stage_names(),
            vec!["origin-check", "websocket", "connection-timer", "session", "wamp"]
        );
    }

    #[test]
    fn test_default_options_have_no_push() {
        assert_eq!(ServerOptions::default().push, PushTransport::Null);
    }
}
