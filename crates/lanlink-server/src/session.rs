// ── Session lifecycle manager ──
//
// One session per config entry: the push-server socket plus the
// background notifier task, started and stopped together but supervised
// independently. The state machine is strict about partial failure --
// a failed bind leaves nothing behind to tear down, and `stop` is safe
// to call any number of times from any state.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use lanlink_core::Notifier;

use crate::context::ServerContext;
use crate::error::SessionError;
use crate::push;

// ── SessionState ─────────────────────────────────────────────────────

/// Lifecycle state, observable by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unbound,
    Starting,
    Running,
    Stopping,
    Stopped,
}

// ── SessionConfig ────────────────────────────────────────────────────

/// Listening address and shutdown policy for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: IpAddr,
    pub port: u16,
    /// How long `stop` waits for in-flight requests (and the notifier)
    /// before cancelling outright.
    pub drain_timeout: Duration,
}

impl SessionConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            host,
            port,
            drain_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8889)
    }
}

// ── Session ──────────────────────────────────────────────────────────

struct SessionTasks {
    cancel: CancellationToken,
    server: Option<JoinHandle<()>>,
    notifier: Option<JoinHandle<()>>,
}

/// Push-server + notifier lifecycle for one config entry.
pub struct Session {
    config: SessionConfig,
    ctx: ServerContext,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<SessionState>,
    tasks: Mutex<SessionTasks>,
}

impl Session {
    pub fn new(config: SessionConfig, ctx: ServerContext, notifier: Arc<dyn Notifier>) -> Self {
        let (state, _) = watch::channel(SessionState::Unbound);
        Self {
            config,
            ctx,
            notifier,
            state,
            tasks: Mutex::new(SessionTasks {
                cancel: CancellationToken::new(),
                server: None,
                notifier: None,
            }),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Subscribe to lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Start the push server and the background notifier task.
    ///
    /// All routes are registered before the socket is bound. On bind
    /// failure the session transitions straight to `Stopped` with
    /// nothing started: no listening socket, no notifier task, nothing
    /// for the host to tear down. Returns the bound address (useful when
    /// the configured port is 0).
    pub async fn start(&self) -> Result<SocketAddr, SessionError> {
        let mut tasks = self.tasks.lock().await;

        let current = self.state();
        if !matches!(current, SessionState::Unbound | SessionState::Stopped) {
            return Err(SessionError::AlreadyRunning { state: current });
        }
        let _ = self.state.send(SessionState::Starting);

        // Route registration completes before bind.
        let app = push::router(self.ctx.clone());

        let requested = SocketAddr::new(self.config.host, self.config.port);
        let listener = match TcpListener::bind(requested).await {
            Ok(listener) => listener,
            Err(source) => {
                error!(addr = %requested, error = %source, "failed to bind push server");
                let _ = self.state.send(SessionState::Stopped);
                return Err(SessionError::Bind {
                    addr: requested,
                    source,
                });
            }
        };
        let bound = listener.local_addr().map_err(|source| {
            let _ = self.state.send(SessionState::Stopped);
            SessionError::Bind {
                addr: requested,
                source,
            }
        })?;

        let cancel = CancellationToken::new();
        tasks.cancel = cancel.clone();

        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(cancel.clone().cancelled_owned());
        tasks.server = Some(tokio::spawn(async move {
            if let Err(e) = server.await {
                error!(error = %e, "push server terminated abnormally");
            }
        }));

        // The notifier only starts once the bind has succeeded. It is
        // supervised on its own: an error here is logged, never allowed
        // to take the push server down with it.
        let notifier = Arc::clone(&self.notifier);
        tasks.notifier = Some(tokio::spawn(async move {
            match notifier.start().await {
                Ok(()) => debug!("notifier task finished"),
                Err(e) => warn!(error = %e, "notifier task exited with error"),
            }
        }));

        let _ = self.state.send(SessionState::Running);
        info!(addr = %bound, "push server started");
        Ok(bound)
    }

    /// Stop the session: close the listening socket, drain in-flight
    /// requests, then stop the notifier.
    ///
    /// Idempotent -- a second call (or a call on a never-started session)
    /// is a no-op. Each teardown step runs regardless of whether the
    /// previous one failed.
    pub async fn stop(&self) {
        let mut tasks = self.tasks.lock().await;

        let current = self.state();
        if !matches!(current, SessionState::Starting | SessionState::Running) {
            debug!(state = ?current, "session stop: nothing to stop");
            return;
        }
        let _ = self.state.send(SessionState::Stopping);

        // Stop accepting, let in-flight requests drain -- bounded.
        tasks.cancel.cancel();
        if let Some(mut handle) = tasks.server.take() {
            match tokio::time::timeout(self.config.drain_timeout, &mut handle).await {
                Ok(Ok(())) => debug!("push server drained and shut down"),
                Ok(Err(e)) => warn!(error = %e, "push server task failed during shutdown"),
                Err(_) => {
                    warn!("in-flight requests did not drain in time; aborting server task");
                    handle.abort();
                }
            }
        }

        // The notifier is stopped even if the drain above failed.
        self.notifier.stop().await;
        if let Some(mut handle) = tasks.notifier.take() {
            match tokio::time::timeout(self.config.drain_timeout, &mut handle).await {
                Ok(_) => {}
                Err(_) => {
                    warn!("notifier did not stop within the drain window; cancelling");
                    handle.abort();
                }
            }
        }

        let _ = self.state.send(SessionState::Stopped);
        info!("session stopped");
    }
}
