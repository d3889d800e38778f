//! Session manager driving the auth state machine.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use cybervault_common::{AuthError, Passphrase, Result};
use cybervault_provider::{Provider, SessionEvent};

use crate::state::{AuthState, SessionNotice};

/// Running provider-event listener.
struct Listener {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Owns the authentication lifecycle: current identity, session and the
/// transitions between them.
///
/// Provider-pushed session events are the sole transition trigger; the
/// explicit `sign_in`/`sign_out` calls merely ask the provider to act and
/// let the resulting event drive the state. The startup lookup and the
/// subscription's first event may race — both post into the same state
/// setter, and writing an identical state twice is a no-op, so they converge
/// regardless of arrival order.
pub struct SessionManager {
    provider: Arc<dyn Provider>,
    state: Arc<watch::Sender<AuthState>>,
    notices: mpsc::Sender<SessionNotice>,
    listener: Mutex<Option<Listener>>,
}

impl SessionManager {
    /// Create a manager in the `Unknown` state.
    ///
    /// Returns the manager together with the receiving end of the
    /// single-subscriber notice channel.
    pub fn new(provider: Arc<dyn Provider>) -> (Self, mpsc::Receiver<SessionNotice>) {
        let (state, _) = watch::channel(AuthState::Unknown);
        let (notices_tx, notices_rx) = mpsc::channel(32);

        let manager = Self {
            provider,
            state: Arc::new(state),
            notices: notices_tx,
            listener: Mutex::new(None),
        };

        (manager, notices_rx)
    }

    /// Determine the initial state and start listening for transitions.
    ///
    /// Subscribes to provider session events exactly once for the process
    /// lifetime (calling this again is a no-op), then queries the provider
    /// for a pre-existing valid session. A restored session reaches
    /// `Authenticated` without emitting a welcome notice.
    ///
    /// # Errors
    /// - Provider lookup failure; the state falls back to `Unauthenticated`
    pub async fn initialize(&self) -> Result<()> {
        {
            let mut listener = self.listener.lock().await;
            if listener.is_some() {
                debug!("session listener already running");
                return Ok(());
            }

            let events = self.provider.session_events();
            let (shutdown_tx, shutdown_rx) = oneshot::channel();
            let state = self.state.clone();
            let notices = self.notices.clone();

            let task = tokio::spawn(listen(events, shutdown_rx, state, notices));
            *listener = Some(Listener {
                shutdown: shutdown_tx,
                task,
            });
        }

        match self.provider.current_session().await {
            Ok(Some(session)) => {
                info!(email = %session.identity.email, "restored existing session");
                set_state(
                    &self.state,
                    AuthState::Authenticated {
                        identity: session.identity.clone(),
                        session,
                    },
                );
                Ok(())
            }
            Ok(None) => {
                set_state(&self.state, AuthState::Unauthenticated);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "session lookup failed");
                set_state(&self.state, AuthState::Unauthenticated);
                Err(e.into())
            }
        }
    }

    /// Register a new account.
    ///
    /// Does not transition state: the provider's confirmation event performs
    /// the transition once the account is confirmed.
    ///
    /// # Errors
    /// - Already registered, network failure; reported, never retried
    pub async fn sign_up(
        &self,
        email: &str,
        passphrase: &Passphrase,
        display_name: &str,
    ) -> std::result::Result<(), AuthError> {
        self.provider.sign_up(email, passphrase, display_name).await?;
        info!(email, "sign-up submitted");
        let _ = self.notices.try_send(SessionNotice::ConfirmationSent {
            email: email.to_string(),
        });
        Ok(())
    }

    /// Authenticate with email and passphrase.
    ///
    /// On success the provider's pushed event drives the transition to
    /// `Authenticated`; the welcome notice for the explicit call is emitted
    /// here. On failure the state remains `Unauthenticated`.
    pub async fn sign_in(
        &self,
        email: &str,
        passphrase: &Passphrase,
    ) -> std::result::Result<(), AuthError> {
        self.provider.sign_in(email, passphrase).await?;
        info!(email, "sign-in accepted");
        let _ = self.notices.try_send(SessionNotice::Welcome {
            email: email.to_string(),
        });
        Ok(())
    }

    /// End the active session.
    ///
    /// On confirmation the pushed event transitions the state to
    /// `Unauthenticated`, at which point dependents drop their
    /// session-scoped state.
    pub async fn sign_out(&self) -> std::result::Result<(), AuthError> {
        self.provider.sign_out().await?;
        info!("signed out");
        let _ = self.notices.try_send(SessionNotice::SignedOut);
        Ok(())
    }

    /// Current auth state.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Subscribe to auth state changes.
    pub fn watch_state(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Stop the provider event listener.
    ///
    /// The subscription is a process-scoped resource: acquired once by
    /// `initialize`, released here at shutdown.
    pub async fn shutdown(&self) {
        let listener = self.listener.lock().await.take();
        if let Some(listener) = listener {
            let _ = listener.shutdown.send(());
            let _ = listener.task.await;
            info!("session listener stopped");
        }
    }
}

/// Background loop applying provider-pushed events, in arrival order.
async fn listen(
    mut events: broadcast::Receiver<SessionEvent>,
    mut shutdown: oneshot::Receiver<()>,
    state: Arc<watch::Sender<AuthState>>,
    notices: mpsc::Sender<SessionNotice>,
) {
    debug!("session listener started");
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("session listener shutting down");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => apply_event(&state, &notices, event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "session event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    warn!("session event stream closed");
                    break;
                }
            },
        }
    }
}

/// Apply one pushed event to the state machine.
fn apply_event(
    state: &watch::Sender<AuthState>,
    notices: &mpsc::Sender<SessionNotice>,
    event: SessionEvent,
) {
    match event {
        SessionEvent::SignedIn(session) => {
            // Fresh first login: the identity has never authenticated
            // before. An explicit sign-in carries a stamped identity and is
            // greeted by the caller instead, so the two paths cannot
            // double-fire.
            let fresh = session.identity.last_authenticated_at.is_none();
            let email = session.identity.email.clone();
            let changed = set_state(
                state,
                AuthState::Authenticated {
                    identity: session.identity.clone(),
                    session,
                },
            );
            if changed && fresh {
                let _ = notices.try_send(SessionNotice::Welcome { email });
            }
        }
        SessionEvent::Refreshed(session) => {
            set_state(
                state,
                AuthState::Authenticated {
                    identity: session.identity.clone(),
                    session,
                },
            );
        }
        SessionEvent::SignedOut => {
            set_state(state, AuthState::Unauthenticated);
        }
    }
}

/// Set the state, suppressing identical writes.
fn set_state(state: &watch::Sender<AuthState>, next: AuthState) -> bool {
    state.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            debug!(to = ?variant_name(&next), "auth state transition");
            *current = next;
            true
        }
    })
}

fn variant_name(state: &AuthState) -> &'static str {
    match state {
        AuthState::Unknown => "unknown",
        AuthState::Authenticated { .. } => "authenticated",
        AuthState::Unauthenticated => "unauthenticated",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cybervault_provider::MemoryProvider;
    use std::time::Duration;
    use tokio::sync::mpsc::error::TryRecvError;

    const EMAIL: &str = "me@example.com";

    fn passphrase() -> Passphrase {
        Passphrase::new("correct horse")
    }

    async fn provider_with_account() -> Arc<MemoryProvider> {
        let provider = Arc::new(MemoryProvider::new());
        provider.sign_up(EMAIL, &passphrase(), "Me").await.unwrap();
        provider.confirm_account(EMAIL).unwrap();
        provider.sign_out().await.unwrap();
        provider
    }

    async fn wait_until<F>(manager: &SessionManager, predicate: F)
    where
        F: Fn(&AuthState) -> bool,
    {
        let mut rx = manager.watch_state();
        tokio::time::timeout(Duration::from_secs(1), async {
            while !predicate(&rx.borrow_and_update().clone()) {
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("state did not converge");
    }

    #[tokio::test]
    async fn test_initialize_without_session() {
        let provider = Arc::new(MemoryProvider::new());
        let (manager, _notices) = SessionManager::new(provider);

        manager.initialize().await.unwrap();
        assert_eq!(manager.state(), AuthState::Unauthenticated);

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_restore_does_not_greet() {
        let provider = provider_with_account().await;
        // A previously issued session is still valid at startup.
        provider.sign_in(EMAIL, &passphrase()).await.unwrap();

        let (manager, mut notices) = SessionManager::new(provider);
        manager.initialize().await.unwrap();

        assert!(manager.state().is_authenticated());
        assert_eq!(notices.try_recv(), Err(TryRecvError::Empty));

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_explicit_sign_in_greets_once() {
        let provider = provider_with_account().await;
        let (manager, mut notices) = SessionManager::new(provider);
        manager.initialize().await.unwrap();

        manager.sign_in(EMAIL, &passphrase()).await.unwrap();
        wait_until(&manager, AuthState::is_authenticated).await;

        assert_eq!(
            notices.recv().await,
            Some(SessionNotice::Welcome {
                email: EMAIL.to_string()
            })
        );
        // The pushed event for an explicit sign-in must not greet again.
        assert_eq!(notices.try_recv(), Err(TryRecvError::Empty));

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_sign_in_failure_keeps_state() {
        let provider = provider_with_account().await;
        let (manager, _notices) = SessionManager::new(provider);
        manager.initialize().await.unwrap();

        let result = manager.sign_in(EMAIL, &Passphrase::new("wrong")).await;
        assert_eq!(result, Err(AuthError::InvalidCredentials));
        assert_eq!(manager.state(), AuthState::Unauthenticated);

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_sign_up_transitions_only_on_confirmation() {
        let provider = Arc::new(MemoryProvider::new());
        let (manager, mut notices) = SessionManager::new(provider.clone());
        manager.initialize().await.unwrap();

        manager.sign_up(EMAIL, &passphrase(), "Me").await.unwrap();
        assert_eq!(manager.state(), AuthState::Unauthenticated);
        assert_eq!(
            notices.recv().await,
            Some(SessionNotice::ConfirmationSent {
                email: EMAIL.to_string()
            })
        );

        // The provider's asynchronous confirmation event performs the
        // transition, greeting the fresh first login.
        provider.confirm_account(EMAIL).unwrap();
        wait_until(&manager, AuthState::is_authenticated).await;
        assert_eq!(
            notices.recv().await,
            Some(SessionNotice::Welcome {
                email: EMAIL.to_string()
            })
        );

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_sign_out() {
        let provider = provider_with_account().await;
        let (manager, mut notices) = SessionManager::new(provider);
        manager.initialize().await.unwrap();

        manager.sign_in(EMAIL, &passphrase()).await.unwrap();
        wait_until(&manager, AuthState::is_authenticated).await;
        let _ = notices.recv().await; // welcome

        manager.sign_out().await.unwrap();
        wait_until(&manager, |s| *s == AuthState::Unauthenticated).await;
        assert_eq!(notices.recv().await, Some(SessionNotice::SignedOut));

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let provider = Arc::new(MemoryProvider::new());
        let (manager, _notices) = SessionManager::new(provider);

        manager.initialize().await.unwrap();
        manager.initialize().await.unwrap();
        assert_eq!(manager.state(), AuthState::Unauthenticated);

        manager.shutdown().await;
    }
}
