//! Client auth session: token storage, one-time initialization, and a
//! single-flight token refresh shared by concurrent requests.

use std::collections::HashMap;

use anyhow::anyhow;
use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::api::{AuthTokens, is_auth_endpoint};

pub const UNAUTHORIZED: u16 = 401;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitState {
    #[default]
    NotStarted,
    InFlight,
    Done,
}

#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    access: Option<String>,
    refresh: Option<String>,
}

impl TokenStore {
    pub fn access_token(&self) -> Option<&str> {
        self.access.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh.as_deref()
    }

    pub fn set(&mut self, tokens: AuthTokens) {
        self.access = Some(tokens.access_token);
        self.refresh = Some(tokens.refresh_token);
    }

    pub fn clear(&mut self) {
        self.access = None;
        self.refresh = None;
    }
}

#[derive(Debug, Default)]
struct FlightState {
    generation: u64,
    in_flight: bool,
    waiting: usize,
    /// Finished flights that still have waiters to hand their outcome to,
    /// with the number of waiters left.
    outcomes: HashMap<u64, (Result<String, String>, usize)>,
}

/// Runs at most one refresh at a time. Callers arriving while a refresh is
/// running block until it finishes and receive its outcome instead of
/// starting their own.
#[derive(Debug, Default)]
pub struct RefreshFlight {
    state: Mutex<FlightState>,
    done: Condvar,
}

impl RefreshFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run<F>(&self, refresh: F) -> anyhow::Result<String>
    where
        F: FnOnce() -> anyhow::Result<String>,
    {
        let mut state = self.state.lock();
        if state.in_flight {
            let awaited = state.generation;
            state.waiting += 1;
            debug!(generation = awaited, waiting = state.waiting, "joining in-flight refresh");
            loop {
                self.done.wait(&mut state);
                let Some(entry) = state.outcomes.get_mut(&awaited) else {
                    continue;
                };
                let outcome = entry.0.clone();
                entry.1 -= 1;
                if entry.1 == 0 {
                    state.outcomes.remove(&awaited);
                }
                return outcome.map_err(|msg| anyhow!("token refresh failed: {msg}"));
            }
        }

        state.generation += 1;
        state.in_flight = true;
        let mut leader = Leader {
            flight: self,
            generation: state.generation,
            published: false,
        };
        drop(state);

        let outcome = refresh().map_err(|err| format!("{err:#}"));
        leader.publish(&outcome);

        outcome.map_err(|msg| anyhow!("token refresh failed: {msg}"))
    }

    /// Callers currently blocked on the running refresh.
    pub fn waiters(&self) -> usize {
        self.state.lock().waiting
    }
}

/// Ends a flight exactly once. If the refresh unwinds before publishing,
/// dropping the leader hands waiters a failure and frees the slot.
struct Leader<'a> {
    flight: &'a RefreshFlight,
    generation: u64,
    published: bool,
}

impl Leader<'_> {
    fn publish(&mut self, outcome: &Result<String, String>) {
        self.published = true;
        let mut state = self.flight.state.lock();
        state.in_flight = false;
        let waiting = std::mem::take(&mut state.waiting);
        if waiting > 0 {
            state
                .outcomes
                .insert(self.generation, (outcome.clone(), waiting));
        }
        drop(state);
        self.flight.done.notify_all();
        debug!(
            generation = self.generation,
            waiting,
            ok = outcome.is_ok(),
            "refresh finished"
        );
    }
}

impl Drop for Leader<'_> {
    fn drop(&mut self) {
        if !self.published {
            warn!(generation = self.generation, "refresh panicked; releasing waiters");
            self.publish(&Err("refresh panicked".to_string()));
        }
    }
}

#[derive(Debug, Default)]
pub struct Session {
    tokens: RwLock<TokenStore>,
    init: Mutex<InitState>,
    flight: RefreshFlight,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: AuthTokens) -> Self {
        let session = Self::default();
        session.tokens.write().set(tokens);
        session
    }

    /// Claims initialization. Only the first caller gets `true`.
    pub fn begin_init(&self) -> bool {
        let mut init = self.init.lock();
        if *init != InitState::NotStarted {
            return false;
        }
        *init = InitState::InFlight;
        true
    }

    pub fn finish_init(&self) {
        *self.init.lock() = InitState::Done;
    }

    pub fn init_state(&self) -> InitState {
        *self.init.lock()
    }

    pub fn store_tokens(&self, tokens: AuthTokens) {
        self.tokens.write().set(tokens);
    }

    pub fn clear(&self) {
        self.tokens.write().clear();
    }

    pub fn access_token(&self) -> Option<String> {
        self.tokens.read().access_token().map(str::to_owned)
    }

    pub fn has_refresh_token(&self) -> bool {
        self.tokens.read().refresh_token().is_some()
    }

    /// `Authorization` header value for the current access token.
    pub fn bearer(&self) -> Option<String> {
        self.tokens
            .read()
            .access_token()
            .map(|token| format!("Bearer {token}"))
    }

    /// A failed request earns one refresh-and-retry: only a 401, never for
    /// the auth endpoints themselves, never twice.
    pub fn should_refresh(&self, path: &str, status: u16, retried: bool) -> bool {
        status == UNAUTHORIZED && !retried && !is_auth_endpoint(path)
    }

    /// Exchanges the stored refresh token for new tokens and returns the new
    /// access token. Concurrent callers share one exchange. A failed
    /// exchange clears the stored tokens.
    #[instrument(skip_all)]
    pub fn refresh<F>(&self, refresher: F) -> anyhow::Result<String>
    where
        F: FnOnce(&str) -> anyhow::Result<AuthTokens>,
    {
        self.flight.run(|| {
            let refresh_token = self
                .tokens
                .read()
                .refresh_token()
                .map(str::to_owned)
                .ok_or_else(|| anyhow!("no refresh token stored"))?;

            match refresher(&refresh_token) {
                Ok(tokens) => {
                    let access = tokens.access_token.clone();
                    self.tokens.write().set(tokens);
                    info!("access token refreshed");
                    Ok(access)
                }
                Err(err) => {
                    warn!(error = %err, "refresh rejected; clearing tokens");
                    self.tokens.write().clear();
                    Err(err)
                }
            }
        })
    }

    pub fn refresh_waiters(&self) -> usize {
        self.flight.waiters()
    }
}
