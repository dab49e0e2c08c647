//! Debounced live preview refresh
//!
//! Every session is either `Idle` or has exactly one refresh pending. The
//! first edit of a burst arms a single-shot task; further edits are absorbed
//! until it fires, at which point the text as it is then gets interpreted.
//! Sessions are independent of each other and of which one is active.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::{debug, trace};

use super::timer::{DeferredQueue, TaskToken};
use crate::interpreter::DocumentInterpreter;
use crate::markup::RenderResult;
use crate::session::{DocumentSession, SessionId, SessionManager};
use crate::sink::PresentationSink;

/// Default delay between the first edit and the refresh.
pub const DEFAULT_PREVIEW_DELAY: Duration = Duration::from_millis(1000);

/// Refresh state of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshState {
    #[default]
    Idle,
    /// A refresh task is armed and will fire at `due`
    Pending { token: TaskToken, due: Instant },
}

/// Per-session debounce state machine over a shared deferred task queue.
#[derive(Debug)]
pub struct PreviewScheduler {
    delay: Duration,
    states: HashMap<SessionId, RefreshState>,
    queue: DeferredQueue<SessionId>,
}

impl PreviewScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            states: HashMap::new(),
            queue: DeferredQueue::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Change the debounce delay. Already armed refreshes keep their deadline.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    pub fn state(&self, session: SessionId) -> RefreshState {
        self.states.get(&session).copied().unwrap_or_default()
    }

    pub fn is_pending(&self, session: SessionId) -> bool {
        matches!(self.state(session), RefreshState::Pending { .. })
    }

    /// Record an edit of `session`.
    ///
    /// Returns `true` if this edit armed a new refresh, `false` if live
    /// preview is off or a refresh is already pending.
    pub fn notify_edit(&mut self, session: &DocumentSession, now: Instant) -> bool {
        if !session.is_live_preview() {
            return false;
        }

        let id = session.id();
        if self.is_pending(id) {
            trace!("Edit of session {} coalesced into pending refresh", id);
            return false;
        }

        let token = self.queue.schedule_after(now, self.delay, id);
        let due = now + self.delay;
        self.states.insert(id, RefreshState::Pending { token, due });
        debug!("Preview refresh for session {} scheduled in {:?}", id, self.delay);
        true
    }

    /// Fire every refresh due at `now`.
    ///
    /// Each fired refresh interprets the session's current text and pushes
    /// the result. Refreshes for sessions that have been closed are dropped.
    /// Returns the number of renders pushed.
    pub fn fire_due(
        &mut self,
        now: Instant,
        sessions: &SessionManager,
        interpreter: &mut DocumentInterpreter,
        sink: &mut dyn PresentationSink,
    ) -> usize {
        let mut refreshed = 0;
        for (token, id) in self.queue.pop_due(now) {
            match self.states.get(&id) {
                Some(RefreshState::Pending { token: pending, .. }) if *pending == token => {}
                _ => {
                    trace!("Dropping refresh for session {} without a pending state", id);
                    continue;
                }
            }
            self.states.insert(id, RefreshState::Idle);

            let Some(session) = sessions.get(id) else {
                debug!("Refresh fired for closed session {}", id);
                continue;
            };

            let result = interpreter.interpret(session);
            sink.push_render(id, &result);
            refreshed += 1;
        }
        refreshed
    }

    /// Interpret and push immediately, outside the debounce state machine.
    pub fn refresh_now(
        &self,
        session: &DocumentSession,
        interpreter: &mut DocumentInterpreter,
        sink: &mut dyn PresentationSink,
    ) -> RenderResult {
        let result = interpreter.interpret(session);
        sink.push_render(session.id(), &result);
        result
    }

    /// Earliest deadline among armed refreshes.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.next_deadline()
    }

    /// Forget a closed session. Its armed task still fires, as a no-op.
    pub fn forget(&mut self, session: SessionId) {
        self.states.remove(&session);
    }
}

impl Default for PreviewScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_DELAY)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
