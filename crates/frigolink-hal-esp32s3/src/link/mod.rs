//! Lock-free session status shared between the Wi-Fi worker and the engine
//! loop.

use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};

/// Lifecycle of the server session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum SessionState {
    Closed = 0,
    Opening = 1,
    Open = 2,
    /// Deliberately given up; never reopened without a reboot.
    Released = 3,
}

impl SessionState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Opening,
            2 => Self::Open,
            3 => Self::Released,
            _ => Self::Closed,
        }
    }
}

/// Immutable session snapshot for the engine loop and logs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub revision: u32,
}

impl SessionSnapshot {
    pub const fn is_open(self) -> bool {
        matches!(self.state, SessionState::Open)
    }
}

/// Shared session status; writers bump the revision on every real change.
#[derive(Debug)]
pub struct SessionHandle {
    state: AtomicU8,
    revision: AtomicU32,
}

impl SessionHandle {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(SessionState::Closed as u8),
            revision: AtomicU32::new(0),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: SessionState::from_raw(self.state.load(Ordering::Acquire)),
            revision: self.revision.load(Ordering::Acquire),
        }
    }

    pub fn mark_opening(&self) {
        self.store_state(SessionState::Opening);
    }

    pub fn mark_open(&self) {
        self.store_state(SessionState::Open);
    }

    pub fn mark_closed(&self) {
        // A released session stays released even if the link flaps.
        if self.snapshot().state == SessionState::Released {
            return;
        }
        self.store_state(SessionState::Closed);
    }

    pub fn mark_released(&self) {
        self.store_state(SessionState::Released);
    }

    fn store_state(&self, next: SessionState) {
        if self.state.swap(next as u8, Ordering::AcqRel) != next as u8 {
            self.revision.fetch_add(1, Ordering::AcqRel);
        }
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}
