//! Connection state machine: `Opened -> Hanged -> Closed`, represented as
//! an `AtomicI32` the way the teacher's source material represents
//! connection state, with CAS-guarded transition helpers so racing
//! `grace_close`/`force_close` calls agree on exactly one winner.

use crate::error::{GateMeshError, Result};
use std::sync::atomic::{AtomicI32, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ConnState {
    Opened = 0,
    Hanged = 1,
    Closed = 2,
}

impl ConnState {
    fn from_i32(v: i32) -> Self {
        match v {
            0 => ConnState::Opened,
            1 => ConnState::Hanged,
            _ => ConnState::Closed,
        }
    }
}

#[derive(Debug)]
pub struct AtomicConnState(AtomicI32);

impl AtomicConnState {
    pub fn new() -> Self {
        Self(AtomicI32::new(ConnState::Opened as i32))
    }

    pub fn load(&self) -> ConnState {
        ConnState::from_i32(self.0.load(Ordering::SeqCst))
    }

    /// Errs if the connection isn't usable right now, mirroring
    /// `checkState` (hanged/closed both reject sends).
    pub fn check(&self) -> Result<()> {
        match self.load() {
            ConnState::Hanged => Err(GateMeshError::ConnectionHanged),
            ConnState::Closed => Err(GateMeshError::ConnectionClosed),
            ConnState::Opened => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.load() == ConnState::Closed
    }

    pub fn try_opened_to_hanged(&self) -> bool {
        self.0
            .compare_exchange(
                ConnState::Opened as i32,
                ConnState::Hanged as i32,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    pub fn try_hanged_to_closed(&self) -> bool {
        self.0
            .compare_exchange(
                ConnState::Hanged as i32,
                ConnState::Closed as i32,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Force-close transition: accepts either `Opened` or `Hanged` as the
    /// starting state, matching `forceClose`'s double CAS attempt.
    pub fn try_force_to_closed(&self) -> bool {
        self.0
            .compare_exchange(
                ConnState::Opened as i32,
                ConnState::Closed as i32,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
            || self
                .0
                .compare_exchange(
                    ConnState::Hanged as i32,
                    ConnState::Closed as i32,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_ok()
    }
}

impl Default for AtomicConnState {
    fn default() -> Self {
        Self::new()
    }
}
