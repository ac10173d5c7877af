//! Input funnel from host callback threads into the session timeline
//!
//! Producers never take the session lock: they check a mirrored copy of the
//! session state and push onto a bounded channel. `step()` drains the channel
//! under the lock before running the frame. Everything one raw event
//! translates to travels as a single batch, so a joystick sample is either
//! queued whole or not at all.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};

use smallvec::SmallVec;

use super::state::{Operation, SessionState};
use crate::input::{
    InputEvent, RawKeyEvent, RawMotionSample, RawTouchEvent, translate_key, translate_motion,
    translate_touch,
};

/// Raw events buffered between two frames before new ones are dropped.
pub const INPUT_QUEUE_CAPACITY: usize = 4096;

/// Normalized events produced by one raw event.
pub(crate) type InputBatch = SmallVec<[InputEvent; 3]>;

/// Lock-free mirror of the session state read by input producers.
#[derive(Debug, Clone)]
pub(crate) struct StateMirror(Arc<AtomicU8>);

impl StateMirror {
    pub(crate) fn new(state: SessionState) -> Self {
        Self(Arc::new(AtomicU8::new(state.as_u8())))
    }

    pub(crate) fn store(&self, state: SessionState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }

    pub(crate) fn load(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire)).unwrap_or(SessionState::Destroyed)
    }
}

pub(crate) fn channel(mirror: StateMirror) -> (InputSender, Receiver<InputBatch>) {
    let (tx, rx) = sync_channel(INPUT_QUEUE_CAPACITY);
    (InputSender { tx, mirror }, rx)
}

/// Clonable handle for delivering input from any thread.
///
/// Events arriving before the surface is ready, or after destroy, are dropped
/// silently.
#[derive(Debug, Clone)]
pub struct InputSender {
    tx: SyncSender<InputBatch>,
    mirror: StateMirror,
}

impl InputSender {
    fn accepting(&self) -> bool {
        Operation::Input.is_allowed_in(self.mirror.load())
    }

    /// Queue a normalized event. Returns whether it was accepted.
    pub fn send(&self, event: InputEvent) -> bool {
        self.push(std::iter::once(event).collect())
    }

    fn push(&self, batch: InputBatch) -> bool {
        if batch.is_empty() || !self.accepting() {
            return false;
        }
        match self.tx.try_send(batch) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::trace!("Input queue full, dropping event");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Translate and queue a key event.
    ///
    /// Returns `true` when the key was consumed; otherwise the host should
    /// apply its default handling.
    pub fn on_key_event(&self, raw: &RawKeyEvent) -> bool {
        match translate_key(raw) {
            Some(event) => self.send(event.into()),
            None => false,
        }
    }

    /// Translate and queue a joystick sample. Returns `true` if consumed.
    pub fn on_motion_event(&self, raw: &RawMotionSample) -> bool {
        self.push(translate_motion(raw).into_iter().map(InputEvent::from).collect())
    }

    /// Translate and queue a touch event. Returns `true` if consumed.
    pub fn on_touch_event(&self, raw: &RawTouchEvent) -> bool {
        match translate_touch(raw) {
            Some(event) => self.send(event.into()),
            None => false,
        }
    }
}
