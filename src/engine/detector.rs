//! Activation-key matcher for the background stream.

use crate::wire::ACTIVATION_KEY;

/// Tracks progress matching [`ACTIVATION_KEY`] against bytes drained from
/// the background fifo, one at a time.
///
/// Matching requires not just byte equality but that the byte hasn't been
/// sitting behind newer arrivals: a key byte is only accepted if, at the
/// moment it's drained, the queue still held at least as many bytes as are
/// left in the key (so a burst of unrelated bytes piling up behind a
/// partial match invalidates it rather than being silently skipped over).
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyDetector {
    progress: u8,
}

impl KeyDetector {
    pub fn new() -> Self {
        Self { progress: 0 }
    }

    pub fn reset(&mut self) {
        self.progress = 0;
    }

    /// Feeds one byte drained from the background fifo, given its pre-pop
    /// queue depth. Returns `true` exactly when `byte` completes the key.
    pub fn on_byte(&mut self, depth: u16, byte: u8) -> bool {
        let key_len = ACTIVATION_KEY.len() as u16;
        if depth > key_len {
            self.progress = 0;
            return false;
        }
        let expected = ACTIVATION_KEY[self.progress as usize];
        if byte != expected {
            self.progress = 0;
            return false;
        }
        let remaining = key_len - self.progress as u16;
        if remaining > 1 && depth < remaining {
            self.progress = 0;
            return false;
        }
        self.progress += 1;
        if self.progress as usize == ACTIVATION_KEY.len() {
            self.progress = 0;
            return true;
        }
        false
    }
}
