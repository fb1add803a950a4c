//! The protocol engine: a single context struct owning the fifo, the
//! address cursor, the activation-key detector, the mode/timeout state,
//! and the host-supplied callbacks.
//!
//! Unlike the reference firmware, which swaps its serial/flash function
//! pointers on entry to and exit from active mode, [`Engine`] threads the
//! same [`CallbackSet`] through every call unconditionally — there is
//! nothing to save or restore.

mod detector;
mod dispatch;

pub use detector::KeyDetector;

use crate::codec::FlashScalar;
use crate::cursor::Cursor;
use crate::error::FifoError;
use crate::fifo::{ByteFifo, DrainMode};
use crate::wire::{ACTIVATION_KEY, ACTIVE_TIMER_MAX};

/// Whether the engine is passively watching the stream for an activation
/// key, or actively dispatching framed commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Background,
    Active,
}

/// Host-supplied I/O. All three of `flash_read`/`flash_write`/`serial_write`
/// are mandatory; the three lifecycle hooks are optional and default to
/// doing nothing.
#[derive(Clone, Copy)]
pub struct CallbackSet {
    pub flash_read: fn(u16) -> u8,
    pub flash_write: fn(u8, u16),
    pub serial_write: fn(u8),
    pub on_enter: Option<fn()>,
    pub on_exit: Option<fn()>,
    pub on_first_write: Option<fn()>,
}

impl CallbackSet {
    pub fn new(flash_read: fn(u16) -> u8, flash_write: fn(u8, u16), serial_write: fn(u8)) -> Self {
        Self {
            flash_read,
            flash_write,
            serial_write,
            on_enter: None,
            on_exit: None,
            on_first_write: None,
        }
    }
}

/// The protocol engine. `N` is the backing fifo's capacity; use
/// [`crate::wire::FIFO_CAPACITY`] unless a target needs otherwise.
pub struct Engine<const N: usize> {
    fifo: ByteFifo<N>,
    cursor: Cursor,
    detector: KeyDetector,
    mode: Mode,
    active_timer: u16,
    written: u16,
    callbacks: CallbackSet,
}

impl<const N: usize> Engine<N> {
    /// Builds a new engine in background mode, with an empty, idle fifo.
    ///
    /// Fails with [`FifoError::NonPowerOfTwo`] unless `N` is a power of two
    /// no smaller than 2.
    pub fn setup(callbacks: CallbackSet) -> Result<Self, FifoError> {
        Ok(Self {
            fifo: ByteFifo::new(DrainMode::Trigger)?,
            cursor: Cursor::new(),
            detector: KeyDetector::new(),
            mode: Mode::Background,
            active_timer: 0,
            written: 0,
            callbacks,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn address(&self) -> u16 {
        self.cursor.address()
    }

    pub fn set_address_offset(&mut self, offset: u16) {
        self.cursor.set_offset(offset);
    }

    pub fn set_on_enter(&mut self, f: fn()) {
        self.callbacks.on_enter = Some(f);
    }

    pub fn set_on_exit(&mut self, f: fn()) {
        self.callbacks.on_exit = Some(f);
    }

    pub fn set_on_first_write(&mut self, f: fn()) {
        self.callbacks.on_first_write = Some(f);
    }

    /// Typed read from flash at `address` (the raw device address; the
    /// cursor's configured offset is not applied). Advances the cursor to
    /// `address + size_of::<T>()`, mirroring every wire-driven READ.
    ///
    /// This is the host application's own accessor for its configuration
    /// variables, independent of the serial protocol — the application
    /// calls it directly, unaware that the same flash cells may also have
    /// just been rewritten by a host PC over the wire.
    pub fn get<T: FlashScalar>(&mut self, address: u16) -> T {
        let callbacks = self.callbacks;
        let (value, next) = T::read_from(&mut |a| (callbacks.flash_read)(a), address);
        self.cursor.advance_to(next);
        value
    }

    /// Feeds one received serial byte to the engine.
    ///
    /// In [`Mode::Background`] this only ever buffers bytes that are part
    /// of [`ACTIVATION_KEY`] — anything else is dropped without being
    /// queued. In [`Mode::Active`] every byte is buffered and the active
    /// timeout is reloaded; a [`crate::wire::FRAME_END`] byte additionally
    /// triggers a dispatch attempt over the accumulated frame.
    pub fn listen(&mut self, byte: u8) {
        match self.mode {
            Mode::Active => {
                self.active_timer = ACTIVE_TIMER_MAX;
                let _ = self.fifo.put(byte, |_, _| {});
                if byte == crate::wire::FRAME_END {
                    self.parse_frame();
                }
            }
            Mode::Background => {
                let key_len = ACTIVATION_KEY.len() as u16;
                if byte == ACTIVATION_KEY[ACTIVATION_KEY.len() - 1] && self.fifo.size() >= key_len - 1 {
                    let _ = self.fifo.put(byte, |_, _| {});
                    let detector = &mut self.detector;
                    let mut activated = false;
                    self.fifo.flush(|b, depth| {
                        if detector.on_byte(depth, b) {
                            activated = true;
                        }
                    });
                    if activated {
                        self.enter_active_mode();
                    }
                } else if ACTIVATION_KEY.contains(&byte) {
                    let _ = self.fifo.put(byte, |_, _| {});
                }
            }
        }
    }

    /// Advances the active-mode timeout by one tick. Once it reaches zero
    /// the engine silently drops back to background mode — no `on_exit`
    /// is invoked, matching the reference firmware's unconditional
    /// timeout reset.
    pub fn loop_tick(&mut self) {
        if self.mode == Mode::Active {
            if self.active_timer == 0 {
                self.mode = Mode::Background;
                self.detector.reset();
            } else {
                self.active_timer -= 1;
            }
        }
    }

    fn enter_active_mode(&mut self) {
        self.written = 0;
        self.send_ack();
        if let Some(on_enter) = self.callbacks.on_enter {
            on_enter();
        }
        self.mode = Mode::Active;
        self.active_timer = ACTIVE_TIMER_MAX;
    }

    fn call_if_first_write(&mut self) {
        if self.written == 0 {
            if let Some(on_first_write) = self.callbacks.on_first_write {
                on_first_write();
            }
        }
    }

    fn flash_write(&mut self, byte: u8, addr: u16) {
        (self.callbacks.flash_write)(byte, addr);
    }

    fn flash_read(&mut self, addr: u16) -> u8 {
        (self.callbacks.flash_read)(addr)
    }

    fn emit(&mut self, byte: u8) {
        (self.callbacks.serial_write)(byte);
    }
}
