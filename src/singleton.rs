//! A process-wide [`Engine`] accessor, for targets that only ever need one
//! instance and would rather not thread it through every interrupt
//! handler by hand.
//!
//! This is a thin convenience layered on top of [`Engine`], not a
//! replacement for it — nothing here is required to use the crate.

use core::cell::RefCell;
use critical_section::Mutex;
use once_cell::sync::OnceCell;

use crate::engine::{CallbackSet, Engine};
use crate::error::FifoError;
use crate::wire::FIFO_CAPACITY;

type SharedEngine = Mutex<RefCell<Option<Engine<FIFO_CAPACITY>>>>;

static ENGINE: OnceCell<SharedEngine> = OnceCell::new();

/// Builds the process-wide engine. Must be called exactly once, before any
/// other function in this module.
pub fn init(callbacks: CallbackSet) -> Result<(), FifoError> {
    let engine = Engine::setup(callbacks)?;
    let cell = ENGINE.get_or_init(|| Mutex::new(RefCell::new(None)));
    critical_section::with(|cs| {
        *cell.borrow_ref_mut(cs) = Some(engine);
    });
    Ok(())
}

/// Runs `f` with exclusive access to the process-wide engine.
///
/// # Panics
/// Panics if called before [`init`].
pub fn with<R>(f: impl FnOnce(&mut Engine<FIFO_CAPACITY>) -> R) -> R {
    let cell = ENGINE.get().expect("singleton::init was not called");
    critical_section::with(|cs| {
        let mut engine = cell.borrow_ref_mut(cs);
        f(engine.as_mut().expect("singleton::init was not called"))
    })
}
