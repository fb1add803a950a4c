//! End-to-end exercises of the protocol engine against an in-memory flash
//! array and a collecting serial sink, covering the handful of concrete
//! command sequences the wire format is built around.

use std::sync::Mutex;

use trapconfig::wire::{
    Command, TypeTag, ACTIVE_TIMER_MAX, FRAME_END, LENGTH_ZERO, NEWLINE, NOT_USED, NUL,
};
use trapconfig::{CallbackSet, Engine, Mode};

static FLASH: Mutex<[u8; 1024]> = Mutex::new([0u8; 1024]);
static SERIAL_OUT: Mutex<Vec<u8>> = Mutex::new(Vec::new());

fn flash_read(addr: u16) -> u8 {
    FLASH.lock().unwrap()[addr as usize]
}

fn flash_write(byte: u8, addr: u16) {
    FLASH.lock().unwrap()[addr as usize] = byte;
}

fn serial_write(byte: u8) {
    SERIAL_OUT.lock().unwrap().push(byte);
}

fn reset_fixtures() {
    for cell in FLASH.lock().unwrap().iter_mut() {
        *cell = 0;
    }
    SERIAL_OUT.lock().unwrap().clear();
}

fn drain_output() -> Vec<u8> {
    core::mem::take(&mut SERIAL_OUT.lock().unwrap())
}

fn feed(engine: &mut Engine<32>, bytes: &[u8]) {
    for &b in bytes {
        engine.listen(b);
    }
}

fn new_engine() -> Engine<32> {
    reset_fixtures();
    Engine::setup(CallbackSet::new(flash_read, flash_write, serial_write)).unwrap()
}

#[test]
fn background_noise_never_activates_the_engine() {
    let mut engine = new_engine();
    feed(&mut engine, b"the quick brown fox jumps over 13 lazy dogs");
    assert_eq!(engine.mode(), Mode::Background);
    assert!(drain_output().is_empty());
}

#[test]
fn activation_key_flips_into_active_mode_and_acks() {
    let mut engine = new_engine();
    feed(&mut engine, &[2, 4, 6, 8]);
    assert_eq!(engine.mode(), Mode::Active);
    assert_eq!(drain_output(), vec![Command::ACK, NUL, FRAME_END, NEWLINE]);
}

#[test]
fn byte_outside_the_key_alphabet_never_reaches_the_detector() {
    // Only bytes belonging to the activation key are ever admitted to the
    // background fifo; anything else is dropped before the detector sees
    // it, so it cannot break an otherwise-valid key sequence.
    let mut engine = new_engine();
    feed(&mut engine, &[2, 4, 6, 99, 8]);
    assert_eq!(engine.mode(), Mode::Active);
}

#[test]
fn extra_key_byte_before_completion_slips_the_window() {
    // An extra in-alphabet byte queued ahead of the completing byte grows
    // the fifo past the key length, which invalidates the partial match.
    let mut engine = new_engine();
    feed(&mut engine, &[2, 4, 6, 2, 8]);
    assert_eq!(engine.mode(), Mode::Background);
}

#[test]
fn set_address_write_read_round_trip() {
    let mut engine = new_engine();
    feed(&mut engine, &[2, 4, 6, 8]);
    drain_output();

    // SET_ADDRESS 100 ('C' = 3 digits)
    feed(
        &mut engine,
        &[
            Command::SET_ADDRESS,
            NUL,
            TypeTag::NONE,
            b'C',
            NOT_USED,
            NOT_USED,
            b'1',
            b'0',
            b'0',
            NUL,
            FRAME_END,
        ],
    );
    assert_eq!(drain_output(), vec![Command::ACK, NUL, FRAME_END, NEWLINE]);
    assert_eq!(engine.address(), 100);

    // WRITE u8 = 42 ('B' = 2 digits)
    feed(
        &mut engine,
        &[
            Command::WRITE,
            NUL,
            TypeTag::U8,
            b'B',
            NOT_USED,
            NOT_USED,
            b'4',
            b'2',
            NUL,
            FRAME_END,
        ],
    );
    assert_eq!(drain_output(), vec![Command::ACK, NUL, FRAME_END, NEWLINE]);
    assert_eq!(flash_read(100), 42);

    // point back at 100 and READ it back
    feed(
        &mut engine,
        &[
            Command::SET_ADDRESS,
            NUL,
            TypeTag::NONE,
            b'C',
            NOT_USED,
            NOT_USED,
            b'1',
            b'0',
            b'0',
            NUL,
            FRAME_END,
        ],
    );
    drain_output();

    feed(
        &mut engine,
        &[Command::READ, NUL, TypeTag::U8, LENGTH_ZERO, NOT_USED, NOT_USED, NUL, FRAME_END],
    );
    assert_eq!(
        drain_output(),
        vec![Command::READ_RESPONSE, NUL, TypeTag::U8, LENGTH_ZERO, NOT_USED, NOT_USED, b'4', b'2', NUL, FRAME_END, NEWLINE]
    );
}

#[test]
fn get_address_reports_the_current_pointer() {
    let mut engine = new_engine();
    feed(&mut engine, &[2, 4, 6, 8]);
    drain_output();

    feed(
        &mut engine,
        &[
            Command::SET_ADDRESS,
            NUL,
            TypeTag::NONE,
            b'B',
            NOT_USED,
            NOT_USED,
            b'5',
            b'0',
            NUL,
            FRAME_END,
        ],
    );
    drain_output();

    feed(
        &mut engine,
        &[Command::GET_ADDRESS, NUL, TypeTag::NONE, LENGTH_ZERO, NOT_USED, NOT_USED, NUL, FRAME_END],
    );
    assert_eq!(
        drain_output(),
        vec![Command::AT_ADDRESS_RESPONSE, NUL, TypeTag::NONE, LENGTH_ZERO, NOT_USED, NOT_USED, b'5', b'0', NUL, FRAME_END, NEWLINE]
    );
}

#[test]
fn write_float_preserves_four_decimal_digits() {
    let mut engine = new_engine();
    feed(&mut engine, &[2, 4, 6, 8]);
    drain_output();

    feed(
        &mut engine,
        &[
            Command::WRITE,
            NUL,
            TypeTag::Float,
            b'F',
            NOT_USED,
            NOT_USED,
            b'3',
            b'.',
            b'1',
            b'4',
            b'1',
            b'6',
            NUL,
            FRAME_END,
        ],
    );
    assert_eq!(drain_output(), vec![Command::ACK, NUL, FRAME_END, NEWLINE]);

    let (value, _) = trapconfig::codec::read_float(&mut flash_read, 0);
    assert!((value - 3.1416).abs() <= 5e-5, "got {value}");
}

#[test]
fn malformed_write_frame_is_nacked() {
    let mut engine = new_engine();
    feed(&mut engine, &[2, 4, 6, 8]);
    drain_output();

    // dataLength letter '0' is not a capital letter
    feed(
        &mut engine,
        &[Command::WRITE, NUL, TypeTag::U8, b'0', NOT_USED, NOT_USED, NUL, FRAME_END],
    );
    assert_eq!(drain_output(), vec![Command::NACK, NUL, FRAME_END, NEWLINE]);
    assert_eq!(engine.mode(), Mode::Active);
}

#[test]
fn terminate_acks_runs_on_exit_and_returns_to_background() {
    static EXITED: Mutex<bool> = Mutex::new(false);
    fn on_exit() {
        *EXITED.lock().unwrap() = true;
    }

    let mut engine = new_engine();
    engine.set_on_exit(on_exit);
    feed(&mut engine, &[2, 4, 6, 8]);
    drain_output();

    feed(
        &mut engine,
        &[Command::TERMINATE, NUL, TypeTag::NONE, LENGTH_ZERO, NOT_USED, NOT_USED, NUL, FRAME_END],
    );
    assert_eq!(drain_output(), vec![Command::ACK, NUL, FRAME_END, NEWLINE]);
    assert_eq!(engine.mode(), Mode::Background);
    assert!(*EXITED.lock().unwrap());
}

#[test]
fn active_mode_times_out_back_to_background_without_on_exit() {
    static EXITED: Mutex<bool> = Mutex::new(false);
    fn on_exit() {
        *EXITED.lock().unwrap() = true;
    }

    let mut engine = new_engine();
    engine.set_on_exit(on_exit);
    feed(&mut engine, &[2, 4, 6, 8]);
    drain_output();

    for _ in 0..=ACTIVE_TIMER_MAX {
        engine.loop_tick();
    }
    assert_eq!(engine.mode(), Mode::Background);
    assert!(!*EXITED.lock().unwrap());
}
