//! Frame scanning and the five command handlers.

use super::Engine;
use crate::codec::{self, Scalar};
use crate::wire::{self, Command, TypeTag, FRAME_END, LENGTH_ZERO, MAX_ADDRESS_LEN, MAX_WRITE_LEN, NOT_USED, NUL};

impl<const N: usize> Engine<N> {
    /// Scans the accumulated frame for a recognized command byte followed
    /// by [`NUL`], dispatches to its handler, then drains whatever is left
    /// in the fifo (except after TERMINATE, which returns immediately).
    ///
    /// A stray [`FRAME_END`] encountered before any command byte ends the
    /// scan with nothing dispatched — matching the reference firmware,
    /// this is not itself a NACK.
    pub(super) fn parse_frame(&mut self) {
        while self.fifo.size() > 0 {
            let Ok(byte) = self.fifo.pop() else { return };
            if byte == FRAME_END {
                return;
            }
            match byte {
                Command::SET_ADDRESS => {
                    if self.fifo.pop() == Ok(NUL) {
                        self.cmd_set_address();
                        self.fifo.drain();
                        return;
                    }
                }
                Command::WRITE => {
                    if self.fifo.pop() == Ok(NUL) {
                        self.cmd_write();
                        self.fifo.drain();
                        return;
                    }
                }
                Command::READ => {
                    if self.fifo.pop() == Ok(NUL) {
                        self.cmd_read();
                        self.fifo.drain();
                        return;
                    }
                }
                Command::GET_ADDRESS => {
                    if self.fifo.pop() == Ok(NUL) {
                        self.cmd_get_address();
                        self.fifo.drain();
                        return;
                    }
                }
                Command::TERMINATE => {
                    if self.fifo.pop() == Ok(NUL) {
                        self.cmd_terminate();
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    fn cmd_set_address(&mut self) {
        if self.fifo.pop() != Ok(TypeTag::NONE) {
            return self.send_nack();
        }
        let Ok(len_byte) = self.fifo.pop() else { return self.send_nack() };
        let Some(len) = wire::decode_length_letter(len_byte) else { return self.send_nack() };
        if len > MAX_ADDRESS_LEN {
            return self.send_nack();
        }
        if self.fifo.pop() != Ok(NOT_USED) {
            return self.send_nack();
        }
        if self.fifo.pop() != Ok(NOT_USED) {
            return self.send_nack();
        }
        let mut digits = heapless::Vec::<u8, 5>::new();
        for _ in 0..len {
            let Ok(b) = self.fifo.pop() else { return self.send_nack() };
            if !b.is_ascii_digit() {
                return self.send_nack();
            }
            let _ = digits.push(b);
        }
        if self.fifo.pop() != Ok(NUL) {
            return self.send_nack();
        }
        let address = codec::str_to_uint(&digits) as u16;
        self.cursor.set_address(address);
        self.send_ack();
    }

    fn cmd_write(&mut self) {
        let Ok(type_byte) = self.fifo.pop() else { return self.send_nack() };
        let Some(tag) = TypeTag::from_byte(type_byte) else { return self.send_nack() };
        if tag == TypeTag::None {
            return self.send_nack();
        }
        let Ok(len_byte) = self.fifo.pop() else { return self.send_nack() };
        let Some(len) = wire::decode_length_letter(len_byte) else { return self.send_nack() };
        if len > MAX_WRITE_LEN {
            return self.send_nack();
        }
        if self.fifo.pop() != Ok(NOT_USED) {
            return self.send_nack();
        }
        if self.fifo.pop() != Ok(NOT_USED) {
            return self.send_nack();
        }
        let mut data = heapless::Vec::<u8, 24>::new();
        for _ in 0..len {
            let Ok(b) = self.fifo.pop() else { return self.send_nack() };
            if !Self::byte_allowed_for(tag, b) {
                return self.send_nack();
            }
            let _ = data.push(b);
        }
        if self.fifo.pop() != Ok(NUL) {
            return self.send_nack();
        }
        self.call_if_first_write();
        let value = Self::parse_scalar(tag, &data);
        let addr = self.cursor.address();
        let next = {
            let callbacks = self.callbacks;
            codec::write_scalar(&mut |b, a| (callbacks.flash_write)(b, a), addr, value)
        };
        self.cursor.advance_to(next);
        self.written = self.written.wrapping_add(1);
        self.send_ack();
    }

    /// A WRITE payload byte is valid if it's a decimal digit, or the sign
    /// expected for `tag`'s signed representation, or a `.` when `tag` is
    /// [`TypeTag::Float`], or any byte at all when `tag` is
    /// [`TypeTag::Char`].
    fn byte_allowed_for(tag: TypeTag, byte: u8) -> bool {
        if tag == TypeTag::Char {
            return true;
        }
        if byte.is_ascii_digit() {
            return true;
        }
        if byte == b'.' && tag == TypeTag::Float {
            return true;
        }
        if byte == b'-' && matches!(tag, TypeTag::I8 | TypeTag::I16 | TypeTag::I32 | TypeTag::Float) {
            return true;
        }
        false
    }

    fn parse_scalar(tag: TypeTag, data: &[u8]) -> Scalar {
        match tag {
            TypeTag::U8 => Scalar::U8(codec::str_to_uint(data) as u8),
            TypeTag::I8 => Scalar::I8(codec::str_to_int(data) as i8),
            TypeTag::U16 => Scalar::U16(codec::str_to_uint(data) as u16),
            TypeTag::I16 => Scalar::I16(codec::str_to_int(data) as i16),
            TypeTag::U32 => Scalar::U32(codec::str_to_uint(data)),
            TypeTag::I32 => Scalar::I32(codec::str_to_int(data)),
            TypeTag::Float => Scalar::Float(codec::str_to_float(data)),
            TypeTag::Char => Scalar::Char(data.first().copied().unwrap_or(0)),
            TypeTag::None => Scalar::U8(0),
        }
    }

    fn cmd_read(&mut self) {
        let Ok(type_byte) = self.fifo.pop() else { return self.send_nack() };
        let Some(tag) = TypeTag::from_byte(type_byte) else { return self.send_nack() };
        if tag == TypeTag::None {
            return self.send_nack();
        }
        if self.fifo.pop() != Ok(LENGTH_ZERO) {
            return self.send_nack();
        }
        if self.fifo.pop() != Ok(NOT_USED) {
            return self.send_nack();
        }
        if self.fifo.pop() != Ok(NOT_USED) {
            return self.send_nack();
        }
        if self.fifo.pop() != Ok(NUL) {
            return self.send_nack();
        }
        let addr = self.cursor.address();
        let (value, next) = {
            let callbacks = self.callbacks;
            codec::read_scalar(&mut |a| (callbacks.flash_read)(a), addr, tag)
        };
        self.cursor.advance_to(next);
        self.emit(Command::READ_RESPONSE);
        self.emit(NUL);
        self.emit(tag.to_byte());
        self.emit(LENGTH_ZERO);
        self.emit(NOT_USED);
        self.emit(NOT_USED);
        let callbacks = self.callbacks;
        codec::print_scalar(value, |b| (callbacks.serial_write)(b));
        self.emit(NUL);
        self.emit(FRAME_END);
        self.emit(wire::NEWLINE);
    }

    fn cmd_get_address(&mut self) {
        if self.fifo.pop() != Ok(TypeTag::NONE) {
            return self.send_nack();
        }
        if self.fifo.pop() != Ok(LENGTH_ZERO) {
            return self.send_nack();
        }
        if self.fifo.pop() != Ok(NOT_USED) {
            return self.send_nack();
        }
        if self.fifo.pop() != Ok(NOT_USED) {
            return self.send_nack();
        }
        if self.fifo.pop() != Ok(NUL) {
            return self.send_nack();
        }
        self.emit(Command::AT_ADDRESS_RESPONSE);
        self.emit(NUL);
        self.emit(TypeTag::NONE);
        self.emit(LENGTH_ZERO);
        self.emit(NOT_USED);
        self.emit(NOT_USED);
        let address = self.cursor.address();
        let callbacks = self.callbacks;
        codec::print_u16(address, |b| (callbacks.serial_write)(b));
        self.emit(NUL);
        self.emit(FRAME_END);
        self.emit(wire::NEWLINE);
    }

    fn cmd_terminate(&mut self) {
        if self.fifo.pop() != Ok(TypeTag::NONE) {
            return self.send_nack();
        }
        if self.fifo.pop() != Ok(LENGTH_ZERO) {
            return self.send_nack();
        }
        if self.fifo.pop() != Ok(NOT_USED) {
            return self.send_nack();
        }
        if self.fifo.pop() != Ok(NOT_USED) {
            return self.send_nack();
        }
        if self.fifo.pop() != Ok(NUL) {
            return self.send_nack();
        }
        self.send_ack();
        if let Some(on_exit) = self.callbacks.on_exit {
            on_exit();
        }
        self.mode = super::Mode::Background;
        self.detector.reset();
    }

    pub(super) fn send_ack(&mut self) {
        self.emit(Command::ACK);
        self.emit(NUL);
        self.emit(FRAME_END);
        self.emit(wire::NEWLINE);
    }

    pub(super) fn send_nack(&mut self) {
        self.emit(Command::NACK);
        self.emit(NUL);
        self.emit(FRAME_END);
        self.emit(wire::NEWLINE);
    }
}
