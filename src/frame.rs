//! Wire frames
//!
//! The module implements a RAL-compatible interface for working
//! with the 99-bit parallel packet exchanged with the line encoder
//! and decoder. Bit 98 is the first bit on the wire.
//!
//! ```text
//!  98      91 90              72 71                      19 18     0
//! +----------+------------------+-------------------------+---------+
//! |   SYNC   | TOKEN/HANDSHAKE  |                         | CRC/EOP |
//! +----------+-------+----------+-------------------------+---------+
//! |   SYNC   |  PID  |                DATA                | CRC/EOP |
//! +----------+-------+------------------------------------+---------+
//!             \______________ PAYLOAD _______________/
//! ```
//!
//! The CRC and EOP bits belong to the external encoder, and they're
//! always zero here.

#![allow(non_snake_case, non_upper_case_globals)]

use crate::{ral, reg::Reg};

/// Number of bits in a frame.
pub const FRAME_BITS: u32 = 99;

/// The synchronization pattern that leads every frame.
pub const SYNC_PATTERN: u8 = 0b0000_0001;

const FRAME_MASK: u128 = (1 << FRAME_BITS) - 1;

/// A 99-bit packet, as offered to the line encoder
/// or received from the line decoder.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Frame {
    BITS: Reg<u128>,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    /// An all-zero frame; not even the sync field is set.
    pub const fn new() -> Self {
        Frame { BITS: Reg::new(0) }
    }

    /// A frame holding only the sync field.
    pub fn synced() -> Self {
        let mut frame = Frame::new();
        ral::write_reg!(crate::frame, &mut frame, BITS, SYNC: SYNC_PATTERN as u128);
        frame
    }

    /// Wrap raw bits from the line decoder.
    ///
    /// Bits beyond the frame width are dropped.
    pub fn from_raw(raw: u128) -> Self {
        Frame {
            BITS: Reg::new(raw & FRAME_MASK),
        }
    }

    /// Returns all 99 bits, right aligned.
    pub fn raw(&self) -> u128 {
        ral::read_reg!(crate::frame, self, BITS)
    }

    /// Indicates if no bit in the frame is set.
    pub fn is_empty(&self) -> bool {
        self.raw() == 0
    }

    pub fn sync(&self) -> u8 {
        ral::read_reg!(crate::frame, self, BITS, SYNC) as u8
    }

    /// Indicates if the frame leads with [`SYNC_PATTERN`].
    pub fn has_sync(&self) -> bool {
        ral::read_reg!(crate::frame, self, BITS, SYNC == SYNC_PATTERN as u128)
    }

    /// Returns the 19-bit token field.
    pub fn token(&self) -> u32 {
        ral::read_reg!(crate::frame, self, BITS, TOKEN) as u32
    }

    pub(crate) fn set_token(&mut self, token: u32) {
        ral::modify_reg!(crate::frame, self, BITS, TOKEN: token as u128);
    }

    /// Returns the 19-bit handshake identifier.
    ///
    /// This overlaps the token field, and the leading bits of a data
    /// packet's payload.
    pub fn handshake(&self) -> u32 {
        ral::read_reg!(crate::frame, self, BITS, HANDSHAKE) as u32
    }

    pub(crate) fn set_handshake(&mut self, id: u32) {
        ral::modify_reg!(crate::frame, self, BITS, HANDSHAKE: id as u128);
    }

    /// Returns the 72-bit payload of a data packet.
    pub fn payload(&self) -> u128 {
        ral::read_reg!(crate::frame, self, BITS, PAYLOAD)
    }

    pub(crate) fn set_payload(&mut self, payload: u128) {
        ral::modify_reg!(crate::frame, self, BITS, PAYLOAD: payload);
    }

    /// Returns the PID byte that leads a data packet's payload.
    pub fn pid(&self) -> u8 {
        ral::read_reg!(crate::frame, self, BITS, PID) as u8
    }

    /// Returns the 64-bit data field of a data packet.
    pub fn data(&self) -> u64 {
        ral::read_reg!(crate::frame, self, BITS, DATA) as u64
    }

    /// Iterate over the frame bits in wire order, starting with the sync field.
    pub fn bits(&self) -> Bits {
        Bits {
            raw: self.raw(),
            remaining: FRAME_BITS,
        }
    }
}

/// Frame bits in wire order
///
/// See [`Frame::bits`].
#[derive(Clone, Debug)]
pub struct Bits {
    raw: u128,
    remaining: u32,
}

impl Iterator for Bits {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        self.remaining = self.remaining.checked_sub(1)?;
        Some(self.raw & (1u128 << self.remaining) != 0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.remaining as usize;
        (len, Some(len))
    }
}

impl ExactSizeIterator for Bits {}

pub mod BITS {
    pub mod SYNC {
        pub const offset: u32 = 91;
        pub const mask: u128 = 0xFF << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    pub mod TOKEN {
        pub const offset: u32 = 72;
        pub const mask: u128 = 0x7_FFFF << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    pub mod HANDSHAKE {
        pub use super::TOKEN::*;
    }
    pub mod PAYLOAD {
        pub const offset: u32 = 19;
        pub const mask: u128 = 0xFF_FFFF_FFFF_FFFF_FFFF << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    pub mod PID {
        pub const offset: u32 = 83;
        pub const mask: u128 = 0xFF << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    pub mod DATA {
        pub const offset: u32 = 19;
        pub const mask: u128 = 0xFFFF_FFFF_FFFF_FFFF << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
}
