//! NRZI line coding
//!
//! A logical one holds the line level, and a logical zero toggles it. The
//! [`Coder`] transcodes the serial bit stream from the external encoder, but
//! only within an activation window at the start of each packet. Outside the
//! window, bits pass straight through, and the line level returns high.
//!
//! The window opens when the upstream bit source asserts `valid`, and it
//! stays open for [`TOKEN_FIELD_CYCLES`] cycles. This is true for every packet
//! kind. Select [`Window::PerKind`] to size the window from
//! [`PacketKind::field_cycles`] instead.
//!
//! ```
//! use usbll::nrzi::{Coder, Decoder, LineIn, Window};
//! use usbll::packet::PacketKind;
//!
//! let mut coder = Coder::new(Window::Fixed);
//! let mut decoder = Decoder::new();
//!
//! let bits = [true, false, false, true, false];
//! let mut decoded = [false; 5];
//! // The coder has one cycle of latency. The first output is the idle line.
//! let idle = coder.tick(LineIn::bit(bits[0], PacketKind::Token), false);
//! assert!(!idle.valid);
//! for (idx, bit) in bits.iter().skip(1).enumerate() {
//!     let out = coder.tick(LineIn::bit(*bit, PacketKind::Token), false);
//!     decoded[idx] = decoder.decode(out.bit);
//! }
//! let out = coder.tick(LineIn::IDLE, false);
//! decoded[4] = decoder.decode(out.bit);
//! assert_eq!(decoded, bits);
//! ```

use crate::packet::{PacketKind, TOKEN_FIELD_CYCLES};

/// NRZI activation window policy.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Window {
    /// Transcode the first 28 cycles of every packet.
    #[default]
    Fixed,
    /// Transcode the packet's leading field, sized by packet kind.
    PerKind,
}

impl Window {
    /// Returns the number of cycles the coder is active for a packet of `kind`.
    pub const fn cycles(self, kind: PacketKind) -> u8 {
        match self {
            Window::Fixed => TOKEN_FIELD_CYCLES,
            Window::PerKind => kind.field_cycles(),
        }
    }
}

/// A serial bit from the upstream encoder.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LineIn {
    pub bit: bool,
    /// The upstream source is ready, and `bit` is valid.
    pub valid: bool,
    /// The kind of packet being serialized.
    pub kind: PacketKind,
}

impl LineIn {
    /// No packet in progress.
    pub const IDLE: LineIn = LineIn {
        bit: true,
        valid: false,
        kind: PacketKind::Token,
    };

    /// A valid bit of a `kind` packet.
    pub const fn bit(bit: bool, kind: PacketKind) -> Self {
        LineIn {
            bit,
            valid: true,
            kind,
        }
    }
}

/// A serial bit for the line driver.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LineOut {
    pub bit: bool,
    pub valid: bool,
}

impl LineOut {
    /// The idle line: high, nothing valid.
    pub const IDLE: LineOut = LineOut {
        bit: true,
        valid: false,
    };
}

/// NRZI transcoder and its activation policy.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Coder {
    window: Window,
    /// Line level, held across packets.
    level: bool,
    /// Cycles since the upstream source became ready.
    elapsed: u8,
    /// Registered output.
    out: LineOut,
}

impl Default for Coder {
    fn default() -> Self {
        Self::new(Window::default())
    }
}

impl Coder {
    /// Create a coder with the line high.
    pub const fn new(window: Window) -> Self {
        Coder {
            window,
            level: true,
            elapsed: 0,
            out: LineOut::IDLE,
        }
    }

    pub const fn window(&self) -> Window {
        self.window
    }

    /// Returns the current line level.
    pub const fn level(&self) -> bool {
        self.level
    }

    /// Returns the number of cycles since the upstream source became ready.
    ///
    /// Saturates at `u8::MAX`.
    pub const fn elapsed(&self) -> u8 {
        self.elapsed
    }

    /// Indicates if a bit presented with `input` would be transcoded.
    pub const fn use_nrzi(&self, input: &LineIn) -> bool {
        input.valid && self.elapsed < self.window.cycles(input.kind)
    }

    /// Advance the coder by one cycle.
    ///
    /// Returns the output registered on the previous cycle. `reset` returns
    /// the line high, and produces the idle output.
    pub fn tick(&mut self, input: LineIn, reset: bool) -> LineOut {
        if reset {
            *self = Coder::new(self.window);
            return LineOut::IDLE;
        }

        let active = self.use_nrzi(&input);
        if !active {
            self.level = true;
        } else if !input.bit {
            self.level = !self.level;
        }

        let previous = self.out;
        self.out = LineOut {
            bit: if active { self.level } else { input.bit },
            valid: input.valid,
        };
        self.elapsed = if input.valid {
            self.elapsed.saturating_add(1)
        } else {
            0
        };
        previous
    }
}

/// NRZI decoder.
///
/// The inverse of a [`Coder`] while it's active: an unchanged level is a one,
/// and a toggled level is a zero.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Decoder {
    level: bool,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Create a decoder that expects the line to start high.
    pub const fn new() -> Self {
        Decoder { level: true }
    }

    /// Expect the line to be high again.
    pub fn reset(&mut self) {
        self.level = true;
    }

    /// Decode the next line level.
    pub fn decode(&mut self, level: bool) -> bool {
        let bit = level == self.level;
        self.level = level;
        bit
    }
}
