//! Packets and transaction requests
//!
//! A [`Packet`] is one of the three packet classes exchanged on the bus.
//! Packets become [`Frame`]s on their way to the line encoder, and inbound
//! frames are classified back into packets.

use crate::frame::Frame;
use usb_device::{UsbDirection, UsbError};

/// Width of the token field, in bits.
pub const TOKEN_BITS: u32 = 19;

/// Width of the RW-supplied data packet payload, in bits.
pub const PAYLOAD_BITS: u32 = 72;

/// 19-bit handshake identifier for an acknowledgment.
pub const ACK: u32 = 0x014b;

/// 19-bit handshake identifier for a negative acknowledgment.
pub const NAK: u32 = 0x015a;

/// Which controller drives the bus.
///
/// The kind is supplied once per transaction, and it's held stable
/// until the controller reports completion.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[repr(u8)]
pub enum TransactionKind {
    /// No transaction; the bus is quiet.
    #[default]
    None = 0b00,
    /// Request data from the remote peer.
    In = 0b01,
    /// Send data to the remote peer.
    Out = 0b10,
}

impl TransactionKind {
    /// Decode the 2-bit transaction kind.
    ///
    /// Only the low two bits are considered. Returns a parse error for
    /// the unassigned `0b11` code.
    pub fn from_bits(bits: u8) -> usb_device::Result<Self> {
        match bits & 0b11 {
            0b00 => Ok(TransactionKind::None),
            0b01 => Ok(TransactionKind::In),
            0b10 => Ok(TransactionKind::Out),
            _ => Err(UsbError::ParseError),
        }
    }

    /// Returns the 2-bit transaction kind code.
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Returns the data direction of this transaction, if any.
    ///
    /// Direction is taken from the engine's point of view, like the
    /// host's view in USB: `In` moves data towards the engine.
    pub fn direction(self) -> Option<UsbDirection> {
        match self {
            TransactionKind::None => None,
            TransactionKind::In => Some(UsbDirection::In),
            TransactionKind::Out => Some(UsbDirection::Out),
        }
    }
}

impl From<UsbDirection> for TransactionKind {
    fn from(direction: UsbDirection) -> Self {
        match direction {
            UsbDirection::In => TransactionKind::In,
            UsbDirection::Out => TransactionKind::Out,
        }
    }
}

/// A 19-bit token that addresses a transaction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Token(u32);

impl Token {
    /// Create a token.
    ///
    /// Returns a buffer overflow if `token` doesn't fit in 19 bits.
    pub fn new(token: u32) -> usb_device::Result<Self> {
        if token >> TOKEN_BITS != 0 {
            Err(UsbError::BufferOverflow)
        } else {
            Ok(Token(token))
        }
    }

    /// Create a token from the low 19 bits of `token`.
    pub const fn truncate(token: u32) -> Self {
        Token(token & ((1 << TOKEN_BITS) - 1))
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

/// A 72-bit data packet payload: PID byte, then 64 data bits.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Payload(u128);

impl Payload {
    /// Create a payload.
    ///
    /// Returns a buffer overflow if `payload` doesn't fit in 72 bits.
    pub fn new(payload: u128) -> usb_device::Result<Self> {
        if payload >> PAYLOAD_BITS != 0 {
            Err(UsbError::BufferOverflow)
        } else {
            Ok(Payload(payload))
        }
    }

    /// Create a payload from its PID and data fields.
    pub const fn from_parts(pid: u8, data: u64) -> Self {
        Payload((pid as u128) << 64 | data as u128)
    }

    pub const fn get(self) -> u128 {
        self.0
    }

    pub const fn pid(self) -> u8 {
        (self.0 >> 64) as u8
    }

    pub const fn data(self) -> u64 {
        self.0 as u64
    }
}

/// Handshake outcome.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Handshake {
    Ack,
    Nak,
}

impl Handshake {
    /// Returns the 19-bit handshake identifier.
    pub const fn id(self) -> u32 {
        match self {
            Handshake::Ack => ACK,
            Handshake::Nak => NAK,
        }
    }

    /// Returns `Ack` when `ack` is true, else `Nak`.
    pub const fn from_ack(ack: bool) -> Self {
        if ack {
            Handshake::Ack
        } else {
            Handshake::Nak
        }
    }
}

/// The packet classes, without their contents.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PacketKind {
    Token,
    Data,
    Handshake,
}

impl PacketKind {
    /// Returns the number of cycles the packet's leading field
    /// spends on the line.
    pub const fn field_cycles(self) -> u8 {
        match self {
            PacketKind::Handshake => HANDSHAKE_FIELD_CYCLES,
            PacketKind::Token => TOKEN_FIELD_CYCLES,
            PacketKind::Data => DATA_FIELD_CYCLES,
        }
    }
}

/// Cycles spent on a handshake packet's field.
pub const HANDSHAKE_FIELD_CYCLES: u8 = 12;
/// Cycles spent on a token packet's field.
///
/// This is also the fixed NRZI activation window.
pub const TOKEN_FIELD_CYCLES: u8 = 28;
/// Cycles spent on a data packet's field.
pub const DATA_FIELD_CYCLES: u8 = 92;

/// A packet.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Packet {
    Token(Token),
    Data(Payload),
    Handshake(Handshake),
}

impl Packet {
    pub const fn kind(&self) -> PacketKind {
        match self {
            Packet::Token(_) => PacketKind::Token,
            Packet::Data(_) => PacketKind::Data,
            Packet::Handshake(_) => PacketKind::Handshake,
        }
    }

    /// Frame the packet for the line encoder.
    ///
    /// Every frame leads with the sync pattern.
    pub fn frame(&self) -> Frame {
        let mut frame = Frame::synced();
        match *self {
            Packet::Token(token) => frame.set_token(token.get()),
            Packet::Data(payload) => frame.set_payload(payload.get()),
            Packet::Handshake(handshake) => frame.set_handshake(handshake.id()),
        }
        frame
    }

    /// Parse an inbound frame.
    ///
    /// The handshake field decides the class: `ACK` or `NAK` identifiers
    /// are handshakes, anything else is data. Tokens are never received.
    /// Returns a parse error if the frame doesn't lead with the sync pattern.
    pub fn parse(frame: &Frame) -> usb_device::Result<Self> {
        if !frame.has_sync() {
            return Err(UsbError::ParseError);
        }
        Ok(match frame.handshake() {
            ACK => Packet::Handshake(Handshake::Ack),
            NAK => Packet::Handshake(Handshake::Nak),
            _ => Packet::Data(Payload(frame.payload())),
        })
    }
}

impl Frame {
    /// Indicates if the handshake field holds the `NAK` identifier.
    ///
    /// This is the only classification the controllers need; everything
    /// else is treated as an acknowledgment or data.
    pub fn is_nak(&self) -> bool {
        self.handshake() == NAK
    }
}
