//! Packet assembly and dispatch
//!
//! The [`Engine`] owns one controller for each transaction kind, and the NRZI
//! coder. Every tick, it
//!
//! - selects the active controller by transaction kind,
//! - frames the packet the active controller is offering,
//! - classifies the inbound packet for the controllers, and forwards its
//!   data to the requester,
//! - advances the line coder.
//!
//! Both controllers run on every tick, but only the selected controller may
//! start a transaction, and only its outputs are observed.

use crate::{
    controller::{self, Controller, InTransaction, OutTransaction, Rx, State, Status},
    frame::Frame,
    nrzi::{Coder, LineIn, LineOut, Window},
    packet::{Handshake, Packet, Payload, Token, TransactionKind},
};

/// Engine configuration.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Config {
    /// NRZI activation window.
    pub window: Window,
}

/// A transaction request from the requester.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Request {
    pub kind: TransactionKind,
    pub token: Token,
    /// Data packet payload for OUT transactions.
    pub payload: Payload,
    /// For OUT, the payload is valid. For IN, there's room for the
    /// inbound data.
    pub available: bool,
}

/// The inbound packet, as delivered by the line decoder.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Received {
    pub frame: Frame,
    pub available: bool,
    /// The decoder marked the packet corrupt.
    pub corrupt: bool,
}

impl Received {
    /// Nothing received.
    pub const fn none() -> Self {
        Received {
            frame: Frame::new(),
            available: false,
            corrupt: false,
        }
    }

    /// A clean packet.
    pub fn packet(packet: &Packet) -> Self {
        Received {
            frame: packet.frame(),
            available: true,
            corrupt: false,
        }
    }

    /// A packet that failed the decoder's checks.
    pub fn corrupt(frame: Frame) -> Self {
        Received {
            frame,
            available: true,
            corrupt: true,
        }
    }
}

/// One tick's worth of engine inputs.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Inputs {
    /// Synchronous reset. Overrides everything else.
    pub reset: bool,
    pub request: Request,
    /// The encoder accepted the packet offered on the previous tick.
    pub sent: bool,
    pub rx: Received,
    /// Serial bit from the encoder, for the line coder.
    pub line: LineIn,
}

impl Default for Inputs {
    fn default() -> Self {
        Inputs {
            reset: false,
            request: Request::default(),
            sent: false,
            rx: Received::none(),
            line: LineIn::IDLE,
        }
    }
}

/// One tick's worth of engine outputs.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Outputs {
    /// Completion status of the active transaction.
    pub status: Status,
    /// The framed packet for the encoder.
    pub tx: Frame,
    /// `tx` is offered to the encoder.
    pub tx_valid: bool,
    /// The active controller samples inbound packets.
    pub rx_enable: bool,
    /// Data field of the inbound packet, for the requester.
    pub data: u64,
    /// `data` is valid.
    pub data_valid: bool,
    /// Serial bit for the line driver.
    pub line: LineOut,
}

impl Default for Outputs {
    fn default() -> Self {
        Outputs {
            status: Status::empty(),
            tx: Frame::new(),
            tx_valid: false,
            rx_enable: false,
            data: 0,
            data_valid: false,
            line: LineOut::IDLE,
        }
    }
}

/// The link-layer engine.
///
/// Call [`tick()`](Engine::tick) once per clock cycle.
///
/// # Example
///
/// An OUT transaction, with an encoder that's always ready, and a peer
/// that acknowledges the first data packet.
///
/// ```
/// use usbll::engine::{Config, Engine, Inputs, Received, Request};
/// use usbll::packet::{Handshake, Packet, Payload, Token, TransactionKind};
///
/// let mut engine = Engine::new(Config::default());
/// let request = Request {
///     kind: TransactionKind::Out,
///     token: Token::new(0x1_2345).unwrap(),
///     payload: Payload::from_parts(0xC3, 0xDEAD_BEEF),
///     available: true,
/// };
/// let mut inputs = Inputs {
///     request,
///     sent: true,
///     ..Inputs::default()
/// };
///
/// engine.tick(&inputs); // Idle; starts the transaction
/// let token = engine.tick(&inputs);
/// assert_eq!(token.tx, Packet::Token(request.token).frame());
/// let data = engine.tick(&inputs);
/// assert_eq!(data.tx, Packet::Data(request.payload).frame());
///
/// inputs.rx = Received::packet(&Packet::Handshake(Handshake::Ack));
/// let handshake = engine.tick(&inputs);
/// assert!(handshake.status.is_done());
/// assert!(handshake.status.is_success());
/// ```
#[derive(Clone, Debug)]
pub struct Engine {
    config: Config,
    /// Kind, token, and payload sampled while the active controller was idle.
    request: Request,
    in_transaction: InTransaction,
    out_transaction: OutTransaction,
    coder: Coder,
    cycle: u64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Engine {
    /// Create an engine in its reset state.
    pub const fn new(config: Config) -> Self {
        Engine {
            config,
            request: Request {
                kind: TransactionKind::None,
                token: Token::truncate(0),
                payload: Payload::from_parts(0, 0),
                available: false,
            },
            in_transaction: InTransaction::new(),
            out_transaction: OutTransaction::new(),
            coder: Coder::new(config.window),
            cycle: 0,
        }
    }

    pub const fn config(&self) -> Config {
        self.config
    }

    /// Returns the number of ticks since creation or the last reset.
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Returns the transaction kind that selects the active controller.
    pub const fn kind(&self) -> TransactionKind {
        self.request.kind
    }

    pub fn in_transaction(&self) -> &InTransaction {
        &self.in_transaction
    }

    pub fn out_transaction(&self) -> &OutTransaction {
        &self.out_transaction
    }

    pub fn coder(&self) -> &Coder {
        &self.coder
    }

    /// Indicates if the active controller has a transaction in flight.
    pub fn is_busy(&self) -> bool {
        match self.request.kind {
            TransactionKind::None => false,
            TransactionKind::In => !self.in_transaction.is_idle(),
            TransactionKind::Out => !self.out_transaction.is_idle(),
        }
    }

    /// Advance the engine by one clock tick.
    pub fn tick(&mut self, inputs: &Inputs) -> Outputs {
        if inputs.reset {
            self.reset();
            return Outputs::default();
        }

        // The request is held until the transaction completes.
        if !self.is_busy() {
            if self.request.kind != inputs.request.kind {
                debug!("SELECT {=u8}", inputs.request.kind.bits());
            }
            self.request.kind = inputs.request.kind;
            self.request.token = inputs.request.token;
            self.request.payload = inputs.request.payload;
        }
        let kind = self.request.kind;

        let rx = Rx {
            available: inputs.rx.available,
            nak: inputs.rx.frame.is_nak(),
            corrupt: inputs.rx.corrupt,
        };
        let controller_inputs = |start| controller::Inputs {
            reset: false,
            start,
            ready: inputs.request.available,
            sent: inputs.sent,
            rx,
        };
        let in_outputs = self
            .in_transaction
            .step(&controller_inputs(kind == TransactionKind::In));
        let out_outputs = self
            .out_transaction
            .step(&controller_inputs(kind == TransactionKind::Out));

        let (active, packet) = match kind {
            TransactionKind::None => (controller::Outputs::default(), None),
            TransactionKind::In => {
                let packet = if in_outputs.state != State::Handshake {
                    Packet::Token(self.request.token)
                } else {
                    Packet::Handshake(Handshake::from_ack(in_outputs.ack))
                };
                (in_outputs, Some(packet))
            }
            TransactionKind::Out => {
                let packet = if out_outputs.state == State::Token {
                    Packet::Token(self.request.token)
                } else {
                    Packet::Data(self.request.payload)
                };
                (out_outputs, Some(packet))
            }
        };

        if active.is_done() {
            debug!(
                "DONE {=u8} SUCCESS {=bool} CYCLE {=u64}",
                kind.bits(),
                active.is_success(),
                self.cycle
            );
        }

        let line = self.coder.tick(inputs.line, false);
        self.cycle = self.cycle.wrapping_add(1);

        Outputs {
            status: active.status,
            tx: packet.map_or_else(Frame::new, |packet| packet.frame()),
            tx_valid: active.tx_valid || active.send_handshake,
            rx_enable: active.rx_enable,
            data: inputs.rx.frame.data(),
            data_valid: inputs.rx.available,
            line,
        }
    }

    /// Return every controller, counter, and the line coder to
    /// its reset state.
    pub fn reset(&mut self) {
        *self = Engine::new(self.config);
        debug!("RESET");
    }
}
