//! Transaction controllers
//!
//! A controller drives a single transaction through its phases, one clock
//! tick at a time. Both controllers share the same four states, and the same
//! per-tick signals. See [`InTransaction`] and [`OutTransaction`] for how each
//! moves between states.
//!
//! Every call to [`Controller::step`] is one clock edge. The returned
//! [`Outputs`] are derived from the state registered *before* the edge, plus
//! that tick's [`Inputs`]. Reset is the exception: it takes effect immediately,
//! and a controller in reset reports nothing.

mod in_transaction;
mod out_transaction;

pub use in_transaction::{InTransaction, RETRY_LIMIT as IN_RETRY_LIMIT};
pub use out_transaction::{OutTransaction, RETRY_LIMIT as OUT_RETRY_LIMIT};

/// Controller state.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum State {
    /// No transaction in flight.
    #[default]
    Idle,
    /// Offering the token.
    Token,
    /// Exchanging the data packet.
    Data,
    /// Exchanging the handshake.
    Handshake,
}

impl State {
    pub const fn name(self) -> &'static str {
        match self {
            State::Idle => "IDLE",
            State::Token => "TOKEN",
            State::Data => "DATA",
            State::Handshake => "HANDSHAKE",
        }
    }
}

bitflags::bitflags! {
    /// Transaction completion status.
    ///
    /// `SUCCESS` is never set without `DONE`. A status that's `DONE` without
    /// `SUCCESS` is a transaction that exhausted its retries.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct Status : u8 {
        /// The transaction completed on this cycle.
        const DONE = 1 << 0;
        /// The completed transaction succeeded.
        const SUCCESS = 1 << 1;
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::empty()
    }
}

impl Status {
    /// Status of a transaction that completes on this cycle.
    pub const fn completed(success: bool) -> Self {
        if success {
            Status::DONE.union(Status::SUCCESS)
        } else {
            Status::DONE
        }
    }

    pub const fn is_done(self) -> bool {
        self.contains(Status::DONE)
    }

    pub const fn is_success(self) -> bool {
        self.contains(Status::SUCCESS)
    }
}

/// The inbound packet signals from the line decoder.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Rx {
    /// A packet is available.
    pub available: bool,
    /// The packet's handshake field holds `NAK`.
    pub nak: bool,
    /// The decoder marked the packet corrupt.
    pub corrupt: bool,
}

impl Rx {
    /// Nothing received.
    pub const NONE: Rx = Rx {
        available: false,
        nak: false,
        corrupt: false,
    };

    /// A clean packet that isn't a `NAK`: an acknowledgment, or data.
    pub const ACK: Rx = Rx {
        available: true,
        nak: false,
        corrupt: false,
    };

    /// A negative acknowledgment.
    pub const NAK: Rx = Rx {
        available: true,
        nak: true,
        corrupt: false,
    };

    /// A packet that failed the decoder's checks.
    pub const CORRUPT: Rx = Rx {
        available: true,
        nak: false,
        corrupt: true,
    };

    /// Indicates if a packet arrived, and it's neither corrupt nor a `NAK`.
    pub const fn is_clean(&self) -> bool {
        self.available && !self.nak && !self.corrupt
    }
}

/// One tick's worth of controller inputs.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Inputs {
    /// Synchronous reset. Overrides everything else.
    pub reset: bool,
    /// Begin a transaction when idle.
    pub start: bool,
    /// The requester is ready. For OUT, there's data to send. For IN, there's
    /// room for the data that will arrive.
    pub ready: bool,
    /// The encoder accepted what the controller offered on the previous tick.
    pub sent: bool,
    /// The inbound packet, if any.
    pub rx: Rx,
}

/// One tick's worth of controller outputs.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Outputs {
    /// The state during this tick.
    pub state: State,
    pub status: Status,
    /// A token or data packet is offered to the encoder.
    pub tx_valid: bool,
    /// A handshake is offered to the encoder.
    pub send_handshake: bool,
    /// The offered handshake is an acknowledgment. Meaningless unless
    /// `send_handshake` is set.
    pub ack: bool,
    /// The controller samples inbound packets this tick.
    pub rx_enable: bool,
    /// The previous attempt failed, and it's being retried.
    pub retry: bool,
}

impl Outputs {
    pub const fn is_done(&self) -> bool {
        self.status.is_done()
    }

    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// A transaction state machine.
pub trait Controller {
    /// How many failed attempts a transaction retries before it aborts.
    const RETRY_LIMIT: u8;

    /// Advance the controller by one clock tick.
    fn step(&mut self, inputs: &Inputs) -> Outputs;

    /// Returns the registered state.
    fn state(&self) -> State;

    /// Returns the number of retries spent on the transaction in flight.
    fn retries(&self) -> u8;

    /// Indicates if the controller is between transactions.
    fn is_idle(&self) -> bool {
        self.state() == State::Idle
    }
}

/// Retry budget for one transaction.
///
/// Counts up to `LIMIT`, and holds there.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub(crate) struct Retries<const LIMIT: u8> {
    count: u8,
}

impl<const LIMIT: u8> Retries<LIMIT> {
    pub const fn new() -> Self {
        Retries { count: 0 }
    }

    pub const fn count(&self) -> u8 {
        self.count
    }

    /// Indicates if another retry is permitted.
    pub const fn can_retry(&self) -> bool {
        self.count < LIMIT
    }

    /// Spend one retry. Returns `false` if the budget was exhausted.
    pub fn spend(&mut self) -> bool {
        let can_retry = self.can_retry();
        if can_retry {
            self.count += 1;
        }
        can_retry
    }

    pub fn clear(&mut self) {
        self.count = 0;
    }
}
