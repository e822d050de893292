//! IN transaction controller
//!
//! An IN transaction requests data from the remote peer:
//!
//! ```text
//!            start && ready         sent         packet or timeout
//!   IDLE ------------------> TOKEN ------> DATA ------------------> HANDSHAKE
//!    ^                                      ^                           |
//!    |                                      |      sent, retry pending  |
//!    |                                      +---------------------------+
//!    |                  sent, no retry pending                          |
//!    +------------------------------------------------------------------+
//! ```
//!
//! The controller answers every data attempt with a handshake: ACK if the
//! data arrived clean and in time, NAK otherwise. A failed attempt spends a
//! retry, and the controller waits for the data again once its NAK is sent.

use super::{Controller, Inputs, Outputs, Retries, Rx, State, Status};
use crate::timeout::Timeout;

/// Retries an IN transaction tolerates before it aborts.
pub const RETRY_LIMIT: u8 = 8;

/// Drives IN transactions.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct InTransaction {
    state: State,
    retries: Retries<RETRY_LIMIT>,
    retry: bool,
    /// The last data attempt arrived clean, before the timeout.
    pkt_good: bool,
    timeout: Timeout,
}

impl InTransaction {
    pub const fn new() -> Self {
        InTransaction {
            state: State::Idle,
            retries: Retries::new(),
            retry: false,
            pkt_good: false,
            timeout: Timeout::new(),
        }
    }

    /// Indicates if the last data attempt was received clean and in time.
    pub const fn pkt_good(&self) -> bool {
        self.pkt_good
    }

    /// Returns the data timeout counter.
    pub fn timeout(&self) -> &Timeout {
        &self.timeout
    }
}

impl Controller for InTransaction {
    const RETRY_LIMIT: u8 = RETRY_LIMIT;

    fn step(&mut self, inputs: &Inputs) -> Outputs {
        if inputs.reset {
            *self = InTransaction::new();
            return Outputs::default();
        }

        let state = self.state;
        let timed_out = self.timeout.is_elapsed();
        let rx = if state == State::Data {
            inputs.rx
        } else {
            Rx::NONE
        };

        let next = match state {
            State::Idle if inputs.start && inputs.ready => State::Token,
            State::Token if inputs.sent => State::Data,
            State::Data if rx.available || timed_out => State::Handshake,
            State::Handshake if inputs.sent && self.retry => State::Data,
            State::Handshake if inputs.sent => State::Idle,
            state => state,
        };

        let done = state == State::Handshake && next == State::Idle;
        let outputs = Outputs {
            state,
            status: if done {
                Status::completed(self.pkt_good)
            } else {
                Status::empty()
            },
            tx_valid: state == State::Token,
            send_handshake: state == State::Handshake,
            ack: self.pkt_good,
            rx_enable: state == State::Data,
            retry: self.retry,
        };

        if state != next {
            debug!("IN {=str} -> {=str}", state.name(), next.name());
        }
        if done && !self.pkt_good {
            warn!("IN aborted after {=u8} retries", self.retries.count());
        }

        if state == State::Data && next == State::Handshake {
            self.pkt_good = rx.is_clean() && !timed_out;
            self.retry = !self.pkt_good && self.retries.spend();
            if self.retry {
                trace!("IN retry {=u8}", self.retries.count());
            }
        } else if state == State::Handshake && next != State::Handshake {
            self.retry = false;
        }
        if next == State::Idle {
            self.retries.clear();
            self.pkt_good = false;
        }
        self.timeout.tick(
            state == State::Data && next == State::Data,
            next != State::Data,
        );
        self.state = next;

        outputs
    }

    fn state(&self) -> State {
        self.state
    }

    fn retries(&self) -> u8 {
        self.retries.count()
    }
}
