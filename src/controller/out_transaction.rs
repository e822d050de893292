//! OUT transaction controller
//!
//! An OUT transaction sends data to the remote peer:
//!
//! ```text
//!            start && ready         sent               sent
//!   IDLE ------------------> TOKEN ------> DATA ----------------> HANDSHAKE
//!    ^                                      ^                        |
//!    |                                      |  NAK / corrupt /       |
//!    |                                      |  timeout, can retry    |
//!    |                                      +------------------------+
//!    |          ACK, or out of retries                               |
//!    +---------------------------------------------------------------+
//! ```
//!
//! While in `HANDSHAKE`, the controller waits for the peer's response, up to
//! the timeout. Every failed response spends a retry, and the data packet is
//! sent again.

use super::{Controller, Inputs, Outputs, Retries, Rx, State, Status};
use crate::timeout::Timeout;

/// Retries an OUT transaction tolerates before it aborts.
pub const RETRY_LIMIT: u8 = 7;

/// Drives OUT transactions.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct OutTransaction {
    state: State,
    retries: Retries<RETRY_LIMIT>,
    retry: bool,
    timeout: Timeout,
}

impl OutTransaction {
    pub const fn new() -> Self {
        OutTransaction {
            state: State::Idle,
            retries: Retries::new(),
            retry: false,
            timeout: Timeout::new(),
        }
    }

    /// Returns the response timeout counter.
    pub fn timeout(&self) -> &Timeout {
        &self.timeout
    }
}

impl Controller for OutTransaction {
    const RETRY_LIMIT: u8 = RETRY_LIMIT;

    fn step(&mut self, inputs: &Inputs) -> Outputs {
        if inputs.reset {
            *self = OutTransaction::new();
            return Outputs::default();
        }

        let state = self.state;
        let timed_out = self.timeout.is_elapsed();
        // Inbound packets only matter while we're waiting on a handshake.
        let rx = if state == State::Handshake {
            inputs.rx
        } else {
            Rx::NONE
        };
        let received = rx.is_clean() && !timed_out;
        let failed = !received && (timed_out || rx.available);

        let next = match state {
            State::Idle if inputs.start && inputs.ready => State::Token,
            State::Token if inputs.sent => State::Data,
            State::Data if inputs.sent => State::Handshake,
            State::Handshake if received => State::Idle,
            State::Handshake if failed && self.retries.can_retry() => State::Data,
            State::Handshake if failed => State::Idle,
            state => state,
        };

        let done = state == State::Handshake && next == State::Idle;
        let outputs = Outputs {
            state,
            status: if done {
                Status::completed(received)
            } else {
                Status::empty()
            },
            tx_valid: matches!(state, State::Token | State::Data),
            send_handshake: false,
            ack: false,
            rx_enable: state == State::Handshake,
            retry: self.retry,
        };

        if state != next {
            debug!("OUT {=str} -> {=str}", state.name(), next.name());
        }
        if done && !received {
            warn!("OUT aborted after {=u8} retries", self.retries.count());
        }

        self.retry = state == State::Handshake && next == State::Data;
        if self.retry {
            self.retries.spend();
            trace!("OUT retry {=u8}", self.retries.count());
        }
        if next == State::Idle {
            self.retries.clear();
        }
        self.timeout.tick(
            state == State::Handshake && next == State::Handshake,
            next != State::Handshake,
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

#[cfg(test)]
mod tests {
    use super::OutTransaction;
    use crate::controller::{Controller, Inputs, Outputs, Rx, State};
    use crate::timeout::TIMEOUT_CYCLES;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    const RETRY_LIMIT: u8 = <OutTransaction as Controller>::RETRY_LIMIT;

    /// Encoder always ready, data always available.
    fn inputs(start: bool, rx: Rx) -> Inputs {
        Inputs {
            reset: false,
            start,
            ready: true,
            sent: true,
            rx,
        }
    }

    /// Run one transaction. `respond` supplies the peer's response for each
    /// handshake attempt (numbered from zero) and each tick in that attempt.
    /// Returns the final outputs, the number of retries observed, and the tick
    /// count.
    fn run(
        ctrl: &mut OutTransaction,
        mut respond: impl FnMut(u32, u32) -> Rx,
    ) -> (Outputs, u32, u32) {
        let mut attempt = 0;
        let mut waited = 0;
        let mut retries = 0u8;
        let mut out = ctrl.step(&inputs(true, Rx::NONE));
        assert_eq!(out.state, State::Idle);
        for tick in 1.. {
            let rx = if ctrl.state() == State::Handshake {
                let rx = respond(attempt, waited);
                waited += 1;
                rx
            } else {
                Rx::NONE
            };
            let before = ctrl.state();
            out = ctrl.step(&inputs(false, rx));
            assert!(!out.is_success() || out.is_done());
            assert!(ctrl.retries() <= RETRY_LIMIT);
            if before == State::Handshake && ctrl.state() == State::Data {
                retries += 1;
                attempt += 1;
                waited = 0;
                assert_eq!(ctrl.retries(), retries);
            }
            if out.is_done() {
                assert!(ctrl.is_idle());
                assert_eq!(ctrl.retries(), 0);
                return (out, u32::from(retries), tick);
            }
        }
        unreachable!()
    }

    #[test]
    fn ack_first_attempt() {
        let mut ctrl = OutTransaction::new();
        let start = ctrl.step(&inputs(true, Rx::NONE));
        assert_eq!(start.state, State::Idle);
        assert!(!start.tx_valid);

        let token = ctrl.step(&inputs(false, Rx::NONE));
        assert_eq!(token.state, State::Token);
        assert!(token.tx_valid);
        assert!(!token.rx_enable);

        let data = ctrl.step(&inputs(false, Rx::NONE));
        assert_eq!(data.state, State::Data);
        assert!(data.tx_valid);

        let handshake = ctrl.step(&inputs(false, Rx::ACK));
        assert_eq!(handshake.state, State::Handshake);
        assert!(handshake.rx_enable);
        assert!(!handshake.tx_valid);
        assert!(handshake.is_done());
        assert!(handshake.is_success());
        assert!(!handshake.retry);
        assert_eq!(ctrl.retries(), 0);
        assert!(ctrl.is_idle());
    }

    #[test]
    fn waits_in_handshake_until_response() {
        let mut ctrl = OutTransaction::new();
        let (out, retries, ticks) = run(&mut ctrl, |_, waited| {
            if waited == 10 {
                Rx::ACK
            } else {
                Rx::NONE
            }
        });
        assert!(out.is_success());
        assert_eq!(retries, 0);
        assert_eq!(ticks, 3 + 10);
    }

    #[test]
    fn six_naks_then_ack() {
        let mut ctrl = OutTransaction::new();
        let (out, retries, _) = run(&mut ctrl, |attempt, _| {
            if attempt < 6 {
                Rx::NAK
            } else {
                Rx::ACK
            }
        });
        assert!(out.is_done());
        assert!(out.is_success());
        assert_eq!(retries, 6);
    }

    #[test]
    fn corrupt_handshake_retries() {
        let mut ctrl = OutTransaction::new();
        let (out, retries, _) = run(&mut ctrl, |attempt, _| {
            if attempt < 2 {
                Rx::CORRUPT
            } else {
                Rx::ACK
            }
        });
        assert!(out.is_success());
        assert_eq!(retries, 2);
    }

    #[test]
    fn always_timeout_aborts() {
        let mut ctrl = OutTransaction::new();
        let (out, retries, ticks) = run(&mut ctrl, |_, _| Rx::NONE);
        assert!(out.is_done());
        assert!(!out.is_success());
        assert_eq!(retries, 7);
        // Token, then 8 attempts of one data cycle and a full handshake wait.
        let attempt = 1 + u32::from(TIMEOUT_CYCLES) + 1;
        assert_eq!(ticks, 1 + 8 * attempt);
    }

    #[test]
    fn always_nak_aborts() {
        let mut ctrl = OutTransaction::new();
        let (out, retries, _) = run(&mut ctrl, |_, _| Rx::NAK);
        assert!(out.is_done());
        assert!(!out.is_success());
        assert_eq!(retries, u32::from(RETRY_LIMIT));
    }

    #[test]
    fn late_ack_after_timeout_is_a_failure() {
        let mut ctrl = OutTransaction::new();
        let (out, retries, _) = run(&mut ctrl, |attempt, waited| {
            if attempt == 0 && waited < u32::from(TIMEOUT_CYCLES) {
                Rx::NONE
            } else {
                Rx::ACK
            }
        });
        assert!(out.is_success());
        assert_eq!(retries, 1);
    }

    #[test]
    fn retry_flag_follows_failed_attempt() {
        let mut ctrl = OutTransaction::new();
        ctrl.step(&inputs(true, Rx::NONE));
        ctrl.step(&inputs(false, Rx::NONE));
        ctrl.step(&inputs(false, Rx::NONE));
        let handshake = ctrl.step(&inputs(false, Rx::NAK));
        assert!(!handshake.is_done());
        assert!(!handshake.retry);
        let data = ctrl.step(&inputs(false, Rx::NONE));
        assert_eq!(data.state, State::Data);
        assert!(data.retry);
        assert_eq!(ctrl.retries(), 1);
    }

    #[test]
    fn waits_for_encoder() {
        let mut ctrl = OutTransaction::new();
        ctrl.step(&inputs(true, Rx::NONE));
        let stalled = Inputs {
            sent: false,
            ..inputs(false, Rx::NONE)
        };
        for _ in 0..5 {
            assert_eq!(ctrl.step(&stalled).state, State::Token);
        }
        ctrl.step(&inputs(false, Rx::NONE));
        for _ in 0..5 {
            assert_eq!(ctrl.step(&stalled).state, State::Data);
        }
        ctrl.step(&inputs(false, Rx::NONE));
        assert_eq!(ctrl.state(), State::Handshake);
    }

    #[test]
    fn needs_start_and_data() {
        let mut ctrl = OutTransaction::new();
        ctrl.step(&Inputs {
            ready: false,
            ..inputs(true, Rx::NONE)
        });
        assert!(ctrl.is_idle());
        ctrl.step(&inputs(false, Rx::NONE));
        assert!(ctrl.is_idle());
        ctrl.step(&inputs(true, Rx::NONE));
        assert_eq!(ctrl.state(), State::Token);
    }

    #[test]
    fn ignores_packets_outside_handshake() {
        let mut ctrl = OutTransaction::new();
        ctrl.step(&inputs(true, Rx::ACK));
        ctrl.step(&inputs(false, Rx::ACK));
        let data = ctrl.step(&inputs(false, Rx::ACK));
        assert_eq!(data.state, State::Data);
        assert!(!data.is_done());
        assert_eq!(ctrl.state(), State::Handshake);
    }

    #[test]
    fn cancelling_start_does_not_abort() {
        let mut ctrl = OutTransaction::new();
        ctrl.step(&inputs(true, Rx::NONE));
        ctrl.step(&inputs(false, Rx::NONE));
        ctrl.step(&inputs(false, Rx::NONE));
        for _ in 0..10 {
            ctrl.step(&inputs(false, Rx::NONE));
        }
        assert_eq!(ctrl.state(), State::Handshake);
    }

    #[test]
    fn reset_overrides() {
        let mut ctrl = OutTransaction::new();
        ctrl.step(&inputs(true, Rx::NONE));
        ctrl.step(&inputs(false, Rx::NONE));
        ctrl.step(&inputs(false, Rx::NONE));
        ctrl.step(&inputs(false, Rx::NAK));
        assert_eq!(ctrl.retries(), 1);
        let out = ctrl.step(&Inputs {
            reset: true,
            ..inputs(true, Rx::ACK)
        });
        assert_eq!(out, Outputs::default());
        assert_eq!(ctrl, OutTransaction::new());
    }

    #[test]
    fn liveness_and_invariants() {
        // Token + (retries + 1) * (data + full handshake wait) + idle re-entry.
        let bound = 1 + (u32::from(RETRY_LIMIT) + 1) * (1 + u32::from(TIMEOUT_CYCLES) + 1) + 1;
        for seed in 0..64 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut ctrl = OutTransaction::new();
            let mut in_flight = 0;
            let mut last_retries = 0;
            for _ in 0..20_000 {
                let rx = match rng.gen_range(0..64) {
                    0 => Rx::ACK,
                    1 | 2 => Rx::NAK,
                    3 => Rx::CORRUPT,
                    _ => Rx::NONE,
                };
                let out = ctrl.step(&Inputs {
                    reset: false,
                    start: rng.gen_bool(0.5),
                    ready: rng.gen_bool(0.75),
                    sent: true,
                    rx,
                });
                assert!(!out.is_success() || out.is_done());
                assert!(ctrl.retries() <= RETRY_LIMIT);
                if ctrl.is_idle() {
                    assert_eq!(ctrl.retries(), 0);
                    in_flight = 0;
                    last_retries = 0;
                } else {
                    assert!(ctrl.retries() >= last_retries);
                    last_retries = ctrl.retries();
                    in_flight += 1;
                    assert!(in_flight <= bound, "seed {seed}");
                }
            }
        }
    }
}
