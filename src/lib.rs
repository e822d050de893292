//! A link-layer engine for a USB-like serial bus
//!
//! `usbll` drives IN and OUT transactions, produces and consumes token, data,
//! and handshake packets, bounds retries on corruption and timeout, and NRZI
//! codes the outbound bitstream. It's a cycle-level model: every component
//! advances exactly once per call to its `tick()` or `step()` method, which
//! stands in for one clock edge.
//!
//! The engine has three external collaborators that aren't part of this crate:
//!
//! - the requester, which supplies a [`Request`](engine::Request) and consumes
//!   inbound data and completion status,
//! - the line encoder and decoder, which turn a parallel [`Frame`](frame::Frame)
//!   into a serial stream (and back), and check for corruption,
//! - the line driver, which consumes the coder's [`LineOut`](nrzi::LineOut).
//!
//! Start with the [`Engine`](engine::Engine). See each module for the details of
//! the individual components.
//!
//! # Errors
//!
//! The engine never fails. Corruption, negative acknowledgments, and timeouts
//! spend retries, and a transaction that runs out of retries completes without
//! success. Only the conversions at the crate's boundary, like
//! [`Token::new`](packet::Token::new), return a [`usb_device::Result`].
//!
//! # Logging
//!
//! Enable the `defmt-03` feature to log controller transitions and transaction
//! completions with `defmt`.

#![no_std]

#[macro_use]
mod log;

mod ral;
mod reg;

pub mod controller;
pub mod engine;
pub mod frame;
pub mod nrzi;
pub mod packet;
pub mod timeout;

pub use controller::{Controller, InTransaction, OutTransaction, State, Status};
pub use engine::{Config, Engine};
