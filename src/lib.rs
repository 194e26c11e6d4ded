//! # iec104_master
//!
//! IEC 60870-5-104 controlling-station (master) protocol engine.
//!
//! The crate implements the APCI/APDU engine of a telecontrol master: frame
//! assembly and classification, send/receive sequence counters with the k/w
//! window, the STARTDT/STOPDT/TESTFR lifecycle with the t1/t2/t3 timers, the
//! interrogation and command workflow, and bit-exact codecs for the typed
//! ASDU catalog.
//!
//! ## Design
//!
//! The engine is single-threaded and cooperative. It owns no socket and
//! spawns no tasks: the host hands it a [`Transport`] (the byte stream) and a
//! [`MasterHandler`] (the upstream callbacks) and drives it through four
//! entry points:
//!
//! - [`Master::on_connect_tcp`]: TCP came up, start the handshake
//! - [`Master::on_disconnect_tcp`]: TCP went away, clear connection state
//! - [`Master::on_timer_second`]: 1 Hz tick for the protocol timers
//! - [`Master::on_packet_ready`]: bytes are readable on the transport
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use iec104_master::{Master, MasterConfig, MasterHandler, InformationObject};
//!
//! struct Scada;
//!
//! impl MasterHandler for Scada {
//!     fn data_indication(&mut self, objects: &[InformationObject]) {
//!         for object in objects {
//!             println!("{object}");
//!         }
//!     }
//! }
//!
//! let config = MasterConfig::new("192.168.1.50").common_address(1).gi_period(300);
//! let mut master = Master::new(config, transport, Scada);
//! master.connect()?;
//! // host loop: call on_timer_second() every second and
//! // on_packet_ready() whenever the socket is readable.
//! ```
//!
//! ## Frame formats
//!
//! ```text
//! APDU:
//! +--------+--------+--------+--------+--------+--------+-- - - --+
//! | 0x68   | Length | CF1    | CF2    | CF3    | CF4    | ASDU    |
//! +--------+--------+--------+--------+--------+--------+-- - - --+
//!   start    4..253   I: N(S)/N(R)  S: N(R)  U: control
//! ```

pub mod codec;
pub mod encoder;
pub mod error;
pub mod master;
pub mod parser;
pub mod types;

mod window;

pub use codec::{Apdu, ApduCodec};
pub use encoder::{encode_asdu, encode_single};
pub use error::{MasterError, Result};
pub use master::{
    ConnectionState, Master, MasterConfig, MasterHandler, Transport, DEFAULT_PORT,
};
pub use parser::parse_asdu;
pub use types::*;
pub use window::{ReceiveOutcome, SequenceWindow};
