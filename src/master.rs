//! The per-connection master engine.
//!
//! A [`Master`] is a single-threaded cooperative state machine. All mutation
//! happens inside four entry points the host invokes ([`Master::on_connect_tcp`],
//! [`Master::on_disconnect_tcp`], [`Master::on_timer_second`] (a 1 Hz tick)
//! and [`Master::on_packet_ready`]) plus the solicitation and command
//! operations. The engine never blocks: the TCP socket lives behind the
//! [`Transport`] trait, decoded data and confirmations come back through the
//! [`MasterHandler`] trait.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, info, trace, warn};

use crate::codec::{Apdu, ApduCodec, HexFrame};
use crate::encoder::encode_single;
use crate::error::{MasterError, Result};
use crate::parser::parse_asdu;
use crate::types::{
    Apci, Asdu, Cause, CounterQualifier, Cp56Time2a, InformationObject, TypeId, UControl,
};
use crate::window::{ReceiveOutcome, SequenceWindow};

/// IANA-assigned IEC 60870-5-104 port.
pub const DEFAULT_PORT: u16 = 2404;

/// Default t1: seconds to wait for STARTDT/TESTFR confirmation or an I-frame
/// acknowledgement.
pub const DEFAULT_T1: u32 = 6;

/// Default t2: seconds before an outstanding acknowledgement is sent.
pub const DEFAULT_T2: u32 = 8;

/// Default t3: idle seconds before a test frame probes the link.
pub const DEFAULT_T3: u32 = 10;

/// Default k: maximum unacknowledged sent I-frames.
pub const DEFAULT_K: u16 = 12;

/// Default w: received I-frames per acknowledgement.
pub const DEFAULT_W: u16 = 8;

/// Seconds before an unanswered general interrogation is retried.
pub const GI_RETRY_TIME: u32 = 45;

/// Default seconds of command supervision (ACTCONFIRM wait).
pub const DEFAULT_COMMAND_TIMEOUT: u32 = 15;

/// Byte-stream transport the engine drives.
///
/// `read` is non-blocking and returns 0 when nothing is pending; `send`
/// either completes or fails the connection.
pub trait Transport {
    /// Establish the TCP connection to the configured station.
    fn connect(&mut self) -> Result<()>;
    /// Tear the connection down; must be idempotent.
    fn disconnect(&mut self);
    /// Read whatever is available into `buf`, returning the byte count.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
    /// Write the whole buffer.
    fn send(&mut self, data: &[u8]) -> Result<()>;
    /// Bytes currently readable.
    fn bytes_available(&mut self) -> usize;
    /// Wait up to `timeout_ms` for `count` bytes to become readable.
    fn wait_bytes(&mut self, count: usize, timeout_ms: u64) -> bool {
        let _ = timeout_ms;
        self.bytes_available() >= count
    }
}

/// Upstream callbacks the host implements.
pub trait MasterHandler {
    /// Decoded telemetry; every call carries objects of a single type
    /// identifier, in wire order, and is delivered before the supervisory
    /// acknowledgement covering the frame goes out.
    fn data_indication(&mut self, objects: &[InformationObject]);

    /// ACTCONFIRM of a station, group or counter interrogation arrived.
    fn interrogation_act_conf_indication(&mut self) {}

    /// ACTTERM of a station, group or counter interrogation arrived.
    fn interrogation_act_term_indication(&mut self) {}

    /// Command response: the echoed object with P/N and cause reflected.
    /// A supervision timeout reports the submitted object with the negative
    /// flag set.
    fn command_act_resp_indication(&mut self, object: &InformationObject) {
        let _ = object;
    }

    /// Raw frames whose ASDU type is outside the catalog.
    fn userproc_apdu(&mut self, raw: &[u8]) {
        let _ = raw;
    }

    /// The engine dropped the connection (protocol violation, timer expiry
    /// or transport failure).
    fn connection_lost(&mut self) {}
}

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No data transfer; re-enterable at any time
    Stopped,
    /// STARTDT act sent, waiting for confirmation
    StartdtWait,
    /// Data transfer running
    Started,
    /// STOPDT act sent, waiting for confirmation
    StopdtWait,
}

/// Engine configuration, built in the chaining style.
#[derive(Debug, Clone)]
pub struct MasterConfig {
    /// Primary station address (host or IP, without port)
    pub remote_addr: String,
    /// Backup station address offered to the host on failover
    pub backup_addr: Option<String>,
    /// TCP port
    pub port: u16,
    /// Originator address stamped on outgoing ASDUs
    pub originator: u8,
    /// Common address of the station
    pub common_address: u16,
    /// Separate common address for commands, when the station wants one
    pub command_address: Option<u16>,
    /// Seconds between general interrogations; 0 disables the cycle
    pub gi_period: u32,
    /// Drop the connection on out-of-order N(S)
    pub seq_order_check: bool,
    /// k: maximum unacknowledged sent I-frames
    pub k: u16,
    /// w: received I-frames per acknowledgement
    pub w: u16,
    /// t1 in seconds
    pub t1: u32,
    /// t2 in seconds
    pub t2: u32,
    /// t3 in seconds
    pub t3: u32,
    /// Command supervision in seconds
    pub command_timeout: u32,
}

impl MasterConfig {
    /// Configuration for the given station address with standard parameters.
    pub fn new(remote_addr: impl Into<String>) -> Self {
        Self {
            remote_addr: remote_addr.into(),
            backup_addr: None,
            port: DEFAULT_PORT,
            originator: 0,
            common_address: 1,
            command_address: None,
            gi_period: 300,
            seq_order_check: true,
            k: DEFAULT_K,
            w: DEFAULT_W,
            t1: DEFAULT_T1,
            t2: DEFAULT_T2,
            t3: DEFAULT_T3,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Set the backup station address.
    pub fn backup_addr(mut self, addr: impl Into<String>) -> Self {
        self.backup_addr = Some(addr.into());
        self
    }

    /// Set the TCP port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the originator (master link) address.
    pub fn originator(mut self, originator: u8) -> Self {
        self.originator = originator;
        self
    }

    /// Set the station common address.
    pub fn common_address(mut self, address: u16) -> Self {
        self.common_address = address;
        self
    }

    /// Use a distinct common address for commands.
    pub fn command_address(mut self, address: u16) -> Self {
        self.command_address = Some(address);
        self
    }

    /// Set the general interrogation period in seconds (0 disables).
    pub fn gi_period(mut self, seconds: u32) -> Self {
        self.gi_period = seconds;
        self
    }

    /// Tolerate out-of-order receive sequence numbers.
    pub fn disable_seq_order_check(mut self) -> Self {
        self.seq_order_check = false;
        self
    }

    /// Set the k parameter.
    pub fn k(mut self, k: u16) -> Self {
        self.k = k;
        self
    }

    /// Set the w parameter.
    pub fn w(mut self, w: u16) -> Self {
        self.w = w;
        self
    }

    /// Set t1 in seconds.
    pub fn t1(mut self, seconds: u32) -> Self {
        self.t1 = seconds;
        self
    }

    /// Set t2 in seconds.
    pub fn t2(mut self, seconds: u32) -> Self {
        self.t2 = seconds;
        self
    }

    /// Set t3 in seconds.
    pub fn t3(mut self, seconds: u32) -> Self {
        self.t3 = seconds;
        self
    }

    /// Set the command supervision time in seconds.
    pub fn command_timeout(mut self, seconds: u32) -> Self {
        self.command_timeout = seconds;
        self
    }
}

/// A command awaiting its ACTCONFIRM.
#[derive(Debug, Clone)]
struct PendingCommand {
    object: InformationObject,
    countdown: u32,
}

/// IEC 60870-5-104 controlling-station engine for one connection.
pub struct Master<T: Transport, H: MasterHandler> {
    config: MasterConfig,
    transport: T,
    handler: H,
    state: ConnectionState,
    tx_ok: bool,
    window: SequenceWindow,
    codec: ApduCodec,
    rx_buf: BytesMut,
    t1: Option<u32>,
    t2: Option<u32>,
    t3: Option<u32>,
    gi_countdown: Option<u32>,
    gi_pending: bool,
    gi_objects: u32,
    testfr_pending: bool,
    test_counter: u16,
    tests_pending: u16,
    pending_commands: Vec<PendingCommand>,
}

impl<T: Transport, H: MasterHandler> Master<T, H> {
    /// Build a disarmed engine around the injected transport and handler.
    pub fn new(config: MasterConfig, transport: T, handler: H) -> Self {
        let window = SequenceWindow::new(config.k, config.w);
        Self {
            config,
            transport,
            handler,
            state: ConnectionState::Stopped,
            tx_ok: false,
            window,
            codec: ApduCodec::new(),
            rx_buf: BytesMut::with_capacity(1024),
            t1: None,
            t2: None,
            t3: None,
            gi_countdown: None,
            gi_pending: false,
            gi_objects: 0,
            testfr_pending: false,
            test_counter: 0,
            tests_pending: 0,
            pending_commands: Vec::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// True once STARTDT has been confirmed.
    pub fn tx_ok(&self) -> bool {
        self.tx_ok
    }

    /// Objects received during the current or last interrogation cycle.
    pub fn gi_object_count(&self) -> u32 {
        self.gi_objects
    }

    /// Commands still waiting for their confirmation.
    pub fn pending_command_count(&self) -> usize {
        self.pending_commands.len()
    }

    /// Test commands sent but not yet confirmed.
    pub fn tests_pending(&self) -> u16 {
        self.tests_pending
    }

    /// Configuration in effect.
    pub fn config(&self) -> &MasterConfig {
        &self.config
    }

    /// Borrow the transport (e.g. to inspect a host-owned socket wrapper).
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Borrow the handler (e.g. to drain a host-owned sink).
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    // Address and parameter setters, usable between connections.

    /// Change the primary station address.
    pub fn set_remote_addr(&mut self, addr: impl Into<String>) {
        self.config.remote_addr = addr.into();
    }

    /// Change the backup station address.
    pub fn set_backup_addr(&mut self, addr: impl Into<String>) {
        self.config.backup_addr = Some(addr.into());
    }

    /// Change the TCP port.
    pub fn set_port(&mut self, port: u16) {
        self.config.port = port;
    }

    /// Change the originator address.
    pub fn set_originator(&mut self, originator: u8) {
        self.config.originator = originator;
    }

    /// Change the station common address.
    pub fn set_common_address(&mut self, address: u16) {
        self.config.common_address = address;
    }

    /// Change the command common address.
    pub fn set_command_address(&mut self, address: u16) {
        self.config.command_address = Some(address);
    }

    /// Change the interrogation period (0 disables the cycle).
    pub fn set_gi_period(&mut self, seconds: u32) {
        self.config.gi_period = seconds;
    }

    /// Tolerate out-of-order receive sequence numbers from now on.
    pub fn disable_seq_order_check(&mut self) {
        self.config.seq_order_check = false;
    }

    // Connection lifecycle.

    /// Connect the transport and start the STARTDT handshake.
    pub fn connect(&mut self) -> Result<()> {
        if self.state != ConnectionState::Stopped {
            return Err(MasterError::protocol_static("connection already active"));
        }
        self.transport.connect()?;
        self.on_connect_tcp();
        Ok(())
    }

    /// Tear everything down immediately. In-flight commands are dropped
    /// without callbacks.
    pub fn disconnect(&mut self) {
        self.transport.disconnect();
        self.on_disconnect_tcp();
    }

    /// The host established TCP: arm the handshake.
    pub fn on_connect_tcp(&mut self) {
        self.reset_connection_state();
        info!(station = %self.config.remote_addr, "TCP up, sending STARTDT act");
        self.state = ConnectionState::StartdtWait;
        self.t1 = Some(self.config.t1);
        if let Err(err) = self.transmit(Apdu::unnumbered(UControl::StartDtAct)) {
            self.fail(err);
        }
    }

    /// The host lost TCP: clear all per-connection state.
    pub fn on_disconnect_tcp(&mut self) {
        self.reset_connection_state();
    }

    /// Ask the station to stop data transfer, then disconnect on its
    /// confirmation.
    pub fn stop_data_transfer(&mut self) -> Result<()> {
        if self.state != ConnectionState::Started {
            return Err(MasterError::NotConnected);
        }
        self.state = ConnectionState::StopdtWait;
        self.t1 = Some(self.config.t1);
        self.transmit(Apdu::unnumbered(UControl::StopDtAct))
    }

    // The 1 Hz tick.

    /// Advance every countdown by one second and act on expiries.
    pub fn on_timer_second(&mut self) {
        if self.state == ConnectionState::Stopped {
            return;
        }

        if let Some(t) = self.t1 {
            let t = t.saturating_sub(1);
            self.t1 = Some(t);
            if t == 0 {
                warn!("t1 expired waiting for peer response");
                self.drop_connection("t1 expiry");
                return;
            }
        }

        if let Some(t) = self.t2 {
            let t = t.saturating_sub(1);
            self.t2 = Some(t);
            if t == 0 {
                self.t2 = None;
                if let Err(err) = self.send_supervisory() {
                    self.fail(err);
                    return;
                }
            }
        }

        if let Some(t) = self.t3 {
            let t = t.saturating_sub(1);
            self.t3 = Some(t);
            if t == 0 {
                debug!("t3 idle, probing with TESTFR act");
                if let Err(err) = self.send_test_frame() {
                    self.fail(err);
                    return;
                }
            }
        }

        if let Some(t) = self.gi_countdown {
            let t = t.saturating_sub(1);
            self.gi_countdown = Some(t);
            if t == 0 {
                self.gi_countdown = None;
                if self.state == ConnectionState::Started {
                    if self.gi_pending {
                        warn!("{}", MasterError::GiTimeout);
                    }
                    if let Err(err) = self.solicit_gi() {
                        warn!(%err, "interrogation not sent, will retry");
                        self.gi_countdown = Some(GI_RETRY_TIME);
                    }
                }
            }
        }

        let mut timed_out = Vec::new();
        for pending in &mut self.pending_commands {
            pending.countdown = pending.countdown.saturating_sub(1);
        }
        self.pending_commands.retain(|pending| {
            if pending.countdown == 0 {
                timed_out.push(pending.object.clone());
                false
            } else {
                true
            }
        });
        for mut object in timed_out {
            warn!("{}", MasterError::CommandTimeout(object.address));
            object.negative = true;
            self.handler.command_act_resp_indication(&object);
        }
    }

    // Receive path.

    /// Drain the transport and process every complete APDU.
    pub fn on_packet_ready(&mut self) {
        if self.state == ConnectionState::Stopped {
            return;
        }

        let mut chunk = [0u8; 4096];
        loop {
            match self.transport.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => self.rx_buf.extend_from_slice(&chunk[..n]),
                Err(err) => {
                    self.fail(err);
                    return;
                }
            }
        }

        loop {
            match self.codec.decode(&mut self.rx_buf) {
                Ok(Some(apdu)) => {
                    if let Err(err) = self.handle_apdu(apdu) {
                        self.fail(err);
                        return;
                    }
                    if self.state == ConnectionState::Stopped {
                        return;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    self.fail(err);
                    return;
                }
            }
        }
    }

    fn handle_apdu(&mut self, apdu: Apdu) -> Result<()> {
        debug!(frame = %apdu, bytes = %HexFrame(&apdu.raw), "rx");
        match apdu.apci {
            Apci::I { send_seq, recv_seq } => {
                if !matches!(
                    self.state,
                    ConnectionState::Started | ConnectionState::StopdtWait
                ) {
                    warn!(state = ?self.state, "I-frame outside data transfer ignored");
                    return Ok(());
                }

                self.window.apply_ack(recv_seq)?;
                self.refresh_t1();

                match self
                    .window
                    .account_receive(send_seq, self.config.seq_order_check)?
                {
                    ReceiveOutcome::InOrder => {}
                    ReceiveOutcome::Realigned { expected } => {
                        warn!(expected, actual = send_seq, "receive sequence realigned");
                    }
                }
                self.t3 = Some(self.config.t3);

                match apdu.asdu {
                    Some(asdu) => {
                        let objects = parse_asdu(&asdu)?;
                        self.route_objects(objects);
                    }
                    None => {
                        warn!("ASDU type outside catalog, forwarding raw APDU");
                        self.handler.userproc_apdu(&apdu.raw);
                    }
                }

                // The acknowledgement goes out only after the indication.
                if self.window.ack_due() {
                    self.send_supervisory()?;
                } else if self.window.recv_unacked() > 0 && self.t2.is_none() {
                    self.t2 = Some(self.config.t2);
                }
                Ok(())
            }

            Apci::S { recv_seq } => {
                self.window.apply_ack(recv_seq)?;
                self.refresh_t1();
                self.t3 = Some(self.config.t3);
                Ok(())
            }

            Apci::U(control) => self.handle_control(control),
        }
    }

    fn handle_control(&mut self, control: UControl) -> Result<()> {
        match control {
            UControl::StartDtCon => {
                if self.state == ConnectionState::StartdtWait {
                    self.state = ConnectionState::Started;
                    self.tx_ok = true;
                    self.refresh_t1();
                    self.t3 = Some(self.config.t3);
                    if self.config.gi_period > 0 {
                        self.gi_countdown = Some(1);
                    }
                    info!("data transfer started");
                } else {
                    warn!(state = ?self.state, "unexpected STARTDT con ignored");
                }
                Ok(())
            }
            UControl::StopDtCon => {
                if self.state == ConnectionState::StopdtWait {
                    info!("data transfer stopped");
                    self.transport.disconnect();
                    self.reset_connection_state();
                } else {
                    warn!(state = ?self.state, "unexpected STOPDT con ignored");
                }
                Ok(())
            }
            UControl::StartDtAct => {
                // A master does not expect this; answer anyway.
                warn!("peer sent STARTDT act to the controlling station");
                self.transmit(Apdu::unnumbered(UControl::StartDtCon))
            }
            UControl::StopDtAct => {
                info!("peer requested data transfer stop");
                if let Err(err) = self.transmit(Apdu::unnumbered(UControl::StopDtCon)) {
                    warn!(%err, "STOPDT con not sent");
                }
                self.drop_connection("peer STOPDT");
                Ok(())
            }
            UControl::TestFrAct => self.transmit(Apdu::unnumbered(UControl::TestFrCon)),
            UControl::TestFrCon => {
                self.testfr_pending = false;
                self.refresh_t1();
                Ok(())
            }
        }
    }

    fn route_objects(&mut self, objects: Vec<InformationObject>) {
        let first = match objects.first() {
            Some(first) => first.clone(),
            None => return,
        };

        match first.type_id {
            TypeId::Interrogation | TypeId::CounterInterrogation => match first.cot {
                Cause::ActivationConfirm => {
                    if first.negative {
                        warn!(object = %first, "interrogation refused by station");
                    } else {
                        debug!(object = %first, "interrogation confirmed");
                    }
                    self.handler.interrogation_act_conf_indication();
                }
                Cause::ActivationTerm => {
                    if first.type_id == TypeId::Interrogation {
                        self.gi_pending = false;
                        self.gi_countdown =
                            (self.config.gi_period > 0).then_some(self.config.gi_period);
                        info!(objects = self.gi_objects, "interrogation terminated");
                    }
                    self.handler.interrogation_act_term_indication();
                }
                other => debug!(cause = %other, "interrogation response ignored"),
            },

            TypeId::ClockSync => {
                if first.negative {
                    warn!("clock synchronization refused by station");
                } else {
                    debug!("clock synchronization confirmed");
                }
            }

            TypeId::TestCommand => {
                if first.cot == Cause::ActivationConfirm {
                    self.tests_pending = self.tests_pending.saturating_sub(1);
                    debug!(pending = self.tests_pending, "test command confirmed");
                }
            }

            ti if ti.is_process_command() || ti.is_parameter() => {
                match first.cot {
                    Cause::ActivationConfirm
                    | Cause::DeactivationConfirm
                    | Cause::ActivationTerm => {
                        self.settle_pending_command(&first);
                        if first.negative {
                            warn!(object = %first, "negative command confirmation");
                        }
                        self.handler.command_act_resp_indication(&first);
                    }
                    _ => self.handler.data_indication(&objects),
                }
            }

            _ => {
                if self.gi_pending && first.cot.is_interrogation_response() {
                    self.gi_objects += objects.len() as u32;
                }
                self.handler.data_indication(&objects);
            }
        }
    }

    fn settle_pending_command(&mut self, echo: &InformationObject) {
        if let Some(index) = self.pending_commands.iter().position(|pending| {
            pending.object.address == echo.address && pending.object.type_id == echo.type_id
        }) {
            self.pending_commands.swap_remove(index);
        }
    }

    // Solicitations and commands.

    /// Send the station interrogation (QOI 20).
    pub fn solicit_gi(&mut self) -> Result<()> {
        self.solicit_interrogation(20)
    }

    /// Send a group interrogation, group 1..=16.
    pub fn solicit_group(&mut self, group: u8) -> Result<()> {
        if !(1..=16).contains(&group) {
            return Err(MasterError::protocol_static("interrogation group out of range"));
        }
        self.solicit_interrogation(20 + group)
    }

    fn solicit_interrogation(&mut self, qualifier: u8) -> Result<()> {
        let object = self.stamp(InformationObject::interrogation(qualifier));
        let asdu = encode_single(&object)?;
        self.send_information(asdu)?;
        self.gi_pending = true;
        self.gi_objects = 0;
        self.gi_countdown = Some(GI_RETRY_TIME);
        info!(qualifier, "interrogation requested");
        Ok(())
    }

    /// Send a counter interrogation.
    pub fn solicit_counter_interrogation(&mut self, qualifier: CounterQualifier) -> Result<()> {
        let object = self.stamp(InformationObject::counter_interrogation(qualifier));
        let asdu = encode_single(&object)?;
        self.send_information(asdu)?;
        info!("counter interrogation requested");
        Ok(())
    }

    /// Synchronize the station clock to the local wall clock.
    pub fn clock_sync(&mut self) -> Result<()> {
        self.clock_sync_with(Cp56Time2a::now())
    }

    /// Synchronize the station clock to the given time.
    pub fn clock_sync_with(&mut self, time: Cp56Time2a) -> Result<()> {
        let object = self.stamp(InformationObject::clock_sync(time));
        let asdu = encode_single(&object)?;
        self.send_information(asdu)?;
        info!(time = %time, "clock synchronization sent");
        Ok(())
    }

    /// Send the application-level test command (distinct from TESTFR).
    pub fn send_test_command(&mut self) -> Result<()> {
        self.test_counter = self.test_counter.wrapping_add(1);
        let object = self.stamp(InformationObject::test_command(
            self.test_counter,
            Cp56Time2a::now(),
        ));
        let asdu = encode_single(&object)?;
        self.send_information(asdu)?;
        self.tests_pending = self.tests_pending.saturating_add(1);
        debug!(counter = self.test_counter, "test command sent");
        Ok(())
    }

    /// Submit a process command (TI 45..=64) or a parameter command
    /// (TI 110..=113), select or execute per the object's qualifier.
    ///
    /// A [`MasterError::WindowExhausted`] or [`MasterError::NotConnected`]
    /// return means "not accepted": nothing was sent and nothing is pending.
    pub fn send_command(&mut self, object: &InformationObject) -> Result<()> {
        if !object.type_id.is_process_command() && !object.type_id.is_parameter() {
            return Err(MasterError::protocol_static(
                "send_command takes command and parameter types only",
            ));
        }
        let command = self.stamp_command(object.clone());
        let asdu = encode_single(&command)?;
        self.send_information(asdu)?;
        info!(command = %command, "command sent");
        self.pending_commands.push(PendingCommand {
            object: command,
            countdown: self.config.command_timeout,
        });
        Ok(())
    }

    /// Stamp the configured addresses onto an outgoing object.
    fn stamp(&self, mut object: InformationObject) -> InformationObject {
        object.common_address = self.config.common_address;
        object.originator = self.config.originator;
        object.cot = Cause::Activation;
        object
    }

    /// Commands may target a distinct common address.
    fn stamp_command(&self, object: InformationObject) -> InformationObject {
        let mut object = self.stamp(object);
        if let Some(address) = self.config.command_address {
            object.common_address = address;
        }
        object
    }

    // Send path.

    fn send_information(&mut self, asdu: Asdu) -> Result<()> {
        if self.state != ConnectionState::Started || !self.tx_ok {
            return Err(MasterError::NotConnected);
        }
        let ns = self.window.claim_send()?;
        let apdu = Apdu::information(ns, self.window.vr(), asdu);
        self.transmit(apdu)?;
        self.window.note_ack_sent();
        self.t2 = None;
        if self.t1.is_none() {
            self.t1 = Some(self.config.t1);
        }
        Ok(())
    }

    fn send_supervisory(&mut self) -> Result<()> {
        let apdu = Apdu::supervisory(self.window.vr());
        self.transmit(apdu)?;
        self.window.note_ack_sent();
        self.t2 = None;
        Ok(())
    }

    fn send_test_frame(&mut self) -> Result<()> {
        self.transmit(Apdu::unnumbered(UControl::TestFrAct))?;
        self.testfr_pending = true;
        self.t3 = Some(self.config.t3);
        if self.t1.is_none() {
            self.t1 = Some(self.config.t1);
        }
        Ok(())
    }

    fn transmit(&mut self, apdu: Apdu) -> Result<()> {
        let mut out = BytesMut::new();
        self.codec.encode(apdu, &mut out)?;
        trace!(bytes = %HexFrame(&out), "tx");
        self.transport.send(&out)
    }

    // Failure handling.

    fn fail(&mut self, err: MasterError) {
        if err.is_fatal() {
            error!(%err, "dropping connection");
            self.drop_connection("protocol or transport failure");
        } else {
            warn!(%err, "recoverable error");
        }
    }

    fn drop_connection(&mut self, reason: &str) {
        info!(reason, "connection down");
        self.transport.disconnect();
        self.reset_connection_state();
        self.handler.connection_lost();
    }

    /// t1 runs only while something waits on the peer.
    fn refresh_t1(&mut self) {
        let demanded = self.testfr_pending
            || self.window.unacked() > 0
            || matches!(
                self.state,
                ConnectionState::StartdtWait | ConnectionState::StopdtWait
            );
        if !demanded {
            self.t1 = None;
        }
    }

    fn reset_connection_state(&mut self) {
        self.state = ConnectionState::Stopped;
        self.tx_ok = false;
        self.window.reset();
        self.rx_buf.clear();
        self.codec.reset();
        self.t1 = None;
        self.t2 = None;
        self.t3 = None;
        self.gi_countdown = None;
        self.gi_pending = false;
        self.gi_objects = 0;
        self.testfr_pending = false;
        self.pending_commands.clear();
    }
}
