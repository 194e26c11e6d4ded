//! Send/receive sequence counters and the k/w transmission window.
//!
//! V(S) and V(R) are 15-bit counters. The peer's N(R) acknowledges every
//! I-frame we sent with N(S) below it; at most `k` of our I-frames may be
//! outstanding, and after `w` received I-frames an acknowledgement must go
//! out.

use crate::error::{MasterError, Result};
use crate::types::SEQ_MODULO;

/// Distance from `from` up to `to` in sequence space.
#[inline]
pub(crate) const fn seq_distance(from: u16, to: u16) -> u16 {
    to.wrapping_sub(from) & (SEQ_MODULO - 1)
}

/// Outcome of accounting a received I-frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// N(S) matched V(R)
    InOrder,
    /// N(S) did not match and V(R) was realigned (order checking off)
    Realigned { expected: u16 },
}

/// Sequence and window state of one connection.
#[derive(Debug, Clone)]
pub struct SequenceWindow {
    /// V(S): N(S) of the next I-frame we send
    vs: u16,
    /// V(R): N(S) we expect from the peer next
    vr: u16,
    /// Everything below this N(S) has been acknowledged by the peer
    acked: u16,
    /// I-frames received since we last sent an acknowledgement
    recv_unacked: u16,
    /// k: maximum outstanding sent I-frames
    k: u16,
    /// w: acknowledge after this many received I-frames
    w: u16,
}

impl SequenceWindow {
    /// Fresh counters with the given window parameters.
    pub fn new(k: u16, w: u16) -> Self {
        Self {
            vs: 0,
            vr: 0,
            acked: 0,
            recv_unacked: 0,
            k,
            w,
        }
    }

    /// Zero all counters (connection teardown).
    pub fn reset(&mut self) {
        self.vs = 0;
        self.vr = 0;
        self.acked = 0;
        self.recv_unacked = 0;
    }

    /// V(S) of the next frame to send.
    #[inline]
    pub fn vs(&self) -> u16 {
        self.vs
    }

    /// V(R), the expected next N(S) from the peer.
    #[inline]
    pub fn vr(&self) -> u16 {
        self.vr
    }

    /// Number of sent I-frames not yet acknowledged.
    #[inline]
    pub fn unacked(&self) -> u16 {
        seq_distance(self.acked, self.vs)
    }

    /// Number of received I-frames not yet acknowledged by us.
    #[inline]
    pub fn recv_unacked(&self) -> u16 {
        self.recv_unacked
    }

    /// Claim the next N(S) for an outgoing I-frame.
    ///
    /// Refused with [`MasterError::WindowExhausted`] once `k` frames are
    /// outstanding; V(S) advances only on success.
    pub fn claim_send(&mut self) -> Result<u16> {
        if self.unacked() >= self.k {
            return Err(MasterError::WindowExhausted(self.k));
        }
        let ns = self.vs;
        self.vs = (self.vs + 1) & (SEQ_MODULO - 1);
        Ok(ns)
    }

    /// Account a received I-frame carrying `ns`.
    ///
    /// A mismatch against V(R) is a [`MasterError::SequenceViolation`] when
    /// order checking is on; otherwise V(R) realigns to the peer.
    pub fn account_receive(&mut self, ns: u16, order_check: bool) -> Result<ReceiveOutcome> {
        let outcome = if ns == self.vr {
            ReceiveOutcome::InOrder
        } else if order_check {
            return Err(MasterError::SequenceViolation {
                expected: self.vr,
                actual: ns,
            });
        } else {
            let expected = self.vr;
            self.vr = ns;
            ReceiveOutcome::Realigned { expected }
        };
        self.vr = (self.vr + 1) & (SEQ_MODULO - 1);
        self.recv_unacked = self.recv_unacked.saturating_add(1);
        Ok(outcome)
    }

    /// Apply the peer's N(R); returns true when the unacked set empties.
    ///
    /// An N(R) beyond V(S) acknowledges frames we never sent and is treated
    /// as a protocol error.
    pub fn apply_ack(&mut self, nr: u16) -> Result<bool> {
        if seq_distance(self.acked, nr) > self.unacked() {
            return Err(MasterError::protocol_static(
                "peer acknowledged frames that were never sent",
            ));
        }
        self.acked = nr;
        Ok(self.unacked() == 0)
    }

    /// True once `w` received I-frames are waiting for an acknowledgement.
    #[inline]
    pub fn ack_due(&self) -> bool {
        self.recv_unacked >= self.w
    }

    /// Note that an acknowledgement carrying V(R) went out (S-frame or
    /// piggybacked on an I-frame).
    #[inline]
    pub fn note_ack_sent(&mut self) {
        self.recv_unacked = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_distance_wraps() {
        assert_eq!(seq_distance(0, 0), 0);
        assert_eq!(seq_distance(0, 5), 5);
        assert_eq!(seq_distance(32766, 2), 4);
        assert_eq!(seq_distance(5, 0), 32763);
    }

    #[test]
    fn test_claim_send_increments_vs() {
        let mut window = SequenceWindow::new(12, 8);
        assert_eq!(window.claim_send().unwrap(), 0);
        assert_eq!(window.claim_send().unwrap(), 1);
        assert_eq!(window.vs(), 2);
        assert_eq!(window.unacked(), 2);
    }

    #[test]
    fn test_window_exhaustion_at_k() {
        let mut window = SequenceWindow::new(3, 8);
        for expected in 0..3 {
            assert_eq!(window.claim_send().unwrap(), expected);
        }
        assert!(matches!(
            window.claim_send(),
            Err(MasterError::WindowExhausted(3))
        ));
        // An ack frees the window again.
        assert!(!window.apply_ack(1).unwrap());
        assert_eq!(window.claim_send().unwrap(), 3);
    }

    #[test]
    fn test_ack_empties_unacked_set() {
        let mut window = SequenceWindow::new(12, 8);
        window.claim_send().unwrap();
        window.claim_send().unwrap();
        assert!(!window.apply_ack(1).unwrap());
        assert_eq!(window.unacked(), 1);
        assert!(window.apply_ack(2).unwrap());
        assert_eq!(window.unacked(), 0);
    }

    #[test]
    fn test_ack_beyond_vs_is_protocol_error() {
        let mut window = SequenceWindow::new(12, 8);
        window.claim_send().unwrap();
        assert!(matches!(
            window.apply_ack(2),
            Err(MasterError::Protocol(_))
        ));
    }

    #[test]
    fn test_duplicate_ack_is_harmless() {
        let mut window = SequenceWindow::new(12, 8);
        window.claim_send().unwrap();
        assert!(window.apply_ack(1).unwrap());
        assert!(window.apply_ack(1).unwrap());
    }

    #[test]
    fn test_in_order_receive_advances_vr() {
        let mut window = SequenceWindow::new(12, 8);
        assert_eq!(
            window.account_receive(0, true).unwrap(),
            ReceiveOutcome::InOrder
        );
        assert_eq!(window.vr(), 1);
        assert_eq!(
            window.account_receive(1, true).unwrap(),
            ReceiveOutcome::InOrder
        );
        assert_eq!(window.vr(), 2);
        assert_eq!(window.recv_unacked(), 2);
    }

    #[test]
    fn test_out_of_order_with_check_is_violation() {
        let mut window = SequenceWindow::new(12, 8);
        window.account_receive(0, true).unwrap();
        match window.account_receive(5, true) {
            Err(MasterError::SequenceViolation { expected, actual }) => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 5);
            }
            other => panic!("expected violation, got {other:?}"),
        }
        // State untouched by the rejected frame.
        assert_eq!(window.vr(), 1);
    }

    #[test]
    fn test_out_of_order_without_check_realigns() {
        let mut window = SequenceWindow::new(12, 8);
        assert_eq!(
            window.account_receive(7, false).unwrap(),
            ReceiveOutcome::Realigned { expected: 0 }
        );
        assert_eq!(window.vr(), 8);
    }

    #[test]
    fn test_ack_due_at_w() {
        let mut window = SequenceWindow::new(12, 3);
        for ns in 0..2 {
            window.account_receive(ns, true).unwrap();
            assert!(!window.ack_due());
        }
        window.account_receive(2, true).unwrap();
        assert!(window.ack_due());

        window.note_ack_sent();
        assert!(!window.ack_due());
        assert_eq!(window.recv_unacked(), 0);
    }

    #[test]
    fn test_vr_wraps_at_modulo() {
        let mut window = SequenceWindow::new(12, 8);
        window.vr = 32767;
        assert_eq!(
            window.account_receive(32767, true).unwrap(),
            ReceiveOutcome::InOrder
        );
        assert_eq!(window.vr(), 0);
    }

    #[test]
    fn test_vs_wraps_at_modulo() {
        let mut window = SequenceWindow::new(12, 8);
        window.vs = 32767;
        window.acked = 32767;
        assert_eq!(window.claim_send().unwrap(), 32767);
        assert_eq!(window.vs(), 0);
        assert_eq!(window.unacked(), 1);
        assert!(window.apply_ack(0).unwrap());
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let mut window = SequenceWindow::new(12, 8);
        window.claim_send().unwrap();
        window.account_receive(0, true).unwrap();
        window.reset();
        assert_eq!(window.vs(), 0);
        assert_eq!(window.vr(), 0);
        assert_eq!(window.unacked(), 0);
        assert_eq!(window.recv_unacked(), 0);
    }
}
