use tracing::{debug, trace};

use crate::address::AddressConfig;
use crate::codec::{
    FrameConfig, CRC_SIZE, LENGTH_HIGH_POS, LENGTH_LOW_POS, MSG_TYPE_POS, OVERHEAD, PAYLOAD_POS,
    PREAMBLE_0_POS, PREAMBLE_1_POS, PREAMBLE_2_POS, SOURCE_POS, TARGET_POS,
};
use crate::crc::crc16;

/// Receives validated frames from a [`FrameReceiver`].
///
/// `frame` holds the complete wire frame: header, payload and CRC.
pub trait FrameSink {
    fn on_frame_received(&mut self, frame: &[u8]);
}

impl<F: FnMut(&[u8])> FrameSink for F {
    fn on_frame_received(&mut self, frame: &[u8]) {
        self(frame)
    }
}

/// Parse position of the receiver, derived from the number of bytes
/// accumulated for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
    AwaitPreamble0,
    AwaitPreamble1,
    AwaitPreamble2,
    SourceAddr,
    TargetAddr,
    MessageType,
    LengthHigh,
    LengthLow,
    AccumulatePayloadAndCrc,
}

impl RxState {
    fn at(received: usize) -> Self {
        match received {
            PREAMBLE_0_POS => RxState::AwaitPreamble0,
            PREAMBLE_1_POS => RxState::AwaitPreamble1,
            PREAMBLE_2_POS => RxState::AwaitPreamble2,
            SOURCE_POS => RxState::SourceAddr,
            TARGET_POS => RxState::TargetAddr,
            MSG_TYPE_POS => RxState::MessageType,
            LENGTH_HIGH_POS => RxState::LengthHigh,
            LENGTH_LOW_POS => RxState::LengthLow,
            _ => RxState::AccumulatePayloadAndCrc,
        }
    }
}

/// Why the receiver dropped what it had accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropReason {
    Preamble,
    OversizedLength,
    Bounds,
    Crc,
    Address,
}

/// Counters for delivered and dropped frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub delivered: u64,
    pub preamble_mismatch: u64,
    pub oversized_length: u64,
    pub crc_mismatch: u64,
    pub address_mismatch: u64,
    pub bounds_reset: u64,
}

/// Byte-at-a-time frame parser.
///
/// State persists across calls, so input may be split at arbitrary points.
/// Every rejection is a silent drop followed by a reset, after which the next
/// byte is a fresh preamble candidate.
#[derive(Debug)]
pub struct FrameReceiver {
    config: FrameConfig,
    scratch: Box<[u8]>,
    write_index: usize,
    received: usize,
    declared_len: usize,
    stats: ReceiverStats,
}

impl FrameReceiver {
    /// Create a receiver with its scratch buffer sized from `config`.
    pub fn new(config: FrameConfig) -> Self {
        Self {
            scratch: vec![0u8; config.scratch_capacity()].into_boxed_slice(),
            config,
            write_index: 0,
            received: 0,
            declared_len: 0,
            stats: ReceiverStats::default(),
        }
    }

    /// Feed one byte. Returns true if it completed a delivered frame.
    pub fn feed_byte<S: FrameSink + ?Sized>(
        &mut self,
        byte: u8,
        addresses: &AddressConfig,
        sink: &mut S,
    ) -> bool {
        match RxState::at(self.received) {
            RxState::AwaitPreamble0 => self.expect_preamble(byte, 0),
            RxState::AwaitPreamble1 => self.expect_preamble(byte, 1),
            RxState::AwaitPreamble2 => self.expect_preamble(byte, 2),
            RxState::SourceAddr
            | RxState::TargetAddr
            | RxState::MessageType
            | RxState::LengthHigh => self.queue_byte(byte),
            RxState::LengthLow => {
                self.queue_byte(byte);
                self.declared_len = usize::from(u16::from_be_bytes([
                    self.scratch[LENGTH_HIGH_POS],
                    self.scratch[LENGTH_LOW_POS],
                ]));
                if self.declared_len > usize::from(self.config.max_payload_size) {
                    self.drop_frame(DropReason::OversizedLength);
                }
            }
            RxState::AccumulatePayloadAndCrc => {
                self.queue_byte(byte);
                if self.received >= self.declared_len + OVERHEAD {
                    return self.complete(addresses, sink);
                }
            }
        }
        false
    }

    /// Feed a buffer. Returns the number of frames delivered during the call.
    pub fn feed<S: FrameSink + ?Sized>(
        &mut self,
        bytes: &[u8],
        addresses: &AddressConfig,
        sink: &mut S,
    ) -> usize {
        let mut delivered = 0usize;
        for &byte in bytes {
            if self.feed_byte(byte, addresses, sink) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Discard any partially received frame.
    pub fn reset(&mut self) {
        let used = self.received.min(self.scratch.len());
        self.scratch[..used].fill(0);
        self.write_index = 0;
        self.received = 0;
        self.declared_len = 0;
    }

    /// Current parse position.
    pub fn state(&self) -> RxState {
        RxState::at(self.received)
    }

    /// Bytes accumulated for the frame in progress.
    pub fn pending_len(&self) -> usize {
        self.received
    }

    /// Delivery and drop counters since creation.
    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// Scratch buffer capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.scratch.len()
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn expect_preamble(&mut self, byte: u8, position: usize) {
        if byte == self.config.preamble[position] {
            self.queue_byte(byte);
        } else {
            self.drop_frame(DropReason::Preamble);
        }
    }

    fn queue_byte(&mut self, byte: u8) {
        self.scratch[self.write_index] = byte;
        self.write_index = (self.write_index + 1) % self.scratch.len();
        self.received = self.received.saturating_add(1);
    }

    fn complete<S: FrameSink + ?Sized>(
        &mut self,
        addresses: &AddressConfig,
        sink: &mut S,
    ) -> bool {
        let crc_pos = self.declared_len + PAYLOAD_POS;
        if crc_pos + CRC_SIZE > self.scratch.len() {
            self.drop_frame(DropReason::Bounds);
            return false;
        }

        let carried = u16::from_be_bytes([self.scratch[crc_pos], self.scratch[crc_pos + 1]]);
        if carried != crc16(&self.scratch[..crc_pos]) {
            self.drop_frame(DropReason::Crc);
            return false;
        }

        let target = self.scratch[TARGET_POS];
        if !addresses.accepts(target) {
            self.drop_frame(DropReason::Address);
            return false;
        }

        let total = crc_pos + CRC_SIZE;
        debug!(
            source = self.scratch[SOURCE_POS],
            target,
            msg_type = self.scratch[MSG_TYPE_POS],
            payload_len = self.declared_len,
            "frame received"
        );
        self.stats.delivered += 1;
        sink.on_frame_received(&self.scratch[..total]);
        self.reset();
        true
    }

    fn drop_frame(&mut self, reason: DropReason) {
        let counter = match reason {
            DropReason::Preamble => &mut self.stats.preamble_mismatch,
            DropReason::OversizedLength => &mut self.stats.oversized_length,
            DropReason::Bounds => &mut self.stats.bounds_reset,
            DropReason::Crc => &mut self.stats.crc_mismatch,
            DropReason::Address => &mut self.stats.address_mismatch,
        };
        *counter += 1;
        if reason != DropReason::Preamble {
            trace!(
                ?reason,
                pending = self.received,
                declared_len = self.declared_len,
                "dropping frame"
            );
        }
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_frame, DEFAULT_PREAMBLE};

    fn frame(cfg: &FrameConfig, source: u8, target: u8, msg_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(cfg, source, target, msg_type, payload, &mut buf).unwrap();
        buf.to_vec()
    }

    fn collect(receiver: &mut FrameReceiver, addresses: &AddressConfig, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        let mut sink = |f: &[u8]| out.push(f.to_vec());
        receiver.feed(bytes, addresses, &mut sink);
        out
    }

    #[test]
    fn delivers_valid_frame() {
        let cfg = FrameConfig::default();
        let wire = frame(&cfg, 0xEE, 0x00, 0x01, b"");
        let mut rx = FrameReceiver::new(cfg);

        let got = collect(&mut rx, &AddressConfig::default(), &wire);

        assert_eq!(got, vec![wire]);
        assert_eq!(rx.stats().delivered, 1);
        assert_eq!(rx.state(), RxState::AwaitPreamble0);
    }

    #[test]
    fn states_advance_in_order() {
        let cfg = FrameConfig::default();
        let wire = frame(&cfg, 1, 0, 2, b"xy");
        let mut rx = FrameReceiver::new(cfg);
        let addresses = AddressConfig::default();
        let mut sink = |_: &[u8]| {};

        let expected = [
            RxState::AwaitPreamble1,
            RxState::AwaitPreamble2,
            RxState::SourceAddr,
            RxState::TargetAddr,
            RxState::MessageType,
            RxState::LengthHigh,
            RxState::LengthLow,
            RxState::AccumulatePayloadAndCrc,
        ];
        assert_eq!(rx.state(), RxState::AwaitPreamble0);
        for (byte, state) in wire.iter().zip(expected) {
            rx.feed_byte(*byte, &addresses, &mut sink);
            assert_eq!(rx.state(), state);
        }
    }

    #[test]
    fn byte_at_a_time_across_calls() {
        let cfg = FrameConfig::default();
        let wire = frame(&cfg, 3, 0, 9, b"split");
        let mut rx = FrameReceiver::new(cfg);
        let addresses = AddressConfig::default();
        let mut delivered = Vec::new();

        for byte in &wire {
            let mut sink = |f: &[u8]| delivered.push(f.to_vec());
            rx.feed_byte(*byte, &addresses, &mut sink);
        }

        assert_eq!(delivered, vec![wire]);
    }

    #[test]
    fn leading_garbage_is_skipped() {
        let cfg = FrameConfig::default();
        let wire = frame(&cfg, 1, 0, 2, b"data");
        let mut input = vec![0x13];
        input.extend_from_slice(&wire);
        let mut rx = FrameReceiver::new(cfg);

        let got = collect(&mut rx, &AddressConfig::default(), &input);

        assert_eq!(got, vec![wire]);
        assert_eq!(rx.stats().preamble_mismatch, 1);
    }

    #[test]
    fn partial_preamble_then_real_frame() {
        let cfg = FrameConfig::default();
        let wire = frame(&cfg, 1, 0, 2, b"data");
        let mut input = vec![DEFAULT_PREAMBLE[0], DEFAULT_PREAMBLE[1], 0x00];
        input.extend_from_slice(&wire);
        let mut rx = FrameReceiver::new(cfg);

        assert_eq!(collect(&mut rx, &AddressConfig::default(), &input), vec![wire]);
    }

    #[test]
    fn any_single_byte_flip_suppresses_delivery() {
        let cfg = FrameConfig::default();
        let wire = frame(&cfg, 0x01, 0x00, 0x05, b"checksum me");
        let addresses = AddressConfig::default();

        for pos in 0..wire.len() {
            let mut corrupted = wire.clone();
            corrupted[pos] ^= 0x5A;
            let mut rx = FrameReceiver::new(cfg);
            let got = collect(&mut rx, &addresses, &corrupted);
            assert!(got.is_empty(), "flip at {pos} was delivered");
        }
    }

    #[test]
    fn crc_mismatch_then_valid_frame() {
        let cfg = FrameConfig::default();
        let mut bad = frame(&cfg, 1, 0, 2, b"abc");
        let last = bad.len() - 1;
        bad[last] ^= 0x01;
        let good = frame(&cfg, 1, 0, 2, b"def");
        let mut rx = FrameReceiver::new(cfg);

        let mut input = bad;
        input.extend_from_slice(&good);
        let got = collect(&mut rx, &AddressConfig::default(), &input);

        assert_eq!(got, vec![good]);
        assert_eq!(rx.stats().crc_mismatch, 1);
    }

    #[test]
    fn foreign_address_is_dropped_and_state_recovers() {
        let cfg = FrameConfig::default();
        let addresses = AddressConfig::new(0x10, 0xFF);
        let foreign = frame(&cfg, 1, 0x11, 2, b"not mine");
        let mine = frame(&cfg, 1, 0x10, 2, b"mine");
        let mut rx = FrameReceiver::new(cfg);

        assert!(collect(&mut rx, &addresses, &foreign).is_empty());
        assert_eq!(rx.stats().address_mismatch, 1);
        assert_eq!(rx.pending_len(), 0);
        assert_eq!(collect(&mut rx, &addresses, &mine), vec![mine]);
    }

    #[test]
    fn broadcast_frames_are_accepted() {
        let cfg = FrameConfig::default();
        let addresses = AddressConfig::new(0x10, 0xFF);
        let wire = frame(&cfg, 1, 0xFF, 2, b"all");
        let mut rx = FrameReceiver::new(cfg);

        assert_eq!(collect(&mut rx, &addresses, &wire), vec![wire]);
    }

    #[test]
    fn oversized_length_resets_at_length_low() {
        let big = FrameConfig::with_max_payload(64);
        let small = FrameConfig::with_max_payload(16);
        let oversized = frame(&big, 1, 0, 2, &[0x00; 40]);
        let good = frame(&small, 1, 0, 2, b"fits");
        let mut rx = FrameReceiver::new(small);
        let addresses = AddressConfig::default();
        let mut sink = |_: &[u8]| {};

        for byte in &oversized[..8] {
            rx.feed_byte(*byte, &addresses, &mut sink);
        }
        assert_eq!(rx.pending_len(), 0);
        assert_eq!(rx.stats().oversized_length, 1);

        let mut input = oversized[8..].to_vec();
        input.extend_from_slice(&good);
        assert_eq!(collect(&mut rx, &addresses, &input), vec![good]);
    }

    #[test]
    fn oversized_payload_body_with_embedded_frame_resyncs() {
        let big = FrameConfig::with_max_payload(128);
        let small = FrameConfig::with_max_payload(16);
        let inner = frame(&small, 1, 0, 2, b"inner");
        let outer = frame(&big, 1, 0, 2, &[&[0u8; 20][..], &inner].concat());
        let mut rx = FrameReceiver::new(small);

        let got = collect(&mut rx, &AddressConfig::default(), &outer);

        assert_eq!(got, vec![inner]);
    }

    #[test]
    fn back_to_back_frames_in_one_call() {
        let cfg = FrameConfig::default();
        let first = frame(&cfg, 1, 0, 2, b"first");
        let second = frame(&cfg, 3, 0, 4, b"second");
        let mut rx = FrameReceiver::new(cfg);

        let mut input = first.clone();
        input.extend_from_slice(&second);
        let mut got = Vec::new();
        let mut sink = |f: &[u8]| got.push(f.to_vec());
        let delivered = rx.feed(&input, &AddressConfig::default(), &mut sink);

        assert_eq!(delivered, 2);
        assert_eq!(got, vec![first, second]);
    }

    #[test]
    fn max_payload_frame_is_delivered() {
        let cfg = FrameConfig::with_max_payload(300);
        let payload: Vec<u8> = (0..300u16).map(|i| (i % 251) as u8).collect();
        let wire = frame(&cfg, 1, 0, 2, &payload);
        let mut rx = FrameReceiver::new(cfg);

        assert_eq!(collect(&mut rx, &AddressConfig::default(), &wire), vec![wire]);
    }

    #[test]
    fn inconsistent_scratch_capacity_resets_defensively() {
        let cfg = FrameConfig {
            max_payload_size: 16,
            scratch_capacity: Some(20),
            ..FrameConfig::default()
        };
        let too_big = frame(&cfg, 1, 0, 2, &[0x11; 12]);
        let fits = frame(&cfg, 1, 0, 2, &[0x22; 4]);
        let mut rx = FrameReceiver::new(cfg);
        assert_eq!(rx.capacity(), 20);

        let mut input = too_big;
        input.extend_from_slice(&fits);
        let got = collect(&mut rx, &AddressConfig::default(), &input);

        assert_eq!(got, vec![fits]);
        assert_eq!(rx.stats().bounds_reset, 1);
    }

    #[test]
    fn truncated_frame_is_abandoned_by_explicit_reset() {
        let cfg = FrameConfig::default();
        let wire = frame(&cfg, 1, 0, 2, b"payload");
        let mut rx = FrameReceiver::new(cfg);
        let addresses = AddressConfig::default();

        assert!(collect(&mut rx, &addresses, &wire[..wire.len() - 3]).is_empty());
        assert!(rx.pending_len() > 0);

        rx.reset();
        assert_eq!(rx.state(), RxState::AwaitPreamble0);
        assert_eq!(collect(&mut rx, &addresses, &wire), vec![wire]);
    }

    #[test]
    fn independent_instances_do_not_share_state() {
        let cfg = FrameConfig::default();
        let wire = frame(&cfg, 1, 0, 2, b"abc");
        let mut a = FrameReceiver::new(cfg);
        let mut b = FrameReceiver::new(cfg);
        let addresses = AddressConfig::default();

        assert!(collect(&mut a, &addresses, &wire[..5]).is_empty());
        assert_eq!(collect(&mut b, &addresses, &wire), vec![wire.clone()]);
        assert_eq!(collect(&mut a, &addresses, &wire[5..]), vec![wire]);
    }
}
