use std::collections::VecDeque;

use tracing::warn;

use crate::codec::{Frame, FrameConfig};
use crate::receiver::FrameSink;

/// A receive collaborator that stores delivered frames for polling.
///
/// With a limit set, the oldest frame is discarded when a new one arrives
/// and the queue is full.
#[derive(Debug)]
pub struct FrameQueue {
    config: FrameConfig,
    frames: VecDeque<Frame>,
    limit: Option<usize>,
    overflowed: u64,
}

impl FrameQueue {
    /// Create an unbounded queue for frames built with `config`.
    pub fn new(config: FrameConfig) -> Self {
        Self {
            config,
            frames: VecDeque::new(),
            limit: None,
            overflowed: 0,
        }
    }

    /// Create a queue holding at most `limit` frames (minimum 1).
    pub fn with_limit(config: FrameConfig, limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::new(config)
        }
    }

    /// Take the oldest queued frame.
    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    /// Take every queued frame, oldest first.
    pub fn drain(&mut self) -> Vec<Frame> {
        self.frames.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames discarded because the queue was full.
    pub fn overflowed(&self) -> u64 {
        self.overflowed
    }
}

impl FrameSink for FrameQueue {
    fn on_frame_received(&mut self, frame: &[u8]) {
        let frame = match Frame::parse(frame, &self.config) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%err, "discarding delivered bytes that do not parse as a frame");
                return;
            }
        };

        if let Some(limit) = self.limit {
            if self.frames.len() >= limit {
                self.frames.pop_front();
                self.overflowed += 1;
            }
        }
        self.frames.push_back(frame);
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::address::AddressConfig;
    use crate::codec::encode_frame;
    use crate::receiver::FrameReceiver;

    fn wire(msg_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(&FrameConfig::default(), 1, 0, msg_type, payload, &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn queues_frames_in_arrival_order() {
        let mut rx = FrameReceiver::new(FrameConfig::default());
        let mut queue = FrameQueue::new(FrameConfig::default());
        let input = [wire(1, b"one"), wire(2, b"two")].concat();

        rx.feed(&input, &AddressConfig::default(), &mut queue);

        assert_eq!(queue.len(), 2);
        let first = queue.pop().unwrap();
        assert_eq!((first.msg_type, first.payload.as_ref()), (1, b"one".as_ref()));
        let rest = queue.drain();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].payload.as_ref(), b"two");
        assert!(queue.is_empty());
    }

    #[test]
    fn limit_discards_oldest() {
        let mut queue = FrameQueue::with_limit(FrameConfig::default(), 2);
        queue.on_frame_received(&wire(1, b""));
        queue.on_frame_received(&wire(2, b""));
        queue.on_frame_received(&wire(3, b""));

        assert_eq!(queue.overflowed(), 1);
        let types: Vec<u8> = queue.drain().iter().map(|f| f.msg_type).collect();
        assert_eq!(types, vec![2, 3]);
    }

    #[test]
    fn unparseable_bytes_are_ignored() {
        let mut queue = FrameQueue::new(FrameConfig::default());
        queue.on_frame_received(b"garbage");
        assert!(queue.is_empty());
    }
}
