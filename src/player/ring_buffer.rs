//! Single-producer/single-consumer ring buffer of interleaved f32
//! samples.
//!
//! Wraps `rtrb`'s lock-free SPSC queue so the zero-fill-on-underrun
//! policy and the `push`/`pop`/`available`/`free_space` surface live in
//! one place instead of being reimplemented at every call site.
//!
//! Capacity is fixed at construction and always rounded up to a power
//! of two.

/// Create a ring buffer of `capacity` samples (rounded up to the next
/// power of two) and split it into its producer and consumer halves.
pub fn ring_buffer(capacity: usize) -> (RingProducer, RingConsumer) {
    let capacity = capacity.next_power_of_two();
    let (producer, consumer) = rtrb::RingBuffer::<f32>::new(capacity);
    (RingProducer { inner: producer }, RingConsumer { inner: consumer })
}

/// The Decode Pump's (T-decode) half: pushes decoded samples in.
pub struct RingProducer {
    inner: rtrb::Producer<f32>,
}

impl RingProducer {
    /// Push as many samples from `src` as there is room for.
    /// Returns the number actually pushed; may be less than
    /// `src.len()` if the buffer fills up mid-push.
    pub fn push(&mut self, src: &[f32]) -> usize {
        let mut pushed = 0;
        for &sample in src {
            if self.inner.push(sample).is_err() {
                break;
            }
            pushed += 1;
        }
        pushed
    }

    /// Free capacity, safe to read from either side.
    pub fn free_space(&self) -> usize {
        self.inner.slots()
    }
}

/// The Mixer's (T-audio) half: pops samples out in the real-time
/// callback.
pub struct RingConsumer {
    inner: rtrb::Consumer<f32>,
}

impl RingConsumer {
    /// Fill `dst` completely: the first `min(dst.len(), available)`
    /// entries come from matching earlier pushes in FIFO order, the
    /// rest are zero-filled. Returns the number of real
    /// (non-zero-filled) samples popped.
    pub fn pop(&mut self, dst: &mut [f32]) -> usize {
        let mut popped = 0;
        for slot in dst.iter_mut() {
            match self.inner.pop() {
                Ok(sample) => {
                    *slot = sample;
                    popped += 1;
                }
                Err(_) => *slot = 0.0,
            }
        }
        popped
    }

    /// Samples currently available to pop, safe to read from either
    /// side.
    pub fn available(&self) -> usize {
        self.inner.slots()
    }

    /// Discard every sample currently buffered.
    ///
    /// rtrb's split queue only lets the consumer half remove entries;
    /// the producer has no way to see, let alone discard, data it
    /// already handed off. This is only ever safe to call while the
    /// producer is not concurrently pushing (the Decode Pump is
    /// paused/draining, or a seek/play is draining stale samples before
    /// the new stream starts), so the consumer half performs it here.
    pub fn drain(&mut self) {
        while self.inner.pop().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_pop_round_trips_in_fifo_order() {
        let (mut tx, mut rx) = ring_buffer(16);
        let pushed = tx.push(&[1.0, 2.0, 3.0]);
        assert_eq!(pushed, 3);

        let mut dst = [0.0f32; 3];
        let popped = rx.pop(&mut dst);
        assert_eq!(popped, 3);
        assert_eq!(dst, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn pop_zero_fills_on_underrun() {
        let (mut tx, mut rx) = ring_buffer(16);
        tx.push(&[1.0, 2.0]);

        let mut dst = [9.0f32; 5];
        let popped = rx.pop(&mut dst);
        assert_eq!(popped, 2);
        assert_eq!(dst, [1.0, 2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn push_stops_when_full() {
        let (mut tx, _rx) = ring_buffer(4);
        let pushed = tx.push(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(pushed, 4);
    }

    #[test]
    fn free_space_and_available_track_each_other() {
        let (mut tx, mut rx) = ring_buffer(8);
        assert_eq!(tx.free_space(), 8);
        tx.push(&[1.0, 2.0, 3.0]);
        assert_eq!(tx.free_space(), 5);
        assert_eq!(rx.available(), 3);

        let mut dst = [0.0f32; 3];
        rx.pop(&mut dst);
        assert_eq!(rx.available(), 0);
    }

    #[test]
    fn drain_discards_buffered_samples() {
        let (mut tx, mut rx) = ring_buffer(8);
        tx.push(&[1.0, 2.0, 3.0]);
        rx.drain();
        assert_eq!(rx.available(), 0);

        let mut dst = [9.0f32; 2];
        let popped = rx.pop(&mut dst);
        assert_eq!(popped, 0);
        assert_eq!(dst, [0.0, 0.0]);
    }

    proptest::proptest! {
        #[test]
        fn fifo_property_holds_for_arbitrary_push_pop_sequences(
            pushes in proptest::collection::vec(
                proptest::collection::vec(-1.0f32..1.0, 0..32), 0..8
            ),
        ) {
            let total: usize = pushes.iter().map(|v| v.len()).sum();
            let (mut tx, mut rx) = ring_buffer((total + 1).max(2));
            let mut expected = Vec::new();
            for chunk in &pushes {
                let pushed = tx.push(chunk);
                expected.extend_from_slice(&chunk[..pushed]);
            }

            let mut dst = vec![0.0f32; expected.len() + 4];
            let popped = rx.pop(&mut dst);
            proptest::prop_assert_eq!(popped, expected.len());
            proptest::prop_assert_eq!(&dst[..expected.len()], &expected[..]);
            proptest::prop_assert!(dst[expected.len()..].iter().all(|&s| s == 0.0));
        }
    }
}
