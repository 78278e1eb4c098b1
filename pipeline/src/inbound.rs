use crate::ring_buffer::{RingProducer, RingSample};

/// Writes host-pushed audio bytes into the ring.
///
/// A single USB packet may straddle the ring's wrap point, so every delivery
/// is split into a write up to the end of the ring and a remainder written
/// from slot 0. Each part is committed separately.
pub struct InboundStreamWriter<'a, T: RingSample, const N: usize> {
    producer: RingProducer<'a, T, N>,
}

impl<'a, T: RingSample, const N: usize> InboundStreamWriter<'a, T, N> {
    pub fn new(producer: RingProducer<'a, T, N>) -> Self {
        Self { producer }
    }

    /// Decodes little-endian samples from `bytes` and commits them. A
    /// trailing partial sample is discarded. Returns the samples written.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let whole = bytes.len() - bytes.len() % T::BYTES;
        let split = whole.min(self.producer.dist_till_write_wrap() * T::BYTES);
        let (first, remainder) = bytes[..whole].split_at(split);

        let mut written = self.producer.write_head().copy_from_le_bytes(first);
        self.producer.advance_write(written);

        if !remainder.is_empty() {
            // The cursor is at slot 0 now. A packet larger than the whole
            // ring keeps only its first N samples of the remainder.
            let wrapped = self.producer.write_head().copy_from_le_bytes(remainder);
            self.producer.advance_write(wrapped);
            written += wrapped;
        }

        if whole != bytes.len() {
            trace!("Inbound: dropped {} trailing bytes", bytes.len() - whole);
        }
        written
    }

    pub fn fill_level(&self) -> usize {
        self.producer.length()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ring_buffer::RingBuffer;

    fn le_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|sample| sample.to_le_bytes()).collect()
    }

    #[test]
    fn delivery_straddling_the_wrap_matches_a_linear_write() {
        const CAPACITY: usize = 16;

        for offset in 0..CAPACITY {
            let mut ring = RingBuffer::<i16, CAPACITY>::new();
            let (producer, mut consumer) = ring.split();
            let mut writer = InboundStreamWriter::new(producer);

            let lead: Vec<i16> = (0..offset as i16).collect();
            writer.write(&le_bytes(&lead));
            for _ in 0..offset {
                consumer.read_one();
            }

            let block: Vec<i16> = (100..112).collect();
            assert_eq!(writer.write(&le_bytes(&block)), block.len(), "offset {offset}");

            let read: Vec<i16> = (0..block.len()).map(|_| consumer.read_one()).collect();
            assert_eq!(read, block, "offset {offset}");
            assert!(consumer.is_empty());
        }
    }

    #[test]
    #[cfg(not(feature = "overrun-assert"))]
    fn wrap_split_leaves_the_cursor_past_the_remainder() {
        let mut ring = RingBuffer::<i16, 8>::new();
        let (producer, _consumer) = ring.split();
        let mut writer = InboundStreamWriter::new(producer);

        writer.write(&le_bytes(&[0; 6]));
        writer.write(&le_bytes(&[1, 2, 3, 4, 5]));

        assert_eq!(writer.producer.write_index(), 3);
        assert_eq!(writer.fill_level(), 8);
    }

    #[test]
    fn odd_trailing_byte_is_discarded() {
        let mut ring = RingBuffer::<i16, 8>::new();
        let (producer, mut consumer) = ring.split();
        let mut writer = InboundStreamWriter::new(producer);

        assert_eq!(writer.write(&[0x02, 0x00, 0x03]), 1);
        assert_eq!(consumer.read_one(), 2);
        assert!(consumer.is_empty());
    }

    #[test]
    fn empty_delivery_writes_nothing() {
        let mut ring = RingBuffer::<i16, 8>::new();
        let (producer, _consumer) = ring.split();
        let mut writer = InboundStreamWriter::new(producer);

        assert_eq!(writer.write(&[]), 0);
        assert_eq!(writer.fill_level(), 0);
        assert_eq!(writer.capacity(), 8);
    }
}
