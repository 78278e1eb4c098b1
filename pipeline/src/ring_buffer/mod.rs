//! Fixed-capacity sample ring shared between the USB OUT path (writer) and
//! the DAC feed interrupt (reader).
//!
//! The ring is never write-protected: a producer that runs ahead of the
//! consumer silently overwrites unread samples. Stalling the producer would
//! mean stalling an interrupt, which is worse than losing audio.
//!
//! Cursors are free-running counters; the slot index is `cursor % N`. This
//! lets the consumer tell "empty" from "lapped" and saturate `length()` at the
//! capacity instead of wrapping back to zero. `N` must be a power of two so
//! the slot index stays continuous when a counter wraps at `usize::MAX`.
//!
//! Each cursor has exactly one owner: [`RingProducer`] moves `write`,
//! [`RingConsumer`] moves `read`. Cursor updates are single atomic stores, and
//! the sample slots are atomic cells, so an overrun is a value race on audio
//! data rather than undefined behaviour.

use core::sync::atomic::{AtomicI16, AtomicI32, AtomicU16, AtomicU32, AtomicUsize, Ordering};

/// A sample type the ring can hold in lock-free slots.
pub trait RingSample: Copy + Default {
    type Cell: Default + Sync;

    /// Size of the sample in its little-endian wire encoding.
    const BYTES: usize;

    fn load(cell: &Self::Cell) -> Self;
    fn store(cell: &Self::Cell, value: Self);
    fn from_le_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_ring_sample {
    ($($ty:ty => $cell:ty),* $(,)?) => {$(
        impl RingSample for $ty {
            type Cell = $cell;

            const BYTES: usize = core::mem::size_of::<$ty>();

            #[inline]
            fn load(cell: &$cell) -> Self {
                cell.load(Ordering::Relaxed)
            }

            #[inline]
            fn store(cell: &$cell, value: Self) {
                cell.store(value, Ordering::Relaxed)
            }

            #[inline]
            fn from_le_slice(bytes: &[u8]) -> Self {
                bytes.try_into().map(<$ty>::from_le_bytes).unwrap_or_default()
            }
        }
    )*};
}

impl_ring_sample!(i16 => AtomicI16, u16 => AtomicU16, i32 => AtomicI32, u32 => AtomicU32);

pub struct RingBuffer<T: RingSample, const N: usize> {
    ring: [T::Cell; N],
    write: AtomicUsize,
    read: AtomicUsize,
}

impl<T: RingSample, const N: usize> RingBuffer<T, N> {
    const CAPACITY_IS_POWER_OF_TWO: () = assert!(N.is_power_of_two(), "ring capacity must be a power of two");

    /// Creates a zero-filled ring, so a consumer that starts early plays
    /// silence rather than whatever was in RAM.
    pub fn new() -> Self {
        let () = Self::CAPACITY_IS_POWER_OF_TWO;

        Self {
            ring: core::array::from_fn(|_| T::Cell::default()),
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Samples available to read, saturated at the capacity once the writer
    /// has lapped the reader.
    pub fn length(&self) -> usize {
        self.pending().min(N)
    }

    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    /// Splits the ring into its single writer and single reader.
    pub fn split(&mut self) -> (RingProducer<'_, T, N>, RingConsumer<'_, T, N>) {
        let ring = &*self;
        (RingProducer { ring }, RingConsumer { ring, overruns: 0 })
    }

    #[inline]
    fn pending(&self) -> usize {
        let read = self.read.load(Ordering::Acquire);
        self.write.load(Ordering::Acquire).wrapping_sub(read)
    }
}

impl<T: RingSample, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner of the write cursor.
pub struct RingProducer<'a, T: RingSample, const N: usize> {
    ring: &'a RingBuffer<T, N>,
}

impl<'a, T: RingSample, const N: usize> RingProducer<'a, T, N> {
    /// Slot index at which the next sample lands.
    pub fn write_index(&self) -> usize {
        self.ring.write.load(Ordering::Relaxed) % N
    }

    /// Slots left before the write cursor has to wrap back to index 0.
    pub fn dist_till_write_wrap(&self) -> usize {
        N - self.write_index()
    }

    /// The contiguous run of slots from the write cursor to the end of the
    /// ring. Samples placed here become visible to the reader only after
    /// [`advance_write`](Self::advance_write).
    pub fn write_head(&mut self) -> WriteHead<'_, T> {
        let start = self.write_index();
        WriteHead {
            slots: &self.ring.ring[start..],
        }
    }

    /// Commits `n` samples. There is no check against the reader.
    pub fn advance_write(&mut self, n: usize) {
        let write = self.ring.write.load(Ordering::Relaxed);

        #[cfg(feature = "overrun-assert")]
        debug_assert!(
            write.wrapping_add(n).wrapping_sub(self.ring.read.load(Ordering::Acquire)) <= N,
            "ring producer lapped the consumer"
        );

        self.ring.write.store(write.wrapping_add(n), Ordering::Release);
    }

    pub fn length(&self) -> usize {
        self.ring.length()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

/// Owner of the read cursor.
pub struct RingConsumer<'a, T: RingSample, const N: usize> {
    ring: &'a RingBuffer<T, N>,
    overruns: u32,
}

impl<'a, T: RingSample, const N: usize> RingConsumer<'a, T, N> {
    /// Returns the sample under the read cursor and advances past it.
    ///
    /// If the writer lapped the reader, the cursor first jumps to the oldest
    /// sample that was not overwritten. On an empty ring the stale sample
    /// under the cursor is returned and the cursor stays put; check
    /// [`length`](Self::length) first when freshness matters.
    pub fn read_one(&mut self) -> T {
        let write = self.ring.write.load(Ordering::Acquire);
        let mut read = self.ring.read.load(Ordering::Relaxed);

        let pending = write.wrapping_sub(read);
        if pending == 0 {
            return T::load(&self.ring.ring[read % N]);
        }
        if pending > N {
            read = write.wrapping_sub(N);
            self.overruns = self.overruns.wrapping_add(1);
        }

        let value = T::load(&self.ring.ring[read % N]);
        self.ring.read.store(read.wrapping_add(1), Ordering::Release);
        value
    }

    pub fn length(&self) -> usize {
        self.ring.length()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Times the reader found itself lapped and skipped overwritten samples.
    pub fn overruns(&self) -> u32 {
        self.overruns
    }
}

/// Writable window from the write cursor up to the wrap point.
pub struct WriteHead<'a, T: RingSample> {
    slots: &'a [T::Cell],
}

impl<'a, T: RingSample> WriteHead<'a, T> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Copies as many samples as fit and returns how many were placed.
    pub fn copy_from_slice(&self, samples: &[T]) -> usize {
        let count = samples.len().min(self.slots.len());
        for (slot, &sample) in self.slots.iter().zip(&samples[..count]) {
            T::store(slot, sample);
        }
        count
    }

    /// Decodes little-endian samples straight from wire bytes. A trailing
    /// partial sample is ignored. Returns how many samples were placed.
    pub fn copy_from_le_bytes(&self, bytes: &[u8]) -> usize {
        let mut count = 0;
        for (slot, chunk) in self.slots.iter().zip(bytes.chunks_exact(T::BYTES)) {
            T::store(slot, T::from_le_slice(chunk));
            count += 1;
        }
        count
    }
}
