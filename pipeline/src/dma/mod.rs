//! Double-buffered transfer engine.
//!
//! Two equally sized buffers are served by a pair of chained hardware
//! channels: when channel A finishes, the hardware starts channel B on its own
//! and raises A's completion flag, and vice versa. Software refills (or
//! drains) the half that just finished and re-arms its channel before the
//! other half runs out, which is one buffer period.
//!
//! All raw pointer handling lives in this module. The rest of the pipeline
//! only ever sees a [`Completion`] guard, which is the single way to borrow a
//! buffer half and which re-arms that half when dropped.

use core::fmt;
use core::marker::PhantomData;
use core::sync::atomic::{Ordering, compiler_fence};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Half {
    A,
    B,
}

impl Half {
    pub const fn other(self) -> Self {
        match self {
            Half::A => Half::B,
            Half::B => Half::A,
        }
    }

    const fn index(self) -> usize {
        match self {
            Half::A => 0,
            Half::B => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    NotStarted,
    AlreadyStarted,
}

impl fmt::Display for DmaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DmaError::NotStarted => f.write_str("transfer chain not started"),
            DmaError::AlreadyStarted => f.write_str("transfer chain already running"),
        }
    }
}

impl core::error::Error for DmaError {}

/// One hardware channel of a chained pair.
///
/// # Safety
///
/// Implementations must only access memory inside the range passed to the
/// most recent [`arm`](Self::arm), and may only report a completion once the
/// hardware has finished with that range.
pub unsafe trait TransferChannel {
    type Word: Copy;

    /// Sets up the channel and links its completion to the start of `next`.
    fn configure(&mut self, next: &Self);

    /// Points the channel at `len` words starting at `buffer` without
    /// starting it.
    ///
    /// # Safety
    ///
    /// The memory must stay valid, and untouched by software, until this
    /// channel reports its completion.
    unsafe fn arm(&mut self, buffer: *mut Self::Word, len: usize);

    /// Starts the channel immediately.
    fn start(&mut self);

    /// Returns `true` and acknowledges the flag if this channel has completed.
    fn completion_signal(&mut self) -> bool;
}

pub struct DoubleBufferEngine<'b, C: TransferChannel, const N: usize> {
    channels: [C; 2],
    buffers: [*mut [C::Word; N]; 2],
    expected: Half,
    running: bool,
    desyncs: u32,
    _buffers: PhantomData<&'b mut [C::Word; N]>,
}

// SAFETY: the buffer pointers come from exclusive borrows held for 'b, and are
// only dereferenced through a `Completion`, which borrows the engine mutably.
unsafe impl<C: TransferChannel + Send, const N: usize> Send for DoubleBufferEngine<'_, C, N> where
    C::Word: Send
{
}

impl<'b, C: TransferChannel, const N: usize> DoubleBufferEngine<'b, C, N> {
    /// Takes ownership of both buffers and chains the two channels into an
    /// endless A, B, A, B alternation.
    pub fn init(buffer_a: &'b mut [C::Word; N], buffer_b: &'b mut [C::Word; N], mut channels: [C; 2]) -> Self {
        let [a, b] = &mut channels;
        a.configure(b);
        b.configure(a);

        Self {
            channels,
            buffers: [buffer_a as *mut _, buffer_b as *mut _],
            expected: Half::A,
            running: false,
            desyncs: 0,
            _buffers: PhantomData,
        }
    }

    /// Arms both halves and starts the chain from half A.
    ///
    /// Fill both buffers (see [`with_buffers`](Self::with_buffers)) before
    /// calling this if the first milliseconds must not be silence.
    pub fn start(&mut self) -> Result<(), DmaError> {
        if self.running {
            return Err(DmaError::AlreadyStarted);
        }

        self.arm(Half::A);
        self.arm(Half::B);
        compiler_fence(Ordering::SeqCst);

        self.expected = Half::A;
        self.running = true;
        self.channels[Half::A.index()].start();

        info!("DMA: chain started ({} words per half)", N);
        Ok(())
    }

    /// Gives software both buffers before the chain is running.
    pub fn with_buffers<R>(&mut self, f: impl FnOnce(&mut [C::Word; N], &mut [C::Word; N]) -> R) -> Result<R, DmaError> {
        if self.running {
            return Err(DmaError::AlreadyStarted);
        }

        // SAFETY: the chain is stopped, so no hardware owns either half, and
        // the two pointers come from distinct exclusive borrows.
        let (a, b) = unsafe { (&mut *self.buffers[0], &mut *self.buffers[1]) };
        Ok(f(a, b))
    }

    /// Services one pending completion, if any.
    ///
    /// Completions are taken in alternation order. If only the unexpected half
    /// has completed, a deadline was missed; that half is still handed out so
    /// the chain keeps running, and the event is counted in
    /// [`desyncs`](Self::desyncs).
    pub fn on_interrupt(&mut self) -> Option<Completion<'_, 'b, C, N>> {
        if !self.running {
            return None;
        }

        let expected = self.expected;
        let half = if self.channels[expected.index()].completion_signal() {
            expected
        } else if self.channels[expected.other().index()].completion_signal() {
            self.desyncs = self.desyncs.wrapping_add(1);
            warn!("DMA: completion for {} while expecting {}", expected.other(), expected);
            expected.other()
        } else {
            return None;
        };

        compiler_fence(Ordering::SeqCst);
        self.expected = half.other();

        Some(Completion { engine: self, half })
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The half whose completion is due next.
    pub fn expected_next(&self) -> Result<Half, DmaError> {
        if self.running {
            Ok(self.expected)
        } else {
            Err(DmaError::NotStarted)
        }
    }

    pub fn desyncs(&self) -> u32 {
        self.desyncs
    }

    fn arm(&mut self, half: Half) {
        let buffer = self.buffers[half.index()].cast::<C::Word>();
        // SAFETY: the half is software-owned (not started yet, or just
        // completed), and the pointer stays valid for 'b.
        unsafe { self.channels[half.index()].arm(buffer, N) };
    }
}

/// Exclusive access to the half that just finished transferring.
///
/// Dropping the guard re-arms the half, so it is back in the chain before
/// the other half completes.
pub struct Completion<'e, 'b, C: TransferChannel, const N: usize> {
    engine: &'e mut DoubleBufferEngine<'b, C, N>,
    half: Half,
}

impl<C: TransferChannel, const N: usize> Completion<'_, '_, C, N> {
    pub fn half(&self) -> Half {
        self.half
    }

    pub fn buffer(&mut self) -> &mut [C::Word; N] {
        // SAFETY: this half completed and has not been re-armed, so the
        // hardware is working on the other half. The guard borrows the engine
        // mutably, so no second reference to this half can exist.
        unsafe { &mut *self.engine.buffers[self.half.index()] }
    }
}

impl<C: TransferChannel, const N: usize> Drop for Completion<'_, '_, C, N> {
    fn drop(&mut self) {
        compiler_fence(Ordering::SeqCst);
        self.engine.arm(self.half);
    }
}

#[cfg(test)]
mod test;
