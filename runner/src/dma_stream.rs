//! Double-buffer-mode DMA streams.
//!
//! A stream in double-buffer mode holds two memory addresses (M0AR and M1AR)
//! and flips between them in hardware at every transfer complete, so one
//! stream behaves as the chained channel pair the engine expects. Each
//! [`DbmTarget`] is one of the two memory targets.
//!
//! Completion interrupts stay disabled: embassy-stm32 owns the DMA stream
//! vectors and would clear the flags first. The flags are polled from the
//! service timer instead, see [`crate::service_timer`].

use core::marker::PhantomData;

use audio_pipeline::TransferChannel;
use defmt::debug;
use embassy_stm32::pac;
use embassy_stm32::pac::dma::vals;

#[derive(Clone, Copy)]
pub struct DbmStream {
    dma: pac::dma::Dma,
    num: usize,
    mux_channel: usize,
    request: u8,
    peripheral_addr: u32,
    dir: vals::Dir,
}

impl DbmStream {
    /// `mux_channel` is the DMAMUX1 channel wired to this stream: streams 0 to
    /// 7 of DMA1 use channels 0 to 7, streams of DMA2 use 8 to 15.
    pub const fn new(
        dma: pac::dma::Dma,
        num: usize,
        mux_channel: usize,
        request: u8,
        peripheral_addr: u32,
        dir: vals::Dir,
    ) -> Self {
        Self {
            dma,
            num,
            mux_channel,
            request,
            peripheral_addr,
            dir,
        }
    }

    /// Splits the stream into its two memory targets.
    pub fn targets<W: DmaWord>(self) -> [DbmTarget<W>; 2] {
        [
            DbmTarget {
                stream: self,
                target: vals::Ct::MEMORY0,
                _word: PhantomData,
            },
            DbmTarget {
                stream: self,
                target: vals::Ct::MEMORY1,
                _word: PhantomData,
            },
        ]
    }

    fn regs(&self) -> pac::dma::St {
        self.dma.st(self.num)
    }

    fn transfer_complete(&self) -> bool {
        self.dma.isr(self.num / 4).read().tcif(self.num % 4)
    }

    fn clear_flags(&self) {
        self.dma.ifcr(self.num / 4).write(|w| {
            w.set_tcif(self.num % 4, true);
            w.set_htif(self.num % 4, true);
            w.set_teif(self.num % 4, true);
            w.set_dmeif(self.num % 4, true);
            w.set_feif(self.num % 4, true);
        });
    }
}

/// Memory word moved per request, and how it maps onto the peripheral data
/// register.
pub trait DmaWord: Copy {
    const PERIPHERAL_SIZE: vals::Size;
    /// Peripheral items per memory word.
    const ITEMS_PER_WORD: usize;
}

// One stereo frame is two 32-bit SAI slots.
impl DmaWord for audio_pipeline::StereoFrame {
    const PERIPHERAL_SIZE: vals::Size = vals::Size::BITS32;
    const ITEMS_PER_WORD: usize = 2;
}

impl DmaWord for u16 {
    const PERIPHERAL_SIZE: vals::Size = vals::Size::BITS16;
    const ITEMS_PER_WORD: usize = 1;
}

pub struct DbmTarget<W> {
    stream: DbmStream,
    target: vals::Ct,
    _word: PhantomData<W>,
}

// SAFETY: the stream registers are only touched by whoever owns the targets,
// and the engine arms a target only while the hardware is on the other one.
// Completion is reported when the stream has switched away from the target,
// which means its last item has been moved.
unsafe impl<W: DmaWord> TransferChannel for DbmTarget<W> {
    type Word = W;

    fn configure(&mut self, _next: &Self) {
        // Both targets share the stream; the first one sets it up.
        if self.target != vals::Ct::MEMORY0 {
            return;
        }

        let stream = &self.stream;
        let regs = stream.regs();
        regs.cr().modify(|w| w.set_en(false));
        while regs.cr().read().en() {}
        stream.clear_flags();

        pac::DMAMUX1
            .ccr(stream.mux_channel)
            .write(|w| w.set_dmareq_id(stream.request));

        regs.par().write_value(stream.peripheral_addr);
        // Direct mode: no FIFO, so each request moves one item.
        regs.fcr().write(|w| w.set_dmdis(vals::Dmdis::from_bits(false as u8)));
        regs.cr().write(|w| {
            w.set_dir(stream.dir);
            w.set_dbm(true);
            w.set_circ(true);
            w.set_minc(true);
            w.set_pinc(false);
            w.set_msize(W::PERIPHERAL_SIZE);
            w.set_psize(W::PERIPHERAL_SIZE);
            w.set_pl(vals::Pl::VERY_HIGH);
            w.set_tcie(false);
            w.set_teie(false);
            w.set_htie(false);
        });

        debug!("DMA: stream {} on request {}", stream.num, stream.request);
    }

    unsafe fn arm(&mut self, buffer: *mut W, len: usize) {
        let regs = self.stream.regs();
        match self.target {
            vals::Ct::MEMORY0 => regs.m0ar().write_value(buffer as u32),
            _ => regs.m1ar().write_value(buffer as u32),
        }

        // NDTR is shared and reloaded by hardware, so it is only written
        // before the stream starts.
        if !regs.cr().read().en() {
            regs.ndtr().write(|w| w.set_ndt((len * W::ITEMS_PER_WORD) as u16));
        }
    }

    fn start(&mut self) {
        let stream = &self.stream;
        stream.clear_flags();
        stream.regs().cr().modify(|w| {
            w.set_ct(vals::Ct::MEMORY0);
            w.set_en(true);
        });
    }

    fn completion_signal(&mut self) -> bool {
        let stream = &self.stream;
        // The stream is now on the other target, so this one is done.
        if stream.transfer_complete() && stream.regs().cr().read().ct() != self.target {
            stream
                .dma
                .ifcr(stream.num / 4)
                .write(|w| w.set_tcif(stream.num % 4, true));
            true
        } else {
            false
        }
    }
}
