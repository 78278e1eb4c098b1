use core::cell::RefCell;

use pretty_assertions::assert_eq;

use super::*;

const HALF_LEN: usize = 4;

#[derive(Default)]
struct SimChannelState {
    next: Option<usize>,
    armed: Option<(*mut u32, usize)>,
    pending: bool,
}

/// Stand-in for the DMA controller: one active channel at a time, chained
/// starts, and a completion flag per channel.
#[derive(Default)]
struct SimBus {
    channels: [SimChannelState; 2],
    active: Option<usize>,
    transmitted: Vec<(usize, Vec<u32>)>,
}

impl SimBus {
    /// Runs the active transfer to its end: the words leave the buffer, the
    /// channel raises its flag and the chained channel takes over.
    fn finish_transfer(&mut self) -> usize {
        let id = self.active.expect("no channel running");
        let (ptr, len) = self.channels[id].armed.expect("channel started unarmed");
        let words = unsafe { core::slice::from_raw_parts(ptr, len) }.to_vec();

        self.transmitted.push((id, words));
        self.channels[id].pending = true;
        self.active = self.channels[id].next;
        id
    }
}

struct SimChannel<'a> {
    id: usize,
    bus: &'a RefCell<SimBus>,
}

unsafe impl TransferChannel for SimChannel<'_> {
    type Word = u32;

    fn configure(&mut self, next: &Self) {
        self.bus.borrow_mut().channels[self.id].next = Some(next.id);
    }

    unsafe fn arm(&mut self, buffer: *mut u32, len: usize) {
        self.bus.borrow_mut().channels[self.id].armed = Some((buffer, len));
    }

    fn start(&mut self) {
        self.bus.borrow_mut().active = Some(self.id);
    }

    fn completion_signal(&mut self) -> bool {
        core::mem::take(&mut self.bus.borrow_mut().channels[self.id].pending)
    }
}

macro_rules! setup_engine {
    ($bus:ident, $engine:ident) => {
        let $bus = RefCell::new(SimBus::default());
        let mut buffer_a = [0u32; HALF_LEN];
        let mut buffer_b = [0u32; HALF_LEN];
        let mut $engine = DoubleBufferEngine::init(
            &mut buffer_a,
            &mut buffer_b,
            [SimChannel { id: 0, bus: &$bus }, SimChannel { id: 1, bus: &$bus }],
        );
    };
}

#[test]
fn init_chains_the_channels_into_a_loop() {
    setup_engine!(bus, engine);

    assert!(!engine.is_running());
    assert_eq!(bus.borrow().channels[0].next, Some(1));
    assert_eq!(bus.borrow().channels[1].next, Some(0));
}

#[test]
fn nothing_is_serviced_before_start() {
    setup_engine!(bus, engine);

    bus.borrow_mut().channels[0].pending = true;
    assert!(engine.on_interrupt().is_none());
    assert_eq!(engine.expected_next(), Err(DmaError::NotStarted));
}

#[test]
fn starting_twice_is_rejected() {
    setup_engine!(bus, engine);

    assert_eq!(engine.start(), Ok(()));
    assert_eq!(engine.start(), Err(DmaError::AlreadyStarted));
    assert_eq!(bus.borrow().active, Some(0));
    assert!(engine.with_buffers(|_, _| ()).is_err());
}

#[test]
fn completions_alternate_between_the_halves() {
    setup_engine!(bus, engine);
    engine.start().unwrap();

    let mut order = Vec::new();
    for _ in 0..6 {
        bus.borrow_mut().finish_transfer();
        let completion = engine.on_interrupt().expect("completion pending");
        order.push(completion.half());
    }

    assert_eq!(order, vec![Half::A, Half::B, Half::A, Half::B, Half::A, Half::B]);
    assert_eq!(engine.desyncs(), 0);
    assert!(engine.on_interrupt().is_none());
}

#[test]
fn serviced_buffer_is_never_the_one_in_flight() {
    setup_engine!(bus, engine);
    engine.start().unwrap();

    for _ in 0..4 {
        let finished = bus.borrow_mut().finish_transfer();
        let mut completion = engine.on_interrupt().unwrap();
        let serviced = completion.buffer().as_mut_ptr();

        let bus = bus.borrow();
        let in_flight = bus.active.unwrap();
        assert_ne!(in_flight, finished);
        assert_ne!(bus.channels[in_flight].armed.unwrap().0, serviced);
    }
}

#[test]
fn refilled_data_goes_out_on_the_next_pass_of_that_half() {
    setup_engine!(bus, engine);
    engine
        .with_buffers(|a, b| {
            a.fill(1);
            b.fill(2);
        })
        .unwrap();
    engine.start().unwrap();

    for value in 10..14 {
        bus.borrow_mut().finish_transfer();
        let mut completion = engine.on_interrupt().unwrap();
        completion.buffer().fill(value);
    }
    bus.borrow_mut().finish_transfer();
    bus.borrow_mut().finish_transfer();

    let transmitted = bus.borrow().transmitted.clone();
    let firsts: Vec<(usize, u32)> = transmitted.iter().map(|(id, words)| (*id, words[0])).collect();
    assert_eq!(firsts, vec![(0, 1), (1, 2), (0, 10), (1, 11), (0, 12), (1, 13)]);
    assert!(transmitted.iter().all(|(_, words)| words.len() == HALF_LEN));
}

#[test]
fn backlogged_completions_are_drained_in_order() {
    setup_engine!(bus, engine);
    engine.start().unwrap();

    bus.borrow_mut().finish_transfer();
    bus.borrow_mut().finish_transfer();

    assert_eq!(engine.on_interrupt().map(|c| c.half()), Some(Half::A));
    assert_eq!(engine.on_interrupt().map(|c| c.half()), Some(Half::B));
    assert_eq!(engine.desyncs(), 0);
}

#[test]
fn out_of_order_completion_is_serviced_and_counted() {
    setup_engine!(bus, engine);
    engine.start().unwrap();

    bus.borrow_mut().channels[1].pending = true;

    assert_eq!(engine.on_interrupt().map(|c| c.half()), Some(Half::B));
    assert_eq!(engine.desyncs(), 1);
    assert_eq!(engine.expected_next(), Ok(Half::A));
}
