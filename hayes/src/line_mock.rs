//! Scripted serial line and virtual clock used by the unit tests.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
    sync::Once,
    vec::Vec,
};

use embedded_hal::delay::DelayNs;
use embedded_io::{ErrorType, Read, ReadReady, Write};
use env_logger::Env;

static INIT: Once = Once::new();

pub fn setup_log() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("trace"))
            .is_test(true)
            .init();
    });
}

/// Delay source that only advances a shared counter.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now_us: Rc<Cell<u64>>,
}

impl VirtualClock {
    pub fn now_us(&self) -> u64 {
        self.now_us.get()
    }

    fn advance(&self, us: u64) {
        self.now_us.set(self.now_us.get() + us);
    }
}

impl DelayNs for VirtualClock {
    fn delay_ns(&mut self, ns: u32) {
        self.advance(u64::from(ns).div_ceil(1000));
    }

    fn delay_us(&mut self, us: u32) {
        self.advance(u64::from(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(u64::from(ms) * 1000);
    }
}

struct Exchange {
    command: Vec<u8>,
    reply: Vec<u8>,
}

#[derive(Default)]
struct LineState {
    /// Bytes on their way to the host, with the time they become readable.
    rx: VecDeque<(u64, u8)>,
    /// Everything the host wrote.
    tx: Vec<u8>,
    /// Host bytes written since the last completed exchange.
    pending: Vec<u8>,
    script: VecDeque<Exchange>,
}

/// A serial line answering host commands from a script.
///
/// Each scripted exchange waits for its command to show up in the host
/// output, then makes its reply readable. Exchanges complete strictly in
/// the order they were added. Clones share the same line, so a test can keep
/// one to inspect the traffic after handing the other to a [`Modem`].
///
/// [`Modem`]: crate::Modem
#[derive(Clone)]
pub struct ScriptedLine {
    state: Rc<RefCell<LineState>>,
    clock: VirtualClock,
}

impl ScriptedLine {
    pub fn new(clock: VirtualClock) -> Self {
        Self {
            state: Rc::default(),
            clock,
        }
    }

    /// Reply with `reply` once the host has written `command`.
    pub fn expect(&self, command: &[u8], reply: &[u8]) -> &Self {
        self.state.borrow_mut().script.push_back(Exchange {
            command: command.to_vec(),
            reply: reply.to_vec(),
        });
        self
    }

    /// Wait for `command` without ever answering it.
    pub fn expect_silence(&self, command: &[u8]) -> &Self {
        self.expect(command, b"")
    }

    /// Make `bytes` readable right away.
    pub fn push_rx(&self, bytes: &[u8]) {
        self.push_rx_after(0, bytes);
    }

    /// Make `bytes` readable `delay_us` from now.
    pub fn push_rx_after(&self, delay_us: u64, bytes: &[u8]) {
        let at = self.clock.now_us() + delay_us;
        self.state
            .borrow_mut()
            .rx
            .extend(bytes.iter().map(|&b| (at, b)));
    }

    pub fn written(&self) -> Vec<u8> {
        self.state.borrow().tx.clone()
    }

    pub fn written_str(&self) -> String {
        String::from_utf8_lossy(&self.state.borrow().tx).into_owned()
    }

    /// Bytes still waiting to be read, whether already readable or not.
    pub fn pending_rx(&self) -> usize {
        self.state.borrow().rx.len()
    }

    /// Scripted exchanges whose command never arrived.
    pub fn unfinished(&self) -> usize {
        self.state.borrow().script.len()
    }
}

impl ErrorType for ScriptedLine {
    type Error = core::convert::Infallible;
}

impl ReadReady for ScriptedLine {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        let now = self.clock.now_us();
        Ok(self
            .state
            .borrow()
            .rx
            .front()
            .is_some_and(|&(at, _)| at <= now))
    }
}

impl Read for ScriptedLine {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let now = self.clock.now_us();
        let mut state = self.state.borrow_mut();
        let mut count = 0;
        while count < buf.len() {
            match state.rx.front() {
                Some(&(at, byte)) if at <= now => {
                    buf[count] = byte;
                    state.rx.pop_front();
                    count += 1;
                }
                _ => break,
            }
        }
        Ok(count)
    }
}

impl Write for ScriptedLine {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let now = self.clock.now_us();
        let mut state = self.state.borrow_mut();
        for &byte in buf {
            state.tx.push(byte);
            state.pending.push(byte);

            let complete = state
                .script
                .front()
                .is_some_and(|exchange| state.pending.ends_with(&exchange.command));
            if complete {
                if let Some(exchange) = state.script.pop_front() {
                    state.rx.extend(exchange.reply.iter().map(|&b| (now, b)));
                }
                state.pending.clear();
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
