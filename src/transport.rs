//! Serial transport abstraction and bounded-wait primitives
//!
//! Each sensor channel exclusively owns one [`SerialPort`]. Concrete
//! implementations wrap the platform UART (baud rate, framing and pins
//! are fixed at construction); the trait only covers what the
//! acquisition core needs.
//!
//! All blocking waits go through the reusable timeout primitives in this
//! module instead of inlined spin loops, so the state machine's error
//! paths stay uniform: a wait either yields data or [`ReadError::Timeout`],
//! never hangs. None of the waits are cancellable mid-flight; the timeout
//! is the only exit.

use crate::{
    errors::{ReadError, ReadResult},
    time::{elapsed, Clock, Timestamp},
};

/// One line-delimited sensor reply.
pub type LineBuf = heapless::String<128>;

/// Exclusive handle to one sensor's serial link.
///
/// `open` re-establishes the link with the configuration the port was
/// constructed with; the core calls it from the initialization path
/// after a teardown.
pub trait SerialPort {
    /// (Re)open the link. Returns `false` if the platform refuses.
    fn open(&mut self) -> bool;

    /// Tear the link down. Reopened by the next initialization attempt.
    fn close(&mut self);

    /// Send raw bytes to the sensor.
    fn write(&mut self, bytes: &[u8]);

    /// Whether at least one byte is waiting to be read.
    fn available(&self) -> bool;

    /// Read buffered bytes up to the terminator (terminator consumed,
    /// not included). May return a partial line if the peer stalls.
    fn read_line(&mut self, terminator: u8) -> Option<LineBuf>;

    /// Read up to `buf.len()` buffered bytes, returning how many were
    /// copied.
    fn read_bytes(&mut self, buf: &mut [u8]) -> usize;

    /// Read a single buffered byte.
    fn read_byte(&mut self) -> Option<u8>;

    /// Discard anything buffered on the link.
    fn flush(&mut self);
}

/// Block until a line arrives or the timeout elapses.
///
/// This is the single read-with-timeout primitive every poll, probe and
/// calibration step goes through.
pub fn read_line_with_timeout<P, C>(
    port: &mut P,
    clock: &C,
    terminator: u8,
    timeout_ms: u64,
) -> ReadResult<LineBuf>
where
    P: SerialPort,
    C: Clock,
{
    wait_available(port, clock, timeout_ms)?;
    port.read_line(terminator).ok_or(ReadError::Timeout)
}

/// Block until `buf` is completely filled or the timeout elapses.
///
/// Used for the particulate sensor's fixed-length vendor frames.
pub fn read_exact_with_timeout<P, C>(
    port: &mut P,
    clock: &C,
    buf: &mut [u8],
    timeout_ms: u64,
) -> ReadResult<()>
where
    P: SerialPort,
    C: Clock,
{
    let start = clock.now();
    let mut filled = 0;
    while filled < buf.len() {
        if port.available() {
            filled += port.read_bytes(&mut buf[filled..]);
        } else if elapsed(start, clock.now()) >= timeout_ms {
            return Err(ReadError::Timeout);
        }
    }
    Ok(())
}

fn wait_available<P, C>(port: &mut P, clock: &C, timeout_ms: u64) -> ReadResult<()>
where
    P: SerialPort,
    C: Clock,
{
    let start: Timestamp = clock.now();
    while !port.available() {
        if elapsed(start, clock.now()) >= timeout_ms {
            return Err(ReadError::Timeout);
        }
    }
    Ok(())
}

/// Scripted serial port for tests.
///
/// Replies are scripted in write order: each `write` consumes the next
/// script entry and, unless it is a silence, appends its bytes to the
/// read buffer. Bytes can also be preloaded directly for sensors that
/// stream without being polled. While the read buffer is empty,
/// `available()` advances the shared test clock so bounded waits time
/// out deterministically instead of spinning forever.
#[cfg(feature = "std")]
pub struct ScriptedPort {
    clock: crate::time::SharedClock,
    poll_step_ms: u64,
    replies: std::collections::VecDeque<Option<Vec<u8>>>,
    inbox: std::collections::VecDeque<u8>,
    writes: Vec<Vec<u8>>,
    opened: bool,
    opens: u32,
    closes: u32,
}

#[cfg(feature = "std")]
impl ScriptedPort {
    /// Create a port driving the given shared test clock.
    pub fn new(clock: crate::time::SharedClock) -> Self {
        Self {
            clock,
            poll_step_ms: 100,
            replies: std::collections::VecDeque::new(),
            inbox: std::collections::VecDeque::new(),
            writes: Vec::new(),
            opened: false,
            opens: 0,
            closes: 0,
        }
    }

    /// Script a reply for the next unanswered write.
    pub fn enqueue_reply(&mut self, bytes: &[u8]) {
        self.replies.push_back(Some(bytes.to_vec()));
    }

    /// Script a timeout for the next unanswered write.
    pub fn enqueue_silence(&mut self) {
        self.replies.push_back(None);
    }

    /// Make bytes readable immediately without a triggering write.
    pub fn preload(&mut self, bytes: &[u8]) {
        self.inbox.extend(bytes);
    }

    /// Everything the core has written, in order.
    pub fn written(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// How many times the link was opened.
    pub fn open_count(&self) -> u32 {
        self.opens
    }

    /// How many times the link was torn down.
    pub fn close_count(&self) -> u32 {
        self.closes
    }
}

#[cfg(feature = "std")]
impl SerialPort for ScriptedPort {
    fn open(&mut self) -> bool {
        self.opened = true;
        self.opens += 1;
        true
    }

    fn close(&mut self) {
        self.opened = false;
        self.closes += 1;
        self.inbox.clear();
    }

    fn write(&mut self, bytes: &[u8]) {
        self.writes.push(bytes.to_vec());
        if let Some(reply) = self.replies.pop_front().flatten() {
            self.inbox.extend(reply);
        }
    }

    fn available(&self) -> bool {
        if self.inbox.is_empty() {
            // Nothing will arrive until the next scripted write; burn
            // simulated time so the caller's bounded wait can expire.
            self.clock.advance(self.poll_step_ms);
            false
        } else {
            true
        }
    }

    fn read_line(&mut self, terminator: u8) -> Option<LineBuf> {
        if self.inbox.is_empty() {
            return None;
        }
        let mut line = LineBuf::new();
        while let Some(byte) = self.inbox.pop_front() {
            if byte == terminator {
                break;
            }
            let _ = line.push(byte as char);
        }
        Some(line)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        let mut count = 0;
        for slot in buf.iter_mut() {
            match self.inbox.pop_front() {
                Some(byte) => {
                    *slot = byte;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.inbox.pop_front()
    }

    fn flush(&mut self) {
        self.inbox.clear();
    }
}
