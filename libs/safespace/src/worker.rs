//! The producer side: a blocking line reader on its own thread, handing
//! parsed samples to the consumer over a bounded channel.

use std::{
    io::{self, BufRead, BufReader, Read},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use flume::{SendTimeoutError, Sender};
use tracing::{debug, error, info, trace, warn};

use crate::{Error, Sample, SerialConfig, decode_line, parse_line};

/// Back-off after an empty or timed-out read.
pub const IDLE_BACKOFF: Duration = Duration::from_millis(10);
pub const CHANNEL_CAPACITY: usize = 64;
/// Lines longer than this are dropped unparsed.
pub const MAX_LINE_LEN: usize = 4096;
/// Extra time `join` allows past the longest blocking call of the source.
pub const JOIN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Sample(Sample),
    /// The transport failed; no further events follow.
    Failed(String),
    /// The input ended (replay sources only).
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfInput {
    Finish,
    Wait,
}

#[derive(Debug, Clone, Copy)]
pub struct PumpOptions {
    pub end_of_input: EndOfInput,
    /// Delay after each forwarded sample, used to pace replays.
    pub pacing: Option<Duration>,
}

impl Default for PumpOptions {
    fn default() -> Self {
        Self {
            end_of_input: EndOfInput::Wait,
            pacing: None,
        }
    }
}

pub fn channel() -> (Sender<Event>, flume::Receiver<Event>) {
    flume::bounded(CHANNEL_CAPACITY)
}

pub fn open_port(config: &SerialConfig) -> Result<Box<dyn serialport::SerialPort>, Error> {
    serialport::new(&config.port, config.baud_rate)
        .timeout(config.timeout())
        .open()
        .map_err(|source| Error::SerialOpen {
            port: config.port.clone(),
            source,
        })
}

/// Reads lines from `reader` until `stop` is set, the consumer goes away,
/// the input ends or the transport fails.
pub fn pump<R: BufRead>(mut reader: R, tx: &Sender<Event>, stop: &AtomicBool, opts: PumpOptions) {
    let mut buf = Vec::with_capacity(256);
    // set while skipping the tail of an oversized line
    let mut discard = false;
    while !stop.load(Ordering::Relaxed) {
        let room = (MAX_LINE_LEN + 1).saturating_sub(buf.len()) as u64;
        match (&mut reader).take(room).read_until(b'\n', &mut buf) {
            Ok(0) if buf.is_empty() => match opts.end_of_input {
                EndOfInput::Finish => {
                    debug!("end of input");
                    forward(tx, stop, Event::Finished);
                    return;
                }
                EndOfInput::Wait => {
                    thread::sleep(IDLE_BACKOFF);
                    continue;
                }
            },
            Ok(_) if buf.len() > MAX_LINE_LEN && buf.last() != Some(&b'\n') => {
                trace!(len = buf.len(), "dropping oversized line");
                buf.clear();
                discard = true;
                continue;
            }
            Ok(_) => {}
            // a partial line stays in `buf` and is completed by the next read
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                ) =>
            {
                thread::sleep(IDLE_BACKOFF);
                continue;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                error!(?err, "serial connection lost");
                forward(tx, stop, Event::Failed(format!("serial connection lost: {err}")));
                return;
            }
        }
        if discard {
            discard = false;
            buf.clear();
            continue;
        }
        let line = decode_line(&buf);
        buf.clear();
        if line.is_empty() {
            thread::sleep(IDLE_BACKOFF);
            continue;
        }
        debug!(%line, "raw");
        let Some(sample) = parse_line(&line) else {
            trace!(%line, "dropping unrecognized line");
            continue;
        };
        if !forward(tx, stop, Event::Sample(sample)) {
            return;
        }
        if let Some(pacing) = opts.pacing {
            thread::sleep(pacing);
        }
    }
    debug!("stop requested");
}

fn forward(tx: &Sender<Event>, stop: &AtomicBool, mut event: Event) -> bool {
    loop {
        match tx.send_timeout(event, IDLE_BACKOFF) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(e)) => {
                if stop.load(Ordering::Relaxed) {
                    return false;
                }
                event = e;
            }
            Err(SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}

/// Handle to the reader thread.
pub struct Worker {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    /// How long `join` waits for the thread to notice the stop flag.
    grace: Duration,
}

impl Worker {
    /// Opens the serial port on the reader thread. An open failure is
    /// reported as [`Event::Failed`].
    pub fn serial(
        config: SerialConfig,
        tx: Sender<Event>,
        stop: Arc<AtomicBool>,
    ) -> Result<Self, Error> {
        let grace = config.timeout() + JOIN_GRACE;
        Self::spawn("serial-reader", stop, grace, move |stop| {
            let port = match open_port(&config) {
                Ok(port) => port,
                Err(err) => {
                    error!(%err, "failed to open serial port");
                    forward(&tx, stop, Event::Failed(err.to_string()));
                    return;
                }
            };
            info!(port = %config.port, baud = config.baud_rate, "serial port opened");
            pump(BufReader::new(port), &tx, stop, PumpOptions::default());
            info!(port = %config.port, "serial reader stopped");
        })
    }

    /// Feeds a recorded stream through the same path as a live port.
    ///
    /// The reader may block indefinitely (stdin), so [`Worker::join`] gives
    /// up on it after the pacing delay plus [`JOIN_GRACE`].
    pub fn replay<R: BufRead + Send + 'static>(
        reader: R,
        pacing: Option<Duration>,
        tx: Sender<Event>,
        stop: Arc<AtomicBool>,
    ) -> Result<Self, Error> {
        let grace = pacing.unwrap_or_default() + JOIN_GRACE;
        Self::spawn("replay-reader", stop, grace, move |stop| {
            let opts = PumpOptions {
                end_of_input: EndOfInput::Finish,
                pacing,
            };
            pump(reader, &tx, stop, opts);
        })
    }

    fn spawn(
        name: &str,
        stop: Arc<AtomicBool>,
        grace: Duration,
        f: impl FnOnce(&AtomicBool) + Send + 'static,
    ) -> Result<Self, Error> {
        let thread_stop = stop.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || f(&thread_stop))?;
        Ok(Self {
            stop,
            handle,
            grace,
        })
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Requests a stop and waits up to the worker's grace period for the
    /// thread to release its input.
    ///
    /// Returns `false` if the thread is still blocked in a read; it is then
    /// detached and exits with the process.
    pub fn join(self) -> bool {
        let grace = self.grace;
        self.join_timeout(grace)
    }

    pub fn join_timeout(self, timeout: Duration) -> bool {
        self.stop();
        let deadline = Instant::now() + timeout;
        while !self.handle.is_finished() {
            if Instant::now() >= deadline {
                warn!(?timeout, "reader thread did not stop in time");
                return false;
            }
            thread::sleep(IDLE_BACKOFF);
        }
        if self.handle.join().is_err() {
            warn!("reader thread panicked");
        }
        true
    }
}
