//! Mock device channel for testing and development.
//!
//! This module provides a scripted channel that plays back records and
//! faults in order and keeps a log of every open, close and read, so tests
//! can check that each cycle reads from a freshly opened handle.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{HardwareError, Result};
use crate::traits::DeviceChannel;

/// What the next read of a [`MockChannel`] returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockRecord {
    /// A record; a trailing newline is added when returned.
    Line(String),
    /// An I/O failure of the given kind.
    Error(io::ErrorKind),
}

/// Entry in the channel's activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A handle was opened. Generations count up from 1.
    Opened { generation: u64 },
    /// An open attempt failed.
    OpenFailed,
    /// The open handle was released.
    Closed,
    /// A read was served from the handle of this generation.
    Read { generation: u64 },
    /// The channel was torn down.
    Invalidated,
}

#[derive(Debug)]
struct MockState {
    script: VecDeque<MockRecord>,
    repeat: Option<MockRecord>,
    open: bool,
    invalidated: bool,
    generation: u64,
    failed_opens: usize,
    events: Vec<ChannelEvent>,
}

impl MockState {
    fn next_record(&mut self) -> Option<MockRecord> {
        self.script.pop_front().or_else(|| self.repeat.clone())
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock device channel.
///
/// The channel starts open (generation 1). Records queued through the
/// [`MockChannelHandle`] are returned one per read; once the queue is empty
/// the record set with [`MockChannelHandle::repeat_line`] is returned
/// forever, or a fault if none was set.
///
/// # Examples
///
/// ```
/// use sensord_hardware::DeviceChannel;
/// use sensord_hardware::mock::MockChannel;
///
/// #[tokio::main]
/// async fn main() -> sensord_hardware::Result<()> {
///     let (mut channel, handle) = MockChannel::new("/sys/class/hwmon/hwmon0/in1_input");
///     handle.push_line("45000");
///     handle.push_line("abc");
///
///     assert_eq!(channel.read_record().await?, "45000\n");
///     assert_eq!(channel.read_record().await?, "abc\n");
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockChannel {
    path: PathBuf,
    state: Arc<Mutex<MockState>>,
}

impl MockChannel {
    pub fn new(path: impl Into<PathBuf>) -> (Self, MockChannelHandle) {
        let state = Arc::new(Mutex::new(MockState {
            script: VecDeque::new(),
            repeat: None,
            open: true,
            invalidated: false,
            generation: 1,
            failed_opens: 0,
            events: vec![ChannelEvent::Opened { generation: 1 }],
        }));

        let channel = Self {
            path: path.into(),
            state: Arc::clone(&state),
        };

        (channel, MockChannelHandle { state })
    }

    fn device(&self) -> String {
        self.path.display().to_string()
    }
}

impl DeviceChannel for MockChannel {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&mut self) -> Result<()> {
        let mut state = lock(&self.state);

        if state.invalidated {
            return Err(HardwareError::invalidated(self.device()));
        }

        if state.failed_opens > 0 {
            state.failed_opens -= 1;
            state.open = false;
            state.events.push(ChannelEvent::OpenFailed);
            return Err(io::Error::from(io::ErrorKind::NotFound).into());
        }

        state.generation += 1;
        state.open = true;
        let generation = state.generation;
        state.events.push(ChannelEvent::Opened { generation });
        Ok(())
    }

    async fn read_record(&mut self) -> Result<String> {
        let mut state = lock(&self.state);

        if state.invalidated {
            return Err(HardwareError::invalidated(self.device()));
        }
        if !state.open {
            return Err(HardwareError::disconnected(self.device()));
        }

        let generation = state.generation;
        state.events.push(ChannelEvent::Read { generation });

        match state.next_record() {
            Some(MockRecord::Line(line)) => Ok(format!("{}\n", line)),
            Some(MockRecord::Error(kind)) => Err(io::Error::from(kind).into()),
            None => Err(HardwareError::other("no record scripted")),
        }
    }

    fn close(&mut self) {
        let mut state = lock(&self.state);
        if state.open {
            state.open = false;
            state.events.push(ChannelEvent::Closed);
        }
    }

    fn invalidate(&mut self) {
        let mut state = lock(&self.state);
        state.open = false;
        state.invalidated = true;
        state.events.push(ChannelEvent::Invalidated);
    }

    fn is_open(&self) -> bool {
        lock(&self.state).open
    }
}

/// Handle for scripting and inspecting a mock channel.
///
/// It can be cloned and shared across tasks.
#[derive(Debug, Clone)]
pub struct MockChannelHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockChannelHandle {
    /// Queue a record for a later read.
    pub fn push_line(&self, line: impl Into<String>) {
        lock(&self.state)
            .script
            .push_back(MockRecord::Line(line.into()));
    }

    /// Queue an I/O failure for a later read.
    pub fn push_error(&self, kind: io::ErrorKind) {
        lock(&self.state).script.push_back(MockRecord::Error(kind));
    }

    /// Record returned whenever the queue is empty.
    pub fn repeat_line(&self, line: impl Into<String>) {
        lock(&self.state).repeat = Some(MockRecord::Line(line.into()));
    }

    /// I/O failure returned whenever the queue is empty.
    pub fn repeat_error(&self, kind: io::ErrorKind) {
        lock(&self.state).repeat = Some(MockRecord::Error(kind));
    }

    /// Make the next `count` open attempts fail.
    pub fn fail_opens(&self, count: usize) {
        lock(&self.state).failed_opens = count;
    }

    /// Tear the channel down from outside, as a destructor would.
    pub fn invalidate(&self) {
        let mut state = lock(&self.state);
        state.open = false;
        state.invalidated = true;
        state.events.push(ChannelEvent::Invalidated);
    }

    /// Activity log, oldest first.
    pub fn events(&self) -> Vec<ChannelEvent> {
        lock(&self.state).events.clone()
    }

    /// Number of reads served so far.
    pub fn read_count(&self) -> usize {
        lock(&self.state)
            .events
            .iter()
            .filter(|e| matches!(e, ChannelEvent::Read { .. }))
            .count()
    }

    pub fn is_open(&self) -> bool {
        lock(&self.state).open
    }

    pub fn is_invalidated(&self) -> bool {
        lock(&self.state).invalidated
    }
}
