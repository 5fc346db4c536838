//! Auto-advance countdown.
//!
//! At most one countdown is live per timer. Starting a new one replaces the
//! previous countdown and hands out a fresh [`TimerToken`]; completion reports
//! the token so a consumer can discard expiries from a replaced countdown.

use log::{debug, trace};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

impl TimerToken {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

pub trait CountdownTimer: Send {
    fn start(&mut self, duration: Duration) -> TimerToken;
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
}

#[derive(Debug)]
enum TimerCommand {
    Start(TimerToken, Duration),
    Pause,
    Resume,
    Stop,
    Shutdown,
}

/// Wall-clock countdown running on its own thread. Expiry invokes the
/// callback given to [`ThreadTimer::spawn`] from that thread.
pub struct ThreadTimer {
    next_token: u64,
    cmd_tx: Sender<TimerCommand>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadTimer {
    pub fn spawn(on_elapsed: impl Fn(TimerToken) + Send + 'static) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let worker = thread::spawn(move || timer_loop(cmd_rx, on_elapsed));
        Self {
            next_token: 0,
            cmd_tx,
            worker: Some(worker),
        }
    }

    fn send(&self, command: TimerCommand) {
        if self.cmd_tx.send(command).is_err() {
            debug!("timer worker is gone");
        }
    }
}

impl CountdownTimer for ThreadTimer {
    fn start(&mut self, duration: Duration) -> TimerToken {
        self.next_token += 1;
        let token = TimerToken(self.next_token);
        self.send(TimerCommand::Start(token, duration));
        token
    }

    fn pause(&mut self) {
        self.send(TimerCommand::Pause);
    }

    fn resume(&mut self) {
        self.send(TimerCommand::Resume);
    }

    fn stop(&mut self) {
        self.send(TimerCommand::Stop);
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.send(TimerCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[derive(Debug)]
struct Countdown {
    token: TimerToken,
    remaining: Duration,
    running_since: Option<Instant>,
}

impl Countdown {
    fn deadline(&self) -> Option<Instant> {
        self.running_since.map(|since| since + self.remaining)
    }

    fn pause(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.remaining = self.remaining.saturating_sub(since.elapsed());
        }
    }

    fn resume(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }
}

fn timer_loop(cmd_rx: Receiver<TimerCommand>, on_elapsed: impl Fn(TimerToken)) {
    let mut countdown: Option<Countdown> = None;

    loop {
        let deadline = countdown.as_ref().and_then(Countdown::deadline);
        let command = match deadline {
            Some(deadline) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                match cmd_rx.recv_timeout(wait) {
                    Ok(command) => command,
                    Err(RecvTimeoutError::Timeout) => {
                        if let Some(expired) = countdown.take() {
                            trace!("countdown {:?} elapsed", expired.token);
                            on_elapsed(expired.token);
                        }
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }
            None => match cmd_rx.recv() {
                Ok(command) => command,
                Err(_) => return,
            },
        };

        match command {
            TimerCommand::Start(token, duration) => {
                countdown = Some(Countdown {
                    token,
                    remaining: duration,
                    running_since: Some(Instant::now()),
                });
            }
            TimerCommand::Pause => {
                if let Some(active) = countdown.as_mut() {
                    active.pause();
                }
            }
            TimerCommand::Resume => {
                if let Some(active) = countdown.as_mut() {
                    active.resume();
                }
            }
            TimerCommand::Stop => countdown = None,
            TimerCommand::Shutdown => return,
        }
    }
}
