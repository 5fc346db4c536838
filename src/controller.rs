//! Serializes everything that drives the engine.
//!
//! User commands, countdown expiry and connection changes all arrive on one
//! channel and are applied in order by a single worker thread that owns the
//! [`PlaybackEngine`].

use crate::alerts::AlertSink;
use crate::cache::FileCache;
use crate::config::Settings;
use crate::device::{ConnectionState, DeviceDispatcher};
use crate::engine::{PlaybackEngine, PlaybackEvent};
use crate::model::{SidTimerPolicy, StorageTarget, TypeFilter};
use crate::state::PlaybackState;
use crate::timer::{ThreadTimer, TimerToken};
use anyhow::Context;
use log::{debug, trace};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug)]
pub enum PlayerCommand {
    LaunchPath(String),
    LaunchRandom,
    Next,
    Previous,
    TogglePlay,
    Stop,
    SearchMode(String),
    DirectoryMode(String),
    RandomMode(String),
    SetFilter(TypeFilter),
    SetPlayTimer(Option<Duration>),
    SetSidTimerPolicy(SidTimerPolicy),
    SetStorage(StorageTarget),
    ConnectionChanged(ConnectionState),
    TimerElapsed(TimerToken),
    Snapshot(Sender<Arc<PlaybackState>>),
    Shutdown,
}

pub struct PlayerController {
    cmd_tx: Sender<PlayerCommand>,
    event_rx: Option<Receiver<PlaybackEvent>>,
    worker: Option<JoinHandle<()>>,
}

impl PlayerController {
    /// Builds the engine around a [`ThreadTimer`] whose expiries are queued
    /// behind any pending commands.
    pub fn start(
        settings: Settings,
        device: Box<dyn DeviceDispatcher>,
        cache: Box<dyn FileCache>,
        alerts: Box<dyn AlertSink>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        let timer_tx = cmd_tx.clone();
        let timer = ThreadTimer::spawn(move |token| {
            let _ = timer_tx.send(PlayerCommand::TimerElapsed(token));
        });
        let engine = PlaybackEngine::new(settings, device, cache, Box::new(timer), alerts);

        let worker = thread::spawn(move || engine_loop(engine, cmd_rx, event_tx));

        Self {
            cmd_tx,
            event_rx: Some(event_rx),
            worker: Some(worker),
        }
    }

    pub fn send(&self, command: PlayerCommand) -> anyhow::Result<()> {
        self.cmd_tx
            .send(command)
            .map_err(|_| anyhow::anyhow!("player worker has stopped"))
    }

    /// A sender for sources outside the command loop, such as a connection
    /// monitor.
    pub fn sender(&self) -> Sender<PlayerCommand> {
        self.cmd_tx.clone()
    }

    pub fn state(&self) -> anyhow::Result<Arc<PlaybackState>> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.send(PlayerCommand::Snapshot(reply_tx))?;
        reply_rx.recv().context("player worker dropped the snapshot request")
    }

    /// Hands the event stream to the caller. Later calls return `None`.
    pub fn take_event_receiver(&mut self) -> Option<Receiver<PlaybackEvent>> {
        self.event_rx.take()
    }

    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<PlaybackEvent> {
        self.event_rx.as_ref()?.recv_timeout(timeout).ok()
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(PlayerCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn engine_loop(
    mut engine: PlaybackEngine,
    cmd_rx: Receiver<PlayerCommand>,
    event_tx: Sender<PlaybackEvent>,
) {
    while let Ok(command) = cmd_rx.recv() {
        trace!("applying {command:?}");
        match command {
            PlayerCommand::LaunchPath(path) => engine.launch_path(&path),
            PlayerCommand::LaunchRandom => engine.launch_random(),
            PlayerCommand::Next => engine.advance_next(),
            PlayerCommand::Previous => engine.advance_previous(),
            PlayerCommand::TogglePlay => engine.toggle_play(),
            PlayerCommand::Stop => engine.stop_stream(),
            PlayerCommand::SearchMode(query) => engine.set_search_mode(&query),
            PlayerCommand::DirectoryMode(path) => engine.set_directory_mode(&path),
            PlayerCommand::RandomMode(scope) => engine.set_random_mode(&scope),
            PlayerCommand::SetFilter(filter) => engine.set_type_filter(filter),
            PlayerCommand::SetPlayTimer(timer) => engine.set_play_timer(timer),
            PlayerCommand::SetSidTimerPolicy(policy) => engine.set_sid_timer_policy(policy),
            PlayerCommand::SetStorage(storage) => engine.set_storage_target(storage),
            PlayerCommand::ConnectionChanged(state) => engine.handle_connection_state(state),
            PlayerCommand::TimerElapsed(token) => engine.handle_timer_elapsed(token),
            PlayerCommand::Snapshot(reply) => {
                let _ = reply.send(engine.state());
            }
            PlayerCommand::Shutdown => break,
        }

        for event in engine.take_events() {
            if event_tx.send(event).is_err() {
                trace!("no event listener");
            }
        }
    }
    debug!("player worker exiting");
}
