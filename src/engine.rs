//! Playback navigation: which file is current, what comes next or before it
//! under the active mode and filter, and what happens when the cartridge
//! refuses a file.

use crate::alerts::AlertSink;
use crate::cache::FileCache;
use crate::config::Settings;
use crate::device::{ConnectionState, DeviceDispatcher};
use crate::error::PlaybackFault;
use crate::history::PlaybackHistory;
use crate::model::{
    FileType, Item, NavigationMode, PlayState, SidTimerPolicy, StorageTarget, TypeFilter,
};
use crate::state::PlaybackState;
use crate::timer::{CountdownTimer, TimerToken};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Lower bound on launch attempts per navigation request.
const MIN_SKIP_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Launched(Item),
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RandomPick {
    Launched,
    Rejected,
    NoCandidate,
}

pub struct PlaybackEngine {
    settings: Settings,
    device: Box<dyn DeviceDispatcher>,
    cache: Box<dyn FileCache>,
    timer: Box<dyn CountdownTimer>,
    alerts: Box<dyn AlertSink>,
    history: PlaybackHistory,
    state: Arc<PlaybackState>,
    armed: Option<TimerToken>,
    events: Vec<PlaybackEvent>,
}

impl PlaybackEngine {
    pub fn new(
        settings: Settings,
        device: Box<dyn DeviceDispatcher>,
        cache: Box<dyn FileCache>,
        timer: Box<dyn CountdownTimer>,
        alerts: Box<dyn AlertSink>,
    ) -> Self {
        let state = Arc::new(PlaybackState::from_settings(&settings));
        Self {
            settings,
            device,
            cache,
            timer,
            alerts,
            history: PlaybackHistory::new(),
            state,
            armed: None,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> Arc<PlaybackState> {
        Arc::clone(&self.state)
    }

    pub fn history(&self) -> &PlaybackHistory {
        &self.history
    }

    pub fn take_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.events)
    }

    /// Launches a file already present in the history. On rejection the
    /// engine moves on to the next candidate after the selected slot; the
    /// pointer stays on the selected file either way.
    pub fn launch_path(&mut self, path: &str) {
        let Some(item) = self.history.find(path).cloned() else {
            self.raise(PlaybackFault::LookupMiss(path.to_string()));
            return;
        };

        self.history.set_current(&item);
        if !self.execute_launch(item.clone()) {
            self.skip_forward(true);
            self.history.set_current(&item);
        }
    }

    pub fn launch_random(&mut self) {
        let scope = self.state.scope_path.clone();
        self.set_random_mode(&scope);
        if self.pick_random() == RandomPick::Rejected {
            self.skip_forward(true);
        }
    }

    pub fn advance_next(&mut self) {
        self.skip_forward(false);
    }

    /// `rejected` records whether a launch already failed in this request, so
    /// running out of random candidates afterwards ends the stream.
    fn skip_forward(&mut self, mut rejected: bool) {
        for _ in 0..self.skip_budget() {
            let filter = self.active_filter();
            let candidate = self.history.next(self.wraps(), &filter);

            if self.state.mode == NavigationMode::Random && candidate.is_none() {
                match self.pick_random() {
                    RandomPick::Launched => return,
                    RandomPick::Rejected => {
                        rejected = true;
                        continue;
                    }
                    RandomPick::NoCandidate if rejected => {
                        self.exhausted();
                        return;
                    }
                    RandomPick::NoCandidate => return,
                }
            }

            if !self.history.has_compatible_items_in(&filter) {
                self.exhausted();
                return;
            }

            let Some(item) = candidate else {
                self.raise(PlaybackFault::NothingLoaded);
                return;
            };
            if self.execute_launch(item) {
                return;
            }
            rejected = true;
        }
        self.exhausted();
    }

    pub fn advance_previous(&mut self) {
        for _ in 0..self.skip_budget() {
            let filter = self.active_filter();
            let (item, repeating) = match self.history.previous(self.wraps(), &filter) {
                Some(item) => (item, false),
                None => match self.state.current_item.clone() {
                    Some(current) => (current, true),
                    None => return,
                },
            };

            if self.execute_launch(item) {
                return;
            }
            if !self.history.has_compatible_items_in(&filter) {
                self.exhausted();
                return;
            }
            // Relaunching the same file again cannot change the outcome.
            if repeating {
                self.stop_stream();
                return;
            }
        }
        self.exhausted();
    }

    pub fn toggle_play(&mut self) {
        let Some(item) = self.state.current_item.clone() else {
            self.raise(PlaybackFault::NothingLoaded);
            return;
        };

        if self.state.play_state == PlayState::Playing {
            self.timer.pause();
            self.update(|state| state.play_state = PlayState::Paused);
            let sent = if item.is_music() {
                self.device.toggle_music()
            } else {
                self.device.reset()
            };
            if let Err(err) = sent {
                warn!("pause of {} failed: {err}", item.path);
            }
            return;
        }

        if !item.is_compatible {
            self.raise(PlaybackFault::Incompatible(item.path));
            return;
        }

        self.timer.resume();
        self.update(|state| state.play_state = PlayState::Playing);
        if item.is_music() {
            if let Err(err) = self.device.toggle_music() {
                warn!("resume of {} failed: {err}", item.path);
            }
            return;
        }

        let storage = self.state.storage;
        match self.device.launch(storage, &item) {
            Ok(result) if result.is_success() => debug!("relaunched {}", item.path),
            Ok(result) => {
                warn!("relaunch of {} returned {:?}", item.path, result.kind);
                self.raise(PlaybackFault::LaunchFailed(item.path));
            }
            Err(err) => {
                warn!("relaunch of {} failed: {err}", item.path);
                self.raise(PlaybackFault::LaunchFailed(item.path));
            }
        }
    }

    pub fn stop_stream(&mut self) {
        self.disarm_timer();
        if self.state.play_state == PlayState::Stopped {
            return;
        }
        if let Err(err) = self.device.reset() {
            debug!("reset while stopping failed: {err}");
        }
        self.update(|state| state.play_state = PlayState::Stopped);
        self.events.push(PlaybackEvent::Stopped);
        info!("stream stopped");
    }

    pub fn set_search_mode(&mut self, query: &str) {
        let query = query.trim().to_string();
        let results = self.cache.search(&query, &[]);
        if results.is_empty() {
            self.raise(PlaybackFault::NoSearchResults(query));
            return;
        }

        info!("search \"{query}\" matched {} files", results.len());
        self.history.load(results);
        self.update(move |state| {
            state.mode = NavigationMode::Search;
            state.search_query = Some(query);
        });
    }

    pub fn set_directory_mode(&mut self, path: &str) {
        let files: Vec<Item> = match self.cache.directory(path) {
            Some(listing) => listing.launchable().cloned().collect(),
            None => Vec::new(),
        };
        if files.is_empty() {
            self.raise(PlaybackFault::EmptyDirectory(path.to_string()));
            return;
        }

        info!("directory {path} holds {} launchable files", files.len());
        self.history.load(files);
        self.update(|state| {
            state.mode = NavigationMode::Directory;
            state.type_filter = TypeFilter::All;
            state.search_query = None;
        });
        self.alerts
            .notify(&format!("Filter reset to {} for directory playback", TypeFilter::All));
    }

    pub fn set_random_mode(&mut self, scope: &str) {
        if self.state.mode != NavigationMode::Random {
            self.history.clear();
        }
        let scope = scope.to_string();
        self.update(move |state| {
            state.mode = NavigationMode::Random;
            state.scope_path = scope;
            state.search_query = None;
        });
    }

    pub fn set_type_filter(&mut self, filter: TypeFilter) {
        self.update(|state| state.type_filter = filter);
    }

    pub fn set_play_timer(&mut self, play_timer: Option<Duration>) {
        self.update(|state| state.play_timer = play_timer);
    }

    pub fn set_sid_timer_policy(&mut self, policy: SidTimerPolicy) {
        self.update(|state| state.sid_timer_policy = policy);
    }

    pub fn set_storage_target(&mut self, storage: StorageTarget) {
        self.update(|state| state.storage = storage);
    }

    pub fn handle_timer_elapsed(&mut self, token: TimerToken) {
        if self.armed != Some(token) {
            debug!("ignoring expiry of replaced timer {}", token.raw());
            return;
        }
        self.armed = None;
        self.advance_next();
    }

    pub fn handle_connection_state(&mut self, connection: ConnectionState) {
        if connection == ConnectionState::ConnectionLost && self.state.is_playing() {
            warn!("connection lost while playing");
            self.stop_stream();
        }
    }

    fn execute_launch(&mut self, item: Item) -> bool {
        let current = item.clone();
        self.update(move |state| {
            state.current_item = Some(current);
            state.play_state = PlayState::Playing;
        });

        if !item.is_compatible {
            self.raise(PlaybackFault::Incompatible(item.path));
            return false;
        }

        let storage = self.state.storage;
        match self.device.launch(storage, &item) {
            Ok(result) if result.is_success() => {
                if self.state.mode != NavigationMode::Random {
                    self.history.set_current(&item);
                }
                info!("launched {}", item.path);
                self.alerts.clear_error();
                self.arm_timer(&item);
                self.events.push(PlaybackEvent::Launched(item));
                true
            }
            Ok(result) if result.is_incompatible() => {
                warn!("device rejected {} with {:?}", item.path, result.kind);
                if let Err(err) = self.cache.mark_incompatible(&item) {
                    error!("failed to record {} as incompatible: {err:#}", item.path);
                }
                self.history.mark_incompatible(&item.path);
                self.update(|state| {
                    if let Some(current) = state.current_item.as_mut() {
                        current.is_compatible = false;
                    }
                });
                self.raise(PlaybackFault::Incompatible(item.path));
                false
            }
            Ok(result) => {
                warn!("launch of {} returned {:?}", item.path, result.kind);
                self.raise(PlaybackFault::LaunchFailed(item.path));
                false
            }
            Err(err) => {
                warn!("launch of {} failed: {err}", item.path);
                self.raise(PlaybackFault::LaunchFailed(item.path));
                false
            }
        }
    }

    fn pick_random(&mut self) -> RandomPick {
        let filter = self.active_filter();
        let Some(item) =
            self.cache
                .random_file(self.state.storage, &self.state.scope_path, &filter)
        else {
            self.raise(PlaybackFault::EmptyScope {
                filter: self.state.type_filter,
                scope: self.state.scope_path.clone(),
            });
            return RandomPick::NoCandidate;
        };

        if self.execute_launch(item.clone()) {
            self.history.add(item);
            RandomPick::Launched
        } else {
            RandomPick::Rejected
        }
    }

    fn arm_timer(&mut self, item: &Item) {
        self.disarm_timer();
        let duration = match self.state.sid_timer_policy {
            SidTimerPolicy::SongLength if item.is_music() => {
                item.play_length.or(self.state.play_timer)
            }
            _ => self.state.play_timer,
        };
        if let Some(duration) = duration {
            debug!("auto-advance in {:?}", duration);
            self.armed = Some(self.timer.start(duration));
        }
    }

    fn disarm_timer(&mut self) {
        if self.armed.take().is_some() {
            self.timer.stop();
        }
    }

    fn exhausted(&mut self) {
        self.stop_stream();
        self.raise(PlaybackFault::ExhaustedCandidates);
    }

    fn raise(&mut self, fault: PlaybackFault) {
        warn!("{fault}");
        self.alerts.notify_error(&fault.to_string());
    }

    fn update(&mut self, apply: impl FnOnce(&mut PlaybackState)) {
        let mut next = PlaybackState::clone(&self.state);
        apply(&mut next);
        self.state = Arc::new(next);
    }

    fn active_filter(&self) -> Vec<FileType> {
        self.settings.file_types(self.state.type_filter)
    }

    fn wraps(&self) -> bool {
        self.state.mode != NavigationMode::Random
    }

    fn skip_budget(&self) -> usize {
        self.history.len().max(MIN_SKIP_ATTEMPTS)
    }
}
