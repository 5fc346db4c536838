use crate::config::Settings;
use crate::model::{Item, NavigationMode, PlayState, SidTimerPolicy, StorageTarget, TypeFilter};
use std::time::Duration;

/// Snapshot of everything the engine knows about the current stream. The
/// engine never edits a published snapshot; each change produces a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackState {
    pub storage: StorageTarget,
    pub current_item: Option<Item>,
    pub play_state: PlayState,
    pub mode: NavigationMode,
    pub type_filter: TypeFilter,
    pub scope_path: String,
    pub play_timer: Option<Duration>,
    pub sid_timer_policy: SidTimerPolicy,
    pub search_query: Option<String>,
}

impl PlaybackState {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            storage: settings.default_storage,
            current_item: None,
            play_state: PlayState::Stopped,
            mode: NavigationMode::Random,
            type_filter: settings.default_filter,
            scope_path: String::from("/"),
            play_timer: settings.play_timer(),
            sid_timer_policy: settings.sid_timer_policy,
            search_query: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.play_state == PlayState::Playing
    }

    pub fn summary(&self) -> String {
        let current = self
            .current_item
            .as_ref()
            .map(|item| item.path.as_str())
            .unwrap_or("-");
        let timer = self
            .play_timer
            .map(|timer| format!("{}s", timer.as_secs()))
            .unwrap_or_else(|| String::from("off"));
        let mut summary = format!(
            "{:?} | {:?} mode | filter {} | scope {} | timer {} ({:?}) | {:?} | {}",
            self.play_state,
            self.mode,
            self.type_filter,
            self.scope_path,
            timer,
            self.sid_timer_policy,
            self.storage,
            current,
        );
        if let Some(query) = &self.search_query {
            summary.push_str(&format!(" | search \"{query}\""));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_come_from_settings() {
        let settings = Settings {
            default_storage: StorageTarget::Usb,
            default_filter: TypeFilter::Music,
            play_timer_seconds: Some(30),
            ..Settings::default()
        };
        let state = PlaybackState::from_settings(&settings);

        assert_eq!(state.storage, StorageTarget::Usb);
        assert_eq!(state.type_filter, TypeFilter::Music);
        assert_eq!(state.mode, NavigationMode::Random);
        assert_eq!(state.play_state, PlayState::Stopped);
        assert_eq!(state.play_timer, Some(Duration::from_secs(30)));
        assert!(state.current_item.is_none());
    }

    #[test]
    fn summary_mentions_search_query() {
        let mut state = PlaybackState::from_settings(&Settings::default());
        state.search_query = Some(String::from("hubbard"));
        assert!(state.summary().contains("search \"hubbard\""));
        assert!(state.summary().starts_with("Stopped"));
    }
}
