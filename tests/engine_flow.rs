use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cartstream::alerts::AlertSink;
use cartstream::cache::{FileCache, LocalFileCache};
use cartstream::config::Settings;
use cartstream::controller::{PlayerCommand, PlayerController};
use cartstream::device::{
    ConnectionState, DeviceDispatcher, DeviceError, LaunchResult, LaunchResultKind,
};
use cartstream::engine::PlaybackEvent;
use cartstream::model::{Item, PlayState, StorageTarget, TypeFilter};
use tempfile::tempdir;

struct ScriptedDevice {
    launches: Arc<Mutex<Vec<String>>>,
    outcomes: HashMap<String, LaunchResultKind>,
}

impl DeviceDispatcher for ScriptedDevice {
    fn launch(&mut self, _storage: StorageTarget, item: &Item) -> Result<LaunchResult, DeviceError> {
        self.launches
            .lock()
            .expect("launches")
            .push(item.path.clone());
        let kind = self
            .outcomes
            .get(&item.path)
            .copied()
            .unwrap_or(LaunchResultKind::Success);
        Ok(LaunchResult { kind })
    }

    fn toggle_music(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }
}

#[derive(Clone, Default)]
struct CollectedAlerts(Arc<Mutex<Vec<String>>>);

impl AlertSink for CollectedAlerts {
    fn notify(&mut self, message: &str) {
        self.0.lock().expect("alerts").push(message.to_string());
    }

    fn notify_error(&mut self, message: &str) {
        self.0.lock().expect("alerts").push(message.to_string());
    }
}

fn write_library(root: &Path, files: &[&str]) {
    for file in files {
        let path = root.join(file);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, b"\x01\x08").expect("write");
    }
}

fn start(
    cache: LocalFileCache,
    outcomes: &[(&str, LaunchResultKind)],
) -> (PlayerController, Arc<Mutex<Vec<String>>>, CollectedAlerts) {
    let launches = Arc::new(Mutex::new(Vec::new()));
    let alerts = CollectedAlerts::default();
    let controller = PlayerController::start(
        Settings::default(),
        Box::new(ScriptedDevice {
            launches: Arc::clone(&launches),
            outcomes: outcomes
                .iter()
                .map(|(path, kind)| (path.to_string(), *kind))
                .collect(),
        }),
        Box::new(cache),
        Box::new(alerts.clone()),
    );
    (controller, launches, alerts)
}

fn wait_for_launch(controller: &PlayerController, timeout: Duration) -> Option<String> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        match controller.recv_event_timeout(Duration::from_millis(20)) {
            Some(PlaybackEvent::Launched(item)) => return Some(item.path),
            Some(PlaybackEvent::Stopped) | None => {}
        }
    }
    None
}

#[test]
fn play_timer_walks_the_directory_and_wraps() {
    let dir = tempdir().expect("tempdir");
    write_library(dir.path(), &["dir/a.prg", "dir/b.prg", "dir/c.prg"]);
    let cache = LocalFileCache::scan(dir.path()).expect("scan");
    let (controller, _launches, _alerts) = start(cache, &[]);

    controller
        .send(PlayerCommand::SetPlayTimer(Some(Duration::from_millis(30))))
        .expect("send");
    controller
        .send(PlayerCommand::DirectoryMode(String::from("/dir")))
        .expect("send");
    controller.send(PlayerCommand::Next).expect("send");

    let mut played = Vec::new();
    for _ in 0..4 {
        played.push(wait_for_launch(&controller, Duration::from_secs(2)).expect("launch"));
    }
    assert_eq!(played, vec!["/dir/a.prg", "/dir/b.prg", "/dir/c.prg", "/dir/a.prg"]);

    controller.send(PlayerCommand::Stop).expect("send");
    assert_eq!(
        controller.state().expect("state").play_state,
        PlayState::Stopped
    );
    assert!(wait_for_launch(&controller, Duration::from_millis(150)).is_none());
}

#[test]
fn rejected_file_stays_banned_across_sessions() {
    let dir = tempdir().expect("tempdir");
    write_library(dir.path(), &["dir/f1.prg", "dir/f2.prg", "dir/f3.prg"]);
    let bans = dir.path().join("config").join("incompatible.json");

    {
        let cache =
            LocalFileCache::scan_with_bans(dir.path(), Some(bans.clone())).expect("scan");
        let (controller, launches, alerts) =
            start(cache, &[("/dir/f2.prg", LaunchResultKind::ProgramError)]);
        controller
            .send(PlayerCommand::DirectoryMode(String::from("/dir")))
            .expect("send");
        controller
            .send(PlayerCommand::LaunchPath(String::from("/dir/f2.prg")))
            .expect("send");

        assert_eq!(
            wait_for_launch(&controller, Duration::from_secs(2)).as_deref(),
            Some("/dir/f3.prg")
        );
        assert_eq!(
            *launches.lock().expect("launches"),
            vec!["/dir/f2.prg", "/dir/f3.prg"]
        );
        assert!(
            alerts
                .0
                .lock()
                .expect("alerts")
                .iter()
                .any(|alert| alert.contains("/dir/f2.prg is not supported"))
        );
    }

    let mut reloaded = LocalFileCache::scan_with_bans(dir.path(), Some(bans)).expect("rescan");
    let found = reloaded.search("f2", &[]);
    assert_eq!(found.len(), 1);
    assert!(!found[0].is_compatible);
    assert!(
        reloaded
            .directory("/dir")
            .expect("dir")
            .files
            .iter()
            .filter(|item| item.is_compatible)
            .all(|item| item.path != "/dir/f2.prg")
    );
}

#[test]
fn connection_loss_cancels_pending_auto_advance() {
    let dir = tempdir().expect("tempdir");
    write_library(dir.path(), &["dir/a.prg", "dir/b.prg"]);
    let cache = LocalFileCache::scan(dir.path()).expect("scan");
    let (controller, launches, _alerts) = start(cache, &[]);

    controller
        .send(PlayerCommand::SetPlayTimer(Some(Duration::from_millis(80))))
        .expect("send");
    controller
        .send(PlayerCommand::DirectoryMode(String::from("/dir")))
        .expect("send");
    controller.send(PlayerCommand::Next).expect("send");
    controller
        .sender()
        .send(PlayerCommand::ConnectionChanged(ConnectionState::ConnectionLost))
        .expect("send");

    assert_eq!(
        wait_for_launch(&controller, Duration::from_secs(2)).as_deref(),
        Some("/dir/a.prg")
    );
    assert!(wait_for_launch(&controller, Duration::from_millis(250)).is_none());
    assert_eq!(launches.lock().expect("launches").len(), 1);
    assert_eq!(
        controller.state().expect("state").play_state,
        PlayState::Stopped
    );
}

#[test]
fn random_pick_honours_filter_and_scope() {
    let dir = tempdir().expect("tempdir");
    write_library(
        dir.path(),
        &[
            "music/hubbard/commando.sid",
            "music/hubbard/monty.sid",
            "music/notes.prg",
            "games/ik.crt",
        ],
    );
    let cache = LocalFileCache::scan(dir.path()).expect("scan");
    let (controller, _launches, _alerts) = start(cache, &[]);

    controller
        .send(PlayerCommand::SetFilter(TypeFilter::Music))
        .expect("send");
    controller
        .send(PlayerCommand::RandomMode(String::from("/music")))
        .expect("send");
    for _ in 0..5 {
        controller.send(PlayerCommand::LaunchRandom).expect("send");
        let path = wait_for_launch(&controller, Duration::from_secs(2)).expect("launch");
        assert!(path.starts_with("/music/hubbard/"));
        assert!(path.ends_with(".sid"));
    }

    let state = controller.state().expect("state");
    assert_eq!(state.scope_path, "/music");
    assert_eq!(state.type_filter, TypeFilter::Music);
}

#[test]
fn search_results_replace_the_random_walk() {
    let dir = tempdir().expect("tempdir");
    write_library(dir.path(), &["music/a.sid", "games/ik.crt", "games/ik2.crt"]);
    let cache = LocalFileCache::scan(dir.path()).expect("scan");
    let (controller, _launches, _alerts) = start(cache, &[]);

    controller.send(PlayerCommand::LaunchRandom).expect("send");
    wait_for_launch(&controller, Duration::from_secs(2)).expect("random launch");

    controller
        .send(PlayerCommand::SearchMode(String::from("ik")))
        .expect("send");
    controller.send(PlayerCommand::Next).expect("send");
    assert_eq!(
        wait_for_launch(&controller, Duration::from_secs(2)).as_deref(),
        Some("/games/ik.crt")
    );
    controller.send(PlayerCommand::Previous).expect("send");
    assert_eq!(
        wait_for_launch(&controller, Duration::from_secs(2)).as_deref(),
        Some("/games/ik2.crt")
    );

    let state = controller.state().expect("state");
    assert_eq!(state.search_query.as_deref(), Some("ik"));
}
