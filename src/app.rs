use crate::alerts::ConsoleAlerts;
use crate::cache::{LocalFileCache, normalize_remote};
use crate::config::{self, Settings};
use crate::controller::{PlayerCommand, PlayerController};
use crate::device::NullDevice;
use crate::engine::PlaybackEvent;
use crate::model::{SidTimerPolicy, StorageTarget, TypeFilter};
use anyhow::{Context, Result};
use log::{debug, warn};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct AppStartupOptions {
    pub library: Option<PathBuf>,
    pub storage: Option<StorageTarget>,
}

#[derive(Debug)]
pub enum Input {
    Player(PlayerCommand),
    ShowState,
    Help,
    Quit,
}

pub fn run_with_startup(options: AppStartupOptions) -> Result<()> {
    let mut saved = config::load_settings()?;
    let mut settings = saved.clone();
    if let Some(storage) = options.storage {
        settings.default_storage = storage;
    }
    let root = options
        .library
        .or_else(|| settings.library_root.clone())
        .context("no library directory, pass --library <dir> or set library_root in settings")?;
    let ban_file = config::config_root()?.join("incompatible.json");
    let cache = LocalFileCache::scan_with_bans(&root, Some(ban_file))
        .with_context(|| format!("failed to index {}", root.display()))?;
    println!("Indexed {} files from {}", cache.len(), cache.root().display());

    let mut controller = PlayerController::start(
        settings,
        Box::new(NullDevice::new()),
        Box::new(cache),
        Box::new(ConsoleAlerts::new()),
    );
    if let Some(events) = controller.take_event_receiver() {
        thread::spawn(move || {
            for event in events {
                print_event(&event);
            }
        });
    }

    print_help();
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read command")?;
        match parse_command(&line) {
            Ok(Some(Input::Player(command))) => {
                if remember_preference(&mut saved, &command)
                    && let Err(err) = config::save_settings(&saved)
                {
                    warn!("failed to save settings: {err:#}");
                }
                controller.send(command)?;
            }
            Ok(Some(Input::ShowState)) => println!("  {}", controller.state()?.summary()),
            Ok(Some(Input::Help)) => print_help(),
            Ok(Some(Input::Quit)) => break,
            Ok(None) => {}
            Err(err) => println!("  {err:#}"),
        }
    }
    debug!("command loop finished");
    Ok(())
}

pub fn parse_command(raw: &str) -> Result<Option<Input>> {
    let input = raw.trim();
    if input.is_empty() {
        return Ok(None);
    }

    let mut command_split = input.splitn(2, char::is_whitespace);
    let command = command_split.next().unwrap_or_default();
    let rest = command_split.next().unwrap_or("").trim();

    let parsed = match command {
        "random" | "r" => {
            if rest.is_empty() {
                PlayerCommand::LaunchRandom
            } else {
                PlayerCommand::RandomMode(normalize_remote(rest))
            }
        }
        "dir" | "cd" => {
            if rest.is_empty() {
                anyhow::bail!("Usage: dir <path>");
            }
            PlayerCommand::DirectoryMode(normalize_remote(rest))
        }
        "search" | "s" => {
            if rest.is_empty() {
                anyhow::bail!("Usage: search <query>");
            }
            PlayerCommand::SearchMode(rest.to_string())
        }
        "play" | "p" => {
            if rest.is_empty() {
                anyhow::bail!("Usage: play <path>");
            }
            PlayerCommand::LaunchPath(normalize_remote(rest))
        }
        "next" | "n" => PlayerCommand::Next,
        "prev" | "b" => PlayerCommand::Previous,
        "toggle" | "t" | "pause" => PlayerCommand::TogglePlay,
        "stop" => PlayerCommand::Stop,
        "filter" => match TypeFilter::parse(rest) {
            Some(filter) => PlayerCommand::SetFilter(filter),
            None => anyhow::bail!("Usage: filter <all|music|games|images>"),
        },
        "timer" => match rest {
            "off" | "0" => PlayerCommand::SetPlayTimer(None),
            seconds => {
                let seconds: u64 = seconds
                    .parse()
                    .ok()
                    .context("Usage: timer <seconds|off>")?;
                PlayerCommand::SetPlayTimer(Some(Duration::from_secs(seconds)))
            }
        },
        "policy" => match SidTimerPolicy::parse(rest) {
            Some(policy) => PlayerCommand::SetSidTimerPolicy(policy),
            None => anyhow::bail!("Usage: policy <songlength|override>"),
        },
        "storage" => match StorageTarget::parse(rest) {
            Some(storage) => PlayerCommand::SetStorage(storage),
            None => anyhow::bail!("Usage: storage <sd|usb>"),
        },
        "state" => return Ok(Some(Input::ShowState)),
        "help" | "?" => return Ok(Some(Input::Help)),
        "quit" | "exit" | "q" => return Ok(Some(Input::Quit)),
        other => anyhow::bail!("Unknown command {other}. Use help"),
    };
    Ok(Some(Input::Player(parsed)))
}

/// Copies filter, timer, policy and storage changes into the persisted
/// settings. Returns whether anything changed.
pub fn remember_preference(settings: &mut Settings, command: &PlayerCommand) -> bool {
    let before = settings.clone();
    match command {
        PlayerCommand::SetFilter(filter) => settings.default_filter = *filter,
        PlayerCommand::SetPlayTimer(timer) => {
            settings.play_timer_seconds = timer.map(|duration| duration.as_secs());
        }
        PlayerCommand::SetSidTimerPolicy(policy) => settings.sid_timer_policy = *policy,
        PlayerCommand::SetStorage(storage) => settings.default_storage = *storage,
        _ => return false,
    }
    *settings != before
}

fn print_event(event: &PlaybackEvent) {
    match event {
        PlaybackEvent::Launched(item) => match item.play_length {
            Some(length) => println!("> {} ({}s)", item.path, length.as_secs()),
            None => println!("> {}", item.path),
        },
        PlaybackEvent::Stopped => println!("> stopped"),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  random [scope]     Random file, or set the random scope");
    println!("  dir <path>         Play through a directory");
    println!("  search <query>     Play through search results");
    println!("  play <path>        Launch a file from the current list");
    println!("  next | prev        Move through the current list");
    println!("  toggle | stop      Pause/resume or stop");
    println!("  filter <all|music|games|images>");
    println!("  timer <seconds|off>");
    println!("  policy <songlength|override>");
    println!("  storage <sd|usb>");
    println!("  state | help | quit");
}
