use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    Sid,
    Prg,
    P00,
    Crt,
    Hex,
    Kla,
    Koa,
    Art,
    Aas,
    Hpi,
    D64,
}

impl FileType {
    pub const ALL: [FileType; 11] = [
        Self::Sid,
        Self::Prg,
        Self::P00,
        Self::Crt,
        Self::Hex,
        Self::Kla,
        Self::Koa,
        Self::Art,
        Self::Aas,
        Self::Hpi,
        Self::D64,
    ];

    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|file_type| file_type.extension().eq_ignore_ascii_case(ext))
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Sid => "sid",
            Self::Prg => "prg",
            Self::P00 => "p00",
            Self::Crt => "crt",
            Self::Hex => "hex",
            Self::Kla => "kla",
            Self::Koa => "koa",
            Self::Art => "art",
            Self::Aas => "aas",
            Self::Hpi => "hpi",
            Self::D64 => "d64",
        }
    }

    pub fn is_music(self) -> bool {
        self == Self::Sid
    }

    pub fn is_game(self) -> bool {
        matches!(self, Self::Prg | Self::P00 | Self::Crt | Self::D64)
    }

    pub fn is_image(self) -> bool {
        matches!(
            self,
            Self::Kla | Self::Koa | Self::Art | Self::Aas | Self::Hpi
        )
    }

    /// Firmware images are indexed but never streamed to the cartridge.
    pub fn is_launchable(self) -> bool {
        self != Self::Hex
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TypeFilter {
    #[default]
    All,
    Music,
    Games,
    Images,
}

impl TypeFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "music" | "sid" | "sids" => Some(Self::Music),
            "games" | "game" => Some(Self::Games),
            "images" | "image" | "art" => Some(Self::Images),
            _ => None,
        }
    }

    pub fn default_file_types(self) -> Vec<FileType> {
        FileType::ALL
            .into_iter()
            .filter(|file_type| match self {
                Self::All => file_type.is_launchable(),
                Self::Music => file_type.is_music(),
                Self::Games => file_type.is_game(),
                Self::Images => file_type.is_image(),
            })
            .collect()
    }
}

impl fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::All => "All",
            Self::Music => "Music",
            Self::Games => "Games",
            Self::Images => "Images",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StorageTarget {
    #[default]
    Sd,
    Usb,
}

impl StorageTarget {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sd" => Some(Self::Sd),
            "usb" => Some(Self::Usb),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    Playing,
    Paused,
    #[default]
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationMode {
    #[default]
    Random,
    Directory,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SidTimerPolicy {
    #[default]
    SongLength,
    TimerOverride,
}

impl SidTimerPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "songlength" | "song" | "length" => Some(Self::SongLength),
            "override" | "timer" => Some(Self::TimerOverride),
            _ => None,
        }
    }
}

/// A launchable file as indexed by the file cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: u64,
    pub path: String,
    pub file_type: FileType,
    pub is_compatible: bool,
    /// Only populated for music.
    pub play_length: Option<Duration>,
}

impl Item {
    pub fn new(id: u64, path: impl Into<String>, file_type: FileType) -> Self {
        Self {
            id,
            path: path.into(),
            file_type,
            is_compatible: true,
            play_length: None,
        }
    }

    pub fn is_music(&self) -> bool {
        self.file_type.is_music()
    }

    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn matches(&self, filter: &[FileType]) -> bool {
        filter.is_empty() || filter.contains(&self.file_type)
    }
}
