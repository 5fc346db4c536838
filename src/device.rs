use crate::model::{Item, StorageTarget};
use log::{debug, info};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchResultKind {
    Success,
    ProgramError,
    SidError,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchResult {
    pub kind: LaunchResultKind,
}

impl LaunchResult {
    pub fn success() -> Self {
        Self {
            kind: LaunchResultKind::Success,
        }
    }

    pub fn failed(kind: LaunchResultKind) -> Self {
        Self { kind }
    }

    pub fn is_success(self) -> bool {
        self.kind == LaunchResultKind::Success
    }

    /// The device actively rejected the file's contents.
    pub fn is_incompatible(self) -> bool {
        matches!(
            self.kind,
            LaunchResultKind::ProgramError | LaunchResultKind::SidError
        )
    }
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device is not connected")]
    NotConnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    ConnectionLost,
}

pub trait DeviceDispatcher: Send {
    fn launch(&mut self, storage: StorageTarget, item: &Item) -> Result<LaunchResult, DeviceError>;
    fn toggle_music(&mut self) -> Result<(), DeviceError>;
    fn reset(&mut self) -> Result<(), DeviceError>;
}

/// Accepts every command without a cartridge attached.
#[derive(Debug, Default)]
pub struct NullDevice;

impl NullDevice {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceDispatcher for NullDevice {
    fn launch(&mut self, storage: StorageTarget, item: &Item) -> Result<LaunchResult, DeviceError> {
        info!("launch {:?}:{}", storage, item.path);
        Ok(LaunchResult::success())
    }

    fn toggle_music(&mut self) -> Result<(), DeviceError> {
        debug!("toggle music");
        Ok(())
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        debug!("reset");
        Ok(())
    }
}
