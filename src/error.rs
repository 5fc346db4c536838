use crate::model::TypeFilter;
use thiserror::Error;

/// Everything that can go wrong while navigating. None of these escape the
/// engine; their text is what the user is shown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackFault {
    #[error("File not found: {0}")]
    LookupMiss(String),
    #[error("{0} is not supported by the device, skipping")]
    Incompatible(String),
    #[error("Failed to launch {0}")]
    LaunchFailed(String),
    #[error("No compatible files remain, start a new stream")]
    ExhaustedCandidates,
    #[error("No files match the {filter} filter under {scope}")]
    EmptyScope { filter: TypeFilter, scope: String },
    #[error("No launchable files in {0}")]
    EmptyDirectory(String),
    #[error("No results for \"{0}\"")]
    NoSearchResults(String),
    #[error("Nothing is loaded to play")]
    NothingLoaded,
}
