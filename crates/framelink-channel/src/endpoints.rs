use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::gameplay::{FramePublisher, FrameSubscriber};
use crate::input::{InputPuller, InputPusher};
use crate::resources::{ResourceReplier, ResourceRequester};

/// Default socket directory.
pub const DEFAULT_SOCKET_DIR: &str = "/tmp";

/// Socket paths for the three channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEndpoints {
    pub resources: PathBuf,
    pub gameplay: PathBuf,
    pub input: PathBuf,
}

impl ChannelEndpoints {
    /// Endpoints under an explicit directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            resources: dir.join("framelink-resources.sock"),
            gameplay: dir.join("framelink-gameplay.sock"),
            input: dir.join("framelink-input.sock"),
        }
    }
}

impl Default for ChannelEndpoints {
    fn default() -> Self {
        Self::in_dir(DEFAULT_SOCKET_DIR)
    }
}

/// The backend's three channel ends, bound together.
///
/// Binding is all-or-nothing: if any bind fails, listeners bound so far are
/// unwound by drop and their socket files removed.
pub struct BackendChannels {
    pub resources: ResourceReplier,
    pub gameplay: FramePublisher,
    pub input: InputPuller,
}

impl BackendChannels {
    pub fn bind(endpoints: &ChannelEndpoints) -> Result<Self> {
        let resources = ResourceReplier::bind(&endpoints.resources)?;
        let gameplay = FramePublisher::bind(&endpoints.gameplay)?;
        let input = InputPuller::bind(&endpoints.input)?;
        info!(?endpoints, "backend channels bound");
        Ok(Self {
            resources,
            gameplay,
            input,
        })
    }
}

/// The frontend's three channel ends, connected together.
///
/// Connecting is all-or-nothing, same as binding.
pub struct FrontendChannels {
    pub resources: ResourceRequester,
    pub gameplay: FrameSubscriber,
    pub input: InputPusher,
}

impl FrontendChannels {
    pub fn connect(endpoints: &ChannelEndpoints) -> Result<Self> {
        let resources = ResourceRequester::connect(&endpoints.resources)?;
        let gameplay = FrameSubscriber::connect(&endpoints.gameplay)?;
        let input = InputPusher::connect(&endpoints.input)?;
        info!(?endpoints, "frontend channels connected");
        Ok(Self {
            resources,
            gameplay,
            input,
        })
    }
}
