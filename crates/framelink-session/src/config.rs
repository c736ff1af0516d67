use framelink_channel::ChannelEndpoints;
use framelink_shmem::RegionConfig;

/// Which side of the process split this session plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Transport off; every per-tick call degrades to a no-op.
    #[default]
    Disabled,
    /// Simulation side: broadcasts world state, consumes input.
    Backend,
    /// Presentation side: consumes world state, produces input.
    Frontend,
    /// Legacy alias for [`Role::Backend`].
    Both,
}

impl Role {
    pub fn is_backend(self) -> bool {
        matches!(self, Role::Backend | Role::Both)
    }

    pub fn is_frontend(self) -> bool {
        matches!(self, Role::Frontend)
    }

    pub fn is_enabled(self) -> bool {
        !matches!(self, Role::Disabled)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Disabled => "disabled",
            Role::Backend => "backend",
            Role::Frontend => "frontend",
            Role::Both => "both",
        };
        f.write_str(name)
    }
}

/// Which transport carries the traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// Three Unix domain socket channels.
    #[default]
    Channel,
    /// One POSIX shared-memory region.
    SharedRegion,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransportKind::Channel => "channel",
            TransportKind::SharedRegion => "shared-region",
        };
        f.write_str(name)
    }
}

/// Everything a [`Session`] needs to come up.
///
/// [`Session`]: crate::Session
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub role: Role,
    pub transport: TransportKind,
    /// Backend without video/audio output; the hook adapter votes to skip
    /// rendering.
    pub headless: bool,
    pub region: RegionConfig,
    pub endpoints: ChannelEndpoints,
}

impl SessionConfig {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            ..Self::default()
        }
    }

    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_region(mut self, region: RegionConfig) -> Self {
        self.region = region;
        self
    }

    pub fn with_endpoints(mut self, endpoints: ChannelEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}
