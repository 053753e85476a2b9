//! Ephemeral external resource lifecycle
//!
//! Resources are external side effects created through CLI commands:
//! containers, RBD images, mapped block devices, mounts, network endpoints.
//! They are dependency-chained (a mount depends on a mapped device, which
//! depends on a created image), so release order is strictly
//! reverse-of-acquisition. Unmounting before unmapping, and unmapping before
//! removing, is mandatory or the external command fails.

use serde::Serialize;
use tracing::{debug, info, warn};
use voltest_runner::{Command, Runner};

use crate::error::{Error, Result};

/// The kind of external resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResourceKind {
    /// A running container
    Container,
    /// A block-device image in the storage cluster
    BlockImage,
    /// A block device node mapped on the host
    MappedDevice,
    /// A mounted filesystem
    Mount,
    /// An addressable network endpoint (server container with a fixed IP)
    NetworkEndpoint,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Container => "container",
            Self::BlockImage => "block image",
            Self::MappedDevice => "mapped device",
            Self::Mount => "mount",
            Self::NetworkEndpoint => "network endpoint",
        };
        f.write_str(name)
    }
}

/// Lifecycle state of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResourceState {
    /// Acquisition was requested but the creation command has not succeeded
    Requested,
    /// The resource exists externally and must be released
    Active,
    /// Teardown ran successfully
    Released,
    /// Teardown failed or never ran; manual operator cleanup is required
    Leaked,
}

/// Placeholder substituted with the live identity in teardown templates
pub const IDENTITY_PLACEHOLDER: &str = "{id}";

/// Describes how to create and tear down one external resource
#[derive(Debug, Clone)]
pub struct ResourceSpec {
    kind: ResourceKind,
    name: String,
    create: Option<Command>,
    teardown: Command,
    identity_from_output: bool,
}

impl ResourceSpec {
    /// Describe a resource with its teardown command
    ///
    /// The teardown command may reference the resource's identity with the
    /// `{id}` placeholder; it is substituted at release time. Resources with
    /// no creation command (e.g. a volume the plugin creates implicitly on
    /// first use) become Active immediately on acquisition.
    pub fn new(kind: ResourceKind, name: impl Into<String>, teardown: Command) -> Self {
        Self {
            kind,
            name: name.into(),
            create: None,
            teardown,
            identity_from_output: false,
        }
    }

    /// Set the creation command run at acquisition time
    pub fn create_with(mut self, create: Command) -> Self {
        self.create = Some(create);
        self
    }

    /// Take the resource identity from the creation command's trimmed output
    ///
    /// Used when the external tool names the resource itself: `rbd map`
    /// prints the device node, `mktemp -d` prints the directory.
    pub fn identity_from_output(mut self) -> Self {
        self.identity_from_output = true;
        self
    }

    /// The resource kind
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The requested name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Snapshot of one resource for reporting
#[derive(Debug, Clone, Serialize)]
pub struct ResourceRecord {
    /// Resource kind
    pub kind: ResourceKind,
    /// Requested name
    pub name: String,
    /// Live identity (equals `name` unless captured from creation output)
    pub identity: String,
    /// Final lifecycle state
    pub state: ResourceState,
}

#[derive(Debug)]
struct ResourceEntry {
    spec: ResourceSpec,
    identity: String,
    state: ResourceState,
}

/// LIFO stack of resources owned by one scenario
///
/// The scenario executor guarantees [`ResourceStack::release_all`] runs on
/// every exit path from a scenario body, so acquisition through this stack is
/// scoped: a resource that reaches Active always reaches Released or is
/// recorded as Leaked.
#[derive(Debug, Default)]
pub struct ResourceStack {
    entries: Vec<ResourceEntry>,
}

impl ResourceStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a resource, running its creation command if it has one
    ///
    /// Returns the live identity. A failed or timed-out creation command
    /// leaves the resource in Requested state: it never became Active, so it
    /// is not treated as leaked. A creation that succeeds but yields no
    /// identity is flagged Leaked under the requested name instead, since the
    /// external resource may exist with nothing to release it by.
    pub async fn acquire(&mut self, runner: &Runner, spec: ResourceSpec) -> Result<String> {
        let mut identity = spec.name().to_string();
        let mut state = ResourceState::Requested;
        let mut failure = None;

        match &spec.create {
            Some(create) => match runner.run(create).await {
                Ok(result) => {
                    if spec.identity_from_output {
                        identity = result.output().trim().to_string();
                        if identity.is_empty() {
                            // The create succeeded, so the external resource
                            // may exist; without an identity the teardown
                            // template cannot run, so flag it for manual
                            // cleanup under the requested name.
                            identity = spec.name().to_string();
                            state = ResourceState::Leaked;
                            failure = Some(
                                "creation succeeded but produced no identity".to_string(),
                            );
                        } else {
                            state = ResourceState::Active;
                        }
                    } else {
                        state = ResourceState::Active;
                    }
                }
                Err(e) => failure = Some(e.to_string()),
            },
            None => state = ResourceState::Active,
        }

        let resource = format!("{} {}", spec.kind, spec.name);
        if state == ResourceState::Active {
            debug!(kind = %spec.kind, identity = %identity, "acquired");
        }
        self.entries.push(ResourceEntry {
            spec,
            identity: identity.clone(),
            state,
        });
        match failure {
            None => Ok(identity),
            Some(cause) => Err(Error::ResourceAcquireFailed { resource, cause }),
        }
    }

    /// Release one Active resource by identity, ahead of scenario teardown
    ///
    /// Scenarios use this when the test itself depends on the release side
    /// effect (e.g. an image must be unmapped before the volume plugin may
    /// map it again). Unlike end-of-scenario teardown, a failure here is
    /// propagated: the scenario cannot meaningfully continue.
    pub async fn release(&mut self, runner: &Runner, identity: &str) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .rev()
            .find(|e| e.identity == identity && e.state == ResourceState::Active)
            .ok_or_else(|| {
                Error::internal(format!("no active resource with identity `{identity}`"))
            })?;
        let teardown = entry
            .spec
            .teardown
            .substituted(IDENTITY_PLACEHOLDER, &entry.identity);
        match runner.run(&teardown).await {
            Ok(_) => {
                entry.state = ResourceState::Released;
                debug!(kind = %entry.spec.kind, identity = %entry.identity, "released");
                Ok(())
            }
            Err(e) => {
                entry.state = ResourceState::Leaked;
                Err(Error::ResourceReleaseFailed {
                    resource: format!("{} {}", entry.spec.kind, entry.identity),
                    cause: e.to_string(),
                })
            }
        }
    }

    /// Release every Active resource in reverse order of acquisition
    ///
    /// A failed release marks that resource Leaked and is collected, but the
    /// remaining releases still run. The returned list is empty on full
    /// success.
    pub async fn release_all(&mut self, runner: &Runner) -> Vec<Error> {
        let mut failures = Vec::new();
        for entry in self.entries.iter_mut().rev() {
            if entry.state != ResourceState::Active {
                continue;
            }
            let teardown = entry
                .spec
                .teardown
                .substituted(IDENTITY_PLACEHOLDER, &entry.identity);
            match runner.run(&teardown).await {
                Ok(_) => {
                    entry.state = ResourceState::Released;
                    debug!(kind = %entry.spec.kind, identity = %entry.identity, "released");
                }
                Err(e) => {
                    entry.state = ResourceState::Leaked;
                    warn!(
                        kind = %entry.spec.kind,
                        identity = %entry.identity,
                        error = %e,
                        "release failed, resource leaked"
                    );
                    failures.push(Error::ResourceReleaseFailed {
                        resource: format!("{} {}", entry.spec.kind, entry.identity),
                        cause: e.to_string(),
                    });
                }
            }
        }
        if !failures.is_empty() {
            info!(
                leaked = failures.len(),
                "best-effort cleanup finished with leaked resources"
            );
        }
        failures
    }

    /// Snapshot of all resources and their states
    pub fn records(&self) -> Vec<ResourceRecord> {
        self.entries
            .iter()
            .map(|e| ResourceRecord {
                kind: e.spec.kind,
                name: e.spec.name.clone(),
                identity: e.identity.clone(),
                state: e.state,
            })
            .collect()
    }

    /// Identities of resources left behind for manual cleanup
    pub fn leaked(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.state == ResourceState::Leaked)
            .map(|e| e.identity.clone())
            .collect()
    }
}
