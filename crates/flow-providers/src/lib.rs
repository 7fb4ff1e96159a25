//! flow-providers: the concrete collaborators the core is built against but
//! never calls directly (§1 "out of scope... reduced to a typed interface").
//! Credential resolution, terminal-event publication, and fleet control are
//! each a narrow trait plus the implementation(s) that satisfy it — a
//! Kafka/no-op pair for publishing, a `docker compose --scale` shim and an
//! HTTP probe for the autoscaler's control plane.
//!
//! Nothing in here knows about the step engine, the transaction store, or
//! HTTP routing; the application binary wires these traits in.

pub mod control_plane;
pub mod credentials;
pub mod events;

pub use control_plane::{ControlPlane, HubProbe, HubStatus, ShellControlPlane, SimulatedHubProbe};
pub use credentials::{
    CredentialError, CredentialResolver, EnvCredentialResolver, InlineOnlyCredentialResolver, StaticCredentialResolver,
};
pub use events::{EventPublisher, KafkaEventPublisher, NoopEventPublisher};
