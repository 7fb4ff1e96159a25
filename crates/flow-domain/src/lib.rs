//! Core entities: credentials, entries, requests, runs, and the status
//! enums that define the workflow/step state machines.

pub mod credentials;
pub mod dto;
pub mod entry;
pub mod error;
pub mod params;
pub mod payment;
pub mod request;
pub mod run;
pub mod status;
pub mod ttl;

pub use credentials::Credentials;
pub use dto::{
    ArtifactPayload, DuplicateTransactionBody, EntryStatus, ExecutionCounts, ExecutionResponse,
    ResultsEnvelope, RetryStats, StatusResponse, WorkflowFinishedEvent,
};
pub use entry::{DeclarationEntry, FingerprintFields, ReconciliationEntry};
pub use error::{DomainError, ErrorKind};
pub use params::{DeclarationParams, ReconciliationParams};
pub use payment::PaymentMethod;
pub use request::Request;
pub use run::Run;
pub use status::{RunStatus, StepStatus};
pub use workflow_kind::WorkflowKind;

pub mod workflow_kind;
