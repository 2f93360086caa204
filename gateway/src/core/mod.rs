pub mod realtime;
pub mod store;
pub mod tools;

pub use realtime::{
    CredentialProvider, HandshakeProfile, HandshakeProfileKind, OpenAISessionCredentials,
    RealtimeError, RealtimeResult,
};
pub use store::{
    AuditLog, InMemoryVerificationStore, RecordStore, SeedData, SeedRecordStore, StoreError,
    StoreResult, VerificationStore,
};
pub use tools::{InvocationRequest, ToolDispatcher, ToolOutcome};
