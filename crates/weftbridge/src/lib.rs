//! Tool-call bridge: run-scoped tool registry, credential sealing, and
//! the synchronous gateway that relays tool calls into running
//! workflows over the substrate's signal and query surface.

pub mod credentials;
pub mod gateway;
pub mod registry;

pub use credentials::{CredentialStore, MemoryCredentialStore};
pub use gateway::{ToolCallGateway, DEFAULT_CALL_TIMEOUT, DEFAULT_POLL_INTERVAL};
pub use registry::{RegisteredTool, ToolKind, ToolRegistry, ToolStatus, DEFAULT_REGISTRY_TTL};
