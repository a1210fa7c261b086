//! Skill execution backends for skillchain.
//!
//! The workflow engine never talks to a model directly. It hands a
//! `SkillRequest` to a `SkillBackend` and gets back a result or a typed
//! failure:
//!
//! - **Backend contract**: `SkillBackend`, `SkillRequest`, `SkillResponse`
//! - **Error taxonomy**: quota exhaustion, rejected credential, generic failure
//! - **HTTP backend**: JSON over HTTP via reqwest
//! - **Scripted backend**: canned outcomes for tests and offline use

pub mod backend;
pub mod error;
pub mod http;
pub mod scripted;

pub use backend::{SkillBackend, SkillRequest, SkillResponse};
pub use error::{BackendError, BackendErrorKind};
pub use http::{HttpBackendConfig, HttpSkillBackend};
pub use scripted::ScriptedBackend;
