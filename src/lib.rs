//! Deployment annotation resolution engine
//!
//! Converts declarative deployment annotations attached to network listener
//! and service declarations into typed Kubernetes resource models:
//! - Ingress rules
//! - Istio virtual services and gateways
//! - Service/container specs
//! - Secret mounts for TLS key material
//!
//! The front-end that parses source text into [`Attachment`] trees and the
//! serializer that renders resolved models into manifests are external
//! collaborators. This crate owns the middle: per-kind processors, the
//! defaulting and validation rules, the file-backed secret resolver, and the
//! run-scoped [`GeneratorContext`] that accumulates resolved models.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut ctx = GeneratorContext::new("/opt/runtime");
//! for (owner, attachment) in parsed_unit {
//!     processors::process(&mut ctx, &owner, &attachment)?;
//! }
//! serializer::write(&ctx)?;
//! ```
//!
//! Resolution is single-threaded and fail-fast: the first error aborts the
//! run for the active compilation unit with no partial output.

#![deny(missing_docs)]

pub mod annotation;
pub mod context;
pub mod error;
pub mod models;
pub mod names;
pub mod processors;
pub mod secrets;

pub use annotation::{AnnotationKind, Attachment, ListenerInit, Owner, Value};
pub use context::GeneratorContext;
pub use error::Error;
pub use models::ResourceModel;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
