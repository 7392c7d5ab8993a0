//! Per-kind resource processors
//!
//! One processor per resource kind, each building one model from one
//! annotation attachment and registering it into the [`GeneratorContext`].
//! Attachments resolve to completion in declaration order; the first error
//! aborts the run with nothing registered for the failing attachment.

use tracing::debug;

use crate::annotation::{AnnotationKind, Attachment, Owner, Value};
use crate::context::GeneratorContext;
use crate::models::ResourceModel;
use crate::secrets;
use crate::Result;

mod gateway;
mod ingress;
mod service;
mod virtual_service;

const SECURE_SOCKET: &str = "secureSocket";

/// Resolve one attachment into its resource model, registering the model
/// (and any extracted secrets) into the context as a side effect.
pub fn process(
    ctx: &mut GeneratorContext,
    owner: &Owner,
    attachment: &Attachment,
) -> Result<ResourceModel> {
    match attachment.kind {
        AnnotationKind::Ingress => ingress::process(ctx, owner, attachment),
        AnnotationKind::Service => service::process(ctx, owner, attachment),
        AnnotationKind::VirtualService => virtual_service::process(ctx, owner, attachment),
        AnnotationKind::Gateway => gateway::process(ctx, owner, attachment),
    }
}

/// Scan the owner's listener configuration for a `secureSocket` block and
/// register the secrets it references.
///
/// Shared by the ingress and service processors; other kinds carry no key
/// material.
fn process_listener_config(ctx: &mut GeneratorContext, owner: &Owner) -> Result<()> {
    let Some(init) = &owner.listener else {
        return Ok(());
    };
    let Some(config) = init.config_record() else {
        return Ok(());
    };
    for (key, value) in config {
        if key == SECURE_SOCKET {
            if let Value::Record(pairs) = value {
                let resolved =
                    secrets::resolve_secure_socket(&owner.name, pairs, ctx.install_root())?;
                ctx.add_listener_secrets(&owner.name, resolved)?;
            }
        }
    }
    Ok(())
}

/// Whether the owner's listener configuration carries a `secureSocket` block
fn has_secure_socket(owner: &Owner) -> bool {
    owner
        .listener
        .as_ref()
        .and_then(|init| init.config_record())
        .is_some_and(|config| config.iter().any(|(key, _)| key == SECURE_SOCKET))
}

/// Log and skip an unrecognized top-level key.
///
/// Top-level keys stay non-strict for backward compatibility with older
/// annotation schemas; keys inside nested blocks are always fatal.
fn ignore_legacy_key(kind: &str, key: &str) {
    debug!(kind, key, "ignoring unrecognized top-level annotation key");
}
