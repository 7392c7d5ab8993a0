//! Ingress annotation processor

use crate::annotation::{
    expect_bool, expect_map, expect_string, Attachment, KeyPath, Owner,
};
use crate::context::GeneratorContext;
use crate::error::Error;
use crate::models::{IngressModel, ResourceModel};
use crate::names::{default_hostname, default_name, is_blank, sanitize, INGRESS_SUFFIX};
use crate::Result;

pub(crate) fn process(
    ctx: &mut GeneratorContext,
    owner: &Owner,
    attachment: &Attachment,
) -> Result<ResourceModel> {
    if owner.is_service && !owner.anonymous {
        return Err(Error::configuration(
            "an ingress annotation on a service is only supported when the service \
             is bound to an anonymous listener",
        ));
    }

    let mut model = decode(attachment)?;
    if is_blank(&model.name) {
        model.name = default_name(owner, INGRESS_SUFFIX);
    }
    if is_blank(&model.hostname) {
        model.hostname = default_hostname(owner);
    }
    model.listener_name = owner.name.clone();

    super::process_listener_config(ctx, owner)?;
    ctx.insert_ingress(&owner.name, model.clone())?;
    Ok(ResourceModel::Ingress(model))
}

fn decode(attachment: &Attachment) -> Result<IngressModel> {
    let mut model = IngressModel::default();
    let root = KeyPath::new();
    for (key, value) in attachment.pairs() {
        let path = root.key(key);
        match key.as_str() {
            "name" => model.name = sanitize(&expect_string(value, &path)?),
            "labels" => model.labels = expect_map(value, &path)?,
            "annotations" => model.annotations = expect_map(value, &path)?,
            "hostname" => model.hostname = expect_string(value, &path)?,
            "path" => model.path = Some(expect_string(value, &path)?),
            "targetPath" => model.target_path = Some(expect_string(value, &path)?),
            "ingressClass" => model.ingress_class = Some(expect_string(value, &path)?),
            "enableTLS" => model.enable_tls = expect_bool(value, &path)?,
            other => super::ignore_legacy_key("ingress", other),
        }
    }
    Ok(model)
}
