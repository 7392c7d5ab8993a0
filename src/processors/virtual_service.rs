//! Istio virtual service annotation processor
//!
//! Virtual service annotations are decoded strictly at every depth: any key
//! outside the schema fails the whole resolution with the traversed key
//! path, and nothing is registered.

use crate::annotation::{
    expect_i64, expect_int, expect_list, expect_map, expect_record, expect_string,
    expect_string_list, Attachment, KeyPath, Owner, Value,
};
use crate::context::GeneratorContext;
use crate::error::Error;
use crate::models::{
    Destination, DestinationWeight, HttpRoute, ResourceModel, VirtualServiceModel,
};
use crate::names::{default_name, is_blank, sanitize, VIRTUAL_SERVICE_SUFFIX};
use crate::Result;

pub(crate) fn process(
    ctx: &mut GeneratorContext,
    owner: &Owner,
    attachment: &Attachment,
) -> Result<ResourceModel> {
    let mut model = decode(attachment)?;
    if is_blank(&model.name) {
        model.name = default_name(owner, VIRTUAL_SERVICE_SUFFIX);
    }
    if model.hosts.is_empty() {
        model.hosts = vec!["*".to_string()];
    }

    ctx.insert_virtual_service(&owner.name, model.clone())?;
    Ok(ResourceModel::VirtualService(model))
}

fn decode(attachment: &Attachment) -> Result<VirtualServiceModel> {
    let mut model = VirtualServiceModel::default();
    let root = KeyPath::new();
    for (key, value) in attachment.pairs() {
        let path = root.key(key);
        match key.as_str() {
            "name" => model.name = sanitize(&expect_string(value, &path)?),
            "labels" => model.labels = expect_map(value, &path)?,
            "annotations" => model.annotations = expect_map(value, &path)?,
            "hosts" => model.hosts = expect_string_list(value, &path)?,
            "gateways" => model.gateways = expect_string_list(value, &path)?,
            "http" => model.http = decode_http(value, &path)?,
            _ => return Err(unrecognized(&path)),
        }
    }
    Ok(model)
}

fn decode_http(value: &Value, path: &KeyPath) -> Result<Vec<HttpRoute>> {
    let entries = expect_list(value, path)?;
    let mut routes = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let entry_path = path.index(i);
        let mut route = HttpRoute::default();
        for (key, value) in expect_record(entry, &entry_path)? {
            let path = entry_path.key(key);
            match key.as_str() {
                "route" => route.route = decode_routes(value, &path)?,
                "timeout" => route.timeout = Some(expect_i64(value, &path)?),
                "appendHeaders" => route.append_headers = expect_map(value, &path)?,
                _ => return Err(unrecognized(&path)),
            }
        }
        routes.push(route);
    }
    Ok(routes)
}

fn decode_routes(value: &Value, path: &KeyPath) -> Result<Vec<DestinationWeight>> {
    let entries = expect_list(value, path)?;
    let mut weights = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let entry_path = path.index(i);
        let mut weight = DestinationWeight::default();
        for (key, value) in expect_record(entry, &entry_path)? {
            let path = entry_path.key(key);
            match key.as_str() {
                "destination" => weight.destination = decode_destination(value, &path)?,
                "weight" => weight.weight = Some(expect_int(value, &path)?),
                _ => return Err(unrecognized(&path)),
            }
        }
        weights.push(weight);
    }
    Ok(weights)
}

fn decode_destination(value: &Value, path: &KeyPath) -> Result<Destination> {
    let mut destination = Destination::default();
    for (key, value) in expect_record(value, path)? {
        let path = path.key(key);
        match key.as_str() {
            "host" => destination.host = expect_string(value, &path)?,
            "subset" => destination.subset = Some(expect_string(value, &path)?),
            "port" => destination.port = Some(expect_int(value, &path)?),
            _ => return Err(unrecognized(&path)),
        }
    }
    Ok(destination)
}

fn unrecognized(path: &KeyPath) -> Error {
    Error::configuration_at(path, "unrecognized virtual service annotation key")
}
