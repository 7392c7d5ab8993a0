//! Istio gateway annotation processor
//!
//! Gateway annotations are decoded strictly at every depth, like virtual
//! services. TLS options are additionally cross-validated: certificate
//! fields must match the declared termination mode.

use crate::annotation::{
    expect_bool, expect_int, expect_list, expect_map, expect_record, expect_string,
    expect_string_list, Attachment, KeyPath, Owner, Value,
};
use crate::context::GeneratorContext;
use crate::error::Error;
use crate::models::{GatewayModel, GatewayPort, GatewayServer, ResourceModel, TlsMode, TlsOptions};
use crate::names::{default_name, is_blank, sanitize, GATEWAY_SUFFIX};
use crate::Result;

pub(crate) fn process(
    ctx: &mut GeneratorContext,
    owner: &Owner,
    attachment: &Attachment,
) -> Result<ResourceModel> {
    let mut model = decode(attachment)?;
    if is_blank(&model.name) {
        model.name = default_name(owner, GATEWAY_SUFFIX);
    }

    ctx.insert_gateway(&owner.name, model.clone())?;
    Ok(ResourceModel::Gateway(model))
}

fn decode(attachment: &Attachment) -> Result<GatewayModel> {
    let mut model = GatewayModel::default();
    let root = KeyPath::new();
    for (key, value) in attachment.pairs() {
        let path = root.key(key);
        match key.as_str() {
            "name" => model.name = sanitize(&expect_string(value, &path)?),
            "labels" => model.labels = expect_map(value, &path)?,
            "annotations" => model.annotations = expect_map(value, &path)?,
            "selector" => model.selector = expect_map(value, &path)?,
            "servers" => model.servers = decode_servers(value, &path)?,
            _ => return Err(unrecognized(&path)),
        }
    }
    Ok(model)
}

fn decode_servers(value: &Value, path: &KeyPath) -> Result<Vec<GatewayServer>> {
    let entries = expect_list(value, path)?;
    let mut servers = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let entry_path = path.index(i);
        let mut server = GatewayServer::default();
        for (key, value) in expect_record(entry, &entry_path)? {
            let path = entry_path.key(key);
            match key.as_str() {
                "port" => server.port = decode_port(value, &path)?,
                "hosts" => server.hosts = expect_string_list(value, &path)?,
                "tls" => server.tls = Some(decode_tls(value, &path)?),
                _ => return Err(unrecognized(&path)),
            }
        }
        servers.push(server);
    }
    Ok(servers)
}

fn decode_port(value: &Value, path: &KeyPath) -> Result<GatewayPort> {
    let mut port = GatewayPort::default();
    for (key, value) in expect_record(value, path)? {
        let path = path.key(key);
        match key.as_str() {
            "number" => port.number = expect_int(value, &path)?,
            "name" => port.name = expect_string(value, &path)?,
            "protocol" => port.protocol = expect_string(value, &path)?,
            _ => return Err(unrecognized(&path)),
        }
    }
    Ok(port)
}

fn decode_tls(value: &Value, path: &KeyPath) -> Result<TlsOptions> {
    let mut tls = TlsOptions::default();
    for (key, value) in expect_record(value, path)? {
        let key_path = path.key(key);
        match key.as_str() {
            "httpsRedirect" => tls.https_redirect = expect_bool(value, &key_path)?,
            "mode" => {
                let mode = expect_string(value, &key_path)?;
                tls.mode = TlsMode::parse(&mode).ok_or_else(|| {
                    Error::configuration_at(&key_path, format!("unknown TLS mode '{mode}'"))
                })?;
            }
            "serverCertificate" => {
                tls.server_certificate = Some(expect_string(value, &key_path)?);
            }
            "privateKey" => tls.private_key = Some(expect_string(value, &key_path)?),
            "caCertificates" => tls.ca_certificates = Some(expect_string(value, &key_path)?),
            "subjectAltNames" => tls.subject_alt_names = expect_string_list(value, &key_path)?,
            _ => return Err(unrecognized(&key_path)),
        }
    }
    validate_tls(&tls, path)?;
    Ok(tls)
}

/// Certificate fields must be consistent with the termination mode.
fn validate_tls(tls: &TlsOptions, path: &KeyPath) -> Result<()> {
    match tls.mode {
        TlsMode::Simple | TlsMode::Mutual
            if tls.server_certificate.is_none() || tls.private_key.is_none() =>
        {
            Err(Error::configuration_at(
                path,
                "TLS modes SIMPLE and MUTUAL require serverCertificate and privateKey",
            ))
        }
        TlsMode::Mutual if tls.ca_certificates.is_none() => Err(Error::configuration_at(
            path,
            "TLS mode MUTUAL requires caCertificates",
        )),
        _ => Ok(()),
    }
}

fn unrecognized(path: &KeyPath) -> Error {
    Error::configuration_at(path, "unrecognized gateway annotation key")
}
