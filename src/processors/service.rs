//! Service/container annotation processor
//!
//! Unlike the other kinds, the service model inherits fields from the owning
//! listener declaration itself: unset ports default to the listener's port
//! argument, and the protocol comes from the listener's type qualifier.

use crate::annotation::{
    expect_int, expect_map, expect_string, Attachment, KeyPath, ListenerInit, Owner, Value,
};
use crate::context::GeneratorContext;
use crate::error::Error;
use crate::models::{ResourceModel, ServiceModel, UNSET_PORT};
use crate::names::{default_name, is_blank, sanitize, SVC_SUFFIX};
use crate::Result;

pub(crate) fn process(
    ctx: &mut GeneratorContext,
    owner: &Owner,
    attachment: &Attachment,
) -> Result<ResourceModel> {
    if owner.is_service && !owner.anonymous {
        return Err(Error::configuration(
            "a service annotation on a service is only supported when the service \
             is bound to an anonymous listener",
        ));
    }
    let Some(init) = &owner.listener else {
        return Err(Error::configuration(format!(
            "no listener declaration visible for service annotation on '{}'",
            owner.name
        )));
    };

    let mut model = decode(attachment)?;
    if is_blank(&model.name) {
        model.name = default_name(owner, SVC_SUFFIX);
    }

    // An explicit annotation port becomes the k8s service port while the
    // listener port stays the target port; with no explicit ports the
    // listener port serves as both.
    if model.port == UNSET_PORT {
        model.port = listener_port(init)?;
    }
    if model.target_port == UNSET_PORT {
        model.target_port = listener_port(init)?;
    }

    model.protocol = init.protocol.clone();
    if model.protocol == "http" && super::has_secure_socket(owner) {
        model.protocol = "https".to_string();
    }

    super::process_listener_config(ctx, owner)?;
    ctx.insert_service(&owner.name, model.clone())?;
    Ok(ResourceModel::Service(model))
}

/// Parse the listener's first constructor argument as a port number.
fn listener_port(init: &ListenerInit) -> Result<i32> {
    match init.port_arg() {
        Some(Value::Int(port)) => i32::try_from(*port).map_err(|_| {
            Error::configuration(format!("listener port {port} out of range"))
        }),
        Some(Value::String(expr)) => expr.parse().map_err(|_| {
            Error::configuration(format!(
                "unable to parse port/targetPort for the service: {expr}"
            ))
        }),
        Some(other) => Err(Error::configuration(format!(
            "unable to parse port/targetPort for the service: found {}",
            other.type_name()
        ))),
        None => Err(Error::configuration(
            "listener declaration has no port argument",
        )),
    }
}

fn decode(attachment: &Attachment) -> Result<ServiceModel> {
    let mut model = ServiceModel::default();
    let root = KeyPath::new();
    for (key, value) in attachment.pairs() {
        let path = root.key(key);
        match key.as_str() {
            "name" => model.name = sanitize(&expect_string(value, &path)?),
            "labels" => model.labels = expect_map(value, &path)?,
            "annotations" => model.annotations = expect_map(value, &path)?,
            "serviceType" => model.service_type = expect_string(value, &path)?,
            "portName" => model.port_name = Some(expect_string(value, &path)?),
            "port" => model.port = expect_int(value, &path)?,
            "targetPort" => model.target_port = expect_int(value, &path)?,
            "sessionAffinity" => model.session_affinity = Some(expect_string(value, &path)?),
            other => super::ignore_legacy_key("service", other),
        }
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationKind;

    fn attachment(pairs: Vec<(&str, Value)>) -> Attachment {
        Attachment::new(
            AnnotationKind::Service,
            pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        )
    }

    fn http_listener(name: &str, port: Value) -> Owner {
        Owner::listener(name, ListenerInit::new("http", vec![port]))
    }

    #[test]
    fn test_ports_default_from_listener() {
        let mut ctx = GeneratorContext::new("/opt/runtime");
        let owner = http_listener("helloEP", Value::Int(9090));

        let model = process(&mut ctx, &owner, &attachment(vec![])).unwrap();
        let ResourceModel::Service(model) = model else {
            panic!("expected service model");
        };
        assert_eq!(model.name, "helloep-svc");
        assert_eq!(model.port, 9090);
        assert_eq!(model.target_port, 9090);
        assert_eq!(model.protocol, "http");
        assert_eq!(model.service_type, "ClusterIP");
    }

    #[test]
    fn test_explicit_port_keeps_listener_target_port() {
        let mut ctx = GeneratorContext::new("/opt/runtime");
        let owner = http_listener("helloEP", Value::Int(9090));
        let att = attachment(vec![("port", Value::Int(80))]);

        let model = process(&mut ctx, &owner, &att).unwrap();
        let ResourceModel::Service(model) = model else {
            panic!("expected service model");
        };
        assert_eq!(model.port, 80);
        assert_eq!(model.target_port, 9090);
    }

    #[test]
    fn test_port_expression_as_string_parses() {
        let mut ctx = GeneratorContext::new("/opt/runtime");
        let owner = http_listener("ep", Value::string("8443"));

        let model = process(&mut ctx, &owner, &attachment(vec![])).unwrap();
        let ResourceModel::Service(model) = model else {
            panic!("expected service model");
        };
        assert_eq!(model.port, 8443);
    }

    #[test]
    fn test_unparsable_port_argument_is_fatal() {
        let mut ctx = GeneratorContext::new("/opt/runtime");
        let owner = http_listener("ep", Value::string("config.port"));

        let err = process(&mut ctx, &owner, &attachment(vec![])).unwrap_err();
        assert!(err
            .to_string()
            .contains("unable to parse port/targetPort for the service: config.port"));
        assert!(ctx.services().is_empty());
    }

    #[test]
    fn test_secure_socket_upgrades_protocol() {
        let mut ctx = GeneratorContext::new("/opt/runtime");
        let owner = Owner::listener(
            "ep",
            ListenerInit::new(
                "http",
                vec![
                    Value::Int(9090),
                    Value::Record(vec![("secureSocket".to_string(), Value::Record(vec![]))]),
                ],
            ),
        );

        let model = process(&mut ctx, &owner, &attachment(vec![])).unwrap();
        let ResourceModel::Service(model) = model else {
            panic!("expected service model");
        };
        assert_eq!(model.protocol, "https");
    }

    #[test]
    fn test_non_http_protocol_not_upgraded() {
        let mut ctx = GeneratorContext::new("/opt/runtime");
        let owner = Owner::listener(
            "ep",
            ListenerInit::new(
                "grpc",
                vec![
                    Value::Int(9090),
                    Value::Record(vec![("secureSocket".to_string(), Value::Record(vec![]))]),
                ],
            ),
        );

        let model = process(&mut ctx, &owner, &attachment(vec![])).unwrap();
        let ResourceModel::Service(model) = model else {
            panic!("expected service model");
        };
        assert_eq!(model.protocol, "grpc");
    }

    #[test]
    fn test_explicit_fields_resolve() {
        let mut ctx = GeneratorContext::new("/opt/runtime");
        let owner = http_listener("ep", Value::Int(9090));
        let att = attachment(vec![
            ("name", Value::string("hello_svc")),
            ("serviceType", Value::string("NodePort")),
            ("portName", Value::string("http-port")),
            ("sessionAffinity", Value::string("ClientIP")),
        ]);

        let model = process(&mut ctx, &owner, &att).unwrap();
        let ResourceModel::Service(model) = model else {
            panic!("expected service model");
        };
        assert_eq!(model.name, "hello-svc");
        assert_eq!(model.service_type, "NodePort");
        assert_eq!(model.port_name.as_deref(), Some("http-port"));
        assert_eq!(model.session_affinity.as_deref(), Some("ClientIP"));
    }

    #[test]
    fn test_service_on_named_listener_rejected() {
        let mut ctx = GeneratorContext::new("/opt/runtime");
        let owner = Owner::service("helloService");

        let err = process(&mut ctx, &owner, &attachment(vec![])).unwrap_err();
        assert!(err.to_string().contains("anonymous listener"));
    }
}
