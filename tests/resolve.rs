//! End-to-end resolution tests
//!
//! Drive the full pipeline the way the compiler front-end would: build
//! owning declarations and attachments, process them in declaration order,
//! and inspect the populated context the serializer receives.

use std::io::Write;
use std::path::Path;

use kubegen::models::ResourceModel;
use kubegen::{processors, AnnotationKind, Attachment, GeneratorContext, ListenerInit, Owner, Value};

fn record(pairs: Vec<(&str, Value)>) -> Value {
    Value::Record(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

fn attachment(kind: AnnotationKind, pairs: Vec<(&str, Value)>) -> Attachment {
    Attachment::new(
        kind,
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
    )
}

fn write_file(dir: &Path, name: &str, content: &[u8]) -> String {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).expect("create fixture");
    file.write_all(content).expect("write fixture");
    path.display().to_string()
}

#[test]
fn secure_listener_yields_https_service_and_merged_secret() {
    let dir = tempfile::tempdir().expect("tempdir");
    let key_store = write_file(dir.path(), "keystore.p12", b"key material");
    let trust_store = write_file(dir.path(), "truststore.p12", b"trust material");

    // listener myListener(9090, config = { secureSocket: { keyStore, trustStore } })
    let owner = Owner::listener(
        "myListener",
        ListenerInit::new(
            "http",
            vec![
                Value::Int(9090),
                record(vec![(
                    "secureSocket",
                    record(vec![
                        ("keyStore", record(vec![("path", Value::string(&key_store))])),
                        (
                            "trustStore",
                            record(vec![("path", Value::string(&trust_store))]),
                        ),
                    ]),
                )]),
            ],
        ),
    );

    let mut ctx = GeneratorContext::new("/opt/runtime");
    let model = processors::process(&mut ctx, &owner, &attachment(AnnotationKind::Service, vec![]))
        .expect("resolution succeeds");

    let ResourceModel::Service(service) = model else {
        panic!("expected service model");
    };
    assert_eq!(service.protocol, "https");
    assert_eq!(service.port, 9090);
    assert_eq!(service.target_port, 9090);
    assert_eq!(service.name, "mylistener-svc");

    // Both stores share a parent directory, so exactly one merged secret
    assert_eq!(ctx.secrets().len(), 1);
    let secret = &ctx.secrets()["mylistener-secure-socket"];
    assert_eq!(secret.mount_path, dir.path().display().to_string());
    assert_eq!(secret.data.len(), 2);
    assert!(secret.data.contains_key("keystore.p12"));
    assert!(secret.data.contains_key("truststore.p12"));
    assert_eq!(ctx.listener_secrets("myListener"), std::slice::from_ref(secret));
}

#[test]
fn virtual_service_defaults_hosts_and_keeps_route_structure() {
    // http: [{route: [{destination: {host: "svc1", port: 80}, weight: 100}]}]
    let att = attachment(
        AnnotationKind::VirtualService,
        vec![(
            "http",
            Value::List(vec![record(vec![(
                "route",
                Value::List(vec![record(vec![
                    (
                        "destination",
                        record(vec![
                            ("host", Value::string("svc1")),
                            ("port", Value::Int(80)),
                        ]),
                    ),
                    ("weight", Value::Int(100)),
                ])]),
            )])]),
        )],
    );
    let owner = Owner::listener("reviews", ListenerInit::new("http", vec![Value::Int(9090)]));

    let mut ctx = GeneratorContext::new("/opt/runtime");
    processors::process(&mut ctx, &owner, &att).expect("resolution succeeds");

    let vs = &ctx.virtual_services()["reviews"];
    assert_eq!(vs.hosts, vec!["*"]);
    assert_eq!(vs.http.len(), 1);
    assert_eq!(vs.http[0].route.len(), 1);
    let dw = &vs.http[0].route[0];
    assert_eq!(dw.weight, Some(100));
    assert_eq!(dw.destination.host, "svc1");
    assert_eq!(dw.destination.port, Some(80));
}

#[test]
fn failed_attachment_registers_nothing() {
    let att = attachment(
        AnnotationKind::VirtualService,
        vec![
            ("hosts", Value::List(vec![Value::string("shop.example.com")])),
            (
                "http",
                Value::List(vec![record(vec![("retries", Value::Int(3))])]),
            ),
        ],
    );
    let owner = Owner::listener("shopEP", ListenerInit::new("http", vec![Value::Int(80)]));

    let mut ctx = GeneratorContext::new("/opt/runtime");
    let err = processors::process(&mut ctx, &owner, &att).unwrap_err();
    assert!(err.to_string().contains("http[0].retries"));
    assert!(ctx.virtual_services().is_empty());
    assert!(ctx.all_models().is_empty());
}

#[test]
fn declarations_resolve_in_order_and_share_the_context() {
    let mut ctx = GeneratorContext::new("/opt/runtime");

    let shop = Owner::listener("shopEP", ListenerInit::new("http", vec![Value::Int(8080)]));
    processors::process(
        &mut ctx,
        &shop,
        &attachment(AnnotationKind::Ingress, vec![]),
    )
    .expect("shop ingress resolves");
    processors::process(
        &mut ctx,
        &shop,
        &attachment(AnnotationKind::Service, vec![]),
    )
    .expect("shop service resolves");

    let admin = Owner::listener("adminEP", ListenerInit::new("http", vec![Value::Int(9090)]));
    processors::process(
        &mut ctx,
        &admin,
        &attachment(AnnotationKind::Ingress, vec![]),
    )
    .expect("admin ingress resolves");

    assert_eq!(ctx.ingresses().len(), 2);
    assert_eq!(ctx.services().len(), 1);
    assert_eq!(ctx.ingresses()["shopEP"].name, "shopep-ingress");
    assert_eq!(ctx.ingresses()["shopEP"].hostname, "shopep-hostname");
    assert_eq!(ctx.ingresses()["adminEP"].name, "adminep-ingress");
    assert_eq!(ctx.all_models().len(), 3);
}

#[test]
fn duplicate_explicit_names_across_listeners_fail() {
    let mut ctx = GeneratorContext::new("/opt/runtime");
    let name = vec![("name", Value::string("edge"))];

    let a = Owner::listener("aEP", ListenerInit::new("http", vec![Value::Int(80)]));
    processors::process(
        &mut ctx,
        &a,
        &attachment(AnnotationKind::Ingress, name.clone()),
    )
    .expect("first registration succeeds");

    let b = Owner::listener("bEP", ListenerInit::new("http", vec![Value::Int(81)]));
    let err = processors::process(&mut ctx, &b, &attachment(AnnotationKind::Ingress, name))
        .unwrap_err();
    assert!(err.to_string().contains("duplicate ingress name 'edge'"));
}

#[test]
fn anonymous_service_resolution_end_to_end() {
    // service helloWorld on new http:Listener(8080)
    let owner = Owner::anonymous_service(
        "helloWorld",
        ListenerInit::new("http", vec![Value::Int(8080)]),
    );

    let mut ctx = GeneratorContext::new("/opt/runtime");
    processors::process(
        &mut ctx,
        &owner,
        &attachment(AnnotationKind::Service, vec![]),
    )
    .expect("service resolves");
    processors::process(
        &mut ctx,
        &owner,
        &attachment(AnnotationKind::Ingress, vec![]),
    )
    .expect("ingress resolves");

    assert_eq!(ctx.services()["helloWorld"].name, "helloworld-anonymous-svc");
    assert_eq!(ctx.services()["helloWorld"].port, 8080);
    assert_eq!(ctx.ingresses()["helloWorld"].name, "helloworld-anonymous-ingress");
    assert_eq!(ctx.ingresses()["helloWorld"].hostname, "helloworld-hostname");
}

#[test]
fn ingress_and_service_on_one_secured_listener_share_one_secret() {
    let dir = tempfile::tempdir().expect("tempdir");
    let key_store = write_file(dir.path(), "keystore.p12", b"key material");

    let owner = Owner::listener(
        "ep",
        ListenerInit::new(
            "http",
            vec![
                Value::Int(9443),
                record(vec![(
                    "secureSocket",
                    record(vec![(
                        "keyStore",
                        record(vec![("path", Value::string(&key_store))]),
                    )]),
                )]),
            ],
        ),
    );

    let mut ctx = GeneratorContext::new("/opt/runtime");
    processors::process(
        &mut ctx,
        &owner,
        &attachment(AnnotationKind::Ingress, vec![]),
    )
    .expect("ingress resolves");
    processors::process(
        &mut ctx,
        &owner,
        &attachment(AnnotationKind::Service, vec![]),
    )
    .expect("service resolves");

    // Both processors scan the listener config, but the secret is associated
    // with the listener exactly once
    assert_eq!(ctx.secrets().len(), 1);
    let associated = ctx.listener_secrets("ep");
    assert_eq!(associated.len(), 1);
    assert_eq!(associated[0].name, "ep-keystore");
}

#[test]
fn split_key_material_yields_two_secrets() {
    let key_dir = tempfile::tempdir().expect("tempdir");
    let trust_dir = tempfile::tempdir().expect("tempdir");
    let key_store = write_file(key_dir.path(), "keystore.p12", b"key");
    let trust_store = write_file(trust_dir.path(), "truststore.p12", b"trust");

    let owner = Owner::listener(
        "ep",
        ListenerInit::new(
            "http",
            vec![
                Value::Int(9443),
                record(vec![(
                    "secureSocket",
                    record(vec![
                        ("keyStore", record(vec![("path", Value::string(&key_store))])),
                        (
                            "trustStore",
                            record(vec![("path", Value::string(&trust_store))]),
                        ),
                    ]),
                )]),
            ],
        ),
    );

    let mut ctx = GeneratorContext::new("/opt/runtime");
    processors::process(
        &mut ctx,
        &owner,
        &attachment(AnnotationKind::Ingress, vec![]),
    )
    .expect("resolution succeeds");

    assert_eq!(ctx.secrets().len(), 2);
    assert!(ctx.secrets().contains_key("ep-keystore"));
    assert!(ctx.secrets().contains_key("ep-truststore"));
    assert_eq!(ctx.listener_secrets("ep").len(), 2);
}
