//! Resolved resource models
//!
//! Plain serde-serializable descriptors of the deployment artifacts this
//! crate resolves. The downstream serializer turns these into manifest
//! files; nothing here performs I/O.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sentinel for a port field the source did not set
pub const UNSET_PORT: i32 = -1;

// =============================================================================
// Ingress
// =============================================================================

/// Kubernetes ingress rule resolved from an `Ingress` annotation
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngressModel {
    /// Resource name, defaulted from the owning listener when blank
    pub name: String,
    /// Labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Ingress hostname, defaulted from the owning listener when blank
    pub hostname: String,
    /// HTTP path served by this rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Rewrite target path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<String>,
    /// Ingress controller class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_class: Option<String>,
    /// Whether TLS termination is enabled
    #[serde(default)]
    pub enable_tls: bool,
    /// Name of the listener this rule exposes
    pub listener_name: String,
}

// =============================================================================
// Service
// =============================================================================

/// Kubernetes service/container spec resolved from a `Service` annotation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceModel {
    /// Resource name, defaulted from the owning declaration when blank
    pub name: String,
    /// Labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Service type (ClusterIP, NodePort, LoadBalancer)
    pub service_type: String,
    /// Name of the service port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_name: Option<String>,
    /// Service port; [`UNSET_PORT`] until defaulted from the listener
    pub port: i32,
    /// Container target port; [`UNSET_PORT`] until defaulted from the listener
    pub target_port: i32,
    /// Session affinity setting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_affinity: Option<String>,
    /// Protocol derived from the listener type ("http" or "https")
    pub protocol: String,
}

impl Default for ServiceModel {
    fn default() -> Self {
        Self {
            name: String::new(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            service_type: "ClusterIP".to_string(),
            port_name: None,
            port: UNSET_PORT,
            target_port: UNSET_PORT,
            session_affinity: None,
            protocol: String::new(),
        }
    }
}

// =============================================================================
// Istio virtual service
// =============================================================================

/// Istio virtual service resolved from a `VirtualService` annotation
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VirtualServiceModel {
    /// Resource name, defaulted from the owning declaration when blank
    pub name: String,
    /// Labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Destination hosts; defaults to `["*"]` when unset
    pub hosts: Vec<String>,
    /// Gateways this virtual service binds to, in source order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gateways: Vec<String>,
    /// HTTP routes, in source order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub http: Vec<HttpRoute>,
}

/// One HTTP route entry of a virtual service
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HttpRoute {
    /// Weighted destinations, in source order
    pub route: Vec<DestinationWeight>,
    /// Request timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    /// Headers appended to matched requests
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub append_headers: BTreeMap<String, String>,
}

/// A destination and the share of traffic routed to it
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DestinationWeight {
    /// The routing destination
    pub destination: Destination,
    /// Traffic weight in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
}

/// A routing destination of a virtual service
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    /// Destination service host
    pub host: String,
    /// Destination subset name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subset: Option<String>,
    /// Destination service port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
}

// =============================================================================
// Istio gateway
// =============================================================================

/// Istio gateway resolved from a `Gateway` annotation
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayModel {
    /// Resource name, defaulted from the owning declaration when blank
    pub name: String,
    /// Labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Workload selector for the gateway proxy
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selector: BTreeMap<String, String>,
    /// Server entries, in source order
    pub servers: Vec<GatewayServer>,
}

/// One server entry of a gateway
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayServer {
    /// The port the proxy listens on
    pub port: GatewayPort,
    /// Hosts exposed by this server, in source order
    pub hosts: Vec<String>,
    /// TLS options for this server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsOptions>,
}

/// Listening port of a gateway server
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayPort {
    /// Port number
    pub number: i32,
    /// Port name
    pub name: String,
    /// Port protocol (HTTP, HTTPS, TCP, ...)
    pub protocol: String,
}

/// TLS options of a gateway server
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TlsOptions {
    /// Redirect plain-HTTP requests to HTTPS
    #[serde(default)]
    pub https_redirect: bool,
    /// TLS termination mode
    pub mode: TlsMode,
    /// Server certificate path (SIMPLE and MUTUAL modes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_certificate: Option<String>,
    /// Private key path (SIMPLE and MUTUAL modes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    /// CA certificate bundle path (MUTUAL mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_certificates: Option<String>,
    /// Accepted subject alternative names, in source order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_alt_names: Vec<String>,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            https_redirect: false,
            mode: TlsMode::Passthrough,
            server_certificate: None,
            private_key: None,
            ca_certificates: None,
            subject_alt_names: Vec::new(),
        }
    }
}

/// TLS termination mode of a gateway server
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TlsMode {
    /// Forward the TLS stream unterminated
    Passthrough,
    /// Terminate TLS with a server certificate
    Simple,
    /// Terminate TLS and require client certificates
    Mutual,
}

impl TlsMode {
    /// Parse the annotation's string form of a TLS mode
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PASSTHROUGH" => Some(Self::Passthrough),
            "SIMPLE" => Some(Self::Simple),
            "MUTUAL" => Some(Self::Mutual),
            _ => None,
        }
    }
}

// =============================================================================
// Secrets
// =============================================================================

/// Kubernetes secret holding base64-encoded key material
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecretModel {
    /// Resource name
    pub name: String,
    /// Directory the secret volume mounts at
    pub mount_path: String,
    /// File name to base64-encoded content
    pub data: BTreeMap<String, String>,
}

// =============================================================================
// Closed sum over resource kinds
// =============================================================================

/// Any resolved resource model, for callers that iterate a whole run
#[derive(Clone, Debug, PartialEq)]
pub enum ResourceModel {
    /// Ingress rule
    Ingress(IngressModel),
    /// Service/container spec
    Service(ServiceModel),
    /// Istio virtual service
    VirtualService(VirtualServiceModel),
    /// Istio gateway
    Gateway(GatewayModel),
    /// Secret mount
    Secret(SecretModel),
}

impl ResourceModel {
    /// The resolved resource name
    pub fn name(&self) -> &str {
        match self {
            ResourceModel::Ingress(m) => &m.name,
            ResourceModel::Service(m) => &m.name,
            ResourceModel::VirtualService(m) => &m.name,
            ResourceModel::Gateway(m) => &m.name,
            ResourceModel::Secret(m) => &m.name,
        }
    }

    /// Kind label used in logs and error messages
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceModel::Ingress(_) => "ingress",
            ResourceModel::Service(_) => "service",
            ResourceModel::VirtualService(_) => "virtual service",
            ResourceModel::Gateway(_) => "gateway",
            ResourceModel::Secret(_) => "secret",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_model_defaults() {
        let model = ServiceModel::default();
        assert_eq!(model.service_type, "ClusterIP");
        assert_eq!(model.port, UNSET_PORT);
        assert_eq!(model.target_port, UNSET_PORT);
    }

    #[test]
    fn test_tls_options_default_to_passthrough() {
        let tls = TlsOptions::default();
        assert_eq!(tls.mode, TlsMode::Passthrough);
        assert!(!tls.https_redirect);
    }

    #[test]
    fn test_tls_mode_parse() {
        assert_eq!(TlsMode::parse("SIMPLE"), Some(TlsMode::Simple));
        assert_eq!(TlsMode::parse("MUTUAL"), Some(TlsMode::Mutual));
        assert_eq!(TlsMode::parse("simple"), None);
    }

    #[test]
    fn test_ingress_serializes_camel_case() {
        let model = IngressModel {
            name: "shop-ingress".to_string(),
            hostname: "shop.example.com".to_string(),
            target_path: Some("/".to_string()),
            enable_tls: true,
            listener_name: "shopEP".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&model).expect("serializes");
        assert_eq!(json["targetPath"], "/");
        assert_eq!(json["enableTls"], true);
        assert_eq!(json["listenerName"], "shopEP");
        // Empty maps are omitted entirely
        assert!(json.get("labels").is_none());
    }

    #[test]
    fn test_resource_model_kind_and_name() {
        let model = ResourceModel::Secret(SecretModel {
            name: "listener-keystore".to_string(),
            mount_path: "/sec".to_string(),
            data: BTreeMap::new(),
        });
        assert_eq!(model.kind(), "secret");
        assert_eq!(model.name(), "listener-keystore");
    }
}
