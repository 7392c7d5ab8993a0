//! Run-scoped generator context
//!
//! One [`GeneratorContext`] exists per generation run. Processors write
//! resolved models into it keyed by owning declaration name; the downstream
//! serializer reads it once after every attachment in the compilation unit
//! has been processed, then it is discarded. Access is strictly sequential,
//! so the context needs no interior locking.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Error;
use crate::models::{
    GatewayModel, IngressModel, ResourceModel, SecretModel, ServiceModel, VirtualServiceModel,
};
use crate::Result;

/// Run-scoped aggregate of all resolved resource models.
///
/// Passed `&mut` into every processor call; there is no ambient singleton.
/// Each owning declaration holds at most one model per kind, and resource
/// names are unique within a kind across the whole run.
#[derive(Debug)]
pub struct GeneratorContext {
    install_root: PathBuf,
    ingresses: BTreeMap<String, IngressModel>,
    services: BTreeMap<String, ServiceModel>,
    virtual_services: BTreeMap<String, VirtualServiceModel>,
    gateways: BTreeMap<String, GatewayModel>,
    listener_secrets: BTreeMap<String, Vec<SecretModel>>,
    secrets: BTreeMap<String, SecretModel>,
}

impl GeneratorContext {
    /// Create a context for one generation run.
    ///
    /// `install_root` is the process-wide installation root substituted for
    /// the home placeholder in secret file paths.
    pub fn new(install_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
            ingresses: BTreeMap::new(),
            services: BTreeMap::new(),
            virtual_services: BTreeMap::new(),
            gateways: BTreeMap::new(),
            listener_secrets: BTreeMap::new(),
            secrets: BTreeMap::new(),
        }
    }

    /// Installation root used for secret path resolution
    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Register an ingress model under its owning declaration
    pub fn insert_ingress(&mut self, owner: &str, model: IngressModel) -> Result<()> {
        Self::ensure_unique("ingress", &self.ingresses, owner, &model.name)?;
        debug!(owner, name = %model.name, "registered ingress model");
        let _ = self.ingresses.insert(owner.to_string(), model);
        Ok(())
    }

    /// Register a service model under its owning declaration
    pub fn insert_service(&mut self, owner: &str, model: ServiceModel) -> Result<()> {
        Self::ensure_unique("service", &self.services, owner, &model.name)?;
        debug!(owner, name = %model.name, "registered service model");
        let _ = self.services.insert(owner.to_string(), model);
        Ok(())
    }

    /// Register a virtual service model under its owning declaration
    pub fn insert_virtual_service(
        &mut self,
        owner: &str,
        model: VirtualServiceModel,
    ) -> Result<()> {
        Self::ensure_unique("virtual service", &self.virtual_services, owner, &model.name)?;
        debug!(owner, name = %model.name, "registered virtual service model");
        let _ = self.virtual_services.insert(owner.to_string(), model);
        Ok(())
    }

    /// Register a gateway model under its owning declaration
    pub fn insert_gateway(&mut self, owner: &str, model: GatewayModel) -> Result<()> {
        Self::ensure_unique("gateway", &self.gateways, owner, &model.name)?;
        debug!(owner, name = %model.name, "registered gateway model");
        let _ = self.gateways.insert(owner.to_string(), model);
        Ok(())
    }

    /// Associate resolved secrets with a listener and add them to the
    /// aggregate set.
    ///
    /// Secrets dedupe by name: re-registering an identical model is a no-op,
    /// while a name collision with different payloads is a consistency error.
    /// The per-listener association is a set too, so several annotations on
    /// one secured listener share a single entry per secret.
    pub fn add_listener_secrets(&mut self, owner: &str, secrets: Vec<SecretModel>) -> Result<()> {
        for secret in &secrets {
            match self.secrets.get(&secret.name) {
                Some(existing) if existing != secret => {
                    return Err(Error::duplicate("secret", &secret.name));
                }
                Some(_) => {}
                None => {
                    debug!(owner, name = %secret.name, mount = %secret.mount_path,
                        "registered secret model");
                    let _ = self.secrets.insert(secret.name.clone(), secret.clone());
                }
            }
        }
        let associated = self.listener_secrets.entry(owner.to_string()).or_default();
        for secret in secrets {
            if !associated.contains(&secret) {
                associated.push(secret);
            }
        }
        Ok(())
    }

    /// Resolved ingress models, keyed by owning declaration
    pub fn ingresses(&self) -> &BTreeMap<String, IngressModel> {
        &self.ingresses
    }

    /// Resolved service models, keyed by owning declaration
    pub fn services(&self) -> &BTreeMap<String, ServiceModel> {
        &self.services
    }

    /// Resolved virtual service models, keyed by owning declaration
    pub fn virtual_services(&self) -> &BTreeMap<String, VirtualServiceModel> {
        &self.virtual_services
    }

    /// Resolved gateway models, keyed by owning declaration
    pub fn gateways(&self) -> &BTreeMap<String, GatewayModel> {
        &self.gateways
    }

    /// Secrets associated with one listener, if any
    pub fn listener_secrets(&self, owner: &str) -> &[SecretModel] {
        self.listener_secrets
            .get(owner)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The aggregate secret set, keyed by secret name
    pub fn secrets(&self) -> &BTreeMap<String, SecretModel> {
        &self.secrets
    }

    /// Every resolved model of the run, for serializers that iterate all
    /// artifacts uniformly.
    pub fn all_models(&self) -> Vec<ResourceModel> {
        let mut models = Vec::new();
        models.extend(self.ingresses.values().cloned().map(ResourceModel::Ingress));
        models.extend(self.services.values().cloned().map(ResourceModel::Service));
        models.extend(
            self.virtual_services
                .values()
                .cloned()
                .map(ResourceModel::VirtualService),
        );
        models.extend(self.gateways.values().cloned().map(ResourceModel::Gateway));
        models.extend(self.secrets.values().cloned().map(ResourceModel::Secret));
        models
    }

    /// Reject a resource name already registered under a different owner.
    fn ensure_unique<M>(
        kind: &str,
        registered: &BTreeMap<String, M>,
        owner: &str,
        name: &str,
    ) -> Result<()>
    where
        M: HasName,
    {
        for (other_owner, model) in registered {
            if other_owner != owner && model.name() == name {
                return Err(Error::duplicate(kind, name));
            }
        }
        Ok(())
    }
}

/// Internal access to a model's resolved name for uniqueness checks
trait HasName {
    fn name(&self) -> &str;
}

macro_rules! impl_has_name {
    ($($ty:ty),*) => {
        $(impl HasName for $ty {
            fn name(&self) -> &str {
                &self.name
            }
        })*
    };
}

impl_has_name!(IngressModel, ServiceModel, VirtualServiceModel, GatewayModel);
