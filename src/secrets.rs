//! Secret material resolver
//!
//! Reads the key-store and trust-store files referenced by a listener's
//! `secureSocket` configuration and packages their contents as secret
//! models. Kubernetes forbids two volumes at one mount path, so when both
//! stores resolve to the same mount directory they collapse into a single
//! merged secret.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::debug;

use crate::annotation::{KeyPath, Value};
use crate::error::Error;
use crate::models::SecretModel;
use crate::names::sanitize;
use crate::Result;

/// Placeholder in secret file paths substituted with the installation root
pub const HOME_PLACEHOLDER: &str = "${runtime.home}";

const KEY_STORE: &str = "keyStore";
const TRUST_STORE: &str = "trustStore";
const PATH_FIELD: &str = "path";

/// Resolve a listener's `secureSocket` record into secret models.
///
/// Returns zero, one, or two secrets: one merged `<owner>-secure-socket`
/// when both stores share a mount directory, otherwise independent
/// `<owner>-keystore` / `<owner>-truststore` entries.
pub fn resolve_secure_socket(
    owner: &str,
    secure_socket: &[(String, Value)],
    install_root: &Path,
) -> Result<Vec<SecretModel>> {
    let mut key_store_file = None;
    let mut trust_store_file = None;
    let path = KeyPath::new().key("secureSocket");
    for (key, value) in secure_socket {
        match key.as_str() {
            KEY_STORE => key_store_file = extract_file_path(value, &path.key(key))?,
            TRUST_STORE => trust_store_file = extract_file_path(value, &path.key(key))?,
            // The secureSocket record carries protocol options (passwords,
            // cipher lists) that are not deployment concerns.
            _ => {}
        }
    }

    let mut secrets = Vec::new();
    if let (Some(key_store), Some(trust_store)) = (&key_store_file, &trust_store_file) {
        let key_store_mount = mount_dir(key_store, install_root)?;
        if key_store_mount == mount_dir(trust_store, install_root)? {
            debug!(owner, mount = %key_store_mount.display(),
                "key store and trust store share a mount directory, merging");
            let mut data = BTreeMap::new();
            let _ = data.insert(file_name(key_store)?, read_encoded(key_store, install_root)?);
            let _ = data.insert(
                file_name(trust_store)?,
                read_encoded(trust_store, install_root)?,
            );
            secrets.push(SecretModel {
                name: format!("{}-secure-socket", sanitize(owner)),
                mount_path: key_store_mount.display().to_string(),
                data,
            });
            return Ok(secrets);
        }
    }

    if let Some(key_store) = &key_store_file {
        secrets.push(single_store_secret(
            key_store,
            format!("{}-keystore", sanitize(owner)),
            install_root,
        )?);
    }
    if let Some(trust_store) = &trust_store_file {
        secrets.push(single_store_secret(
            trust_store,
            format!("{}-truststore", sanitize(owner)),
            install_root,
        )?);
    }
    Ok(secrets)
}

fn single_store_secret(file: &str, name: String, install_root: &Path) -> Result<SecretModel> {
    let mut data = BTreeMap::new();
    let _ = data.insert(file_name(file)?, read_encoded(file, install_root)?);
    Ok(SecretModel {
        name,
        mount_path: mount_dir(file, install_root)?.display().to_string(),
        data,
    })
}

/// Pull the `path` field out of a `keyStore`/`trustStore` sub-record.
fn extract_file_path(value: &Value, path: &KeyPath) -> Result<Option<String>> {
    let pairs = crate::annotation::expect_record(value, path)?;
    for (key, entry) in pairs {
        if key == PATH_FIELD {
            return crate::annotation::expect_string(entry, &path.key(key)).map(Some);
        }
    }
    Ok(None)
}

/// Resolve the directory a secret file mounts at inside the container.
///
/// A relative path at the source level would mount over the project source
/// root, overwriting it; other relative paths mount under the installation
/// root.
fn mount_dir(file_path: &str, install_root: &Path) -> Result<PathBuf> {
    let substituted = substitute_home(file_path, install_root);
    let path = Path::new(&substituted);
    if path.is_relative() && path.parent() == Some(Path::new(".")) {
        return Err(Error::path(
            file_path,
            "a relative path at the source level mounts over the project source root; \
             place the file in a subdirectory (e.g. './security/keystore.p12')",
        ));
    }
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        install_root.join(path)
    };
    match resolved.parent() {
        Some(parent) => Ok(parent.to_path_buf()),
        None => Err(Error::path(file_path, "path has no parent directory")),
    }
}

/// Read a secret file and base64-encode its contents.
fn read_encoded(file_path: &str, install_root: &Path) -> Result<String> {
    let substituted = substitute_home(file_path, install_root);
    let content = fs::read(&substituted)
        .map_err(|e| Error::path(&substituted, format!("unable to read secret file: {e}")))?;
    Ok(STANDARD.encode(content))
}

fn substitute_home(file_path: &str, install_root: &Path) -> String {
    file_path.replace(HOME_PLACEHOLDER, &install_root.display().to_string())
}

fn file_name(file_path: &str) -> Result<String> {
    Path::new(file_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::path(file_path, "path has no file name"))
}
