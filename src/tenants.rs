//! Tenant registry.
//!
//! Static mapping from tenant key to its billing configuration, loaded once
//! from a TOML file at startup and shared read-only for the life of the
//! process. There is deliberately no mutation or reload API.
//!
//! Registry file shape:
//!
//! ```toml
//! [tenants.big]
//! template = "assets/big/Invoice.xlsx"
//! signature = "assets/big/Signature.png"
//! output_name = "Invoice_Signed.pdf"
//! recipient = "accounts@example.com"
//! cc = ["owner@example.com"]
//! subject_prefix = "Rent Invoice"
//! invoice_code = "BIG"
//! rect = { x = 620.0, y = 370.0, width = 100.0, height = 100.0 }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::invoice::signature::SignatureRect;

/// Billing configuration for one invoice recipient. Immutable after load.
#[derive(Debug, Clone, Deserialize)]
pub struct TenantConfig {
    /// Source xlsx template; copied per run, never written in place.
    pub template: PathBuf,
    /// Signature/stamp raster overlaid on the generated PDF.
    pub signature: PathBuf,
    /// File name the finished PDF is delivered under.
    pub output_name: String,
    pub recipient: String,
    #[serde(default)]
    pub cc: Vec<String>,
    pub subject_prefix: String,
    /// Invoice numbering code, the middle segment of the invoice number.
    pub invoice_code: String,
    /// Placement rectangle; tenants that omit it share the default stamp
    /// geometry.
    #[serde(default)]
    pub rect: SignatureRect,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read tenant registry file: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to parse tenant registry: {0}")]
    Parse(#[source] toml::de::Error),
    #[error("tenant registry is empty")]
    Empty,
    #[error("tenant '{tenant}' has a signature rectangle with non-positive size")]
    InvalidRect { tenant: String },
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    tenants: BTreeMap<String, TenantConfig>,
}

/// Process-wide read-only tenant map.
#[derive(Debug)]
pub struct TenantRegistry {
    tenants: BTreeMap<String, TenantConfig>,
}

impl TenantRegistry {
    /// Load and validate the registry from a TOML file.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let raw = std::fs::read_to_string(path).map_err(RegistryError::Read)?;
        let file: RegistryFile = toml::from_str(&raw).map_err(RegistryError::Parse)?;
        Self::from_map(file.tenants)
    }

    pub fn from_map(tenants: BTreeMap<String, TenantConfig>) -> Result<Self, RegistryError> {
        if tenants.is_empty() {
            return Err(RegistryError::Empty);
        }
        for (key, tenant) in &tenants {
            if !tenant.rect.is_valid() {
                return Err(RegistryError::InvalidRect {
                    tenant: key.clone(),
                });
            }
        }
        Ok(Self { tenants })
    }

    pub fn get(&self, key: &str) -> Option<&TenantConfig> {
        self.tenants.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TenantConfig)> {
        self.tenants.iter()
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}
