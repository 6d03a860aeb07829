//! Distribution dispatcher.
//!
//! Drives the invoice pipeline for one tenant or for every registered
//! tenant, and hands the result to the caller (HTTP stream, zip bundle) or
//! to the mail collaborator. Batch sends isolate per-tenant failures: one
//! broken tenant is recorded and the loop moves on.

use std::io::Write;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::invoice::{GeneratedInvoice, InvoicePipeline, PipelineError};
use crate::mailer::{MailError, Mailer};
use crate::tenants::{TenantConfig, TenantRegistry};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown tenant '{0}'")]
    UnknownTenant(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error("failed to build invoice archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("failed to write archive entry: {0}")]
    ArchiveIo(#[source] std::io::Error),
}

/// Per-tenant outcome of one batch attempt.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DispatchResult {
    pub tenant: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchResult {
    fn succeeded(tenant: &str) -> Self {
        Self {
            tenant: tenant.to_string(),
            ok: true,
            error: None,
        }
    }

    fn failed(tenant: &str, error: &DispatchError) -> Self {
        Self {
            tenant: tenant.to_string(),
            ok: false,
            error: Some(error.to_string()),
        }
    }
}

/// Pipeline runner plus delivery for the whole tenant registry.
pub struct Dispatcher {
    registry: Arc<TenantRegistry>,
    pipeline: InvoicePipeline,
    mailer: Arc<dyn Mailer>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<TenantRegistry>,
        pipeline: InvoicePipeline,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            registry,
            pipeline,
            mailer,
        }
    }

    pub fn registry(&self) -> &TenantRegistry {
        &self.registry
    }

    /// Run the pipeline for one tenant and return the signed PDF.
    pub async fn generate(
        &self,
        tenant_key: &str,
        reference: NaiveDate,
    ) -> Result<GeneratedInvoice, DispatchError> {
        let tenant = self.lookup(tenant_key)?;
        Ok(self.pipeline.generate(tenant, reference).await?)
    }

    /// Run the pipeline for every tenant and bundle the PDFs into a zip
    /// archive, each under its configured filename. Synchronous callers get
    /// a complete archive or an error; partial bundles are not produced.
    pub async fn bundle_all(&self, reference: NaiveDate) -> Result<Vec<u8>, DispatchError> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();

        for (key, tenant) in self.registry.iter() {
            let invoice = self.pipeline.generate(tenant, reference).await.map_err(|e| {
                log::error!("bundle: pipeline failed for tenant {key}: {e}");
                e
            })?;
            writer.start_file(invoice.filename.as_str(), options)?;
            writer
                .write_all(&invoice.pdf)
                .map_err(DispatchError::ArchiveIo)?;
        }

        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }

    /// Generate and email the invoice for one tenant.
    pub async fn send_one(
        &self,
        tenant_key: &str,
        reference: NaiveDate,
    ) -> Result<(), DispatchError> {
        let tenant = self.lookup(tenant_key)?;
        self.send_tenant(tenant_key, tenant, reference).await
    }

    /// Batch send over the whole registry. Never fails as a whole: each
    /// tenant's outcome is accumulated and a failure only affects its own
    /// entry in the result list.
    pub async fn send_all(&self, reference: NaiveDate) -> Vec<DispatchResult> {
        let mut results = Vec::with_capacity(self.registry.len());
        for (key, tenant) in self.registry.iter() {
            match self.send_tenant(key, tenant, reference).await {
                Ok(()) => results.push(DispatchResult::succeeded(key)),
                Err(e) => {
                    log::error!("batch send failed for tenant {key}: {e}");
                    results.push(DispatchResult::failed(key, &e));
                }
            }
        }
        results
    }

    async fn send_tenant(
        &self,
        key: &str,
        tenant: &TenantConfig,
        reference: NaiveDate,
    ) -> Result<(), DispatchError> {
        let invoice = self.pipeline.generate(tenant, reference).await?;
        let label = invoice.period.billing_label();
        let subject = format!("{} - {}", tenant.subject_prefix, label);
        let body = format!(
            "Please find attached the invoice for {} {}.",
            label,
            invoice.period.date_range()
        );

        self.mailer
            .send_invoice(
                &tenant.recipient,
                &tenant.cc,
                &subject,
                &body,
                &invoice.filename,
                invoice.pdf,
            )
            .await?;
        log::info!("invoice for tenant {key} sent to {}", tenant.recipient);
        Ok(())
    }

    fn lookup(&self, key: &str) -> Result<&TenantConfig, DispatchError> {
        self.registry
            .get(key)
            .ok_or_else(|| DispatchError::UnknownTenant(key.to_string()))
    }
}
