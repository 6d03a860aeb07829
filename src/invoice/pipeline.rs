//! Single-tenant pipeline run.
//!
//! Allocates a fresh temporary workspace, copies the tenant template into
//! it, and walks the populate/convert/stamp stages. The workspace is removed
//! when the run ends, on success and on every failure path alike.

use chrono::NaiveDate;

use crate::tenants::TenantConfig;

use super::convert::PdfConverter;
use super::period::FiscalPeriod;
use super::signature::stamp_signature;
use super::template::populate_template;
use super::{AssetKind, PipelineError};

/// Working-copy name inside the workspace; also fixes the converter's
/// output stem.
const WORKING_NAME: &str = "Invoice.xlsx";

/// Finished, signed invoice for one tenant at one point in time. Held in
/// memory only; nothing is persisted.
#[derive(Debug)]
pub struct GeneratedInvoice {
    pub filename: String,
    pub pdf: Vec<u8>,
    pub period: FiscalPeriod,
}

/// Runs the populate -> convert -> stamp stages for one tenant.
#[derive(Debug, Clone)]
pub struct InvoicePipeline {
    converter: PdfConverter,
    workspace_root: Option<std::path::PathBuf>,
}

impl InvoicePipeline {
    pub fn new(converter: PdfConverter) -> Self {
        Self {
            converter,
            workspace_root: None,
        }
    }

    /// Allocate per-run workspaces under `root` instead of the system
    /// temporary directory.
    pub fn with_workspace_root(mut self, root: impl Into<std::path::PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Produce the signed invoice PDF for `tenant` as of `reference`.
    ///
    /// Both input assets are checked up front so a missing file fails before
    /// any mutation is attempted.
    pub async fn generate(
        &self,
        tenant: &TenantConfig,
        reference: NaiveDate,
    ) -> Result<GeneratedInvoice, PipelineError> {
        if !tenant.template.exists() {
            return Err(PipelineError::AssetMissing(AssetKind::Template));
        }
        if !tenant.signature.exists() {
            return Err(PipelineError::AssetMissing(AssetKind::Signature));
        }

        let period = FiscalPeriod::for_date(reference);
        let workspace = match &self.workspace_root {
            Some(root) => tempfile::tempdir_in(root),
            None => tempfile::tempdir(),
        }
        .map_err(PipelineError::Workspace)?;
        let working = workspace.path().join(WORKING_NAME);
        std::fs::copy(&tenant.template, &working).map_err(PipelineError::Workspace)?;

        {
            let working = working.clone();
            let code = tenant.invoice_code.clone();
            let period = period.clone();
            tokio::task::spawn_blocking(move || populate_template(&working, &code, &period))
                .await
                .map_err(|e| PipelineError::Workspace(std::io::Error::other(e)))??;
        }

        let pdf_path = self.converter.convert(&working, workspace.path()).await?;

        let pdf = {
            let signature = tenant.signature.clone();
            let rect = tenant.rect;
            tokio::task::spawn_blocking(move || stamp_signature(&pdf_path, &signature, &rect))
                .await
                .map_err(|e| PipelineError::Workspace(std::io::Error::other(e)))??
        };

        Ok(GeneratedInvoice {
            filename: tenant.output_name.clone(),
            pdf,
            period,
        })
    }
}
