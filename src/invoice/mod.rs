//! Invoice production pipeline.
//!
//! One run takes a tenant's spreadsheet template through four stages inside
//! an isolated temporary workspace:
//! - `period` - fiscal-period math derived from the reference date
//! - `template` - field injection into a working copy of the template
//! - `convert` - headless LibreOffice conversion to PDF
//! - `signature` - stamp image compositing onto the first page

pub mod convert;
pub mod period;
pub mod pipeline;
pub mod signature;
pub mod template;

pub use convert::{ConvertError, PdfConverter};
pub use period::FiscalPeriod;
pub use pipeline::{GeneratedInvoice, InvoicePipeline};
pub use signature::{SignatureError, SignatureRect};
pub use template::TemplateError;

use std::fmt;

use thiserror::Error;

/// Which input asset failed the existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Template,
    Signature,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Template => write!(f, "invoice template"),
            AssetKind::Signature => write!(f, "signature image"),
        }
    }
}

/// Errors from a single pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0} file is missing")]
    AssetMissing(AssetKind),
    #[error("failed to set up pipeline workspace: {0}")]
    Workspace(#[source] std::io::Error),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error(transparent)]
    Signature(#[from] SignatureError),
}
