#![allow(dead_code)]

//! Shared fixtures: on-disk tenant assets, a fake converter binary that
//! stands in for LibreOffice, and a dispatcher wired to a mock mailer.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use rent_invoice_server::dispatch::Dispatcher;
use rent_invoice_server::invoice::{InvoicePipeline, PdfConverter, SignatureRect};
use rent_invoice_server::mailer::MockMailer;
use rent_invoice_server::tenants::{TenantConfig, TenantRegistry};

/// Write a valid empty xlsx workbook usable as an invoice template.
pub fn write_template(path: &Path) {
    let book = umya_spreadsheet::new_file();
    umya_spreadsheet::writer::xlsx::write(&book, path).unwrap();
}

/// Write a small opaque PNG usable as a signature image.
pub fn write_signature(path: &Path) {
    image::RgbaImage::from_pixel(40, 20, image::Rgba([20, 20, 160, 255]))
        .save(path)
        .unwrap();
}

/// Write a single-page PDF for the fake converter to hand out.
pub fn write_fixture_pdf(path: &Path) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        Content::<Vec<Operation>> { operations: vec![] }.encode().unwrap(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.0.into(), 0.0.into(), 595.0.into(), 842.0.into()],
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// Shell script that mimics `soffice --headless --convert-to pdf IN --outdir OUT`
/// by copying a fixture PDF to the expected output path.
#[cfg(unix)]
pub fn fake_converter(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let fixture = dir.join("fixture.pdf");
    write_fixture_pdf(&fixture);

    let script = dir.join("fake-soffice.sh");
    let body = format!(
        "#!/bin/sh\ncp '{}' \"$6/$(basename \"$4\" .xlsx).pdf\"\n",
        fixture.display()
    );
    std::fs::write(&script, body).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}

/// Create template + signature assets for one tenant under `dir/key/`.
pub fn tenant_with_assets(dir: &Path, key: &str, recipient: &str) -> TenantConfig {
    let tenant_dir = dir.join(key);
    std::fs::create_dir_all(&tenant_dir).unwrap();
    let template = tenant_dir.join("Invoice.xlsx");
    let signature = tenant_dir.join("Signature.png");
    write_template(&template);
    write_signature(&signature);

    TenantConfig {
        template,
        signature,
        output_name: format!("{key}_Invoice.pdf"),
        recipient: recipient.to_string(),
        cc: vec![],
        subject_prefix: "Rent Invoice".to_string(),
        invoice_code: key.to_uppercase(),
        rect: SignatureRect::default(),
    }
}

pub fn registry_of(tenants: Vec<(&str, TenantConfig)>) -> Arc<TenantRegistry> {
    let map: BTreeMap<String, TenantConfig> = tenants
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    Arc::new(TenantRegistry::from_map(map).unwrap())
}

#[cfg(unix)]
pub fn dispatcher_with_mock_mail(
    dir: &Path,
    registry: Arc<TenantRegistry>,
) -> (Arc<Dispatcher>, Arc<MockMailer>) {
    let converter = PdfConverter::new(fake_converter(dir), Duration::from_secs(5));
    let mailer = Arc::new(MockMailer::new());
    let dispatcher = Arc::new(Dispatcher::new(
        registry,
        InvoicePipeline::new(converter),
        mailer.clone(),
    ));
    (dispatcher, mailer)
}
