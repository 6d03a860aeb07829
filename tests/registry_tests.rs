//! Tenant registry loading from disk.

use rent_invoice_server::invoice::SignatureRect;
use rent_invoice_server::tenants::{RegistryError, TenantRegistry};

fn write_registry(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("tenants.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_load_registry_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_registry(
        &dir,
        r#"
        [tenants.big]
        template = "assets/big/Invoice.xlsx"
        signature = "assets/big/Signature.png"
        output_name = "Invoice_Signed.pdf"
        recipient = "accounts@example.com"
        cc = ["owner@example.com", "books@example.com"]
        subject_prefix = "Rent Invoice"
        invoice_code = "BIG"
        rect = { x = 600.0, y = 350.0, width = 120.0, height = 90.0 }
        "#,
    );

    let registry = TenantRegistry::load(&path).unwrap();
    assert_eq!(registry.len(), 1);

    let big = registry.get("big").unwrap();
    assert_eq!(big.recipient, "accounts@example.com");
    assert_eq!(big.cc.len(), 2);
    assert_eq!(big.rect.width, 120.0);
    assert_ne!(big.rect, SignatureRect::default());
}

#[test]
fn test_malformed_registry_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_registry(&dir, "tenants = 42");
    assert!(matches!(
        TenantRegistry::load(&path),
        Err(RegistryError::Parse(_))
    ));
}

#[test]
fn test_registry_iteration_order_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_registry(
        &dir,
        r#"
        [tenants.zeta]
        template = "z.xlsx"
        signature = "z.png"
        output_name = "z.pdf"
        recipient = "z@example.com"
        subject_prefix = "Rent"
        invoice_code = "Z"

        [tenants.alpha]
        template = "a.xlsx"
        signature = "a.png"
        output_name = "a.pdf"
        recipient = "a@example.com"
        subject_prefix = "Rent"
        invoice_code = "A"
        "#,
    );

    let registry = TenantRegistry::load(&path).unwrap();
    let keys: Vec<&String> = registry.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["alpha", "zeta"]);
}
