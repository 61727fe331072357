//! Integration tests for the registry document format

use dactyl_core::{CoreError, RegistryDocument, Template, DOCUMENT_VERSION};

#[test]
fn test_empty_document_roundtrip() {
    let json = RegistryDocument::empty().to_json().unwrap();
    let recovered = RegistryDocument::from_json(&json).unwrap();
    assert_eq!(recovered.version, DOCUMENT_VERSION);
    assert!(recovered.templates.is_empty());
}

#[test]
fn test_document_preserves_all_attributes() {
    let document = RegistryDocument::new(vec![Template::new("Right thumb", 3, 42, 0x1122334455)]);

    let json = document.to_json().unwrap();
    let recovered = RegistryDocument::from_json(&json).unwrap();

    let template = &recovered.templates[0];
    assert_eq!(template.name, "Right thumb");
    assert_eq!(template.group_id, 3);
    assert_eq!(template.template_id, 42);
    assert_eq!(template.device_id, 0x1122334455);
}

#[test]
fn test_document_is_human_auditable_json() {
    let json = RegistryDocument::new(vec![Template::new("Finger 1", 0, 7, 0)])
        .to_json()
        .unwrap();

    assert!(json.contains("\"version\""));
    assert!(json.contains("\"template_id\": 7"));
    assert!(json.contains("\"name\": \"Finger 1\""));
}

#[test]
fn test_future_version_rejected() {
    let json = format!(
        r#"{{"version": {}, "templates": []}}"#,
        DOCUMENT_VERSION + 1
    );
    assert!(matches!(
        RegistryDocument::from_json(&json),
        Err(CoreError::UnsupportedVersion(_))
    ));
}

#[test]
fn test_truncated_document_is_an_error() {
    let json = RegistryDocument::new(vec![Template::new("Finger 1", 0, 7, 0)])
        .to_json()
        .unwrap();
    let truncated = &json[..json.len() / 2];
    assert!(RegistryDocument::from_json(truncated).is_err());
}
