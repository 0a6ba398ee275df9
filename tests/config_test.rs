use loanform::config::Settings;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_tabs_from_schemas_dir() -> anyhow::Result<()> {
    // Create a temporary directory
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    fs::create_dir_all(root.join("forms"))?;

    let loanform_toml = r#"
[log]
level = "debug"

[form]
default_tab = "kyc"
schemas_dir = "forms"
"#;
    fs::write(root.join("loanform.toml"), loanform_toml)?;

    // A tab in JSON
    let kyc_json = r#"
{
    "name": "kyc",
    "title": "Know Your Customer",
    "schema": {
        "type": "object",
        "properties": {
            "pan": { "type": "string", "pattern": "^[A-Z]{5}[0-9]{4}[A-Z]$" },
            "aadhaar": { "type": "string" }
        },
        "required": ["pan"]
    }
}
"#;
    fs::write(root.join("forms/kyc.json"), kyc_json)?;

    // A tab in YAML
    let collateral_yaml = r#"
name: collateral
schema:
  type: object
  title: Collateral
  properties:
    kind:
      type: string
      enum: [Property, Vehicle]
    registration:
      type: string
  dependencies:
    kind:
      oneOf:
        - properties:
            kind: { enum: [Vehicle] }
          required: [registration]
"#;
    fs::write(root.join("forms/collateral.yaml"), collateral_yaml)?;

    // A tab in TOML
    let consent_toml = r#"
name = "consent"

[schema]
type = "object"

[schema.properties.signatory]
type = "string"
"#;
    fs::write(root.join("forms/consent.toml"), consent_toml)?;

    // Not a tab file
    fs::write(root.join("forms/README.md"), "notes")?;

    let settings = Settings::from_root(root.to_str().unwrap())?;
    assert_eq!(settings.log.level, "debug");
    assert_eq!(settings.form.default_tab, "kyc");
    assert_eq!(settings.tabs.len(), 3);

    let catalog = settings.catalog()?;
    assert_eq!(catalog.len(), 5);
    assert_eq!(catalog.get("kyc").unwrap().title(), "Know Your Customer");
    assert_eq!(catalog.get("collateral").unwrap().title(), "Collateral");
    assert_eq!(catalog.get("consent").unwrap().title(), "consent");

    Ok(())
}

#[test]
fn test_unknown_default_tab_is_rejected() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    fs::write(
        temp_dir.path().join("loanform.toml"),
        "[form]\ndefault_tab = \"missing\"\n",
    )?;

    let err = Settings::from_root(temp_dir.path().to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("Configuration validation failed"));
    assert!(err.to_string().contains("missing"));
    Ok(())
}

#[test]
fn test_duplicate_tab_files_are_rejected() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let forms = temp_dir.path().join("config/forms");
    fs::create_dir_all(&forms)?;
    let tab = r#"{"name": "kyc", "schema": {"type": "object", "properties": {}}}"#;
    fs::write(forms.join("a.json"), tab)?;
    fs::write(forms.join("b.json"), tab)?;

    let err = Settings::from_root(temp_dir.path().to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("Duplicate entry"));
    Ok(())
}

#[test]
fn test_malformed_tab_schema_fails_catalog() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let forms = temp_dir.path().join("config/forms");
    fs::create_dir_all(&forms)?;
    fs::write(
        forms.join("bad.json"),
        r#"{"name": "bad", "schema": {"type": "object", "properties": {}, "required": ["ghost"]}}"#,
    )?;

    let settings = Settings::from_root(temp_dir.path().to_str().unwrap())?;
    let err = settings.catalog().unwrap_err();
    assert!(format!("{:#}", err).contains("required property 'ghost' is not declared"));
    Ok(())
}
