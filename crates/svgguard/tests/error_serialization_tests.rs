use serde_json::json;
use svgguard::validation::{ErrorClass, ErrorData};
use svgguard::{Catalog, DeserializationError, ErrorKey, LintIssue, ValidationError};

#[test]
fn dirty_svg_round_trips_through_json() -> Result<(), Box<dyn std::error::Error>> {
    let error = ValidationError::dirty_svg("assets/icons/logo.svg");
    let json = error.to_json()?;
    let restored = ValidationError::from_json(&json)?;

    assert_eq!(restored, error);
    assert_eq!(restored.key(), ErrorKey::DirtySvg);
    assert_eq!(restored.file(), Some("assets/icons/logo.svg"));
    assert_eq!(restored.class(), ErrorClass::Validation);
    Ok(())
}

#[test]
fn lint_error_round_trips_through_json() -> Result<(), Box<dyn std::error::Error>> {
    let error = ValidationError::lint(
        "app.js",
        vec![LintIssue {
            line: 12,
            reason: "Expected '===' and instead saw '=='.".to_string(),
        }],
    );
    let value = error.to_value()?;
    assert_eq!(
        value,
        json!({
            "class": "LintValidationError",
            "filename": "app.js",
            "lint_errors": [{"line": 12, "reason": "Expected '===' and instead saw '=='."}]
        })
    );
    assert_eq!(ValidationError::from_value(value)?, error);
    Ok(())
}

#[test]
fn payload_values_keep_their_json_types() -> Result<(), Box<dyn std::error::Error>> {
    let json = r#"{"class":"ValidationError","key":"unparseable_svg","data":{"file":"a.svg","reason":"bad","attempts":3}}"#;
    let error = ValidationError::from_json(json)?;
    let mut expected = ErrorData::new();
    expected.insert("file".to_string(), json!("a.svg"));
    expected.insert("reason".to_string(), json!("bad"));
    expected.insert("attempts".to_string(), json!(3));
    assert_eq!(error, ValidationError::new(ErrorKey::UnparseableSvg, expected));
    assert_eq!(error.to_json()?, json);
    Ok(())
}

#[test]
fn errors_deserialize_inside_collections() -> Result<(), Box<dyn std::error::Error>> {
    let errors = vec![
        ValidationError::dirty_svg("a.svg"),
        ValidationError::unparseable_svg("b.svg", "error at 1:5: unterminated markup"),
    ];
    let json = serde_json::to_string(&errors)?;
    let restored: Vec<ValidationError> = serde_json::from_str(&json)?;
    assert_eq!(restored, errors);

    let bad: Result<Vec<ValidationError>, _> = serde_json::from_str(r#"[{"class":"Object"}]"#);
    assert!(bad.is_err());
    Ok(())
}

#[test]
fn messages_use_the_catalog() -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::from_json_str(
        "de",
        r#"{"txt.apps.admin.error.app_build.dirty_svg": "%{file} enthält unsicheres Markup."}"#,
    )?;
    let error = ValidationError::dirty_svg("logo.svg");
    assert_eq!(error.message(&catalog), "logo.svg enthält unsicheres Markup.");
    assert_eq!(
        ValidationError::unparseable_svg("b.svg", "boom").to_string(),
        "b.svg could not be parsed as SVG markup: boom"
    );
    Ok(())
}

#[test]
fn non_object_input_is_a_deserialization_error() {
    let err = ValidationError::from_json("\"dirty_svg\"");
    assert!(matches!(err, Err(DeserializationError::NotAnObject(_))));
    if let Err(err) = err {
        assert!(err.to_string().contains("expected an object"));
    }
}
