use uuid::Uuid;

use booking_cell::models::{ExamineeAttribute, FieldMapping, SubmittedField};
use booking_cell::services::intake::extract;

fn mapping(field_id: i64, attribute: ExamineeAttribute, active: bool) -> FieldMapping {
    FieldMapping {
        id: Uuid::new_v4(),
        external_appointment_type_id: 77,
        external_field_id: field_id,
        attribute,
        active,
    }
}

fn field(id: i64, value: &str) -> SubmittedField {
    SubmittedField {
        id,
        value: value.to_string(),
    }
}

#[test]
fn mapped_fields_populate_attributes() {
    let mappings = vec![
        mapping(1, ExamineeAttribute::FirstName, true),
        mapping(2, ExamineeAttribute::LastName, true),
        mapping(3, ExamineeAttribute::Email, true),
        mapping(4, ExamineeAttribute::Condition, true),
    ];
    let fields = vec![
        field(1, "Jordan"),
        field(2, "Smith"),
        field(3, "jordan@example.com"),
        field(4, "Lower back injury"),
    ];

    let result = extract(&mappings, &fields);

    assert_eq!(result.attributes.first_name.as_deref(), Some("Jordan"));
    assert_eq!(result.attributes.last_name.as_deref(), Some("Smith"));
    assert_eq!(result.attributes.email.as_deref(), Some("jordan@example.com"));
    assert_eq!(
        result.attributes.condition.as_deref(),
        Some("Lower back injury")
    );
    assert!(result.missing_required.is_empty());
}

#[test]
fn unmapped_fields_are_silently_dropped() {
    let mappings = vec![mapping(1, ExamineeAttribute::FirstName, true)];
    let fields = vec![field(1, "Jordan"), field(99, "no mapping for this")];

    let result = extract(&mappings, &fields);

    assert_eq!(result.attributes.first_name.as_deref(), Some("Jordan"));
    assert!(result.attributes.condition.is_none());
}

#[test]
fn empty_and_whitespace_values_are_dropped() {
    let mappings = vec![
        mapping(1, ExamineeAttribute::FirstName, true),
        mapping(2, ExamineeAttribute::LastName, true),
    ];
    let fields = vec![field(1, ""), field(2, "   ")];

    let result = extract(&mappings, &fields);

    assert!(result.attributes.first_name.is_none());
    assert!(result.attributes.last_name.is_none());
}

#[test]
fn inactive_mappings_are_ignored() {
    let mappings = vec![mapping(1, ExamineeAttribute::FirstName, false)];
    let fields = vec![field(1, "Jordan")];

    let result = extract(&mappings, &fields);

    assert!(result.attributes.first_name.is_none());
}

#[test]
fn values_are_trimmed() {
    let mappings = vec![mapping(1, ExamineeAttribute::Email, true)];
    let fields = vec![field(1, "  jordan@example.com  ")];

    let result = extract(&mappings, &fields);

    assert_eq!(result.attributes.email.as_deref(), Some("jordan@example.com"));
}

#[test]
fn missing_required_attributes_are_reported_not_rejected() {
    let mappings = vec![
        mapping(1, ExamineeAttribute::FirstName, true),
        mapping(2, ExamineeAttribute::Phone, true),
    ];
    let fields = vec![field(1, "Jordan"), field(2, "+44 7700 900000")];

    let result = extract(&mappings, &fields);

    assert_eq!(
        result.missing_required,
        vec![ExamineeAttribute::LastName, ExamineeAttribute::Email]
    );
    // Extraction still yields what it could resolve.
    assert_eq!(result.attributes.first_name.as_deref(), Some("Jordan"));
}

#[test]
fn absent_optional_attributes_are_not_flagged() {
    let mappings = vec![
        mapping(1, ExamineeAttribute::FirstName, true),
        mapping(2, ExamineeAttribute::LastName, true),
        mapping(3, ExamineeAttribute::Email, true),
    ];
    let fields = vec![
        field(1, "Jordan"),
        field(2, "Smith"),
        field(3, "jordan@example.com"),
    ];

    let result = extract(&mappings, &fields);

    assert!(result.missing_required.is_empty());
    assert!(result.attributes.address.is_none());
    assert!(result.attributes.case_type.is_none());
}

#[test]
fn authorized_contact_parses_affirmative_values() {
    let mappings = vec![mapping(1, ExamineeAttribute::AuthorizedContact, true)];

    for value in ["yes", "true", "1", "YES", "True"] {
        let result = extract(&mappings, &[field(1, value)]);
        assert_eq!(result.attributes.authorized_contact, Some(true), "{}", value);
    }

    let result = extract(&mappings, &[field(1, "no")]);
    assert_eq!(result.attributes.authorized_contact, Some(false));
}
