// tests/record_validator_tests.rs
mod common;

use common::*;
use larder::validator::{decode_table, SourceRow};
use larder::{CatalogError, ColumnLayout, IdColumn, RecordValidator, RejectReason};
use proptest::prelude::*;

fn keyed() -> RecordValidator {
  RecordValidator::new(ColumnLayout::ID_FIRST)
}

fn bulk() -> RecordValidator {
  RecordValidator::new(ColumnLayout::NAME_FIRST)
}

fn reason_of(validator: &RecordValidator, fields: &[&str]) -> RejectReason {
  validator.validate_row(fields, 2).unwrap_err().reason
}

#[test]
fn keyed_row_maps_every_field() {
  let record = keyed()
    .validate_row(&["1", "Test Product", "http://x.jpg", "10.99", "100"], 2)
    .unwrap();
  assert_eq!(record.id.as_deref(), Some("1"));
  assert_eq!(record.name, "Test Product");
  assert_eq!(record.image.as_deref(), Some("http://x.jpg"));
  assert_eq!(record.price, 10.99);
  assert_eq!(record.qty, 100);
  assert!(!record.out_of_stock());
}

#[test]
fn bulk_row_has_no_id_and_trims_fields() {
  let record = bulk().validate_row(&["  Lamp  ", "   ", " 4.5 ", " 0 "], 2).unwrap();
  assert_eq!(record.id, None);
  assert_eq!(record.name, "Lamp");
  assert_eq!(record.image, None);
  assert_eq!(record.price, 4.5);
  assert!(record.out_of_stock());
}

#[test]
fn blank_keyed_id_means_generate() {
  let record = keyed().validate_row(&["", "Chair", "", "1", "1"], 2).unwrap();
  assert_eq!(record.id, None);
}

#[test]
fn required_id_layout_rejects_blank_id() {
  let layout = ColumnLayout {
    id: IdColumn::Required(0),
    ..ColumnLayout::ID_FIRST
  };
  let err = RecordValidator::new(layout).validate_row(&[" ", "Chair", "", "1", "1"], 9).unwrap_err();
  assert_eq!(err.reason, RejectReason::MalformedRow);
  assert_eq!(err.line, 9);
}

#[test]
fn rules_apply_in_order() {
  let v = keyed();
  assert_eq!(reason_of(&v, &["1", "Name", "img", "1.0"]), RejectReason::MalformedRow);
  assert_eq!(reason_of(&v, &["1", "  ", "img", "oops", "oops"]), RejectReason::MissingName);
  assert_eq!(reason_of(&v, &["1", "Name", "img", "oops", "oops"]), RejectReason::InvalidPrice);
  assert_eq!(reason_of(&v, &["1", "Name", "img", "-0.01", "1"]), RejectReason::InvalidPrice);
  assert_eq!(reason_of(&v, &["1", "Name", "img", "NaN", "1"]), RejectReason::InvalidPrice);
  assert_eq!(reason_of(&v, &["1", "Name", "img", "inf", "1"]), RejectReason::InvalidPrice);
  assert_eq!(reason_of(&v, &["1", "Name", "img", "1", "-1"]), RejectReason::InvalidQuantity);
  assert_eq!(reason_of(&v, &["1", "Name", "img", "1", "1.5"]), RejectReason::InvalidQuantity);
  assert_eq!(reason_of(&v, &["1", "Name", "img", "1", "99999999999"]), RejectReason::InvalidQuantity);
}

#[test]
fn extra_columns_are_ignored() {
  let record = bulk().validate_row(&["Desk", "", "3", "2", "surplus"], 2).unwrap();
  assert_eq!(record.name, "Desk");
}

#[test]
fn decode_drops_header_and_numbers_lines() {
  let rows = decode_table(&csv(KEYED_HEADER, &["1,A,,1,1", "2,B,,2,2"])).unwrap();
  assert_eq!(
    rows,
    vec![
      SourceRow {
        line: 2,
        fields: vec!["1".into(), "A".into(), "".into(), "1".into(), "1".into()]
      },
      SourceRow {
        line: 3,
        fields: vec!["2".into(), "B".into(), "".into(), "2".into(), "2".into()]
      },
    ]
  );
}

#[test]
fn header_only_input_decodes_to_nothing() {
  assert!(decode_table(b"invalid").unwrap().is_empty());
  assert!(decode_table(b"").unwrap().is_empty());
}

#[test]
fn short_rows_decode_and_are_rejected_later() {
  let rows = decode_table(&csv(BULK_HEADER, &["only,two"])).unwrap();
  let validated = bulk().validate_rows(&rows);
  assert!(validated.records.is_empty());
  assert_eq!(validated.rejected[0].reason, RejectReason::MalformedRow);
  assert_eq!(validated.rejected[0].line, 2);
}

#[test]
fn invalid_utf8_is_a_decode_error() {
  let err = decode_table(b"name,image,price,qty\n\xff,,1,1\n").unwrap_err();
  assert!(matches!(err, CatalogError::Decode { .. }));
}

#[test]
fn unterminated_quote_is_a_decode_error() {
  let err = decode_table(&csv(KEYED_HEADER, &["1,\"Broken,,1,1", "2,Fine,,2,2"])).unwrap_err();
  assert!(matches!(err, CatalogError::Decode { .. }));
}

#[test]
fn quoted_fields_with_commas_and_escaped_quotes_decode() {
  let rows = decode_table(&csv(KEYED_HEADER, &["1,\"Desk, \"\"oak\"\"\",,1,1"])).unwrap();
  assert_eq!(rows[0].fields[1], "Desk, \"oak\"");
}

#[test]
fn bad_row_never_drops_later_good_rows() {
  let rows = decode_table(&csv(KEYED_HEADER, &["1,Good,,1,1", "2,,,1,1", "3,AlsoGood,,2,0"])).unwrap();
  let validated = keyed().validate_rows(&rows);
  let names: Vec<_> = validated.records.iter().map(|r| r.name.as_str()).collect();
  assert_eq!(names, vec!["Good", "AlsoGood"]);
  assert_eq!(validated.rejected.len(), 1);
  assert_eq!(validated.rejected[0].line, 3);
  assert_eq!(validated.rejected[0].reason, RejectReason::MissingName);
}

#[test]
fn quoted_fields_keep_embedded_commas() {
  let rows = decode_table(&csv(KEYED_HEADER, &["7,\"Table, oak\",,120,1"])).unwrap();
  let record = keyed().validate_rows(&rows).records.remove(0);
  assert_eq!(record.name, "Table, oak");
}

proptest! {
  #[test]
  fn valid_rows_derive_out_of_stock_from_qty(
    name in "[A-Za-z][A-Za-z0-9 ]{0,20}",
    cents in 0u32..10_000_000,
    qty in 0i32..1000,
  ) {
    let price = format!("{}.{:02}", cents / 100, cents % 100);
    let qty_text = qty.to_string();
    let record = keyed()
      .validate_row(&["", name.as_str(), "", price.as_str(), qty_text.as_str()], 2)
      .unwrap();
    prop_assert_eq!(record.out_of_stock(), qty == 0);
    prop_assert_eq!(record.name, name.trim().to_string());
    prop_assert!(record.price >= 0.0);
  }

  #[test]
  fn one_bad_row_rejects_only_itself(
    good_before in 0usize..5,
    good_after in 0usize..5,
    bad_qty in -1000i32..0,
  ) {
    let mut lines = Vec::new();
    for i in 0..good_before {
      lines.push(format!("b{},Before {},,1,1", i, i));
    }
    lines.push(format!("bad,Bad,,1,{}", bad_qty));
    for i in 0..good_after {
      lines.push(format!("a{},After {},,1,1", i, i));
    }
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let rows = decode_table(&csv(KEYED_HEADER, &refs)).unwrap();
    let validated = keyed().validate_rows(&rows);

    prop_assert_eq!(validated.records.len(), good_before + good_after);
    prop_assert_eq!(validated.rejected.len(), 1);
    prop_assert_eq!(validated.rejected[0].reason, RejectReason::InvalidQuantity);
    prop_assert_eq!(validated.rejected[0].line, good_before as u64 + 2);
  }
}
