// larder/src/validator.rs

//! Turns raw CSV bytes into validated `NewProduct`s, one row at a time.
//!
//! Decoding fails only when the byte stream itself is unreadable. Individual
//! rows that break a field rule are rejected with a `RowRejected` and the
//! remaining rows are still processed.

use crate::error::{CatalogError, RejectReason, RowRejected};
use crate::model::NewProduct;
use std::io;
use tracing::{debug, warn};

/// Where (and whether) a layout carries the product identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdColumn {
  /// No id column; the store generates one.
  Generated,
  /// Id at this position; blank means "generate".
  Optional(usize),
  /// Id at this position; blank rejects the row as malformed.
  Required(usize),
}

/// Positional mapping from CSV columns to product fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
  pub min_columns: usize,
  pub id: IdColumn,
  pub name: usize,
  pub image: usize,
  pub price: usize,
  pub qty: usize,
}

impl ColumnLayout {
  /// `name,image,price,qty` — the bulk initial-load dialect.
  pub const NAME_FIRST: ColumnLayout = ColumnLayout {
    min_columns: 4,
    id: IdColumn::Generated,
    name: 0,
    image: 1,
    price: 2,
    qty: 3,
  };

  /// `id,name,image,price,qty` — the keyed incremental-upload dialect.
  pub const ID_FIRST: ColumnLayout = ColumnLayout {
    min_columns: 5,
    id: IdColumn::Optional(0),
    name: 1,
    image: 2,
    price: 3,
    qty: 4,
  };

  /// Number of fields a row needs before any field rule can be applied.
  pub fn required_width(&self) -> usize {
    let id_width = match self.id {
      IdColumn::Generated => 0,
      IdColumn::Optional(idx) | IdColumn::Required(idx) => idx + 1,
    };
    [self.name, self.image, self.price, self.qty]
      .iter()
      .map(|idx| idx + 1)
      .chain([id_width, self.min_columns])
      .max()
      .unwrap_or(self.min_columns)
  }
}

/// One data row of the source table with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
  pub line: u64,
  pub fields: Vec<String>,
}

/// Decodes CSV bytes into data rows. The header row is consumed and dropped.
///
/// The `csv` reader would let an unterminated quote swallow the rest of the
/// input into one field, so an odd number of `"` fails the whole table.
pub fn decode_table(bytes: &[u8]) -> Result<Vec<SourceRow>, CatalogError> {
  if bytes.iter().filter(|b| **b == b'"').count() % 2 != 0 {
    let source = csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, "unterminated quoted field"));
    return Err(CatalogError::Decode { source });
  }

  let mut reader = csv::ReaderBuilder::new()
    .has_headers(true)
    .flexible(true)
    .from_reader(bytes);

  let mut rows = Vec::new();
  for (idx, result) in reader.records().enumerate() {
    let record = result.map_err(|source| CatalogError::Decode { source })?;
    // Header is line 1; fall back to the record index when no position is tracked.
    let line = record.position().map(|p| p.line()).unwrap_or(idx as u64 + 2);
    rows.push(SourceRow {
      line,
      fields: record.iter().map(str::to_string).collect(),
    });
  }
  debug!(rows = rows.len(), "Decoded CSV table.");
  Ok(rows)
}

/// Records that passed validation plus the rejections, in source order.
#[derive(Debug, Default, Clone)]
pub struct ValidatedRows {
  pub records: Vec<NewProduct>,
  pub rejected: Vec<RowRejected>,
}

#[derive(Debug, Clone, Copy)]
pub struct RecordValidator {
  layout: ColumnLayout,
}

impl RecordValidator {
  pub fn new(layout: ColumnLayout) -> Self {
    Self { layout }
  }

  pub fn layout(&self) -> ColumnLayout {
    self.layout
  }

  /// Applies the field rules, in order, to a single row.
  pub fn validate_row<S: AsRef<str>>(&self, fields: &[S], line: u64) -> Result<NewProduct, RowRejected> {
    let layout = &self.layout;
    let reject = |reason| RowRejected { reason, line };

    if fields.len() < layout.required_width() {
      return Err(reject(RejectReason::MalformedRow));
    }

    let id = match layout.id {
      IdColumn::Generated => None,
      IdColumn::Optional(idx) => non_empty(cell(fields, idx)),
      IdColumn::Required(idx) => {
        Some(non_empty(cell(fields, idx)).ok_or_else(|| reject(RejectReason::MalformedRow))?)
      }
    };

    let name = cell(fields, layout.name);
    if name.is_empty() {
      return Err(reject(RejectReason::MissingName));
    }

    let image = non_empty(cell(fields, layout.image));

    let price = cell(fields, layout.price)
      .parse::<f64>()
      .ok()
      .filter(|p| p.is_finite() && *p >= 0.0)
      .ok_or_else(|| reject(RejectReason::InvalidPrice))?;

    let qty = cell(fields, layout.qty)
      .parse::<i32>()
      .ok()
      .filter(|q| *q >= 0)
      .ok_or_else(|| reject(RejectReason::InvalidQuantity))?;

    Ok(NewProduct {
      id,
      name: name.to_string(),
      image,
      price,
      qty,
    })
  }

  /// Validates every row independently. A rejected row never stops later rows.
  pub fn validate_rows(&self, rows: &[SourceRow]) -> ValidatedRows {
    let mut out = ValidatedRows::default();
    for row in rows {
      match self.validate_row(&row.fields, row.line) {
        Ok(record) => out.records.push(record),
        Err(rejection) => {
          warn!(line = rejection.line, reason = %rejection.reason, "Skipping rejected row.");
          out.rejected.push(rejection);
        }
      }
    }
    debug!(
      valid = out.records.len(),
      rejected = out.rejected.len(),
      "Row validation finished."
    );
    out
  }
}

fn cell<S: AsRef<str>>(fields: &[S], idx: usize) -> &str {
  fields[idx].as_ref().trim()
}

fn non_empty(value: &str) -> Option<String> {
  if value.is_empty() {
    None
  } else {
    Some(value.to_string())
  }
}
