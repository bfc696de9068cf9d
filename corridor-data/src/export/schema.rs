//! DBF table layout derived from feature attributes.

use std::collections::BTreeSet;

use corridor_core::{AttributeValue, Layer};
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};

use super::ExportError;

/// Longest field name a DBF header can store.
pub(super) const MAX_FIELD_NAME: usize = 10;
/// Field added when a layer carries no attributes at all.
pub(super) const ID_FIELD: &str = "FID";
const MAX_TEXT_WIDTH: usize = 254;
const INTEGER_WIDTH: u8 = 20;
const NUMBER_WIDTH: u8 = 24;
const NUMBER_DECIMALS: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ColumnKind {
    Logical,
    Integer,
    Number,
    Text { width: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Column {
    /// Attribute key the column reads from; `None` for the generated id.
    pub(super) source: Option<String>,
    /// Name written to the DBF header.
    pub(super) name: String,
    pub(super) kind: ColumnKind,
}

/// Derive one column per attribute key, in key order.
pub(super) fn derive_columns(layer: &Layer) -> Vec<Column> {
    let keys: BTreeSet<&String> = layer
        .features()
        .iter()
        .flat_map(|feature| feature.attributes.keys())
        .collect();
    if keys.is_empty() {
        return vec![Column {
            source: None,
            name: ID_FIELD.to_owned(),
            kind: ColumnKind::Integer,
        }];
    }

    let mut taken = BTreeSet::new();
    keys.into_iter()
        .map(|key| {
            let name = unique_field_name(key, &mut taken);
            Column {
                source: Some(key.clone()),
                name,
                kind: column_kind(layer, key),
            }
        })
        .collect()
}

fn column_kind(layer: &Layer, key: &str) -> ColumnKind {
    let values: Vec<&AttributeValue> = layer
        .features()
        .iter()
        .filter_map(|feature| feature.attributes.get(key))
        .filter(|value| !matches!(value, AttributeValue::Null))
        .collect();
    if values.is_empty() {
        return ColumnKind::Text { width: 1 };
    }
    if values.iter().all(|value| matches!(value, AttributeValue::Bool(_))) {
        return ColumnKind::Logical;
    }
    if values
        .iter()
        .all(|value| matches!(value, AttributeValue::Integer(_)))
    {
        return ColumnKind::Integer;
    }
    if values.iter().all(|value| {
        matches!(
            value,
            AttributeValue::Integer(_) | AttributeValue::Number(_)
        )
    }) {
        return ColumnKind::Number;
    }
    let widest = values
        .iter()
        .map(|value| render(value).len())
        .max()
        .unwrap_or(1)
        .clamp(1, MAX_TEXT_WIDTH);
    ColumnKind::Text {
        width: u8::try_from(widest).unwrap_or(u8::MAX),
    }
}

/// Reduce `key` to a DBF-safe name of at most [`MAX_FIELD_NAME`] ASCII
/// characters that is not already in `taken`.
pub(super) fn unique_field_name(key: &str, taken: &mut BTreeSet<String>) -> String {
    let cleaned: String = key
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .take(MAX_FIELD_NAME)
        .collect();
    let base = if cleaned.is_empty() {
        "FIELD".to_owned()
    } else {
        cleaned
    };

    let mut candidate = base.clone();
    let mut suffix = 1_u32;
    while taken.contains(&candidate.to_ascii_uppercase()) {
        let tag = format!("_{suffix}");
        let keep = MAX_FIELD_NAME.saturating_sub(tag.len());
        candidate = format!("{}{tag}", base.get(..keep).unwrap_or(&base));
        suffix += 1;
    }
    taken.insert(candidate.to_ascii_uppercase());
    candidate
}

pub(super) fn table_builder(columns: &[Column]) -> Result<TableWriterBuilder, ExportError> {
    columns
        .iter()
        .try_fold(TableWriterBuilder::new(), |builder, column| {
            let name =
                FieldName::try_from(column.name.as_str()).map_err(|reason| ExportError::Field {
                    name: column.name.clone(),
                    reason,
                })?;
            Ok(match column.kind {
                ColumnKind::Logical => builder.add_logical_field(name),
                ColumnKind::Integer => builder.add_numeric_field(name, INTEGER_WIDTH, 0),
                ColumnKind::Number => {
                    builder.add_numeric_field(name, NUMBER_WIDTH, NUMBER_DECIMALS)
                }
                ColumnKind::Text { width } => builder.add_character_field(name, width),
            })
        })
}

/// Build the DBF record for the feature at `index`.
pub(super) fn record(columns: &[Column], index: usize, layer: &Layer) -> Record {
    let mut record = Record::default();
    let attributes = layer.features().get(index).map(|feature| &feature.attributes);
    for column in columns {
        let value = match &column.source {
            None => Some(AttributeValue::Integer(
                i64::try_from(index).unwrap_or(i64::MAX),
            )),
            Some(key) => attributes.and_then(|attrs| attrs.get(key)).cloned(),
        };
        record.insert(column.name.clone(), field_value(column.kind, value.as_ref()));
    }
    record
}

#[expect(
    clippy::cast_precision_loss,
    reason = "DBF numeric fields store integers as decimal text"
)]
fn field_value(kind: ColumnKind, value: Option<&AttributeValue>) -> FieldValue {
    match kind {
        ColumnKind::Logical => FieldValue::Logical(match value {
            Some(AttributeValue::Bool(flag)) => Some(*flag),
            _ => None,
        }),
        ColumnKind::Integer | ColumnKind::Number => FieldValue::Numeric(match value {
            Some(AttributeValue::Integer(number)) => Some(*number as f64),
            Some(AttributeValue::Number(number)) if number.is_finite() => Some(*number),
            _ => None,
        }),
        ColumnKind::Text { width } => FieldValue::Character(match value {
            None | Some(AttributeValue::Null) => None,
            Some(other) => Some(truncate(render(other), usize::from(width))),
        }),
    }
}

fn render(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Null => String::new(),
        AttributeValue::Bool(flag) => flag.to_string(),
        AttributeValue::Integer(number) => number.to_string(),
        AttributeValue::Number(number) => number.to_string(),
        AttributeValue::Text(text) => text.clone(),
    }
}

fn truncate(mut text: String, max_bytes: usize) -> String {
    if text.len() > max_bytes {
        let cut = (0..=max_bytes)
            .rev()
            .find(|&index| text.is_char_boundary(index))
            .unwrap_or(0);
        text.truncate(cut);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use corridor_core::{Attributes, Crs, Feature};
    use geo::{Geometry, point};
    use rstest::rstest;

    fn layer_with(records: Vec<Attributes>) -> Layer {
        Layer::new(
            Crs::WORKING,
            records
                .into_iter()
                .map(|attributes| Feature::new(Geometry::Point(point!(x: 0.0, y: 0.0)), attributes))
                .collect(),
        )
    }

    fn attrs(pairs: &[(&str, AttributeValue)]) -> Attributes {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), value.clone()))
            .collect()
    }

    #[rstest]
    #[case("name", "name")]
    #[case("survey_number", "survey_num")]
    #[case("plot area", "plot_area")]
    #[case("", "FIELD")]
    fn names_are_truncated_and_cleaned(#[case] key: &str, #[case] expected: &str) {
        let mut taken = BTreeSet::new();
        assert_eq!(unique_field_name(key, &mut taken), expected);
    }

    #[rstest]
    fn colliding_names_get_suffixes() {
        let mut taken = BTreeSet::new();
        let first = unique_field_name("survey_number", &mut taken);
        let second = unique_field_name("survey_numeral", &mut taken);
        let third = unique_field_name("SURVEY_NUMBERS", &mut taken);
        assert_eq!(first, "survey_num");
        assert_eq!(second, "survey_n_1");
        assert_eq!(third, "SURVEY_N_2");
    }

    #[rstest]
    fn layers_without_attributes_get_an_id_column() {
        let columns = derive_columns(&layer_with(vec![Attributes::new(), Attributes::new()]));
        assert_eq!(columns.len(), 1);
        let column = columns.first().expect("id column");
        assert_eq!(column.name, ID_FIELD);
        assert_eq!(column.source, None);
        assert_eq!(column.kind, ColumnKind::Integer);
    }

    #[rstest]
    fn column_kinds_follow_values() {
        let layer = layer_with(vec![
            attrs(&[
                ("flag", true.into()),
                ("count", 3_i64.into()),
                ("area", 1.5.into()),
                ("label", "Plot 12".into()),
                ("empty", AttributeValue::Null),
            ]),
            attrs(&[
                ("flag", AttributeValue::Null),
                ("count", 4_i64.into()),
                ("area", 2_i64.into()),
                ("label", 7_i64.into()),
            ]),
        ]);
        let kinds: Vec<(String, ColumnKind)> = derive_columns(&layer)
            .into_iter()
            .map(|column| (column.name, column.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("area".to_owned(), ColumnKind::Number),
                ("count".to_owned(), ColumnKind::Integer),
                ("empty".to_owned(), ColumnKind::Text { width: 1 }),
                ("flag".to_owned(), ColumnKind::Logical),
                ("label".to_owned(), ColumnKind::Text { width: 7 }),
            ]
        );
    }

    #[rstest]
    fn text_is_truncated_on_char_boundaries() {
        assert_eq!(truncate("ಬೆಂಗಳೂರು".to_owned(), 4), "ಬ");
        assert_eq!(truncate("short".to_owned(), 10), "short");
    }
}
