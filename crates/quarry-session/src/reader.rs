//! Row readers: raw positioned column data to one logical row value.
//!
//! A reader runs once per successful cursor positioning. The result shape
//! follows the query: single-column results hand the scalar back directly,
//! multi-column results a composite row, typed holders go through
//! [`FromRow`], and entity readers register the materialized record in the
//! persistence context and return the managed key.

use crate::context::PersistenceContext;
use quarry_core::error::{DataError, Error};
use quarry_core::{EntityKey, EntityRecord, FromRow, Result, Row, Value};
use std::marker::PhantomData;

/// Produce one logical row value from raw positioned column data.
pub trait RowReader {
    /// The materialized row type.
    type Output;

    /// Materialize the row at the current position.
    fn read(&self, row: &Row, context: &mut PersistenceContext) -> Result<Self::Output>;
}

/// A materialized result row under the default shape rule.
#[derive(Debug, Clone, PartialEq)]
pub enum RowValue {
    /// Single-column result: the scalar itself, not wrapped
    Scalar(Value),
    /// Multi-column result: the whole row
    Tuple(Row),
}

impl RowValue {
    /// The scalar, when this is a single-column result.
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            RowValue::Scalar(value) => Some(value),
            RowValue::Tuple(_) => None,
        }
    }

    /// The composite row, when this is a multi-column result.
    pub fn as_tuple(&self) -> Option<&Row> {
        match self {
            RowValue::Scalar(_) => None,
            RowValue::Tuple(row) => Some(row),
        }
    }
}

/// The default shape rule: scalar for one column, tuple otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultRowReader;

impl ResultRowReader {
    pub fn new() -> Self {
        Self
    }
}

impl RowReader for ResultRowReader {
    type Output = RowValue;

    fn read(&self, row: &Row, _context: &mut PersistenceContext) -> Result<Self::Output> {
        if row.len() == 1 {
            let value = row.get(0).cloned().unwrap_or(Value::Null);
            Ok(RowValue::Scalar(value))
        } else {
            Ok(RowValue::Tuple(row.clone()))
        }
    }
}

/// Pass the composite row through a typed holder constructor.
#[derive(Debug, Clone, Copy)]
pub struct HolderReader<T> {
    _holder: PhantomData<fn() -> T>,
}

impl<T: FromRow> HolderReader<T> {
    pub fn new() -> Self {
        Self {
            _holder: PhantomData,
        }
    }
}

impl<T: FromRow> Default for HolderReader<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FromRow> RowReader for HolderReader<T> {
    type Output = T;

    fn read(&self, row: &Row, _context: &mut PersistenceContext) -> Result<Self::Output> {
        T::from_row(row)
    }
}

/// Materialize entity records and register them in the persistence context.
///
/// The materializer maps raw columns to an [`EntityRecord`]; the reader
/// wraps it in a load scope so eager attachments queue and drain exactly
/// like non-cursor loads, and registers the record under identity-map
/// semantics (an already-managed record wins). The output is the managed
/// record's key.
pub struct EntityReader<F> {
    entity: String,
    materialize: F,
}

impl<F> EntityReader<F>
where
    F: Fn(&Row) -> Result<EntityRecord>,
{
    /// Create a reader for one entity with its column-mapping function.
    pub fn new(entity: impl Into<String>, materialize: F) -> Self {
        Self {
            entity: entity.into(),
            materialize,
        }
    }

    /// Entity name this reader materializes.
    pub fn entity(&self) -> &str {
        &self.entity
    }
}

impl<F> RowReader for EntityReader<F>
where
    F: Fn(&Row) -> Result<EntityRecord>,
{
    type Output = EntityKey;

    fn read(&self, row: &Row, context: &mut PersistenceContext) -> Result<Self::Output> {
        context.begin_load();
        let result = (self.materialize)(row)
            .map_err(|err| {
                Error::Data(DataError {
                    message: format!("could not materialize entity '{}'", self.entity),
                    source: Some(Box::new(err)),
                })
            })
            .map(|record| context.register(record));
        // the load scope closes on failure paths too
        context.finish_load();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::Attachment;

    fn row(values: Vec<Value>) -> Row {
        let names = (0..values.len()).map(|i| format!("c{i}")).collect();
        Row::new(names, values)
    }

    #[test]
    fn single_column_returns_scalar_unwrapped() {
        let mut context = PersistenceContext::new();
        let value = ResultRowReader::new()
            .read(&row(vec![Value::Int(7)]), &mut context)
            .unwrap();
        assert_eq!(value, RowValue::Scalar(Value::Int(7)));
    }

    #[test]
    fn multi_column_returns_tuple() {
        let mut context = PersistenceContext::new();
        let value = ResultRowReader::new()
            .read(&row(vec![Value::Int(7), Value::Text("x".to_string())]), &mut context)
            .unwrap();
        let tuple = value.as_tuple().expect("tuple shape");
        assert_eq!(tuple.len(), 2);
    }

    #[derive(Debug, PartialEq)]
    struct OrderSummary {
        id: i64,
        total: f64,
    }

    impl FromRow for OrderSummary {
        fn from_row(row: &Row) -> Result<Self> {
            Ok(Self {
                id: row.get_named("id")?,
                total: row.get_named("total")?,
            })
        }
    }

    #[test]
    fn holder_reader_goes_through_from_row() {
        let mut context = PersistenceContext::new();
        let row = Row::new(
            vec!["id".to_string(), "total".to_string()],
            vec![Value::BigInt(3), Value::Double(12.5)],
        );
        let summary: OrderSummary = HolderReader::new().read(&row, &mut context).unwrap();
        assert_eq!(summary, OrderSummary { id: 3, total: 12.5 });
    }

    #[test]
    fn entity_reader_registers_and_returns_managed_key() {
        let mut context = PersistenceContext::new();
        let reader = EntityReader::new("Order", |row: &Row| {
            Ok(EntityRecord::new("Order", row.get(0).cloned().unwrap_or(Value::Null))
                .with_attachment(Attachment::new("lines", false)))
        });

        let key = reader.read(&row(vec![Value::BigInt(5)]), &mut context).unwrap();
        assert!(context.contains(&key));
        // the outermost load scope closed, so the eager attachment drained
        assert!(context.get(&key).unwrap().attachments()[0].is_initialized());
        assert_eq!(context.load_depth(), 0);
    }

    #[test]
    fn entity_reader_wraps_materialization_failure() {
        let mut context = PersistenceContext::new();
        let reader = EntityReader::new("Order", |_row: &Row| -> Result<EntityRecord> {
            Err(Error::Custom("bad column data".to_string()))
        });

        let err = reader.read(&row(vec![Value::Null]), &mut context).unwrap_err();
        assert!(err.to_string().contains("could not materialize entity 'Order'"));
        assert_eq!(context.load_depth(), 0);
    }
}
