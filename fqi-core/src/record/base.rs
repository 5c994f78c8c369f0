//! Base implementation of records.
use crate::error::FqiError;
use std::collections::{hash_map::IntoIter, HashMap};

/// Represents possible types of values that can be stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single floating-point value, like the mean of the regression targets.
    Scalar(f32),

    /// A 1-dimensional array of floating-point values.
    Array1(Vec<f32>),

    /// A text value.
    String(String),
}

/// A container for storing key-value pairs of various data types.
///
/// If a key is inserted twice, the latter value wins.
#[derive(Debug, Clone, Default)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator that consumes the record.
    pub fn into_iter_in_record(self) -> IntoIter<String, RecordValue> {
        self.0.into_iter()
    }

    /// Gets a reference to the value associated with the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Merges another record into this one in place.
    ///
    /// Values of `record` overwrite values of `self` with the same key.
    pub fn merge_inplace(&mut self, record: Record) {
        self.0.extend(record.0);
    }

    /// Gets a scalar value from the record.
    ///
    /// # Errors
    ///
    /// Returns [`FqiError::RecordKeyError`] if the key does not exist and
    /// [`FqiError::RecordValueTypeError`] if the value is not a scalar.
    pub fn get_scalar(&self, k: &str) -> Result<f32, FqiError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(FqiError::RecordValueTypeError("Scalar".to_string())),
            None => Err(FqiError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a 1-dimensional array from the record.
    pub fn get_array1(&self, k: &str) -> Result<Vec<f32>, FqiError> {
        match self.0.get(k) {
            Some(RecordValue::Array1(v)) => Ok(v.clone()),
            Some(_) => Err(FqiError::RecordValueTypeError("Array1".to_string())),
            None => Err(FqiError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a string value from the record.
    pub fn get_string(&self, k: &str) -> Result<String, FqiError> {
        match self.0.get(k) {
            Some(RecordValue::String(s)) => Ok(s.clone()),
            Some(_) => Err(FqiError::RecordValueTypeError("String".to_string())),
            None => Err(FqiError::RecordKeyError(k.to_string())),
        }
    }

    /// Checks if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overwrites() {
        let r1 = Record::from_slice(&[
            ("iteration", RecordValue::Scalar(1.0)),
            ("name", RecordValue::String("first".to_string())),
        ]);
        let r2 = Record::from_scalar("iteration", 2.0);
        let mut r = r1;
        r.merge_inplace(r2);

        assert_eq!(r.len(), 2);
        assert_eq!(r.get_scalar("iteration").unwrap(), 2.0);
        assert_eq!(r.get_string("name").unwrap(), "first");
    }

    #[test]
    fn test_get_errors() {
        let r = Record::from_scalar("loss", 0.5);
        assert_eq!(
            r.get_scalar("missing"),
            Err(FqiError::RecordKeyError("missing".to_string()))
        );
        assert_eq!(
            r.get_array1("loss"),
            Err(FqiError::RecordValueTypeError("Array1".to_string()))
        );
    }
}
