use std::fmt;

use crate::{
    evaluator::EvalError,
    value::{Record, Value},
};

/// A segment of a field reference.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// Object field access by name
    ///
    /// # Examples
    /// - `name` → `Field("name")`
    /// - `position.latitude` → `[Field("position"), Field("latitude")]`
    Field(String),

    /// Array element access by index
    ///
    /// # Examples
    /// - `tags.0` → `[Field("tags"), Index(0)]`
    /// - `tags.-1` → `[Field("tags"), Index(-1)]` (negative indices supported)
    ///
    /// # Note
    /// Numeric segments fall back to a field name when the value is an object,
    /// so records keyed by `"2020"` stay reachable.
    Index(i64),
}

/// A reference to a (possibly nested) field of a record.
///
/// Written either dotted (`position.latitude`) or as a tuple
/// (`(position,latitude)`); both give the same path. The written form is
/// kept as the path's name, which `select()` and `aggregate()` use for output
/// keys.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPath {
    name: String,
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Builds a path from a field argument.
    ///
    /// # Examples
    /// ```
    /// use rql_lang::path::FieldPath;
    /// use rql_lang::Value;
    ///
    /// let dotted = FieldPath::from_value(&"address.city".into()).unwrap();
    /// let tuple = FieldPath::from_value(&Value::Array(vec!["address".into(), "city".into()])).unwrap();
    /// assert_eq!(dotted, tuple);
    /// assert_eq!(dotted.to_string(), "address.city");
    /// ```
    pub fn from_value(value: &Value) -> Result<Self, EvalError> {
        let mut parts = Vec::new();
        collect_parts(value, &mut parts)?;

        if parts.iter().any(|p| p.is_empty()) {
            return Err(EvalError::TypeError(format!(
                "empty segment in field reference '{}'",
                parts.join(".")
            )));
        }

        let segments = parts
            .iter()
            .map(|part| match part.parse::<i64>() {
                Ok(index) => PathSegment::Index(index),
                Err(_) => PathSegment::Field(part.clone()),
            })
            .collect();

        Ok(FieldPath {
            name: parts.join("."),
            segments,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Looks the path up in a record.
    ///
    /// A missing field is an error; a field holding `null` is not.
    pub fn lookup<'a>(&self, record: &'a Record) -> Result<&'a Value, EvalError> {
        let (first, rest) = self
            .segments
            .split_first()
            .ok_or_else(|| EvalError::MissingField(self.name.clone()))?;

        let mut current = record
            .get(&segment_key(first))
            .ok_or_else(|| EvalError::MissingField(self.name.clone()))?;

        for segment in rest {
            current = self.step(current, segment)?;
        }
        Ok(current)
    }

    fn step<'a>(&self, value: &'a Value, segment: &PathSegment) -> Result<&'a Value, EvalError> {
        let found = match (value, segment) {
            (Value::Object(map), segment) => map.get(&segment_key(segment)),
            (Value::Array(items), PathSegment::Index(n)) => {
                resolve_index(*n, items.len()).and_then(|i| items.get(i))
            }
            (other, _) => {
                return Err(EvalError::TypeError(format!(
                    "cannot access '{}' inside {} value of field '{}'",
                    segment_key(segment),
                    other.type_name(),
                    self.name
                )));
            }
        };
        found.ok_or_else(|| EvalError::MissingField(self.name.clone()))
    }

    /// Returns a copy of `record` with the value at this path replaced.
    ///
    /// Intermediate objects must exist; the last segment is inserted if absent.
    pub fn assign(&self, record: &Record, value: Value) -> Result<Record, EvalError> {
        let mut result = record.clone();
        match self.segments.split_first() {
            Some((first, [])) => {
                result.insert(segment_key(first), value);
            }
            Some((first, rest)) => {
                let key = segment_key(first);
                let child = result
                    .get_mut(&key)
                    .ok_or_else(|| EvalError::MissingField(self.name.clone()))?;
                self.assign_in(child, rest, value)?;
            }
            None => return Err(EvalError::MissingField(self.name.clone())),
        }
        Ok(result)
    }

    fn assign_in(
        &self,
        current: &mut Value,
        path: &[PathSegment],
        value: Value,
    ) -> Result<(), EvalError> {
        let Some((segment, rest)) = path.split_first() else {
            *current = value;
            return Ok(());
        };

        let child = match (current, segment) {
            (Value::Object(map), segment) => {
                if rest.is_empty() {
                    map.insert(segment_key(segment), value);
                    return Ok(());
                }
                map.get_mut(&segment_key(segment))
            }
            (Value::Array(items), PathSegment::Index(n)) => match resolve_index(*n, items.len()) {
                Some(i) => items.get_mut(i),
                None => None,
            },
            (other, _) => {
                return Err(EvalError::TypeError(format!(
                    "cannot assign '{}' inside {} value of field '{}'",
                    segment_key(segment),
                    other.type_name(),
                    self.name
                )));
            }
        };

        let child = child.ok_or_else(|| EvalError::MissingField(self.name.clone()))?;
        self.assign_in(child, rest, value)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn collect_parts(value: &Value, parts: &mut Vec<String>) -> Result<(), EvalError> {
    match value {
        Value::String(s) => {
            parts.extend(s.split('.').map(str::to_string));
            Ok(())
        }
        Value::Integer(n) => {
            parts.push(n.to_string());
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(|item| collect_parts(item, parts)),
        other => Err(EvalError::TypeError(format!(
            "field reference must be a name, got {}",
            other.type_name()
        ))),
    }
}

fn segment_key(segment: &PathSegment) -> String {
    match segment {
        PathSegment::Field(name) => name.clone(),
        PathSegment::Index(n) => n.to_string(),
    }
}

/// Converts a possibly negative index into a position (-1 = last).
pub fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if index < 0 {
        let back = index.unsigned_abs() as usize;
        len.checked_sub(back)
    } else {
        let index = index as usize;
        (index < len).then_some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: Vec<(&str, Value)>) -> Record {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn nested_lookup() {
        let row = record(vec![(
            "position",
            Value::Object(record(vec![("latitude", Value::Float(12.5))])),
        )]);
        let path = FieldPath::from_value(&"position.latitude".into()).unwrap();
        assert_eq!(path.lookup(&row).unwrap(), &Value::Float(12.5));
    }

    #[test]
    fn array_index_segments() {
        let row = record(vec![("tags", Value::Array(vec!["a".into(), "b".into()]))]);
        let last = FieldPath::from_value(&"tags.-1".into()).unwrap();
        assert_eq!(last.lookup(&row).unwrap(), &Value::from("b"));

        let past_end = FieldPath::from_value(&"tags.2".into()).unwrap();
        assert!(matches!(
            past_end.lookup(&row),
            Err(EvalError::MissingField(_))
        ));
    }

    #[test]
    fn numeric_keys_on_objects() {
        let row = record(vec![("2020", Value::Integer(3))]);
        let path = FieldPath::from_value(&Value::Integer(2020)).unwrap();
        assert_eq!(path.lookup(&row).unwrap(), &Value::Integer(3));
    }

    #[test]
    fn null_fields_are_present() {
        let row = record(vec![("deleted", Value::Null)]);
        let path = FieldPath::from_value(&"deleted".into()).unwrap();
        assert_eq!(path.lookup(&row).unwrap(), &Value::Null);

        let missing = FieldPath::from_value(&"archived".into()).unwrap();
        assert!(matches!(missing.lookup(&row), Err(EvalError::MissingField(f)) if f == "archived"));
    }

    #[test]
    fn assign_nested_field() {
        let row = record(vec![(
            "owner",
            Value::Object(record(vec![("name", "ann".into())])),
        )]);
        let path = FieldPath::from_value(&"owner.name".into()).unwrap();
        let updated = path.assign(&row, "bob".into()).unwrap();

        assert_eq!(path.lookup(&updated).unwrap(), &Value::from("bob"));
        assert_eq!(path.lookup(&row).unwrap(), &Value::from("ann"));
    }
}
