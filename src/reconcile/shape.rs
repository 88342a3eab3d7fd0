//! How messages map onto collection items.

use crate::types::Record;
use serde_json::Value;
use std::fmt;

/// Describes one entity type's items: how to pull an item out of a
/// message, how to key it, and how to merge an update into it.
pub trait EntityShape: Send + Sync + 'static {
    type Item: Clone + PartialEq + Send + Sync + 'static;
    type Key: PartialEq + fmt::Debug;

    /// Pull the item out of a message. None if the message does not carry one.
    fn extract(&self, entity_type: &str, message: &Value) -> Option<Self::Item>;

    fn key(&self, item: &Self::Item) -> Option<Self::Key>;

    fn merge(&self, existing: &Self::Item, incoming: &Self::Item) -> Self::Item;

    /// Key carried by a delete message. Delete messages often hold only
    /// the key, so shapes with strict item types should override this.
    fn key_of_message(&self, entity_type: &str, message: &Value) -> Option<Self::Key> {
        self.extract(entity_type, message)
            .and_then(|item| self.key(&item))
    }
}

/// The entity inside a message: the field named after the entity type
/// when it holds an object, otherwise the message itself.
pub fn unwrap_entity<'a>(entity_type: &str, message: &'a Value) -> &'a Value {
    match message.get(entity_type) {
        Some(inner) if inner.is_object() => inner,
        _ => message,
    }
}

/// Schema-free records keyed by a named field.
///
/// Keys compare as JSON values, except that an integral float such as
/// `1.0` is the same key as the integer `1`.
#[derive(Clone, Debug)]
pub struct FieldShape {
    id_field: String,
    unwrap: bool,
}

impl FieldShape {
    pub fn new(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            unwrap: true,
        }
    }

    /// Whether to unwrap a sub-field named after the entity type.
    pub fn with_unwrap(mut self, unwrap: bool) -> Self {
        self.unwrap = unwrap;
        self
    }

    fn entity<'a>(&self, entity_type: &str, message: &'a Value) -> &'a Value {
        if self.unwrap {
            unwrap_entity(entity_type, message)
        } else {
            message
        }
    }
}

impl EntityShape for FieldShape {
    type Item = Record;
    type Key = Value;

    fn extract(&self, entity_type: &str, message: &Value) -> Option<Record> {
        Record::from_value(self.entity(entity_type, message))
    }

    fn key(&self, item: &Record) -> Option<Value> {
        item.get(&self.id_field).and_then(normalize_key)
    }

    fn merge(&self, existing: &Record, incoming: &Record) -> Record {
        existing.merged(incoming)
    }

    fn key_of_message(&self, entity_type: &str, message: &Value) -> Option<Value> {
        self.entity(entity_type, message)
            .get(&self.id_field)
            .and_then(normalize_key)
    }
}

/// Null is no key. Integral floats inside the integer range become integers.
fn normalize_key(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Number(number) if number.is_f64() => {
            let float = number.as_f64()?;
            if float.fract() != 0.0 {
                Some(value.clone())
            } else if (0.0..18_446_744_073_709_551_616.0).contains(&float) {
                Some(Value::from(float as u64))
            } else if (-9_223_372_036_854_775_808.0..0.0).contains(&float) {
                Some(Value::from(float as i64))
            } else {
                Some(value.clone())
            }
        }
        _ => Some(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_named_subfield() {
        let message = json!({"role": {"role_id": 1, "name": "Admin"}, "socket": "abc"});
        assert_eq!(
            unwrap_entity("role", &message),
            &json!({"role_id": 1, "name": "Admin"})
        );
    }

    #[test]
    fn test_unwrap_falls_back_to_message() {
        let bare = json!({"role_id": 1});
        assert_eq!(unwrap_entity("role", &bare), &bare);

        // A scalar under the entity name is a plain field, not a wrapper.
        let scalar = json!({"role": "admin", "user_id": 4});
        assert_eq!(unwrap_entity("role", &scalar), &scalar);
    }

    #[test]
    fn test_field_shape_keys() {
        let shape = FieldShape::new("user_id");
        let message = json!({"user": {"user_id": 4, "email": "a@b"}});

        let record = shape.extract("user", &message).unwrap();
        assert_eq!(shape.key(&record), Some(json!(4)));
        assert_eq!(shape.key_of_message("user", &message), Some(json!(4)));
        assert_eq!(shape.key_of_message("user", &json!({"user_id": null})), None);
    }

    #[test]
    fn test_field_shape_without_unwrap() {
        let shape = FieldShape::new("role_id").with_unwrap(false);
        let message = json!({"role": {"role_id": 1}, "role_id": 2});
        assert_eq!(shape.key_of_message("role", &message), Some(json!(2)));
    }

    #[test]
    fn test_integral_float_key_matches_integer() {
        let shape = FieldShape::new("role_id");
        let from_int = shape.key_of_message("role", &json!({"role_id": 1}));
        let from_float = shape.key_of_message("role", &json!({"role_id": 1.0}));
        assert_eq!(from_int, Some(json!(1)));
        assert_eq!(from_float, from_int);

        let negative = Record::new().with("role_id", -3.0);
        assert_eq!(shape.key(&negative), Some(json!(-3)));

        // Fractional ids and strings stay as they are.
        assert_eq!(
            shape.key_of_message("role", &json!({"role_id": 1.5})),
            Some(json!(1.5))
        );
        assert_eq!(
            shape.key_of_message("role", &json!({"role_id": "1"})),
            Some(json!("1"))
        );
    }

    #[test]
    fn test_non_object_is_not_a_record() {
        let shape = FieldShape::new("id");
        assert!(shape.extract("role", &json!("text")).is_none());
    }
}
