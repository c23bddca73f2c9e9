//! Pointers are how one record refers to another without embedding it. On the
//! wire they look like
//!
//!     {"__type":"Pointer","className":"Note","objectId":"0165ab..."}

use crate::util::json::{self, Value};

static POINTER_TYPE: &'static str = "Pointer";

/// A lightweight (className, objectId) address of a saved record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pointer {
    #[serde(rename = "className")]
    pub class_name: String,
    #[serde(rename = "objectId")]
    pub object_id: String,
}

impl Pointer {
    pub fn new<T: Into<String>>(class_name: T, object_id: T) -> Pointer {
        Pointer {
            class_name: class_name.into(),
            object_id: object_id.into(),
        }
    }

    /// The inline (wire) form of this pointer
    pub fn to_value(&self) -> Value {
        inline(&self.class_name, Some(&self.object_id))
    }

    /// Pull a pointer out of a value, if the value is one. Anything else
    /// (including pointers missing an id) gives None.
    pub fn from_value(val: &Value) -> Option<Pointer> {
        if json::get_opt::<String>(&["__type"], val).as_ref().map(|x| x.as_str()) != Some(POINTER_TYPE) {
            return None;
        }
        let class_name: String = json::get_opt(&["className"], val)?;
        let object_id: String = json::get_opt(&["objectId"], val)?;
        Some(Pointer::new(class_name, object_id))
    }
}

/// Build the inline form of a reference. Targets that haven't been saved yet
/// get a null objectId.
pub fn inline(class_name: &str, object_id: Option<&String>) -> Value {
    json!({
        "__type": POINTER_TYPE,
        "className": class_name,
        "objectId": object_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_form() {
        let pointer = Pointer::new("Note", "abc123");
        let val = pointer.to_value();
        assert_eq!(json::stringify(&val).unwrap(), r#"{"__type":"Pointer","className":"Note","objectId":"abc123"}"#);
        assert_eq!(Pointer::from_value(&val), Some(pointer));
    }

    #[test]
    fn not_pointers() {
        assert_eq!(Pointer::from_value(&json!({"className": "Note", "objectId": "1"})), None);
        assert_eq!(Pointer::from_value(&inline("Note", None)), None);
        assert_eq!(Pointer::from_value(&json!("Pointer")), None);
    }
}
