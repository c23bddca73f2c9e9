//! Access control is somebody else's problem. We hold onto whatever we're
//! given and ship it with saves, untouched.

use crate::util::json::Value;

/// An opaque, serializable permission value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Acl(Value);

impl Acl {
    pub fn new(val: Value) -> Acl {
        Acl(val)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}
