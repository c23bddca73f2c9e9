//! A small collection of utilities for poking at JSON (and YAML) values. The
//! field store, the config and the wire types all speak `Value`.

use ::serde_json;
use ::serde_yaml;
pub use ::serde_json::{Value, Map};
pub use ::serde::de::DeserializeOwned;
pub use ::serde::ser::Serialize;

use crate::error::{RError, RResult};

/// Parse a JSON string into anything deserializable
pub fn parse<T: DeserializeOwned>(string: &str) -> RResult<T> {
    Ok(serde_json::from_str(string)?)
}

/// Parse a YAML string and return a Value type
pub fn parse_yaml(string: &str) -> RResult<Value> {
    Ok(serde_yaml::from_str(string)?)
}

/// Turn a JSON-serializable object into a Result<String> of JSON.
pub fn stringify<T: Serialize>(obj: &T) -> RResult<String> {
    Ok(serde_json::to_string(obj)?)
}

/// Turn a JSON-serializable object into a Result<Value>
pub fn to_val<T: Serialize>(obj: &T) -> RResult<Value> {
    Ok(serde_json::to_value(obj)?)
}

/// Turn a JSON Value into a object that implements Deserialize
pub fn from_val<T: DeserializeOwned>(val: Value) -> RResult<T> {
    Ok(serde_json::from_value(val)?)
}

/// Create an empty JSON object
pub fn obj() -> Value {
    Value::Object(Map::new())
}

/// Walk a JSON structure, given a key path. Traverses both objects and arrays,
/// returning a reference to the found value, if any.
pub fn walk<'a>(keys: &[&str], data: &'a Value) -> Option<&'a Value> {
    let mut cur = data;
    for key in keys {
        cur = match *cur {
            Value::Object(ref obj) => obj.get(*key)?,
            Value::Array(ref arr) => arr.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// Like `walk`, except that this returns the raw type instead of a Value.
pub fn get<T: DeserializeOwned>(keys: &[&str], value: &Value) -> RResult<T> {
    match walk(keys, value) {
        Some(x) => from_val(x.clone()),
        None => Err(RError::Msg(format!("json: key not found: {:?}", keys))),
    }
}

/// A lot like `get()`, except it converts all errors into a None value.
pub fn get_opt<T: DeserializeOwned>(keys: &[&str], value: &Value) -> Option<T> {
    get(keys, value).ok()
}

/// Set a value into a JSON object at the given key path, creating any
/// intermediate objects that don't exist yet.
pub fn set<T: Serialize>(keys: &[&str], container: &mut Value, to: &T) -> RResult<()> {
    let (last, butlast) = match keys.split_last() {
        Some(x) => x,
        None => return Err(RError::Msg(String::from("json: set: no keys given"))),
    };
    let mut cur = container;
    for key in butlast {
        cur = match cur {
            Value::Object(map) => map.entry(*key).or_insert_with(obj),
            _ => return Err(RError::Msg(format!("json: set: dead end at {}", key))),
        };
    }
    match cur {
        Value::Object(map) => {
            map.insert(String::from(*last), to_val(to)?);
            Ok(())
        }
        _ => Err(RError::Msg(format!("json: set: dead end at {}", last))),
    }
}

/// Deep-merge `from` into `into`. Objects are merged key by key, anything else
/// in `from` replaces what's in `into`.
pub fn merge(into: &mut Value, from: &Value) {
    if let Value::Object(src) = from {
        if let Value::Object(dest) = into {
            for (key, val) in src {
                match dest.get_mut(key) {
                    Some(existing) => merge(existing, val),
                    None => { dest.insert(key.clone(), val.clone()); }
                }
            }
            return;
        }
    }
    *into = from.clone();
}
