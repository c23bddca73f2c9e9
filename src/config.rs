use ::std::fs::File;
use ::std::io::prelude::*;
use ::std::path::Path;
use ::std::env;
use ::std::sync::RwLock;

use crate::error::RResult;
use crate::util::json::{self, Value, DeserializeOwned, Serialize};

/// What we run with when nobody hands us a config file
static DEFAULT_CONFIG: &'static str = r#"
loglevel: "warn"
dispatch:
  # number of threads doing network i/o. 0 means one per cpu
  workers: 0
batch:
  # max number of records sent in one remote batch call
  max_size: 50
"#;

lazy_static! {
    /// create a static/global CONFIG var, and load it with our config data
    static ref CONFIG: RwLock<Value> = {
        match load_config() {
            Ok(x) => RwLock::new(x),
            Err(e) => {
                println!("recsync: error loading config, using defaults: {}", e);
                RwLock::new(json::parse_yaml(DEFAULT_CONFIG).unwrap_or_else(|_| json::obj()))
            }
        }
    };
}

/// load/parse our config file (if we have one) over the default config, and
/// return the parsed JSON value
fn load_config() -> RResult<Value> {
    let mut data = json::parse_yaml(DEFAULT_CONFIG)?;
    let path_env = match env::var("RECSYNC_CONFIG_FILE") {
        Ok(x) => x,
        Err(_) => return Ok(data),
    };
    let path = Path::new(&path_env[..]);
    let mut file = File::open(&path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    let from_file: Value = json::parse_yaml(&contents)?;
    json::merge(&mut data, &from_file);
    Ok(data)
}

/// get a value from our config
pub fn get<T: DeserializeOwned>(keys: &[&str]) -> RResult<T> {
    let guard = lockr!(*CONFIG);
    json::get(keys, &guard)
}

/// get a value from our config, or None if it's missing or the wrong type
pub fn get_opt<T: DeserializeOwned>(keys: &[&str]) -> Option<T> {
    get(keys).ok()
}

/// Set a value into our config
pub fn set<T: Serialize>(keys: &[&str], val: &T) -> RResult<()> {
    let mut guard = lockw!(*CONFIG);
    json::set(keys, &mut guard, val)
}

/// Merge a runtime config object over the current config
pub fn merge(runtime: &Value) -> RResult<()> {
    let mut guard = lockw!(*CONFIG);
    json::merge(&mut guard, runtime);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_defaults() {
        let max: usize = get(&["batch", "max_size"]).unwrap();
        assert!(max > 0);
        assert_eq!(get_opt::<String>(&["not", "here"]), None);
    }

    #[test]
    fn set_and_merge() {
        set(&["test_only", "name"], &String::from("slappy")).unwrap();
        assert_eq!(get::<String>(&["test_only", "name"]).unwrap(), "slappy");
        merge(&json!({"test_only": {"age": 3}})).unwrap();
        assert_eq!(get::<String>(&["test_only", "name"]).unwrap(), "slappy");
        assert_eq!(get::<u32>(&["test_only", "age"]).unwrap(), 3);
    }
}
