//! Engine settings.

use crate::base::{Float, Int};
use crate::error::{EngineError, Result};
use crate::geometry::Vector3f;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// A typed settings value from the scene container's settings block.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// 32-bit integer.
    Int(Int),

    /// 32-bit float.
    Float(Float),

    /// Float triplet.
    Vec3(Vector3f),

    /// String.
    Str(String),
}

/// The settings read from the scene container, passed immutably through the
/// engine. Lookups come in three flavours matching how badly a caller needs
/// the key: presence checks, lookups that warn once per missing key, and
/// typed getters whose absence is fatal.
#[derive(Debug, Default)]
pub struct Config {
    values: HashMap<String, Value>,
    warned: Mutex<HashSet<String>>,
}

impl Config {
    /// Creates a config from decoded key/value pairs.
    ///
    /// * `values` - The decoded settings.
    pub fn new(values: HashMap<String, Value>) -> Self {
        Self {
            values,
            warned: Mutex::new(HashSet::new()),
        }
    }

    /// Returns whether a key is present.
    ///
    /// * `key` - The settings key.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Looks a key up, logging a warning the first time a missing key is
    /// asked for.
    ///
    /// * `key` - The settings key.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        let value = self.values.get(key);
        if value.is_none() {
            let mut warned = self.warned.lock().unwrap();
            if warned.insert(key.to_owned()) {
                warn!("Setting '{key}' not found");
            }
        }
        value
    }

    fn require(&self, key: &str) -> Result<&Value> {
        self.values.get(key).ok_or_else(|| EngineError::Config {
            key: key.to_owned(),
            problem: "not found".to_owned(),
        })
    }

    fn type_error(key: &str, expected: &str) -> EngineError {
        EngineError::Config {
            key: key.to_owned(),
            problem: format!("is not of type {expected}"),
        }
    }

    /// Gets a setting as an integer; missing or mistyped keys are fatal.
    ///
    /// * `key` - The settings key.
    pub fn int(&self, key: &str) -> Result<Int> {
        match self.require(key)? {
            Value::Int(i) => Ok(*i),
            _ => Err(Self::type_error(key, "int4")),
        }
    }

    /// Gets a setting as a boolean, which is an integer > 0.
    ///
    /// * `key` - The settings key.
    pub fn bool(&self, key: &str) -> Result<bool> {
        Ok(self.int(key)? > 0)
    }

    /// Gets a setting as a float; missing or mistyped keys are fatal.
    ///
    /// * `key` - The settings key.
    pub fn float(&self, key: &str) -> Result<Float> {
        match self.require(key)? {
            Value::Float(f) => Ok(*f),
            _ => Err(Self::type_error(key, "flt4")),
        }
    }

    /// Gets a setting as a float triplet; missing or mistyped keys are fatal.
    ///
    /// * `key` - The settings key.
    pub fn vec3(&self, key: &str) -> Result<Vector3f> {
        match self.require(key)? {
            Value::Vec3(v) => Ok(*v),
            _ => Err(Self::type_error(key, "vec3")),
        }
    }

    /// Gets a setting as a string; missing or mistyped keys are fatal.
    ///
    /// * `key` - The settings key.
    pub fn string(&self, key: &str) -> Result<String> {
        match self.require(key)? {
            Value::Str(s) => Ok(s.clone()),
            _ => Err(Self::type_error(key, "str ")),
        }
    }
}
