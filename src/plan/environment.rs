//! Execution environments
//!
//! An environment is a named bag of variables handed to work callbacks. The
//! engine never interprets the variables; it only routes them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named target environment for a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,

    /// Environment variables
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

impl Environment {
    /// Create an empty environment with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: HashMap::new(),
        }
    }

    /// Builder-style variable insert
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Set a variable
    pub fn set(&mut self, key: &str, value: &str) {
        self.variables.insert(key.to_string(), value.to_string());
    }

    /// Get a variable
    pub fn get(&self, key: &str) -> Option<&String> {
        self.variables.get(key)
    }
}
