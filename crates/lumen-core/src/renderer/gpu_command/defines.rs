// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The string-keyed constant table consumed by shader-source generation.

use super::command::{CommandType, IntPacking};
use std::collections::BTreeMap;

/// Key under which the integer packing mode is published.
pub const INT_AS_FLOAT_DEFINE: &str = "GPU_CMD_INT_AS_FLOAT";

/// An explicit table of preprocessor-style constants shared between the
/// components that publish values (such as the command queue) and the
/// component that generates shader source.
///
/// Entries are kept sorted by key so that generated sources are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderDefines {
    entries: BTreeMap<String, String>,
}

impl ShaderDefines {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, returning the previous value if any.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Returns the value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns `true` if `key` is defined.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes `key`, returning its value if it was defined.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Iterates over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Publishes every command type tag as `CMD_<type_name>` and the packing mode
/// as [`INT_AS_FLOAT_DEFINE`].
pub fn register_defines(defines: &mut ShaderDefines, packing: IntPacking) {
    for ty in CommandType::ALL {
        defines.set(ty.define_name(), ty.tag().to_string());
    }
    defines.set(INT_AS_FLOAT_DEFINE, packing.define_value());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_publishes_all_tags() {
        let mut defines = ShaderDefines::new();
        register_defines(&mut defines, IntPacking::BitCast);

        assert_eq!(defines.len(), CommandType::COUNT + 1);
        assert_eq!(defines.get("CMD_invalid"), Some("0"));
        assert_eq!(defines.get("CMD_store_light"), Some("1"));
        assert_eq!(defines.get("CMD_remove_light"), Some("2"));
        assert_eq!(defines.get("CMD_store_source"), Some("3"));
        assert_eq!(defines.get("CMD_remove_sources"), Some("4"));
        assert_eq!(defines.get(INT_AS_FLOAT_DEFINE), Some("1"));
    }

    #[test]
    fn test_register_keeps_unrelated_entries() {
        let mut defines = ShaderDefines::new();
        defines.set("MAX_LIGHTS", "65535");
        register_defines(&mut defines, IntPacking::Convert);

        assert_eq!(defines.get("MAX_LIGHTS"), Some("65535"));
        assert_eq!(defines.get(INT_AS_FLOAT_DEFINE), Some("0"));
    }

    #[test]
    fn test_set_overwrites_and_iterates_sorted() {
        let mut defines = ShaderDefines::new();
        assert_eq!(defines.set("B", "1"), None);
        defines.set("A", "2");
        assert_eq!(defines.set("B", "3"), Some("1".to_string()));

        let keys: Vec<_> = defines.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["A", "B"]);
        assert_eq!(defines.remove("A"), Some("2".to_string()));
        assert!(!defines.contains("A"));
    }
}
