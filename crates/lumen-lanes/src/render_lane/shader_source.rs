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

//! Generation of shader sources from a [`ShaderDefines`] table.

use lumen_core::renderer::gpu_command::ShaderDefines;
use std::fmt::Write;

/// Builds WGSL sources whose constants come from a [`ShaderDefines`] table.
///
/// Each entry becomes a `const NAME = VALUE;` line in a preamble prepended
/// to the shader body. Entries whose key is not a valid WGSL identifier, or
/// whose value is empty, are skipped with a warning.
///
/// ```
/// use lumen_core::renderer::gpu_command::ShaderDefines;
/// use lumen_lanes::ShaderSourceBuilder;
///
/// let mut defines = ShaderDefines::new();
/// defines.set("CMD_store_light", "1");
///
/// let source = ShaderSourceBuilder::new(&defines).build("fn main() {}");
/// assert!(source.starts_with("const CMD_store_light = 1;\n"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ShaderSourceBuilder<'a> {
    defines: &'a ShaderDefines,
}

impl<'a> ShaderSourceBuilder<'a> {
    /// Creates a builder reading from `defines`.
    pub fn new(defines: &'a ShaderDefines) -> Self {
        Self { defines }
    }

    /// Renders the `const` declarations for every usable entry, in key order.
    pub fn preamble(&self) -> String {
        let mut out = String::new();
        for (key, value) in self.defines.iter() {
            if !is_wgsl_identifier(key) {
                log::warn!("ShaderSourceBuilder: Skipping define '{key}': not a WGSL identifier");
                continue;
            }
            let value = value.trim();
            if value.is_empty() {
                log::warn!("ShaderSourceBuilder: Skipping define '{key}': empty value");
                continue;
            }
            // Writing to a String cannot fail.
            let _ = writeln!(out, "const {key} = {value};");
        }
        out
    }

    /// Returns the preamble followed by `body`.
    pub fn build(&self, body: &str) -> String {
        let mut source = self.preamble();
        if !source.is_empty() {
            source.push('\n');
        }
        source.push_str(body);
        source
    }
}

/// Returns `true` if `name` can be used as a WGSL identifier.
pub fn is_wgsl_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    if name == "_" || name.starts_with("__") {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::renderer::gpu_command::{register_defines, IntPacking};

    #[test]
    fn test_preamble_lists_registered_commands() {
        let mut defines = ShaderDefines::new();
        register_defines(&mut defines, IntPacking::BitCast);
        let preamble = ShaderSourceBuilder::new(&defines).preamble();

        assert!(preamble.contains("const CMD_invalid = 0;\n"));
        assert!(preamble.contains("const CMD_remove_sources = 4;\n"));
        assert!(preamble.contains("const GPU_CMD_INT_AS_FLOAT = 1;\n"));
        assert_eq!(preamble.lines().count(), 6);
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let mut defines = ShaderDefines::new();
        defines.set("9LIVES", "9");
        defines.set("has space", "1");
        defines.set("EMPTY", "  ");
        defines.set("__reserved", "1");
        defines.set("MAX_LIGHTS", "65535u");

        let preamble = ShaderSourceBuilder::new(&defines).preamble();
        assert_eq!(preamble, "const MAX_LIGHTS = 65535u;\n");
    }

    #[test]
    fn test_build_without_defines_is_body() {
        let defines = ShaderDefines::new();
        assert_eq!(ShaderSourceBuilder::new(&defines).build("fn f() {}"), "fn f() {}");
    }

    #[test]
    fn test_identifier_rules() {
        assert!(is_wgsl_identifier("CMD_store_light"));
        assert!(is_wgsl_identifier("_private"));
        assert!(!is_wgsl_identifier(""));
        assert!(!is_wgsl_identifier("_"));
        assert!(!is_wgsl_identifier("a-b"));
    }
}
