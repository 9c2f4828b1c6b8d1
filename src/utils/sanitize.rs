// Copyright 2025 Lablup Inc. and Jeongkyu Shin
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

use anyhow::{bail, Result};

/// Validate a composed remote command line before it is sent anywhere.
pub fn sanitize_command(command: &str) -> Result<String> {
    if command.trim().is_empty() {
        bail!("Empty command not allowed");
    }

    // Stay well below the usual ARG_MAX of the remote shell
    const MAX_COMMAND_LENGTH: usize = 65536;
    if command.len() > MAX_COMMAND_LENGTH {
        bail!(
            "Command too long: {} bytes (max: {} bytes)",
            command.len(),
            MAX_COMMAND_LENGTH
        );
    }

    if command.contains('\0') {
        bail!("Command contains null bytes");
    }

    Ok(command.to_string())
}

/// Reduce a host name to characters safe for a local file name.
pub fn sanitize_file_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

/// Single-quote `value` for a POSIX shell.
pub fn quote_single(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Double-quote `value` for a POSIX shell.
///
/// Variable expansion stays possible on the remote side; only `"` and `\`
/// are escaped.
pub fn quote_double(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_command_valid() {
        assert!(sanitize_command("ls -la").is_ok());
        assert!(sanitize_command("echo 'hello world'").is_ok());
        assert!(sanitize_command("ps aux | grep ssh").is_ok());
    }

    #[test]
    fn test_sanitize_command_empty() {
        assert!(sanitize_command("").is_err());
        assert!(sanitize_command("   ").is_err());
    }

    #[test]
    fn test_sanitize_command_null_bytes() {
        assert!(sanitize_command("ls\0").is_err());
    }

    #[test]
    fn test_sanitize_file_component() {
        assert_eq!(sanitize_file_component("as1-11.example.org"), "as1-11.example.org");
        assert_eq!(sanitize_file_component("[::1]"), "___1_");
        assert_eq!(sanitize_file_component("a/b"), "a_b");
        assert_eq!(sanitize_file_component(".."), "unnamed");
        assert_eq!(sanitize_file_component(""), "unnamed");
    }

    #[test]
    fn test_quote_single() {
        assert_eq!(quote_single("/tmp/data"), "'/tmp/data'");
        assert_eq!(quote_single("/tmp/it's"), r"'/tmp/it'\''s'");
    }

    #[test]
    fn test_quote_double() {
        assert_eq!(quote_double("plain"), "\"plain\"");
        assert_eq!(quote_double("$HOME"), "\"$HOME\"");
        assert_eq!(quote_double(r#"say "hi" \o/"#), r#""say \"hi\" \\o/""#);
        assert_eq!(quote_double(""), "\"\"");
    }
}
