//! Server configuration, deserialized from the editor's settings payload.

use std::fmt;

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Configuration {
    pub diag: DiagConfiguration,
    pub jpaths: Vec<String>,
    pub fmt: FmtConfiguration,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            diag: DiagConfiguration::default(),
            jpaths: Vec::new(),
            fmt: FmtConfiguration::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiagConfiguration {
    pub linter: bool,
    pub evaluate: bool,
}

impl Default for DiagConfiguration {
    fn default() -> Self {
        DiagConfiguration {
            linter: true,
            evaluate: false,
        }
    }
}

/// Options handed to the external formatter.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FmtConfiguration {
    pub indent: u32,
    pub max_blank_lines: u32,
    /// `"` | `'` | anything else leaves strings alone.
    pub string_style: String,
    /// `//` | `#` | anything else leaves comments alone.
    pub comment_style: String,
    pub pretty_field_names: bool,
    pub pad_arrays: bool,
    pub pad_objects: bool,
    pub sort_imports: bool,
    pub implicit_plus: bool,
}

impl Default for FmtConfiguration {
    fn default() -> Self {
        FmtConfiguration {
            indent: 2,
            max_blank_lines: 2,
            string_style: "\"".to_string(),
            comment_style: "//".to_string(),
            pretty_field_names: true,
            pad_arrays: false,
            pad_objects: true,
            sort_imports: true,
            implicit_plus: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FormatError {
    pub message: String,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FormatError {}

/// External formatter seam; the transport layer typically shells out to
/// `jsonnetfmt`.
pub trait Formatter: Send + Sync {
    fn format(
        &self,
        filename: &str,
        contents: &str,
        options: &FmtConfiguration,
    ) -> Result<String, FormatError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_shipped_configuration() {
        let config = Configuration::default();
        assert!(config.diag.linter);
        assert!(!config.diag.evaluate);
        assert_eq!(config.fmt.indent, 2);
        assert_eq!(config.fmt.string_style, "\"");
        assert!(config.fmt.sort_imports);
    }

    #[test]
    fn deserializes_a_settings_payload() {
        let payload = serde_json::json!({
            "diag": {"linter": false, "evaluate": true},
            "jpaths": ["vendor", "/abs/lib"],
            "fmt": {"indent": 4, "maxBlankLines": 1, "stringStyle": "'", "implicitPlus": false}
        });
        let config: Configuration = serde_json::from_value(payload).unwrap();
        assert!(!config.diag.linter);
        assert!(config.diag.evaluate);
        assert_eq!(config.jpaths, vec!["vendor", "/abs/lib"]);
        assert_eq!(config.fmt.indent, 4);
        assert_eq!(config.fmt.max_blank_lines, 1);
        assert_eq!(config.fmt.string_style, "'");
        assert!(!config.fmt.implicit_plus);
        // untouched fields keep defaults
        assert!(config.fmt.pad_objects);
    }

    #[test]
    fn partial_payloads_fill_with_defaults() {
        let config: Configuration = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(config.diag.linter);
    }
}
