use serde::{Deserialize, Serialize};

/// JSON document used to save and reopen a playground session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaygroundDocument {
    #[serde(default = "default_version")]
    pub version: String,

    pub source: String,

    /// Compile target shown in the target picker (default: "WGSL")
    #[serde(default = "default_target")]
    pub target: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,
}

/// In-memory editor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaygroundSettings {
    pub editor_font_size: f32,
    pub target: String,
    pub entry_point: Option<String>,
}

impl Default for PlaygroundSettings {
    fn default() -> Self {
        Self {
            editor_font_size: 14.0,
            target: default_target(),
            entry_point: None,
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_target() -> String {
    "WGSL".to_string()
}

impl PlaygroundDocument {
    pub fn new(source: impl Into<String>, settings: &PlaygroundSettings) -> Self {
        Self {
            version: default_version(),
            source: source.into(),
            target: settings.target.clone(),
            entry_point: settings.entry_point.clone(),
        }
    }

    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Open a document through a native file dialog.
    pub fn open_with_dialog() -> Option<Result<Self, String>> {
        let path = rfd::FileDialog::new()
            .add_filter("Playground", &["json"])
            .pick_file()?;
        let result = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))
            .and_then(|text| Self::from_json(&text).map_err(|e| format!("Invalid playground file: {}", e)));
        Some(result)
    }

    /// Save through a native file dialog. `None` when the dialog was cancelled.
    pub fn save_with_dialog(&self) -> Option<Result<(), String>> {
        let path = rfd::FileDialog::new()
            .add_filter("Playground", &["json"])
            .set_file_name("playground.json")
            .save_file()?;
        let result = self
            .to_json()
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&path, json).map_err(|e| format!("Failed to write {}: {}", path.display(), e)));
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let doc = PlaygroundDocument::from_json(r#"{"source": "fn main() {}"}"#).unwrap();
        assert_eq!(doc.version, "1.0");
        assert_eq!(doc.target, "WGSL");
        assert_eq!(doc.entry_point, None);
    }

    #[test]
    fn test_serializes_camel_case() {
        let settings = PlaygroundSettings {
            entry_point: Some("computeMain".into()),
            ..Default::default()
        };
        let json = PlaygroundDocument::new("src", &settings).to_json().unwrap();
        assert!(json.contains("\"entryPoint\": \"computeMain\""));
    }

    #[test]
    fn test_missing_source_is_rejected() {
        assert!(PlaygroundDocument::from_json(r#"{"target": "HLSL"}"#).is_err());
    }
}
