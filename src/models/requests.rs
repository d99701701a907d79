use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct StartRecordingRequest {
    pub url: String,
    pub test_name: String,
    #[serde(default)]
    pub headless: Option<bool>,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    /// Render without writing files
    #[serde(default)]
    pub dry_run: Option<bool>,
}

fn default_viewport_width() -> u32 {
    1280
}
fn default_viewport_height() -> u32 {
    720
}
