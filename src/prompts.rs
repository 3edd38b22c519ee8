use crate::errors::{HunyuanError, Result};

/// Placeholder replaced by the video analysis when a script prompt is rendered.
pub const ANALYSIS_PLACEHOLDER: &str = "{analysis}";

pub const DEFAULT_VIDEO_PROMPT: &str = "These images are frames sampled in order from one video. \
Describe the scenes, subjects, actions, setting and mood, then summarize what the video is about.";

/// The two prompts behind a shooting script: one to analyze the frames, one
/// to write the script from that analysis. The text is passed through as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTemplate {
    pub name: String,
    pub analysis_prompt: String,
    /// Must contain [`ANALYSIS_PLACEHOLDER`].
    pub script_prompt: String,
}

const PRESETS: &[(&str, &str)] = &[
    (
        "promo",
        "Based on this video analysis, write a 30-second promotional shooting script. \
List each shot with duration, framing, camera movement, on-screen text and voice-over.\
\n\n{analysis}",
    ),
    (
        "vlog",
        "Based on this video analysis, write a casual vlog shooting script with an opening hook, \
three to five segments and a closing call to action. \
Give framing and narration for each shot.\n\n{analysis}",
    ),
    (
        "tutorial",
        "Based on this video analysis, write a step-by-step tutorial shooting script. \
For every step give the shot, the demonstration and the spoken explanation.\n\n{analysis}",
    ),
    (
        "story",
        "Based on this video analysis, write a short narrative shooting script with a clear \
beginning, conflict and resolution. Give scene headings, shots and dialogue.\n\n{analysis}",
    ),
];

impl ScriptTemplate {
    pub fn new(
        name: impl Into<String>,
        analysis_prompt: impl Into<String>,
        script_prompt: impl Into<String>,
    ) -> Result<Self> {
        let template = Self {
            name: name.into(),
            analysis_prompt: analysis_prompt.into(),
            script_prompt: script_prompt.into(),
        };
        if template.analysis_prompt.trim().is_empty() {
            return Err(HunyuanError::InvalidInput("analysis prompt must not be empty".into()));
        }
        if !template.script_prompt.contains(ANALYSIS_PLACEHOLDER) {
            return Err(HunyuanError::InvalidInput(format!(
                "script prompt must contain {ANALYSIS_PLACEHOLDER}"
            )));
        }
        Ok(template)
    }

    /// A built-in genre: `promo`, `vlog`, `tutorial` or `story`.
    pub fn preset(name: &str) -> Result<Self> {
        let key = name.trim().to_ascii_lowercase();
        PRESETS
            .iter()
            .find(|(n, _)| *n == key)
            .map(|(n, script)| Self {
                name: (*n).to_string(),
                analysis_prompt: DEFAULT_VIDEO_PROMPT.to_string(),
                script_prompt: (*script).to_string(),
            })
            .ok_or_else(|| {
                HunyuanError::InvalidInput(format!(
                    "unknown script style {name:?} (expected one of: {})",
                    Self::preset_names().join(", ")
                ))
            })
    }

    pub fn preset_names() -> Vec<&'static str> {
        PRESETS.iter().map(|(n, _)| *n).collect()
    }

    /// The script prompt with the analysis filled in.
    pub fn render(&self, analysis: &str) -> String {
        self.script_prompt.replace(ANALYSIS_PLACEHOLDER, analysis)
    }
}
