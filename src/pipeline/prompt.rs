//! Prompt templates: markdown files with `{{KEY}}` placeholders.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

pub fn load_template(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading prompt template {}", path.display()))
}

/// Replace every `{{KEY}}` with its value. Unknown placeholders are left
/// in place.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
    }
    out
}

/// Shape of the opening synthesis piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditoStyle {
    /// Two or three threads woven together.
    #[default]
    Focused,
    /// One thesis, every mention serves it.
    Angle,
    /// A single story, in depth.
    Deep,
}

impl EditoStyle {
    /// Unknown names fall back to `Focused`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "focused" => EditoStyle::Focused,
            "angle" => EditoStyle::Angle,
            "deep" => EditoStyle::Deep,
            other => {
                warn!(target: "pipeline", style = other, "unknown edito style, using focused");
                EditoStyle::Focused
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EditoStyle::Focused => "focused",
            EditoStyle::Angle => "angle",
            EditoStyle::Deep => "deep",
        }
    }

    pub fn instructions(&self) -> &'static str {
        self.instructions_for(PromptVersion::V1)
    }

    pub fn instructions_for(&self, version: PromptVersion) -> &'static str {
        match (version, self) {
            (PromptVersion::V1, EditoStyle::Focused) => FOCUSED,
            (PromptVersion::V1, EditoStyle::Angle) => ANGLE,
            (PromptVersion::V1, EditoStyle::Deep) => DEEP,
            (PromptVersion::V2, EditoStyle::Focused) => FOCUSED_V2,
            (PromptVersion::V2, EditoStyle::Angle) => ANGLE_V2,
            (PromptVersion::V2, EditoStyle::Deep) => DEEP_V2,
        }
    }
}

/// Generation of the style instructions. `V2` is terser, forbids stock
/// phrases and ends on a statement rather than a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptVersion {
    #[default]
    V1,
    V2,
}

impl PromptVersion {
    /// Unknown names fall back to `V1`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "v1" => PromptVersion::V1,
            "v2" => PromptVersion::V2,
            other => {
                warn!(target: "pipeline", version = other, "unknown prompt version, using v1");
                PromptVersion::V1
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PromptVersion::V1 => "v1",
            PromptVersion::V2 => "v2",
        }
    }
}

/// Value of `{{EDITO_STYLE_INSTRUCTIONS}}`: the style instructions, preceded
/// by the stock-phrase ban under `V2`.
pub fn style_block(style: EditoStyle, version: PromptVersion) -> String {
    let instructions = style.instructions_for(version);
    match version {
        PromptVersion::V1 => instructions.to_string(),
        PromptVersion::V2 => format!("{ANTI_TICS_V2}\n{instructions}"),
    }
}

const FOCUSED: &str = "   **Structure of the piece:**
   - Pick 2-3 themes among the selected articles and build a common thread between them
   - Hook: one strong sentence that sets the tone (question, striking fact, anecdote)
   - Body: connect the themes with a personal thread. Do NOT mention articles that do not serve it.
   - Close: a memorable line, a punchline or an opening for the reader
   - RULE: this is a selective column, not an exhaustive news roundup.";

const ANGLE: &str = "   **Structure of the piece:**
   - Identify ONE angle, one thesis that emerges from today's news
   - Hook: one strong sentence that states the thesis (question, striking fact, paradox)
   - Body: develop the argument using today's articles as evidence. Every mention must serve the thesis.
   - Close: a memorable line that wraps the thesis up
   - RULE: the whole piece serves ONE argument. News that does not fit the angle is left out.";

const DEEP: &str = "   **Structure of the piece:**
   - Identify THE most significant story among the selected articles
   - Hook: go straight into the subject
   - Body: analyse that single story in depth: context, stakes, implications, a personal opinion. Dig rather than spread.
   - Close: a clear position or an open question for the reader
   - RULE: single-topic column. Depth over breadth.";

const ANTI_TICS_V2: &str = "   **Style bans:**
   - FORBIDDEN stock phrases: \"Read that again slowly\", \"Maybe that is the real X\", \"this is not a metaphor\", \"Meanwhile\", \"Remains to be seen\", \"A classic of...\", \"What changes is...\", \"Behind this number\"
   - Words used at most once per piece: \"signal\", \"stakes\", \"colossal\", \"monumental\", \"brutal\", \"runaway\", \"pivot\", \"business model\", \"paradigm\", \"tectonic\", \"dizzying\"
   - At most one superlative per paragraph. No superlative in the title.
   - Quotation marks only for direct quotes and real neologisms, never around common technical terms (AI, LLM, fine-tuning).
   - Alarm tone only where it is earned. Everything else stays sober and factual.
   - Natural word order (subject, verb, object) in at least two sentences out of three.
   - No open question as the close. End on a statement.";

const FOCUSED_V2: &str = "   **Structure of the piece:**
   - Pick 2-3 themes among the selected articles and build a common thread between them
   - Hook: a fact, a number, a precise observation. No staging, no showing off.
   - Body: connect the themes with a personal thread. Do NOT mention articles that do not serve it.
   - Close: a clear position, full stop. No question to the reader, no \"remains to be seen\".
   - RULE: this is a selective column, not an exhaustive news roundup.";

const ANGLE_V2: &str = "   **Structure of the piece:**
   - Identify ONE angle, one thesis that emerges from today's news
   - Hook: a fact, a number, a precise observation that states the thesis. No rhetorical question.
   - Body: develop the argument using today's articles as evidence. Every mention must serve the thesis.
   - Close: a clear position that wraps the thesis up. Affirmative, not interrogative.
   - RULE: the whole piece serves ONE argument. News that does not fit the angle is left out.";

const DEEP_V2: &str = "   **Structure of the piece:**
   - Identify THE most significant story among the selected articles
   - Hook: go straight into the subject with a precise fact or number. No warm-up.
   - Body: analyse that single story in depth: context, implications, a personal opinion. Dig rather than spread.
   - Close: a clear position, an affirmative sentence. No open question, no \"time will tell\".
   - RULE: single-topic column. Depth over breadth.";
