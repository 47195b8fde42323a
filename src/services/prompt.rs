use crate::models::{AnalysisMode, MediaInput};

const ITEMS_SHAPE: &str =
    r#"{"items":[{"name":"Food","grams":100,"calories":0,"protein":0,"carbs":0,"fat":0}],"confidence":0.9}"#;
const OPTIONS_SHAPE: &str =
    r#"{"options":[{"name":"Food name","grams":100,"calories":0,"protein":0,"carbs":0,"fat":0}]}"#;

/// Short user turn that accompanies the image in chat-style requests.
pub const CHAT_USER_TEXT: &str = "Analyze this meal.";

/// Which top-level array the provider is asked to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Items,
    Options,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub instruction: String,
    pub shape: ResponseShape,
}

impl Prompt {
    pub fn for_media(media: &MediaInput, mode: AnalysisMode) -> Self {
        match (media, mode) {
            (MediaInput::Audio(_), AnalysisMode::Search) => Prompt {
                instruction: format!(
                    "You are a nutritionist. Listen to the audio. If the speaker lists several foods \
                     (for example \"rice, beans and chicken\"), return each one as a separate option \
                     with estimated macros for an average portion. If the speaker names a single \
                     generic food (for example \"apple\"), return 3 to 5 common sizes or variations \
                     of it. Return ONLY a JSON object: {}",
                    OPTIONS_SHAPE
                ),
                shape: ResponseShape::Options,
            },
            (MediaInput::Audio(_), AnalysisMode::Default) => Prompt {
                instruction: format!(
                    "You are a nutritionist. Listen to the audio describing a meal. Identify every \
                     food mentioned, estimate its weight in grams when none is given (use average \
                     portions), and calculate calories and macros. Return ONLY a JSON object: {}",
                    ITEMS_SHAPE
                ),
                shape: ResponseShape::Items,
            },
            (MediaInput::Image(_), _) => Prompt {
                instruction: format!(
                    "You are a nutritionist. Analyze the image, identify the foods, estimate the \
                     weight of each in grams and calculate calories and macros. Return ONLY a JSON \
                     object: {}",
                    ITEMS_SHAPE
                ),
                shape: ResponseShape::Items,
            },
        }
    }

    /// Instruction for the system message of chat-completion APIs.
    pub fn chat_system_instruction(&self) -> String {
        format!(
            "{} Do not wrap the JSON in markdown and do not add explanations.",
            self.instruction
        )
    }
}
