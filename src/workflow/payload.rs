/// Run Request Payload
///
/// Builds the JSON body posted to the workflow run endpoint. The message is
/// embedded verbatim; the tweaks are passthrough configuration for the
/// remote flow's components and are never inspected here.

use serde_json::{Map, Value, json};

/// Component identifiers of the deployed flow. Each is sent with an empty
/// configuration object.
pub const TWEAK_COMPONENTS: [&str; 12] = [
    "ChatInput-a18M0",
    "ParseData-UWXBP",
    "Prompt-zalIe",
    "SplitText-9kwYE",
    "ChatOutput-oFtXw",
    "Directory-aGzT0",
    "NVIDIAEmbeddingsComponent-sQTue",
    "FAISS-SAdhf",
    "NVIDIAEmbeddingsComponent-GMjQV",
    "FAISS-wKFtX",
    "NVIDIAModelComponent-0s6HX",
    "OpenAIModel-gJpk6",
];

const CHAT_IO_TYPE: &str = "chat";

#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub input_value: String,
    pub output_type: &'static str,
    pub input_type: &'static str,
    pub tweaks: Map<String, Value>,
}

impl RunRequest {
    /// Build a chat-in/chat-out request for `message`.
    pub fn chat(message: &str) -> Self {
        let tweaks = TWEAK_COMPONENTS
            .iter()
            .map(|id| (id.to_string(), Value::Object(Map::new())))
            .collect();

        Self {
            input_value: message.to_string(),
            output_type: CHAT_IO_TYPE,
            input_type: CHAT_IO_TYPE,
            tweaks,
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "input_value": self.input_value,
            "output_type": self.output_type,
            "input_type": self.input_type,
            "tweaks": self.tweaks,
        })
    }

    /// Serialized request body.
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }
}
