#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub num_predict: i32,
    pub temperature: f64,
    pub top_k: i64,
    pub stop: Vec<String>,
}

impl GenerationOptions {
    /// Fixed options for the reasoning protocol: greedy decoding with a
    /// bounded output budget and a stop sequence at the next turn boundary.
    pub fn deterministic() -> Self {
        GenerationOptions {
            num_predict: 200,
            temperature: 0.0,
            top_k: 20,
            stop: vec!["Question:".to_string()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub options: GenerationOptions,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        CompletionRequest {
            prompt: prompt.into(),
            options: GenerationOptions::deterministic(),
        }
    }
}
