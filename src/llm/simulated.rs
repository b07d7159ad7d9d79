//! Simulated LLM for offline use and testing
//!
//! Returns canned responses without requiring external API calls.

/// Simulated LLM provider
pub struct SimulatedLlm {
    model_name: String,
}

impl SimulatedLlm {
    pub fn new(model_name: String) -> Self {
        Self { model_name }
    }

    /// Echo the question and list the cited sources
    pub fn generate(&self, prompt: &str) -> String {
        let question = prompt
            .split("Question:")
            .nth(1)
            .and_then(|s| s.lines().next())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .unwrap_or("your question");

        let sources: Vec<&str> = prompt
            .lines()
            .filter_map(|line| line.split("Source: ").nth(1))
            .map(|rest| rest.split(" |").next().unwrap_or(rest).trim())
            .collect();

        if sources.is_empty() {
            format!(
                "No retrieved records cover \"{}\".\n\n\
                 Note: This is a test response from the simulated LLM (model: {}).",
                question, self.model_name
            )
        } else {
            format!(
                "Based on {} retrieved passage(s), here is a response to \"{}\".\n\
                 Sources: {}\n\n\
                 Note: This is a test response from the simulated LLM (model: {}).",
                sources.len(),
                question,
                sources.join(", "),
                self.model_name
            )
        }
    }
}
