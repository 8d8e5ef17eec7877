/// Fixed system prompt for the environmental-law assistant.
pub const SYSTEM_PROMPT: &str = "You are an expert Environmental Law Assistant. Your role is to:
1. Provide accurate information about environmental laws and regulations
2. Explain legal concepts in clear, understandable terms
3. Reference specific laws and regulations when applicable
4. Highlight important legal considerations and compliance requirements
Please be professional, precise, and helpful in your responses.";

/// Combines the question with the rendered retrieval block. An empty block
/// leaves the question untouched.
pub fn build_user_prompt(question: &str, reference: &str) -> String {
    if reference.trim().is_empty() {
        return question.to_string();
    }

    format!(
        "{question}\n\nReference material:\n{reference}\n\n\
         Use the reference material above where it is relevant to the question."
    )
}
