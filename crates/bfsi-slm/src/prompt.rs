//! Chat template for TinyLlama-style (Zephyr) chat models.

/// End-of-turn marker; generation stops here.
pub const STOP_MARKER: &str = "</s>";

/// Render one system + user turn, leaving the assistant turn open.
pub fn render_prompt(system_prompt: &str, user_query: &str) -> String {
    format!("<|system|>\n{system_prompt}{STOP_MARKER}\n<|user|>\n{user_query}{STOP_MARKER}\n<|assistant|>\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_system_then_user_then_open_assistant_turn() {
        let p = render_prompt("Be brief.", "What is a loan?");
        assert_eq!(p, "<|system|>\nBe brief.</s>\n<|user|>\nWhat is a loan?</s>\n<|assistant|>\n");
    }
}
