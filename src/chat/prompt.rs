//! Prompt templates for the two question shapes.

/// Build the prompt sent to the model.
///
/// With a non-empty `context` the model is told to answer from the context
/// only and to say so when it can't; without one the question is open-ended.
pub fn build(question: &str, context: &str) -> String {
    if context.is_empty() {
        format!(
            "Question: {question}\n\n\
             Please provide a detailed answer. Feel free to use markdown formatting for better readability."
        )
    } else {
        format!(
            "Context: {context}\n\n\
             Question: {question}\n\n\
             Please provide a detailed answer based on the context above. \
             If the answer cannot be found in the context, please say so."
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_prompt_contains_both_verbatim() {
        let context = "Invoice #42 was paid on 3 March.\nTotal: $1,200";
        let question = "When was invoice 42 paid?";
        let prompt = build(question, context);

        assert!(prompt.contains(context));
        assert!(prompt.contains(question));
        assert!(prompt.contains("based on the context above"));
        assert!(prompt.contains("cannot be found in the context"));
        assert!(prompt.find(context).unwrap() < prompt.find(question).unwrap());
    }

    #[test]
    fn open_prompt_has_no_context_section() {
        let prompt = build("What is 2+2?", "");
        assert!(prompt.starts_with("Question: What is 2+2?\n\n"));
        assert!(!prompt.contains("Context:"));
        assert!(prompt.contains("markdown"));
    }
}
