//! Prompt templates for the completion endpoint

/// First `limit` characters of `text`
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

/// Ask for `num_questions` questions as a bare JSON array.
pub fn quiz_prompt(document_text: &str, num_questions: usize, char_limit: usize) -> String {
    format!(
        "Generate exactly {num_questions} quiz questions based on the text below.\n\
         \n\
         Return a JSON array. Each element must be an object with:\n\
         - \"question\": string\n\
         - \"type\": one of \"multiple_choice\", \"true_false\", \"short_answer\"\n\
         - \"options\": array of 2 to 4 strings (multiple_choice only)\n\
         - \"correct_answer\": string\n\
         - \"explanation\": 2 to 4 sentences explaining the correct answer\n\
         - \"source_excerpt\": a 2 to 5 sentence quote or paraphrase from the text supporting the answer\n\
         \n\
         Respond with the JSON array only.\n\
         \n\
         Text:\n\
         {}\n",
        truncate_chars(document_text, char_limit)
    )
}

/// Strict YES/NO judgment of whether two answers mean the same thing.
pub fn judge_prompt(submitted: &str, correct: &str) -> String {
    format!(
        "You are a strict answer validator.\n\
         The correct answer is: \"{correct}\"\n\
         The user answered: \"{submitted}\"\n\
         \n\
         Rules:\n\
         - If the user answer means essentially the same as the correct answer, respond ONLY with \"YES\".\n\
         - Otherwise, respond ONLY with \"NO\".\n\
         - Do not explain.\n"
    )
}

/// Context-only answer prompt for retrieved passages.
pub fn answer_prompt(question: &str, contexts: &[String]) -> String {
    let context_block = contexts
        .iter()
        .map(|c| format!("- {}", c))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a helpful assistant. Answer the question using ONLY the provided context. \
         If the answer cannot be found in the context, say you don't know.\n\
         \n\
         Context:\n\
         {context_block}\n\
         \n\
         Question: {question}\n\
         \n\
         Answer:"
    )
}
