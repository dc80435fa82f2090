//! Prompt templates.

use crate::memory::Turn;

/// Wrap a user question so the model compares papers instead of summarising
/// one.
pub fn enhance_query(query: &str) -> String {
    format!(
        "Perform a syntopical analysis across multiple academic papers to answer: {query}\n\
         Consider different perspectives, methodologies, and findings from all relevant papers. \
         Identify agreements, disagreements, and complementary insights between the papers. \
         Cite specific papers when referencing their content."
    )
}

/// Structured six-part analysis request for a topic.
pub fn analysis_prompt(topic: &str) -> String {
    format!(
        "Perform a comprehensive syntopical analysis on the topic: '{topic}'\n\n\
         Please structure your analysis as follows:\n\
         1. Overview of the topic and its significance\n\
         2. Key perspectives and approaches across the papers\n\
         3. Major agreements between the papers\n\
         4. Notable disagreements or contradictions\n\
         5. Gaps in the literature and potential future research directions\n\
         6. Synthesis of the most important insights\n\n\
         For each point, cite specific papers and explain how they contribute to the \
         understanding of the topic."
    )
}

/// Render history as alternating `Human:` / `Assistant:` lines.
pub fn format_history<'a>(turns: impl IntoIterator<Item = &'a Turn>) -> String {
    turns
        .into_iter()
        .map(|t| format!("\nHuman: {}\nAssistant: {}", t.question, t.answer))
        .collect()
}

/// Ask the model to fold the conversation into a self-contained question.
pub fn condense_question_prompt(history: &str, question: &str) -> String {
    format!(
        "Given the following conversation and a follow up question, rephrase the follow up \
         question to be a standalone question, in its original language.\n\n\
         Chat History:\n{history}\n\
         Follow Up Input: {question}\n\
         Standalone question:"
    )
}

/// System message carrying the retrieved passages.
pub fn answer_system_prompt(context: &str) -> String {
    format!(
        "Use the following pieces of context to answer the user's question. \n\
         If you don't know the answer, just say that you don't know, don't try to make up an \
         answer.\n\
         ----------------\n\
         {context}"
    )
}
