//! Built-in prompt texts
//!
//! The tool-decision prompt teaches the model the `<APIs>` grammar the
//! parser in [`crate::toolcall`] understands; the two must stay in sync.

/// System prompt for the tool-decision call (LLM call #1)
pub const TOOL_DECISION_SYSTEM_PROMPT: &str = "\
You are a helpful assistant with access to a web_search tool.

Decide whether answering the user requires fresh information from the web \
(current events, prices, availability, anything time-sensitive or outside \
your knowledge). If it does, reply with ONLY a tool invocation in this exact \
format:

<APIs>[{\"name\": \"web_search\", \"parameters\": {\"search_query\": \"<query>\"}}]</APIs>

The parameters object may also set search_engine, count, \
search_recency_filter, search_domain_filter and content_size. If no search \
is needed, answer the user directly and do not emit the <APIs> block.";

/// System prompt for the final-answer call (LLM call #2)
pub const FINAL_ANSWER_SYSTEM_PROMPT: &str = "\
You are a helpful assistant. Use the conversation history and, when a \
web_search function result is present, ground your answer in it. Answer \
directly and concisely; do not mention the search machinery or emit any \
<APIs> block.";

/// Prompt for OCR text extraction from an image
pub const OCR_PROMPT: &str = "\
Extract all text contained in the image and return it with its original \
formatting. Ignore what the image depicts; return only the raw text.";

/// Prompt for image description
pub const CAPTION_PROMPT: &str = "\
Describe everything in this image in detail, covering: the main objects or \
people and what they are doing; the scene, setting and atmosphere; any text \
and where it appears; relationships between the elements; other notable \
features such as symbols, colors or lighting; and the overall style or \
likely purpose of the image (photo, screenshot, illustration, ad).";

/// Assistant turn recorded when the final-answer call fails
pub const APOLOGY_TURN: &str =
    "Sorry, I ran into a problem while processing the follow-up information.";

/// Instruction for condensing an oversized search result
pub fn summarization_instruction(query: &str, payload: &str) -> String {
    format!(
        "You are an information-processing assistant. Summarize the following \
         web search results into one passage that keeps the core facts, with \
         particular attention to prices, quality and platform credibility, so \
         it can be used to answer the user's question about '{}'. Output only \
         the summary, with no extra commentary.\n\nOriginal search results:\n{}",
        query, payload
    )
}

/// Wrap retrieved knowledge and the user question into one prompt
pub fn augment_with_context(context: &str, question: &str) -> String {
    format!(
        "Please refer to the following background knowledge:\n---\n{}\n---\n\n\
         The user's original question is:\n{}",
        context, question
    )
}
