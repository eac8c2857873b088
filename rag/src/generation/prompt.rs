//! Prompt text for answering, product lookup and graph query generation.

/// System prompt for answering product questions on behalf of `owner`.
pub fn system_prompt(owner: &str) -> String {
    let owner = if owner.trim().is_empty() { "our" } else { owner.trim() };
    format!(
        r#"You are a friendly, knowledgeable assistant for {owner} products and information.

When answering:
1. Base your answer on the reference material provided with the question.
2. Keep track of the conversation so follow-up questions make sense.
3. If the material does not cover the question, do not say so in those words. Suggest related products you do know about, offer help with other {owner} questions, or point to the official website for the latest details.
4. Be conversational and warm, and include specific product details when you have them.
5. Use plain text formatting.
6. Never mention "context", "reference material" or "conversation history" in your answer."#
    )
}

/// Final user message: retrieved context followed by the literal question.
pub fn question_message(context: &str, query: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {query}")
}

/// Prompt asking the model to pick one canonical product name from a list.
pub fn product_lookup_prompt(owner: &str, query: &str, canonical_names: &[&str]) -> String {
    let owner = owner.trim();
    let subject = if owner.is_empty() {
        "product".to_string()
    } else {
        format!("{owner} product")
    };
    format!(
        "Which {subject} does this message mention?\n\"{query}\"\n\n\
         Answer with exactly one name from this list and nothing else:\n{}\n\n\
         If no listed product is mentioned, or you are not sure, answer \"None\".",
        canonical_names.join(", ")
    )
}

/// System prompt for translating a question into read-only Cypher.
pub const CYPHER_SYSTEM_PROMPT: &str = r#"You translate questions about consumer products into Cypher queries for Neo4j.

Graph schema:
- (:Content {title, content, url, type}) is a crawled web page
- (:Entity {title, type}) is a product, ingredient or other named thing
- (:Content)-[:MENTIONS]->(:Entity)

Rules:
- Only read data (MATCH, WHERE, RETURN, ORDER BY, LIMIT).
- Return columns named title, content and url.
- Use parameters such as $product, $category or $query instead of literal values.
- Reply with the query only, without markdown fences."#;

/// User message for Cypher generation.
pub fn cypher_request(question: &str) -> String {
    format!("Convert this question to a Cypher query: {question}")
}
