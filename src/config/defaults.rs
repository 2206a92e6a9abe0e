//! Default values for configuration

/// Default Qdrant gRPC URL for local development (port 6334, not 6333 REST)
pub fn default_qdrant_url() -> String {
    std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://127.0.0.1:6334".to_string())
}

/// Default environment variable name for Qdrant API key
pub fn default_qdrant_api_key_env() -> String {
    "QDRANT_API_KEY".to_string()
}

/// Default collection name
pub fn default_collection_name() -> String {
    "documents".to_string()
}

/// Default embedding endpoint (OpenAI-compatible)
pub fn default_embedding_url() -> String {
    std::env::var("QUIZZER_EMBEDDING_URL")
        .unwrap_or_else(|_| "https://api.openai.com".to_string())
}

/// Default embedding model
pub fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

/// Default embedding dimension (matches text-embedding-ada-002)
pub fn default_embedding_dimension() -> usize {
    1536
}

/// Default batch size for embedding
pub fn default_embedding_batch_size() -> usize {
    32
}

/// Default environment variable holding the model provider key
pub fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Default completion endpoint (OpenAI-compatible)
pub fn default_completion_url() -> String {
    std::env::var("QUIZZER_COMPLETION_URL")
        .unwrap_or_else(|_| "https://api.openai.com".to_string())
}

/// Default model for quiz generation and question answering
pub fn default_completion_model() -> String {
    "gpt-4".to_string()
}

/// Default model for short-answer judging
pub fn default_judge_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Default request timeout for model calls in seconds
pub fn default_completion_timeout() -> u64 {
    120
}

/// Default sampling temperature for quiz generation
pub fn default_generation_temperature() -> f32 {
    0.7
}

/// Default sampling temperature for question answering
pub fn default_answer_temperature() -> f32 {
    0.2
}

/// Default maximum characters per chunk
pub fn default_chunk_max_chars() -> usize {
    2000
}

/// Default overlap characters between chunks (none)
pub fn default_chunk_overlap() -> usize {
    0
}

/// Default number of points per upsert request
pub fn default_upsert_batch_size() -> usize {
    50
}

/// Default number of retries for a failed upsert batch
pub fn default_upsert_retries() -> usize {
    2
}

/// Default maximum document size in characters
pub fn default_max_document_chars() -> usize {
    500_000
}

/// Default number of questions per quiz
pub fn default_quiz_questions() -> usize {
    3
}

/// Default upper bound on questions per quiz
pub fn default_quiz_max_questions() -> usize {
    10
}

/// Default number of document characters included in the generation prompt
pub fn default_prompt_char_limit() -> usize {
    4000
}

/// Default maximum serialized quiz size in characters
pub fn default_max_serialized_chars() -> usize {
    50_000
}

/// Default maximum number of stored quizzes
pub fn default_max_quizzes() -> usize {
    200
}

/// Default quiz id length
pub fn default_quiz_id_length() -> usize {
    6
}

/// Default attempts at drawing an unused quiz id
pub fn default_quiz_id_attempts() -> usize {
    5
}

/// Default session timezone offset (UTC+8)
pub fn default_utc_offset_hours() -> i32 {
    8
}

/// Default number of retrieved passages
pub fn default_query_k() -> usize {
    4
}

/// Default maximum retrieved passages
pub fn default_query_max_k() -> usize {
    10
}
