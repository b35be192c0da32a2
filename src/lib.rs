//! qna-bot - 시맨틱 QA 챗봇
//!
//! 질문/응답 코퍼스에 대한 자유 텍스트 질의를 두 경로로 해석합니다:
//! 산술 입력은 제한 문법 수식 평가로, 그 외에는 정확 최근접 이웃
//! 벡터 검색 + 퍼지 유사도 재랭킹으로 응답을 고릅니다.

pub mod calc;
pub mod cli;
pub mod corpus;
pub mod embedding;
pub mod engine;
pub mod server;

// Re-exports
pub use calc::{evaluate, is_arithmetic, EvalError};
pub use corpus::{load_sources, Corpus, LoadStats, Record};
pub use embedding::{
    get_api_key, has_api_key, EmbeddingProvider, GeminiEmbedding, HashEmbedding,
};
pub use engine::{
    normalize, FlatL2Index, QueryResolver, ResolverStats, SearchHit, VectorIndex, DEFAULT_TOP_K,
};
