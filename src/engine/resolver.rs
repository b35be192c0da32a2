//! 쿼리 리졸버 - 질의 해석 오케스트레이션
//!
//! 쿼리 하나를 받아 텍스트 응답 하나를 돌려줍니다. 경로는 두 가지:
//! 산술 입력이면 수식 평가, 아니면 임베딩 → 벡터 검색 → 퍼지
//! 재랭킹. 모든 실패 상태는 고정 문장으로 변환되어 나가며, 호출자는
//! 에러를 받지 않습니다.
//!
//! 쿼리 간 상태를 유지하지 않습니다. 코퍼스와 인덱스는 구축 후
//! 불변이므로 동시 쿼리가 조율 없이 공유해도 안전합니다.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::calc;
use crate::corpus::Corpus;
use crate::embedding::EmbeddingProvider;

use super::index::{FlatL2Index, VectorIndex};
use super::normalize::normalize;
use super::rank::{rank, Candidate};

// ============================================================================
// Constants
// ============================================================================

/// 재랭킹 후보 풀 크기 기본값
pub const DEFAULT_TOP_K: usize = 3;

/// 코퍼스가 비어 있을 때의 응답
pub const MSG_NO_DATA: &str = "No data available to answer your question.";

/// 수식 평가 실패 시의 응답
pub const MSG_INVALID_EXPRESSION: &str = "Invalid mathematical expression.";

/// 사용 가능한 후보가 없을 때의 응답
pub const MSG_DONT_UNDERSTAND: &str = "Sorry, I don't understand that question.";

// ============================================================================
// QueryResolver
// ============================================================================

/// 쿼리 리졸버
///
/// 코퍼스, 벡터 인덱스, 주입된 임베딩 프로바이더를 소유합니다.
pub struct QueryResolver {
    corpus: Corpus,
    index: Option<Box<dyn VectorIndex>>,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

/// 리졸버 통계
#[derive(Debug, Clone)]
pub struct ResolverStats {
    pub record_count: usize,
    pub indexed_count: usize,
    pub dimension: Option<usize>,
    pub top_k: usize,
}

impl QueryResolver {
    /// 코퍼스에서 리졸버 구축 (일회성)
    ///
    /// 코퍼스 질문을 정규화·임베딩하여 인덱스를 만듭니다. 빈 코퍼스나
    /// 빈 임베딩 결과면 인덱스 없이 구축되며, 이후 모든 비산술 쿼리는
    /// 고정 "no data" 응답으로 강등됩니다.
    ///
    /// # Arguments
    /// * `corpus` - 수집된 코퍼스
    /// * `embedder` - 임베딩 프로바이더 (명시적 주입)
    /// * `top_k` - 재랭킹 후보 풀 크기
    pub async fn build(
        corpus: Corpus,
        embedder: Arc<dyn EmbeddingProvider>,
        top_k: usize,
    ) -> Result<Self> {
        let index: Option<Box<dyn VectorIndex>> = if corpus.is_empty() {
            tracing::warn!("Corpus is empty - semantic search disabled");
            None
        } else {
            let questions: Vec<String> = corpus
                .records()
                .iter()
                .map(|r| normalize(&r.question))
                .collect();

            // 프로바이더 실패는 "인덱스 구축 불가"로 취급하고 기동은 계속
            let embeddings = match embedder.embed_batch(&questions).await {
                Ok(vectors) => vectors,
                Err(e) => {
                    tracing::warn!("Failed to embed corpus questions: {:#}", e);
                    Vec::new()
                }
            };

            if embeddings.is_empty() {
                tracing::warn!("Embedding produced no vectors - semantic search disabled");
                None
            } else {
                let index = FlatL2Index::build(embeddings)
                    .context("Failed to build vector index")?;
                tracing::info!(
                    "Built vector index: {} records, dim {} ({})",
                    index.len(),
                    index.dimension(),
                    embedder.name()
                );
                Some(Box::new(index))
            }
        };

        Ok(Self {
            corpus,
            index,
            embedder,
            top_k: top_k.max(1),
        })
    }

    /// 쿼리 해석
    ///
    /// 항상 응답 문자열을 반환합니다. 실패 상태도 고정 문장으로
    /// 렌더링되며 패닉이나 에러 전파는 없습니다.
    pub async fn resolve(&self, raw_query: &str) -> String {
        let normalized = normalize(raw_query);

        // 1. 산술 경로
        if calc::is_arithmetic(&normalized) {
            return match calc::evaluate(&normalized) {
                Ok(value) => format!("Result: {}", calc::format_number(value)),
                Err(e) => {
                    tracing::debug!("Rejected expression {:?}: {}", normalized, e);
                    MSG_INVALID_EXPRESSION.to_string()
                }
            };
        }

        // 2. 인덱스 없음 (빈 코퍼스)
        let Some(index) = self.index.as_deref() else {
            return MSG_NO_DATA.to_string();
        };

        // 3. 시맨틱 경로: 임베딩 -> 검색 -> 재랭킹
        let query_embedding = match self.embedder.embed(&normalized).await {
            Ok(vector) => vector,
            Err(e) => {
                // 쿼리 하나의 실패가 공유 상태를 오염시키지 않음
                tracing::warn!("Failed to embed query: {:#}", e);
                return MSG_DONT_UNDERSTAND.to_string();
            }
        };

        let hits = index.search(&query_embedding, self.top_k);

        let candidates: Vec<Candidate> = hits
            .into_iter()
            .filter_map(|hit| {
                self.corpus.get(hit.id).map(|record| Candidate {
                    id: hit.id,
                    question: record.question.clone(),
                    response: record.response.clone(),
                    distance: hit.distance,
                })
            })
            .collect();

        let ranked = rank(&normalized, candidates);

        match ranked.into_iter().next() {
            Some(top) => {
                tracing::debug!("Answering with record {} (score {:.1})", top.id, top.score);
                top.response
            }
            None => MSG_DONT_UNDERSTAND.to_string(),
        }
    }

    /// 리졸버 통계
    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            record_count: self.corpus.len(),
            indexed_count: self.index.as_ref().map(|i| i.len()).unwrap_or(0),
            dimension: self.index.as_ref().map(|i| i.dimension()),
            top_k: self.top_k,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Record;
    use crate::embedding::HashEmbedding;

    fn record(question: &str, response: &str) -> Record {
        Record {
            question: question.to_string(),
            response: response.to_string(),
        }
    }

    async fn resolver_with(records: Vec<Record>) -> QueryResolver {
        QueryResolver::build(Corpus::new(records), Arc::new(HashEmbedding), DEFAULT_TOP_K)
            .await
            .unwrap()
    }

    fn greeting_corpus() -> Vec<Record> {
        vec![record("hello", "hi there"), record("bye", "goodbye")]
    }

    #[tokio::test]
    async fn test_exact_question_match() {
        let resolver = resolver_with(greeting_corpus()).await;

        assert_eq!(resolver.resolve("Hello ").await, "hi there");
        assert_eq!(resolver.resolve("bye").await, "goodbye");
    }

    #[tokio::test]
    async fn test_arithmetic_path() {
        let resolver = resolver_with(greeting_corpus()).await;

        assert_eq!(resolver.resolve("2+2").await, "Result: 4");
        assert_eq!(resolver.resolve("(2+3)*4").await, "Result: 20");
        assert_eq!(resolver.resolve(" 10 / 4 ").await, "Result: 2.5");
    }

    #[tokio::test]
    async fn test_invalid_expression() {
        let resolver = resolver_with(greeting_corpus()).await;

        assert_eq!(resolver.resolve("10/0").await, MSG_INVALID_EXPRESSION);
        assert_eq!(resolver.resolve("2++").await, MSG_INVALID_EXPRESSION);
        assert_eq!(resolver.resolve("(2+3").await, MSG_INVALID_EXPRESSION);
    }

    #[tokio::test]
    async fn test_empty_corpus_degrades() {
        let resolver = resolver_with(vec![]).await;

        // 비산술 쿼리는 고정 no-data 응답
        assert_eq!(resolver.resolve("hello").await, MSG_NO_DATA);
        // 산술 쿼리는 여전히 동작
        assert_eq!(resolver.resolve("2+2").await, "Result: 4");
    }

    #[tokio::test]
    async fn test_weak_match_still_answers() {
        let resolver = resolver_with(greeting_corpus()).await;

        // 어느 레코드와도 강하게 일치하지 않는 쿼리 - 크래시나 빈 응답
        // 없이 두 응답 중 하나를 돌려줘야 함
        let answer = resolver.resolve("what is quantum gravity").await;
        assert!(answer == "hi there" || answer == "goodbye");
    }

    #[tokio::test]
    async fn test_source_order_irrelevant_for_distinct_scores() {
        let forward = resolver_with(greeting_corpus()).await;
        let reversed =
            resolver_with(vec![record("bye", "goodbye"), record("hello", "hi there")]).await;

        // 유사도 스코어가 뚜렷이 다르면 수집 순서는 결과에 무관
        assert_eq!(
            forward.resolve("hello").await,
            reversed.resolve("hello").await
        );
    }

    #[tokio::test]
    async fn test_duplicate_questions_tie_breaks_to_first() {
        let resolver = resolver_with(vec![
            record("hello", "first answer"),
            record("hello", "second answer"),
        ])
        .await;

        // 완전 동점 - 수집 순서가 빠른 레코드가 선택됨
        assert_eq!(resolver.resolve("hello").await, "first answer");
    }

    #[tokio::test]
    async fn test_top_k_clamped_on_small_corpus() {
        let resolver = QueryResolver::build(
            Corpus::new(vec![record("hello", "hi there")]),
            Arc::new(HashEmbedding),
            10,
        )
        .await
        .unwrap();

        // k > 코퍼스 크기여도 정상 동작
        assert_eq!(resolver.resolve("hello").await, "hi there");
    }

    #[tokio::test]
    async fn test_stats() {
        let resolver = resolver_with(greeting_corpus()).await;
        let stats = resolver.stats();

        assert_eq!(stats.record_count, 2);
        assert_eq!(stats.indexed_count, 2);
        assert!(stats.dimension.is_some());
        assert_eq!(stats.top_k, DEFAULT_TOP_K);
    }

    /// 특정 입력에서만 실패하는 프로바이더 (실패 격리 테스트용)
    struct FlakyEmbedding {
        fail_on: &'static str,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for FlakyEmbedding {
        async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            if text.contains(self.fail_on) {
                anyhow::bail!("embedding backend unavailable");
            }
            HashEmbedding.embed(text).await
        }

        fn dimension(&self) -> usize {
            HashEmbedding.dimension()
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_build_failure_degrades_to_no_index() {
        // 구축 시점 프로바이더 실패 -> 인덱스 없이 기동, 쿼리는 고정 응답
        let resolver = QueryResolver::build(
            Corpus::new(greeting_corpus()),
            Arc::new(FlakyEmbedding { fail_on: "hello" }),
            DEFAULT_TOP_K,
        )
        .await
        .unwrap();

        assert_eq!(resolver.stats().indexed_count, 0);
        assert_eq!(resolver.resolve("bye").await, MSG_NO_DATA);
        assert_eq!(resolver.resolve("2+2").await, "Result: 4");
    }

    #[tokio::test]
    async fn test_query_failure_is_isolated() {
        let resolver = QueryResolver::build(
            Corpus::new(greeting_corpus()),
            Arc::new(FlakyEmbedding { fail_on: "boom" }),
            DEFAULT_TOP_K,
        )
        .await
        .unwrap();

        // 실패하는 쿼리는 고정 응답으로 끝나고
        assert_eq!(resolver.resolve("boom").await, MSG_DONT_UNDERSTAND);
        // 공유 상태는 오염되지 않아 다음 쿼리는 정상 동작
        assert_eq!(resolver.resolve("hello").await, "hi there");
    }

    #[tokio::test]
    async fn test_stateless_across_calls() {
        let resolver = resolver_with(greeting_corpus()).await;

        // 같은 쿼리는 호출 순서와 무관하게 같은 응답
        let first = resolver.resolve("hello").await;
        resolver.resolve("10/0").await;
        resolver.resolve("what is quantum gravity").await;
        let second = resolver.resolve("hello").await;
        assert_eq!(first, second);
    }
}
