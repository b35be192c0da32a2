//! 후보 재랭킹 - 문자열 유사도 2차 스코어링
//!
//! 벡터 검색이 추린 최근접 k개 후보를 임베딩 거리와 독립적인
//! 퍼지 문자열 유사도(0~100)로 다시 정렬합니다. 임베딩 공간의
//! 근사 오차를 어휘 수준에서 보정하는 신호입니다.

use std::cmp::Ordering;

use super::normalize::normalize;

// ============================================================================
// Types
// ============================================================================

/// 재랭킹 입력 후보 (벡터 검색 결과에 레코드 내용을 붙인 것)
#[derive(Debug, Clone)]
pub struct Candidate {
    /// 레코드 id
    pub id: usize,
    /// 원본 질문 텍스트
    pub question: String,
    /// 응답 텍스트
    pub response: String,
    /// 벡터 검색 거리 (제곱 L2)
    pub distance: f32,
}

/// 재랭킹 결과
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    /// 레코드 id
    pub id: usize,
    /// 응답 텍스트
    pub response: String,
    /// 유사도 스코어 (0 ~ 100)
    pub score: f32,
}

// ============================================================================
// Ranking
// ============================================================================

/// 퍼지 유사도 비율 (0 ~ 100)
///
/// 정규화 편집 유사도를 100점 스케일로 환산합니다.
/// 완전 일치는 100점입니다.
pub fn fuzzy_ratio(a: &str, b: &str) -> f32 {
    (strsim::normalized_levenshtein(a, b) * 100.0) as f32
}

/// 후보 재랭킹
///
/// 각 후보의 정규화된 질문과 정규화된 쿼리 사이의 유사도를 계산해
/// 내림차순으로 정렬합니다. 동점은 안정 정렬로 벡터 검색 순서를
/// 유지합니다. 빈 후보 목록은 빈 결과가 됩니다.
///
/// # Arguments
/// * `query_normalized` - 정규화된 쿼리 텍스트
/// * `candidates` - 벡터 검색이 반환한 후보 목록 (거리 오름차순)
///
/// # Returns
/// 스코어 내림차순 정렬된 후보 목록
pub fn rank(query_normalized: &str, candidates: Vec<Candidate>) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .map(|c| RankedCandidate {
            id: c.id,
            score: fuzzy_ratio(query_normalized, &normalize(&c.question)),
            response: c.response,
        })
        .collect();

    // Vec::sort_by는 안정 정렬 - 동점 시 입력(검색) 순서 유지
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    ranked
}

// ============================================================================
// Tests
// ============================================================================
