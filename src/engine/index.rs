//! 벡터 인덱스 - 정확 최근접 이웃 검색
//!
//! 소규모 코퍼스에서는 근사 검색의 오차 없이 전수 비교가 가능하므로
//! 브루트포스 flat 인덱스를 사용합니다. 구축 후 읽기 전용이며,
//! 코퍼스 변경 시 전체 재구축이 필요합니다.
//!
//! [`VectorIndex`] 트레이트 뒤에 두어 추후 근사/샤딩 인덱스로
//! 교체할 수 있게 합니다.

use std::cmp::Ordering;

use anyhow::{Context, Result};

// ============================================================================
// Types
// ============================================================================

/// 검색 결과 항목
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// 레코드 id (0..N-1, 코퍼스 수집 순서와 일치)
    pub id: usize,
    /// 쿼리 벡터와의 제곱 L2 거리
    pub distance: f32,
}

// ============================================================================
// VectorIndex Trait
// ============================================================================

/// 벡터 인덱스 트레이트
///
/// 좁은 검색 인터페이스만 노출합니다. 구축 방식은 구현체마다 다릅니다.
pub trait VectorIndex: Send + Sync {
    /// k개의 최근접 이웃 검색
    ///
    /// 거리 오름차순으로 정렬된 결과를 반환합니다. 같은 거리는
    /// 레코드 id 오름차순으로 정렬되어 결과가 결정적입니다.
    /// `k`가 저장된 벡터 수를 넘으면 가능한 수만큼만 반환합니다.
    fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit>;

    /// 저장된 벡터 수
    fn len(&self) -> usize;

    /// 비어 있는지 여부
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 벡터 차원
    fn dimension(&self) -> usize;
}

// ============================================================================
// FlatL2Index
// ============================================================================

/// 브루트포스 제곱 L2 flat 인덱스
///
/// 저장된 모든 벡터와의 거리를 계산하는 정확 검색입니다.
#[derive(Debug)]
pub struct FlatL2Index {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatL2Index {
    /// 벡터 목록으로 인덱스 구축 (일회성)
    ///
    /// 모든 벡터는 같은 차원이어야 합니다. 빈 목록으로는 인덱스를
    /// 만들 수 없습니다.
    ///
    /// # Arguments
    /// * `vectors` - 레코드 순서와 정렬된 임베딩 벡터 목록
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dimension = vectors
            .first()
            .map(|v| v.len())
            .context("cannot build an index from zero vectors")?;

        if dimension == 0 {
            anyhow::bail!("cannot build an index from zero-dimension vectors");
        }

        for (id, vector) in vectors.iter().enumerate() {
            if vector.len() != dimension {
                anyhow::bail!(
                    "dimension mismatch at record {}: expected {}, got {}",
                    id,
                    dimension,
                    vector.len()
                );
            }
        }

        tracing::debug!("Built flat L2 index: {} vectors, dim {}", vectors.len(), dimension);

        Ok(Self { dimension, vectors })
    }
}

impl VectorIndex for FlatL2Index {
    fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        if k == 0 || self.vectors.is_empty() {
            return Vec::new();
        }

        if query.len() != self.dimension {
            tracing::warn!(
                "Query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension
            );
            return Vec::new();
        }

        let mut hits: Vec<SearchHit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(id, vector)| SearchHit {
                id,
                distance: squared_l2(query, vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        hits.truncate(k);

        hits
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 제곱 유클리드(L2) 거리
///
/// 순위 비교에는 제곱근이 필요 없으므로 생략합니다.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

// ============================================================================
// Tests
// ============================================================================
