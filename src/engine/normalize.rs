//! 텍스트 정규화 - 비교용 표준 형태 생성
//!
//! 질문, 쿼리, 후보 비교 키를 모두 같은 표준 형태로 줄입니다.
//! 허용 문자 집합: ASCII 영문자, 숫자, 공백, `+ - * / ( ) .`

use std::sync::OnceLock;

use regex::Regex;

/// 허용되지 않는 문자 매칭 패턴
fn strip_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[^a-zA-Z0-9\s+\-*/().]").expect("static pattern is valid")
    })
}

/// 텍스트 정규화
///
/// 허용 문자 집합 밖의 모든 문자를 제거하고, 소문자화 후
/// 앞뒤 공백을 잘라냅니다.
///
/// 순수 함수이며 모든 입력에 대해 성공합니다 (멱등).
///
/// # Arguments
/// * `text` - 원본 텍스트
///
/// # Returns
/// 정규화된 텍스트
pub fn normalize(text: &str) -> String {
    strip_pattern()
        .replace_all(text, "")
        .to_lowercase()
        .trim()
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================
