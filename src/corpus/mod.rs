//! 코퍼스 모듈 - 질문/응답 레코드 수집
//!
//! 여러 소스 파일(CSV, JSON, 파이프 구분 텍스트)에서 질문/응답 쌍을
//! 읽어 하나의 순서 있는 코퍼스로 합칩니다. 읽을 수 없거나 형식이
//! 잘못된 소스는 경고 후 건너뛰며, 전체 로드를 중단시키지 않습니다.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

// ============================================================================
// Types
// ============================================================================

/// 질문/응답 레코드
///
/// 수집 후 불변입니다. 중복 질문도 그대로 유지되며 각각 독립적으로
/// 검색 대상이 됩니다.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Record {
    /// 질문 텍스트
    #[serde(alias = "Question")]
    pub question: String,
    /// 응답 텍스트
    #[serde(alias = "Response")]
    pub response: String,
}

/// 순서 있는 레코드 집합
///
/// 순서 = 소스 순서대로 이어붙인 수집 순서. 검색 정확성에는 영향이
/// 없고, 동점 처리의 결정성에만 관여합니다.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    records: Vec<Record>,
}

impl Corpus {
    /// 레코드 목록으로 코퍼스 생성
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// 레코드 수
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// id(수집 순서 위치)로 레코드 조회
    pub fn get(&self, id: usize) -> Option<&Record> {
        self.records.get(id)
    }

    /// 전체 레코드 슬라이스
    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

/// 수집 통계
#[derive(Debug, Clone, Default)]
pub struct LoadStats {
    /// 수집된 레코드 수
    pub record_count: usize,
    /// 성공한 소스 수
    pub loaded_sources: usize,
    /// 건너뛴 소스 수
    pub skipped_sources: usize,
}

// ============================================================================
// Loading
// ============================================================================

/// 소스 파일 목록에서 코퍼스 수집
///
/// 소스 순서대로 레코드를 이어붙입니다. 실패한 소스는 경고 후
/// 건너뛰므로 이 함수 자체는 실패하지 않습니다.
///
/// # Arguments
/// * `paths` - 소스 파일 경로 목록
///
/// # Returns
/// (코퍼스, 수집 통계)
pub fn load_sources(paths: &[PathBuf]) -> (Corpus, LoadStats) {
    let mut records = Vec::new();
    let mut stats = LoadStats::default();

    for path in paths {
        match load_source(path) {
            Ok(mut source_records) => {
                tracing::info!(
                    "Loaded {} records from {}",
                    source_records.len(),
                    path.display()
                );
                records.append(&mut source_records);
                stats.loaded_sources += 1;
            }
            Err(e) => {
                tracing::warn!("Skipping source {}: {:#}", path.display(), e);
                stats.skipped_sources += 1;
            }
        }
    }

    stats.record_count = records.len();
    (Corpus::new(records), stats)
}

/// 단일 소스 파일 로드 (확장자로 형식 결정)
fn load_source(path: &Path) -> Result<Vec<Record>> {
    if !path.exists() {
        anyhow::bail!("file not found");
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "txt" => load_txt(path),
        _ => anyhow::bail!("unsupported file format: .{}", ext),
    }
}

/// CSV 소스 (Question/Response 헤더 필수)
fn load_csv(path: &Path) -> Result<Vec<Record>> {
    let mut reader = csv::Reader::from_path(path).context("failed to open CSV")?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: Record = row.context("missing required columns")?;
        records.push(record);
    }

    Ok(records)
}

/// JSON 소스 (레코드 객체 배열)
fn load_json(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path).context("failed to open JSON")?;
    let records: Vec<Record> =
        serde_json::from_reader(BufReader::new(file)).context("missing required fields")?;
    Ok(records)
}

/// 파이프 구분 텍스트 소스 (`질문|응답` 한 줄에 하나)
fn load_txt(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path).context("failed to open text file")?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.context("failed to read line")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match trimmed.split_once('|') {
            Some((question, response)) => records.push(Record {
                question: question.trim().to_string(),
                response: response.trim().to_string(),
            }),
            None => {
                tracing::warn!(
                    "Skipping malformed line {} in {} (no '|' delimiter)",
                    line_no + 1,
                    path.display()
                );
            }
        }
    }

    if records.is_empty() {
        anyhow::bail!("no usable records");
    }

    Ok(records)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_csv() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "greetings.csv",
            "Question,Response\nhello,hi there\nbye,goodbye\n",
        );

        let (corpus, stats) = load_sources(&[path]);
        assert_eq!(corpus.len(), 2);
        assert_eq!(stats.loaded_sources, 1);
        assert_eq!(stats.skipped_sources, 0);
        assert_eq!(corpus.get(0).unwrap().response, "hi there");
        assert_eq!(corpus.get(1).unwrap().question, "bye");
    }

    #[test]
    fn test_load_json() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "faq.json",
            r#"[{"Question": "what is rust", "Response": "a systems language"}]"#,
        );

        let (corpus, _) = load_sources(&[path]);
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.get(0).unwrap().response, "a systems language");
    }

    #[test]
    fn test_load_txt_pipe_delimited() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "faq.txt", "hello|hi there\n\nbad line without pipe\nbye|goodbye\n");

        let (corpus, stats) = load_sources(&[path]);
        assert_eq!(corpus.len(), 2);
        assert_eq!(stats.loaded_sources, 1);
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let good = write_file(&dir, "a.txt", "hello|hi\n");
        let missing = dir.path().join("nope.csv");

        let (corpus, stats) = load_sources(&[missing, good]);
        assert_eq!(corpus.len(), 1);
        assert_eq!(stats.loaded_sources, 1);
        assert_eq!(stats.skipped_sources, 1);
    }

    #[test]
    fn test_unsupported_format_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "notes.docx", "whatever");

        let (corpus, stats) = load_sources(&[path]);
        assert!(corpus.is_empty());
        assert_eq!(stats.skipped_sources, 1);
    }

    #[test]
    fn test_csv_missing_columns_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "bad.csv", "Foo,Bar\n1,2\n");

        let (corpus, stats) = load_sources(&[path]);
        assert!(corpus.is_empty());
        assert_eq!(stats.skipped_sources, 1);
    }

    #[test]
    fn test_concat_preserves_source_order() {
        let dir = TempDir::new().unwrap();
        let first = write_file(&dir, "a.txt", "q1|r1\nq2|r2\n");
        let second = write_file(&dir, "b.txt", "q3|r3\n");

        let (corpus, _) = load_sources(&[first, second]);
        let questions: Vec<&str> = corpus.records().iter().map(|r| r.question.as_str()).collect();
        assert_eq!(questions, vec!["q1", "q2", "q3"]);
    }

    #[test]
    fn test_duplicates_are_retained() {
        let dir = TempDir::new().unwrap();
        let first = write_file(&dir, "a.txt", "hello|hi\n");
        let second = write_file(&dir, "b.txt", "hello|hey\n");

        let (corpus, _) = load_sources(&[first, second]);
        assert_eq!(corpus.len(), 2);
    }
}
