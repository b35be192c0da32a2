//! CLI 모듈
//!
//! qna-bot CLI 명령어 정의 및 구현.
//! 코퍼스 로드와 인덱스 구축은 모든 명령어가 공유하는 시작 절차입니다.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::corpus;
use crate::embedding::{has_api_key, EmbeddingProvider, GeminiEmbedding, HashEmbedding};
use crate::engine::{QueryResolver, DEFAULT_TOP_K};
use crate::server;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "qna-bot")]
#[command(version, about = "시맨틱 QA 챗봇", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 대화형 채팅 루프 시작
    Chat {
        /// 코퍼스 소스 파일 (csv/json/txt, 반복 지정 가능)
        #[arg(short, long, required = true, num_args = 1..)]
        data: Vec<PathBuf>,

        /// 재랭킹 후보 풀 크기
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,

        /// API 없이 결정적 로컬 임베딩 사용 (데모/테스트용)
        #[arg(long)]
        offline: bool,
    },

    /// 단일 질의 후 종료
    Ask {
        /// 질의 텍스트
        query: String,

        /// 코퍼스 소스 파일 (csv/json/txt, 반복 지정 가능)
        #[arg(short, long, required = true, num_args = 1..)]
        data: Vec<PathBuf>,

        /// 재랭킹 후보 풀 크기
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,

        /// API 없이 결정적 로컬 임베딩 사용 (데모/테스트용)
        #[arg(long)]
        offline: bool,
    },

    /// HTTP 서버 실행
    Serve {
        /// 코퍼스 소스 파일 (csv/json/txt, 반복 지정 가능)
        #[arg(short, long, required = true, num_args = 1..)]
        data: Vec<PathBuf>,

        /// 바인드 주소
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// 포트
        #[arg(short, long, default_value = "5000")]
        port: u16,

        /// 재랭킹 후보 풀 크기
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,

        /// API 없이 결정적 로컬 임베딩 사용 (데모/테스트용)
        #[arg(long)]
        offline: bool,
    },
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Chat {
            data,
            top_k,
            offline,
        } => cmd_chat(&data, top_k, offline).await,
        Commands::Ask {
            query,
            data,
            top_k,
            offline,
        } => cmd_ask(&query, &data, top_k, offline).await,
        Commands::Serve {
            data,
            host,
            port,
            top_k,
            offline,
        } => cmd_serve(&data, &host, port, top_k, offline).await,
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 대화형 채팅 명령어 (chat)
async fn cmd_chat(data: &[PathBuf], top_k: usize, offline: bool) -> Result<()> {
    let resolver = build_resolver(data, top_k, offline).await?;

    println!("[*] 챗봇 준비 완료. 질문을 입력하세요 ('exit' 입력 시 종료)");

    let stdin = std::io::stdin();
    let mut line = String::new();

    loop {
        print!("You: ");
        std::io::stdout().flush().context("출력 플러시 실패")?;

        line.clear();
        let bytes = stdin.lock().read_line(&mut line).context("입력 읽기 실패")?;
        if bytes == 0 {
            // EOF
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") {
            println!("Bot: 안녕히 가세요!");
            break;
        }

        let answer = resolver.resolve(input).await;
        println!("Bot: {}", answer);
    }

    Ok(())
}

/// 단일 질의 명령어 (ask)
async fn cmd_ask(query: &str, data: &[PathBuf], top_k: usize, offline: bool) -> Result<()> {
    let resolver = build_resolver(data, top_k, offline).await?;

    let answer = resolver.resolve(query).await;
    println!("{}", answer);

    Ok(())
}

/// 서버 명령어 (serve)
async fn cmd_serve(
    data: &[PathBuf],
    host: &str,
    port: u16,
    top_k: usize,
    offline: bool,
) -> Result<()> {
    let resolver = build_resolver(data, top_k, offline).await?;

    println!("[*] 서버 시작: http://{}:{}", host, port);
    server::run(Arc::new(resolver), host, port).await
}

// ============================================================================
// Bootstrap
// ============================================================================

/// 공통 시작 절차: 프로바이더 선택 -> 코퍼스 로드 -> 인덱스 구축
async fn build_resolver(
    data: &[PathBuf],
    top_k: usize,
    offline: bool,
) -> Result<QueryResolver> {
    let embedder: Arc<dyn EmbeddingProvider> = if offline {
        println!("[*] 오프라인 모드: 로컬 결정적 임베딩 사용");
        Arc::new(HashEmbedding)
    } else {
        if !has_api_key() {
            bail!(
                "API 키가 설정되지 않았습니다.\n\n\
                 설정 방법:\n  \
                 export GEMINI_API_KEY=your-api-key\n  \
                 또는\n  \
                 export GOOGLE_AI_API_KEY=your-api-key\n\n\
                 API 키 발급: https://aistudio.google.com/app/apikey\n\
                 (API 없이 시험하려면 --offline 플래그를 사용하세요)"
            );
        }
        Arc::new(GeminiEmbedding::from_env().context("임베딩 프로바이더 생성 실패")?)
    };

    println!("[*] 데이터 로드 중: {} 개 소스", data.len());
    let (corpus, stats) = corpus::load_sources(data);

    if stats.skipped_sources > 0 {
        println!("[!] 건너뛴 소스: {} 개", stats.skipped_sources);
    }
    println!("[OK] {} 개 질문 로드됨", stats.record_count);

    if corpus.is_empty() {
        println!("[!] 사용 가능한 데이터가 없습니다. 비산술 질의는 고정 응답으로 처리됩니다.");
    } else {
        println!("[*] 인덱스 구축 중 ({})...", embedder.name());
    }

    let resolver = QueryResolver::build(corpus, embedder, top_k)
        .await
        .context("리졸버 구축 실패")?;

    let resolver_stats = resolver.stats();
    if resolver_stats.indexed_count > 0 {
        println!(
            "[OK] 인덱스 구축 완료: {} 레코드, {} 차원",
            resolver_stats.indexed_count,
            resolver_stats.dimension.unwrap_or(0)
        );
    }

    Ok(resolver)
}

// ============================================================================
// Tests
// ============================================================================
