//! 수식 평가 모듈 - 제한된 산술 문법
//!
//! 사용자 쿼리에서 직접 들어오는 신뢰할 수 없는 텍스트를 평가하므로,
//! 범용 평가기가 아닌 산술 전용 문법만 허용합니다:
//! 숫자 리터럴, `+ - * /`, 단항 부호, 괄호.
//! 토크나이저 + 재귀 하강 파서로 표준 연산자 우선순위와
//! 좌결합성을 구현합니다.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

// ============================================================================
// Types
// ============================================================================

/// 수식 평가 에러
///
/// 어떤 입력도 패닉 없이 이 에러로 수렴합니다.
#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("invalid numeric literal '{0}'")]
    InvalidNumber(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unbalanced parentheses")]
    UnbalancedParens,

    #[error("unexpected token in expression")]
    UnexpectedToken,

    #[error("division by zero")]
    DivisionByZero,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

// ============================================================================
// Arithmetic Detection
// ============================================================================

/// 산술 입력 판별 패턴 (숫자, 공백, 연산자, 괄호, 소수점만)
fn arithmetic_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9\s+\-*/().]+$").expect("static pattern is valid"))
}

/// 수식으로 취급할 입력인지 판별
///
/// 정규화된 텍스트가 숫자, 공백, `+ - * / ( ) .` 만으로 이루어진 경우
/// (문자가 하나라도 있으면 제외) true를 반환합니다.
/// 빈 문자열은 수식이 아닙니다.
pub fn is_arithmetic(text: &str) -> bool {
    arithmetic_pattern().is_match(text)
}

// ============================================================================
// Tokenizer
// ============================================================================

/// 입력을 토큰 목록으로 분해
fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            _ if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut end = start;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let lexeme = &input[start..end];
                let value = lexeme
                    .parse::<f64>()
                    .map_err(|_| EvalError::InvalidNumber(lexeme.to_string()))?;
                tokens.push(Token::Number(value));
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            _ => return Err(EvalError::UnexpectedChar(c)),
        }
    }

    Ok(tokens)
}

// ============================================================================
// Parser
// ============================================================================

/// 재귀 하강 파서
///
/// 문법:
/// - expr   := term (('+' | '-') term)*
/// - term   := factor (('*' | '/') factor)*
/// - factor := ('+' | '-') factor | primary
/// - primary := NUMBER | '(' expr ')'
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expr(&mut self) -> Result<f64, EvalError> {
        let mut value = self.term()?;

        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.advance();
                    value += self.term()?;
                }
                Token::Minus => {
                    self.advance();
                    value -= self.term()?;
                }
                _ => break,
            }
        }

        Ok(value)
    }

    fn term(&mut self) -> Result<f64, EvalError> {
        let mut value = self.factor()?;

        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.advance();
                    value *= self.factor()?;
                }
                Token::Slash => {
                    self.advance();
                    let rhs = self.factor()?;
                    if rhs == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    value /= rhs;
                }
                _ => break,
            }
        }

        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, EvalError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.advance();
                self.factor()
            }
            Some(Token::Minus) => {
                self.advance();
                Ok(-self.factor()?)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<f64, EvalError> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(EvalError::UnbalancedParens),
                }
            }
            Some(_) => Err(EvalError::UnexpectedToken),
            None => Err(EvalError::UnexpectedEnd),
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// 수식 평가
///
/// 잘못된 수식(괄호 불일치, 연산자 뒤 피연산자 누락, 빈 입력,
/// 0으로 나누기)은 부분 결과 없이 [`EvalError`]를 반환합니다.
///
/// # Arguments
/// * `input` - 평가할 수식 텍스트
///
/// # Returns
/// 평가 결과 숫자
pub fn evaluate(input: &str) -> Result<f64, EvalError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(EvalError::Empty);
    }

    let mut parser = Parser::new(tokens);
    let value = parser.expr()?;

    // 소비되지 않은 토큰이 남으면 잘못된 수식 ("2 3", "(1))" 등)
    if parser.pos != parser.tokens.len() {
        return Err(EvalError::UnexpectedToken);
    }

    Ok(value)
}

/// 결과 숫자 포매팅 (정수 값은 소수점 없이)
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_arithmetic() {
        assert!(is_arithmetic("2+2"));
        assert!(is_arithmetic("(1.5 - 3) * 4 / 2"));
        assert!(!is_arithmetic("what is 2+2"));
        assert!(!is_arithmetic(""));
        assert!(!is_arithmetic("x + 1"));
    }

    #[test]
    fn test_evaluate_basic() {
        assert_eq!(evaluate("2+2"), Ok(4.0));
        assert_eq!(evaluate("(2+3)*4"), Ok(20.0));
        assert_eq!(evaluate("10/4"), Ok(2.5));
    }

    #[test]
    fn test_evaluate_precedence() {
        assert_eq!(evaluate("2+3*4"), Ok(14.0));
        assert_eq!(evaluate("2*3+4"), Ok(10.0));
        assert_eq!(evaluate("2*(3+4)"), Ok(14.0));
    }

    #[test]
    fn test_evaluate_left_associative() {
        assert_eq!(evaluate("8-3-2"), Ok(3.0));
        assert_eq!(evaluate("100/10/5"), Ok(2.0));
    }

    #[test]
    fn test_evaluate_unary() {
        assert_eq!(evaluate("-3+5"), Ok(2.0));
        assert_eq!(evaluate("--2"), Ok(2.0));
        assert_eq!(evaluate("+4"), Ok(4.0));
        assert_eq!(evaluate("2*-3"), Ok(-6.0));
    }

    #[test]
    fn test_evaluate_decimals() {
        assert_eq!(evaluate("1.5+2.5"), Ok(4.0));
        assert_eq!(evaluate(".5*2"), Ok(1.0));
        assert_eq!(evaluate("2."), Ok(2.0));
    }

    #[test]
    fn test_evaluate_division_by_zero() {
        assert_eq!(evaluate("10/0"), Err(EvalError::DivisionByZero));
        assert_eq!(evaluate("1/(2-2)"), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_evaluate_malformed() {
        assert_eq!(evaluate("2++"), Err(EvalError::UnexpectedEnd));
        assert_eq!(evaluate("(2+3"), Err(EvalError::UnbalancedParens));
        assert_eq!(evaluate("2+3)"), Err(EvalError::UnexpectedToken));
        assert_eq!(evaluate("2 3"), Err(EvalError::UnexpectedToken));
        assert_eq!(evaluate(""), Err(EvalError::Empty));
        assert_eq!(evaluate("   "), Err(EvalError::Empty));
        assert_eq!(
            evaluate("1.2.3"),
            Err(EvalError::InvalidNumber("1.2.3".to_string()))
        );
    }

    #[test]
    fn test_evaluate_rejects_names() {
        assert_eq!(evaluate("abs(1)"), Err(EvalError::UnexpectedChar('a')));
        assert_eq!(evaluate("x"), Err(EvalError::UnexpectedChar('x')));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(20.0), "20");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-6.0), "-6");
    }
}
