//! Routing Error Types
//!
//! 라우팅 코어 에러 정의

use std::fmt;
use std::io;
use thiserror::Error;

const PROCEDURE_NOT_FOUND: &str = "Neo.ClientError.Procedure.ProcedureNotFound";
const NOT_A_LEADER: &str = "Neo.ClientError.Cluster.NotALeader";
const FORBIDDEN_ON_READ_ONLY_DATABASE: &str =
    "Neo.ClientError.General.ForbiddenOnReadOnlyDatabase";

// ============================================================================
// RoutingError - 라우팅 에러
// ============================================================================

/// 라우팅 에러
#[derive(Error, Debug)]
pub enum RoutingError {
    /// 연결 에러
    #[error("Connection error: {0}")]
    Connection(String),

    /// 인증 에러
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// 프로토콜 에러
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 서비스 불가
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// 세션 만료 (선택했던 서버를 더 이상 사용할 수 없음)
    #[error("Session expired: {message}")]
    SessionExpired {
        /// 에러 메시지
        message: String,
        /// 원인 에러
        #[source]
        source: Option<Box<RoutingError>>,
    },

    /// 서버 에러
    #[error("Server error: {code} - {message}")]
    Server {
        /// 서버 에러 코드
        code: String,
        /// 에러 메시지
        message: String,
    },

    /// 타임아웃 에러
    #[error("Timeout: {0}")]
    Timeout(String),

    /// I/O 에러
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// 취소됨
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl RoutingError {
    /// 연결 에러 생성
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// 인증 에러 생성
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// 프로토콜 에러 생성
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// 설정 에러 생성
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// 서비스 불가 에러 생성
    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    /// 세션 만료 에러 생성
    pub fn session_expired(msg: impl Into<String>, source: Option<RoutingError>) -> Self {
        Self::SessionExpired {
            message: msg.into(),
            source: source.map(Box::new),
        }
    }

    /// 서버 에러 생성
    pub fn server(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Server {
            code: code.into(),
            message: message.into(),
        }
    }

    /// 타임아웃 에러 생성
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// 취소 에러 생성
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// 인증 에러 여부
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// 취소 여부
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// 전송 레벨 연결 실패 여부
    ///
    /// 해당 주소의 연결을 잊고 다른 서버로 재시도할 수 있는 에러입니다.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::ServiceUnavailable(_) | Self::Io(_) | Self::Timeout(_)
        )
    }

    /// 쓰기 거부 에러 여부 (리더가 아니거나 읽기 전용)
    pub fn is_failure_to_write(&self) -> bool {
        matches!(
            self,
            Self::Server { code, .. }
                if code == NOT_A_LEADER || code == FORBIDDEN_ON_READ_ONLY_DATABASE
        )
    }

    /// 라우팅 프로시저 미지원 여부
    pub fn is_procedure_not_found(&self) -> bool {
        matches!(self, Self::Server { code, .. } if code == PROCEDURE_NOT_FOUND)
    }

    /// 재시도 가능 여부
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_)
            | Self::Timeout(_)
            | Self::ServiceUnavailable(_)
            | Self::SessionExpired { .. } => true,
            Self::Server { code, .. } => is_retryable_code(code),
            _ => false,
        }
    }
}

/// 재시도 가능한 서버 에러 코드 확인
fn is_retryable_code(code: &str) -> bool {
    code.starts_with("Neo.TransientError")
        || code == NOT_A_LEADER
        || code == FORBIDDEN_ON_READ_ONLY_DATABASE
}

// ============================================================================
// Result Type
// ============================================================================

/// 라우팅 결과 타입
pub type RoutingResult<T> = Result<T, RoutingError>;

// ============================================================================
// ServerError - 서버 에러 코드
// ============================================================================

/// 서버 에러 코드
///
/// 서버가 반환하는 에러를 나타냅니다.
/// 에러 코드는 "Neo.{Category}.{SubCategory}.{ErrorType}" 형식을 따릅니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    /// 에러 코드
    pub code: String,
    /// 에러 메시지
    pub message: String,
}

impl ServerError {
    /// 새 에러 생성
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// 클라이언트 에러 여부
    pub fn is_client_error(&self) -> bool {
        self.code.starts_with("Neo.ClientError")
    }

    /// 트랜지언트 에러 여부 (재시도 가능)
    pub fn is_transient_error(&self) -> bool {
        self.code.starts_with("Neo.TransientError")
    }

    /// 인증 에러 여부
    pub fn is_authentication_error(&self) -> bool {
        self.code.contains("Security") || self.code.contains("Authentication")
    }

    /// 라우팅 프로시저 미지원 여부
    pub fn is_procedure_not_found(&self) -> bool {
        self.code == PROCEDURE_NOT_FOUND
    }

    /// 쓰기 거부 에러 여부
    pub fn is_failure_to_write(&self) -> bool {
        self.code == NOT_A_LEADER || self.code == FORBIDDEN_ON_READ_ONLY_DATABASE
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ServerError {}

impl From<ServerError> for RoutingError {
    fn from(err: ServerError) -> Self {
        if err.is_authentication_error() {
            RoutingError::Authentication(err.message)
        } else {
            RoutingError::Server {
                code: err.code,
                message: err.message,
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
