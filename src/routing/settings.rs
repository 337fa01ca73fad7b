//! 라우팅 설정
//!
//! 라우팅 컨텍스트 및 재발견 재시도 설정

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{RoutingError, RoutingResult};
use crate::spi::Value;

use super::address::ServerAddress;

// ============================================================================
// RoutingContext - 라우팅 컨텍스트
// ============================================================================

/// 라우팅 컨텍스트
///
/// 드라이버 설정에서 온 문자열 키/값 메타데이터로, 서버가 이 클라이언트에
/// 적합한 토폴로지를 돌려줄 수 있도록 라우팅 프로시저에 전달됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingContext {
    entries: HashMap<String, String>,
}

impl RoutingContext {
    /// 빈 컨텍스트 생성
    pub fn empty() -> Self {
        Self::default()
    }

    /// 맵에서 컨텍스트 생성
    pub fn from_map(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// 엔트리 추가
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// 빈 컨텍스트 여부
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 프로시저 파라미터 값으로 변환
    pub fn as_value(&self) -> Value {
        Value::Map(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}

// ============================================================================
// RoutingSettings - 재발견 설정
// ============================================================================

/// 재발견 재시도 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingSettings {
    max_routing_failures: u32,
    retry_timeout_delay: Duration,
}

impl RoutingSettings {
    /// 새 설정 생성
    ///
    /// 두 값 모두 양수여야 합니다.
    pub fn new(max_routing_failures: u32, retry_timeout_delay: Duration) -> RoutingResult<Self> {
        if max_routing_failures == 0 {
            return Err(RoutingError::configuration(
                "max_routing_failures must be positive",
            ));
        }
        if retry_timeout_delay.is_zero() {
            return Err(RoutingError::configuration(
                "retry_timeout_delay must be positive",
            ));
        }

        Ok(Self {
            max_routing_failures,
            retry_timeout_delay,
        })
    }

    /// 최대 재발견 실패 횟수
    pub fn max_routing_failures(&self) -> u32 {
        self.max_routing_failures
    }

    /// 재시도 기본 지연
    pub fn retry_timeout_delay(&self) -> Duration {
        self.retry_timeout_delay
    }
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            max_routing_failures: 5,
            retry_timeout_delay: Duration::from_secs(5),
        }
    }
}

// ============================================================================
// RoutingConfig - 라우팅 설정
// ============================================================================

/// 라우팅 코어 설정
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// 부트스트랩 라우터 주소
    pub initial_router: ServerAddress,
    /// 라우팅 컨텍스트
    pub routing_context: RoutingContext,
    /// 재발견 설정
    pub settings: RoutingSettings,
}

impl RoutingConfig {
    /// 새 설정 생성
    pub fn new(initial_router: ServerAddress) -> RoutingResult<Self> {
        if initial_router.host.trim().is_empty() {
            return Err(RoutingError::configuration(
                "Initial router host must not be empty",
            ));
        }

        Ok(Self {
            initial_router,
            routing_context: RoutingContext::empty(),
            settings: RoutingSettings::default(),
        })
    }

    /// 라우팅 컨텍스트 설정
    pub fn with_routing_context(mut self, context: RoutingContext) -> Self {
        self.routing_context = context;
        self
    }

    /// 재발견 설정 지정
    pub fn with_settings(mut self, settings: RoutingSettings) -> Self {
        self.settings = settings;
        self
    }
}
