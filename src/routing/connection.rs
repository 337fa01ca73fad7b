//! 라우팅 연결 래퍼
//!
//! 풀 연결을 감싸 전송 실패를 분류하고 로드 밸런서에 보고합니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;

use futures::future::BoxFuture;
use tracing::debug;

use crate::error::{RoutingError, RoutingResult};
use crate::spi::{Connection, Record, ServerVersion, Value};

use super::address::ServerAddress;
use super::table::AccessMode;

/// 라우팅 실패 보고 수신자
///
/// [`RoutingConnection`]이 실패를 되돌려 보내는 좁은 창구입니다. 래퍼는
/// 약한 참조만 보유하므로 수신자(로드 밸런서)의 수명을 연장하지 않습니다.
pub trait RoutingErrorHandler: Send + Sync {
    /// 연결 레벨 실패 보고 (주소 전체를 잊음)
    fn on_connection_failure(&self, address: &ServerAddress);

    /// 쓰기 거부 실패 보고 (라이터에서만 잊음)
    fn on_write_failure(&self, address: &ServerAddress);
}

// ============================================================================
// RoutingConnection - 라우팅 연결
// ============================================================================

/// 라우팅 연결
///
/// 모든 동작을 내부 연결에 위임하되 실패를 가로채 분류합니다.
/// 전송 실패는 주소를 잊도록 보고한 뒤 `SessionExpired`로, 쓰기 모드에서
/// 받은 쓰기 거부는 라이터를 잊도록 보고한 뒤 `SessionExpired`로
/// 변환됩니다. 그 외 에러는 그대로 전파됩니다.
///
/// 래핑된 연결당 실패 보고는 최대 한 번입니다.
pub struct RoutingConnection {
    inner: Box<dyn Connection>,
    mode: AccessMode,
    handler: Weak<dyn RoutingErrorHandler>,
    notified: AtomicBool,
}

impl std::fmt::Debug for RoutingConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingConnection")
            .field("mode", &self.mode)
            .field("notified", &self.notified.load(Ordering::Relaxed))
            .finish()
    }
}

impl RoutingConnection {
    /// 새 라우팅 연결 생성
    pub fn new(
        inner: Box<dyn Connection>,
        mode: AccessMode,
        handler: Weak<dyn RoutingErrorHandler>,
    ) -> Self {
        Self {
            inner,
            mode,
            handler,
            notified: AtomicBool::new(false),
        }
    }

    /// 접근 모드
    pub fn access_mode(&self) -> AccessMode {
        self.mode
    }

    /// 연결된 서버 주소
    pub fn server_address(&self) -> &ServerAddress {
        self.inner.address()
    }

    fn notify_once(&self, notify: impl FnOnce(&dyn RoutingErrorHandler, &ServerAddress)) {
        if self.notified.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(handler) = self.handler.upgrade() {
            notify(handler.as_ref(), self.inner.address());
        }
    }

    fn handle_failure(&self, error: RoutingError) -> RoutingError {
        let address = self.inner.address().clone();

        if error.is_connection_failure() {
            debug!(address = %address, "Connection failure, reporting address");
            self.notify_once(|handler, address| handler.on_connection_failure(address));
            RoutingError::session_expired(
                format!("Connection to server at {} has been terminated", address),
                Some(error),
            )
        } else if self.mode == AccessMode::Write && error.is_failure_to_write() {
            debug!(address = %address, "Write rejected, reporting writer");
            self.notify_once(|handler, address| handler.on_write_failure(address));
            RoutingError::session_expired(
                format!("Server at {} no longer accepts writes", address),
                Some(error),
            )
        } else {
            error
        }
    }
}

impl Connection for RoutingConnection {
    fn address(&self) -> &ServerAddress {
        self.inner.address()
    }

    fn server_version(&self) -> ServerVersion {
        self.inner.server_version()
    }

    fn run_procedure<'a>(
        &'a mut self,
        procedure: &'a str,
        parameters: HashMap<String, Value>,
    ) -> BoxFuture<'a, RoutingResult<Vec<Record>>> {
        Box::pin(async move {
            match self.inner.run_procedure(procedure, parameters).await {
                Ok(records) => Ok(records),
                Err(error) => Err(self.handle_failure(error)),
            }
        })
    }
}
