//! Clock
//!
//! 시간 주입 (만료 판정 및 재시도 지연용)

use std::fmt;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;

/// 시간 소스
///
/// 라우팅 테이블의 만료 판정과 재발견 재시도 지연이 이 트레이트를 통해
/// 시간을 읽습니다. 전역 시계를 직접 읽지 않으므로 테스트에서 가짜 시계를
/// 주입할 수 있습니다.
pub trait Clock: Send + Sync + fmt::Debug {
    /// 단조 증가 밀리초
    fn millis(&self) -> u64;

    /// 지정한 시간만큼 대기
    fn delay(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

// ============================================================================
// MonotonicClock - 기본 시계
// ============================================================================

/// 기본 단조 시계
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// 새 시계 생성
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn delay(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

// ============================================================================
// FakeClock - 테스트용 시계
// ============================================================================

/// 테스트용 시계
///
/// `delay`는 실제로 대기하지 않고 요청된 시간을 기록한 뒤 시계를 앞으로
/// 이동시킵니다.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FakeClock {
    now: std::sync::atomic::AtomicU64,
    sleeps: parking_lot::Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl FakeClock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn advance(&self, duration: Duration) {
        self.now.fetch_add(
            duration.as_millis() as u64,
            std::sync::atomic::Ordering::SeqCst,
        );
    }

    pub(crate) fn recorded_sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

#[cfg(test)]
impl Clock for FakeClock {
    fn millis(&self) -> u64 {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn delay(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.sleeps.lock().push(duration);
        self.advance(duration);
        Box::pin(std::future::ready(()))
    }
}
