//! 라우팅 테이블
//!
//! 클러스터 구성의 현재 뷰와 역할별 최신성 판정

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::clock::Clock;

use super::address::{AddressSet, ServerAddress};
use super::composition::ClusterComposition;

// ============================================================================
// AccessMode - 접근 모드
// ============================================================================

/// 접근 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessMode {
    /// 읽기
    #[default]
    Read,
    /// 쓰기
    Write,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "READ"),
            Self::Write => write!(f, "WRITE"),
        }
    }
}

// ============================================================================
// RoutingTable - 라우팅 테이블
// ============================================================================

/// 라우팅 테이블
///
/// 마지막으로 수락된 클러스터 구성을 보관합니다. 하나의 뮤텍스가 전체
/// 상태를 보호하며, 읽기는 스냅샷을 얻은 뒤 락을 놓고 사용합니다.
pub struct RoutingTable {
    clock: Arc<dyn Clock>,
    state: Mutex<TableState>,
}

#[derive(Debug)]
struct TableState {
    expires_at: u64,
    readers: AddressSet,
    writers: AddressSet,
    routers: AddressSet,
}

impl RoutingTable {
    /// 부트스트랩 라우터로 테이블 생성
    ///
    /// 라우터 집합만 채워지고 즉시 만료 상태이므로 첫 획득에서 재발견이
    /// 일어납니다.
    pub fn new(
        clock: Arc<dyn Clock>,
        initial_routers: impl IntoIterator<Item = ServerAddress>,
    ) -> Self {
        let expires_at = clock.millis();
        Self {
            clock,
            state: Mutex::new(TableState {
                expires_at,
                readers: AddressSet::new(),
                writers: AddressSet::new(),
                routers: initial_routers.into_iter().collect(),
            }),
        }
    }

    /// 접근 모드 기준 최신성 판정
    ///
    /// 라이터가 없는 구성은 읽기 요청에 대해서도 오래된 것으로 취급합니다.
    /// 라이터 없음은 페일오버 진행 중일 가능성이 높아서, 읽기 전용
    /// 워크로드도 라우팅 갱신을 수행하게 됩니다.
    pub fn is_stale_for(&self, mode: AccessMode) -> bool {
        let state = self.state.lock();
        self.clock.millis() >= state.expires_at
            || state.routers.is_empty()
            || state.writers.is_empty()
            || (mode == AccessMode::Read && state.readers.is_empty())
    }

    /// 구성으로 테이블 갱신
    ///
    /// 세 역할 집합을 원자적으로 교체하고, 이전에는 있었지만 새 구성에
    /// 없는 주소들을 돌려줍니다. 반환된 주소의 풀 연결은 호출자가
    /// 정리해야 합니다.
    pub fn update(&self, composition: &ClusterComposition) -> HashSet<ServerAddress> {
        let mut state = self.state.lock();

        let mut removed: HashSet<ServerAddress> = state
            .readers
            .iter()
            .chain(state.writers.iter())
            .chain(state.routers.iter())
            .cloned()
            .collect();

        state.readers = composition.readers().clone();
        state.writers = composition.writers().clone();
        state.routers = composition.routers().clone();
        state.expires_at = composition.expires_at();

        for address in state
            .readers
            .iter()
            .chain(state.writers.iter())
            .chain(state.routers.iter())
        {
            removed.remove(address);
        }
        drop(state);

        debug!(composition = %composition, "Updated routing table");
        removed
    }

    /// 주소 잊기
    ///
    /// 리더와 라이터에서만 제거합니다. 데이터 플레인에서 빠진 서버도
    /// 라우터로는 여전히 응답할 수 있으므로 라우터 집합은 유지합니다.
    pub fn forget(&self, address: &ServerAddress) {
        let mut state = self.state.lock();
        state.readers.remove(address);
        state.writers.remove(address);
    }

    /// 라이터에서만 주소 잊기
    pub fn forget_writer(&self, address: &ServerAddress) {
        let mut state = self.state.lock();
        state.writers.remove(address);
    }

    /// 리더 스냅샷
    pub fn readers(&self) -> Arc<[ServerAddress]> {
        self.state.lock().readers.snapshot()
    }

    /// 라이터 스냅샷
    pub fn writers(&self) -> Arc<[ServerAddress]> {
        self.state.lock().writers.snapshot()
    }

    /// 라우터 스냅샷
    pub fn routers(&self) -> Arc<[ServerAddress]> {
        self.state.lock().routers.snapshot()
    }
}

impl fmt::Debug for RoutingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RoutingTable")
            .field("expires_at", &state.expires_at)
            .field("readers", &state.readers)
            .field("writers", &state.writers)
            .field("routers", &state.routers)
            .finish()
    }
}
