//! 로드 밸런서
//!
//! 라우팅 테이블 최신성 보장, 접근 모드별 서버 선택, 실패 보고의 정문

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use tracing::{debug, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::error::{RoutingError, RoutingResult};
use crate::spi::ConnectionPool;

use super::address::ServerAddress;
use super::connection::{RoutingConnection, RoutingErrorHandler};
use super::provider::{ClusterCompositionProvider, RoutingProcedureRunner};
use super::rediscovery::Rediscovery;
use super::resolver::{DnsHostNameResolver, HostNameResolver};
use super::settings::RoutingConfig;
use super::table::{AccessMode, RoutingTable};

// ============================================================================
// LoadBalancer - 로드 밸런서
// ============================================================================

/// 로드 밸런서
///
/// 모든 획득 전에 라우팅 테이블이 신선함을 보장하고, 최소 연결 수 기준에
/// 라운드 로빈 타이브레이크를 더해 서버를 고릅니다. 획득한 연결은
/// [`RoutingConnection`]으로 감싸져 전송 실패를 이 밸런서로 되돌립니다.
pub struct LoadBalancer {
    pool: Arc<dyn ConnectionPool>,
    routing_table: Arc<RoutingTable>,
    rediscovery: Rediscovery,
    /// 갱신 단일화 락: 동시에 하나의 재발견만 진행
    refresh_lock: tokio::sync::Mutex<()>,
    read_cursor: AtomicUsize,
    write_cursor: AtomicUsize,
    weak_self: Weak<LoadBalancer>,
}

impl LoadBalancer {
    /// 새 로드 밸런서 생성
    ///
    /// 기본 구성요소(단조 시계, DNS 해석기, 라우팅 프로시저 실행기)를
    /// 사용합니다. 생성 시 한 번의 라우팅 갱신을 수행하므로 잘못된
    /// 부트스트랩 설정은 여기서 바로 실패합니다.
    pub async fn new(config: RoutingConfig, pool: Arc<dyn ConnectionPool>) -> RoutingResult<Arc<Self>> {
        let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
        let provider = Arc::new(RoutingProcedureRunner::new(
            config.routing_context.clone(),
            clock.clone(),
        ));
        Self::with_components(
            config,
            pool,
            provider,
            Arc::new(DnsHostNameResolver::new()),
            clock,
        )
        .await
    }

    /// 구성요소를 직접 주입해 생성
    pub async fn with_components(
        config: RoutingConfig,
        pool: Arc<dyn ConnectionPool>,
        provider: Arc<dyn ClusterCompositionProvider>,
        resolver: Arc<dyn HostNameResolver>,
        clock: Arc<dyn Clock>,
    ) -> RoutingResult<Arc<Self>> {
        if config.initial_router.host.trim().is_empty() {
            return Err(RoutingError::configuration(
                "Initial router host must not be empty",
            ));
        }

        let routing_table = Arc::new(RoutingTable::new(
            clock.clone(),
            [config.initial_router.clone()],
        ));
        let rediscovery = Rediscovery::new(
            config.initial_router,
            config.settings,
            provider,
            resolver,
            clock,
        );

        let balancer = Arc::new_cyclic(|weak_self| Self {
            pool,
            routing_table,
            rediscovery,
            refresh_lock: tokio::sync::Mutex::new(()),
            read_cursor: AtomicUsize::new(0),
            write_cursor: AtomicUsize::new(0),
            weak_self: weak_self.clone(),
        });

        // 생성 시 1회 갱신 (잘못된 부트스트랩에서 빨리 실패)
        balancer.ensure_routing(AccessMode::Read).await?;

        Ok(balancer)
    }

    /// 라우팅 테이블
    pub fn routing_table(&self) -> &Arc<RoutingTable> {
        &self.routing_table
    }

    /// 접근 모드에 맞는 연결 획득
    ///
    /// 테이블이 오래됐으면 갱신한 뒤, 후보 중 활성 연결이 가장 적은
    /// 서버를 고릅니다. 선택한 서버로의 연결이 실패하면 그 주소를 잊고
    /// 남은 후보로 재시도하며, 한 바퀴를 다 소진하면 강제로 한 번 더
    /// 갱신한 뒤에도 실패할 때 `SessionExpired`를 돌려줍니다.
    pub async fn acquire(&self, mode: AccessMode) -> RoutingResult<RoutingConnection> {
        self.ensure_routing(mode).await?;

        let mut forced_refresh_done = false;
        let mut failed_in_pass = false;

        loop {
            let candidates = match mode {
                AccessMode::Read => self.routing_table.readers(),
                AccessMode::Write => self.routing_table.writers(),
            };

            if candidates.is_empty() {
                if failed_in_pass && !forced_refresh_done {
                    forced_refresh_done = true;
                    failed_in_pass = false;
                    self.refresh_routing_table(mode).await?;
                    continue;
                }
                return Err(RoutingError::session_expired(
                    format!("Failed to obtain connection towards {} server", mode),
                    None,
                ));
            }

            let selected = self.select(mode, &candidates);

            match self.pool.acquire(&selected).await {
                Ok(connection) => {
                    let handler: Weak<dyn RoutingErrorHandler> = self.weak_self.clone();
                    return Ok(RoutingConnection::new(connection, mode, handler));
                }
                Err(error) if error.is_authentication() || error.is_cancelled() => {
                    return Err(error);
                }
                Err(error) => {
                    warn!(address = %selected, error = %error, "Failed to acquire connection, forgetting address");
                    self.routing_table.forget(&selected);
                    self.pool.purge(&selected);
                    failed_in_pass = true;
                }
            }
        }
    }

    /// 동기 컨텍스트에서 로드 밸런서 생성
    pub fn new_blocking(
        config: RoutingConfig,
        pool: Arc<dyn ConnectionPool>,
    ) -> RoutingResult<Arc<Self>> {
        block_on_routing(Self::new(config, pool))
    }

    /// 동기 컨텍스트에서 연결 획득
    ///
    /// 비동기 코어를 전용 스레드의 현재-스레드 런타임으로 감쌉니다.
    pub fn acquire_blocking(&self, mode: AccessMode) -> RoutingResult<RoutingConnection> {
        block_on_routing(self.acquire(mode))
    }

    /// 라우팅 테이블 최신성 보장
    ///
    /// 테이블당 동시에 하나의 갱신만 진행됩니다. 락을 기다리던 호출자는
    /// 락을 얻은 뒤 다시 검사해 이미 끝난 갱신 결과를 공유합니다.
    async fn ensure_routing(&self, mode: AccessMode) -> RoutingResult<()> {
        if !self.routing_table.is_stale_for(mode) {
            return Ok(());
        }

        let _guard = self.refresh_lock.lock().await;
        if !self.routing_table.is_stale_for(mode) {
            return Ok(());
        }

        self.refresh(mode).await
    }

    /// 강제 갱신 (최신성 검사 없이)
    async fn refresh_routing_table(&self, mode: AccessMode) -> RoutingResult<()> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh(mode).await
    }

    async fn refresh(&self, mode: AccessMode) -> RoutingResult<()> {
        debug!(mode = %mode, "Routing table is stale, refreshing");
        let composition = self
            .rediscovery
            .lookup(&self.routing_table, self.pool.as_ref())
            .await?;

        let removed = self.routing_table.update(&composition);
        for address in &removed {
            self.pool.purge(address);
        }

        Ok(())
    }

    /// 최소 연결 선택 (라운드 로빈 타이브레이크)
    ///
    /// 역할별 커서가 가리키는 위치부터 전체 후보를 훑어 활성 연결 수가
    /// 가장 적은 서버를 고릅니다. 동률이면 먼저 훑은 쪽이 이기므로 부하가
    /// 없을 때는 순수 라운드 로빈으로 동작합니다. 커서는 호출마다 1씩
    /// 전진합니다.
    fn select(&self, mode: AccessMode, candidates: &[ServerAddress]) -> ServerAddress {
        let cursor = match mode {
            AccessMode::Read => &self.read_cursor,
            AccessMode::Write => &self.write_cursor,
        };
        let start = cursor.fetch_add(1, Ordering::Relaxed);
        let length = candidates.len();

        let mut best = start % length;
        let mut fewest = usize::MAX;
        for offset in 0..length {
            let index = (start + offset) % length;
            let active = self.pool.active_connections(&candidates[index]);
            if active < fewest {
                fewest = active;
                best = index;
            }
        }

        candidates[best].clone()
    }
}

/// 비동기 작업을 전용 스레드의 현재-스레드 런타임에서 동기 실행
fn block_on_routing<T, F>(future: F) -> RoutingResult<T>
where
    T: Send,
    F: std::future::Future<Output = RoutingResult<T>> + Send,
{
    std::thread::scope(|s| {
        s.spawn(|| {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| RoutingError::connection(format!("Failed to create runtime: {}", e)))?;

            rt.block_on(future)
        })
        .join()
        .map_err(|_| RoutingError::connection("Thread panicked"))?
    })
}

impl RoutingErrorHandler for LoadBalancer {
    fn on_connection_failure(&self, address: &ServerAddress) {
        self.routing_table.forget(address);
        self.pool.purge(address);
    }

    fn on_write_failure(&self, address: &ServerAddress) {
        self.routing_table.forget_writer(address);
        self.pool.purge(address);
    }
}
