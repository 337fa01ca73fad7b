//! 재발견
//!
//! 알려진 라우터와 부트스트랩 라우터를 거쳐 라우팅 테이블을 갱신합니다.

use std::cmp;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{RoutingError, RoutingResult};
use crate::spi::ConnectionPool;

use super::address::ServerAddress;
use super::composition::ClusterComposition;
use super::provider::ClusterCompositionProvider;
use super::resolver::HostNameResolver;
use super::settings::RoutingSettings;
use super::table::RoutingTable;

const NO_ROUTERS_AVAILABLE: &str = "No routing servers available";

// ============================================================================
// NextAttemptStrategy - 다음 시도 전략
// ============================================================================

/// 다음 재발견 시도의 후보 순서
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAttemptStrategy {
    /// 알려진 라우터 먼저, 그 다음 부트스트랩
    KnownRoutersFirst,
    /// 부트스트랩 먼저, 그 다음 알려진 라우터
    BootstrapFirst,
}

/// 전략 저장용 원자 셀
#[derive(Debug)]
struct StrategyCell(AtomicBool);

impl StrategyCell {
    fn new(strategy: NextAttemptStrategy) -> Self {
        Self(AtomicBool::new(strategy == NextAttemptStrategy::BootstrapFirst))
    }

    fn load(&self) -> NextAttemptStrategy {
        if self.0.load(Ordering::SeqCst) {
            NextAttemptStrategy::BootstrapFirst
        } else {
            NextAttemptStrategy::KnownRoutersFirst
        }
    }

    fn store(&self, strategy: NextAttemptStrategy) {
        self.0.store(
            strategy == NextAttemptStrategy::BootstrapFirst,
            Ordering::SeqCst,
        );
    }
}

// ============================================================================
// Rediscovery - 재발견
// ============================================================================

/// 재발견
///
/// 라우터 후보들을 순서대로 시도해 새 클러스터 구성을 얻습니다. 시도는
/// `max_routing_failures`회로 제한되며, 시도 사이에는 기본 지연에서
/// 시작해 지수적으로 늘어나는 대기가 들어갑니다.
///
/// 라이터가 없는 구성을 받으면 다음 갱신은 부트스트랩 주소를 먼저
/// 시도합니다. 라이터가 전부 빠진 클러스터는 페일오버 중일 가능성이
/// 높고, 알려진 라우터들 자체가 파티션에서 밀려났을 수 있습니다. 이
/// 편향은 라이터가 있는 구성이 관측될 때까지 유지됩니다.
pub struct Rediscovery {
    initial_router: ServerAddress,
    settings: RoutingSettings,
    provider: Arc<dyn ClusterCompositionProvider>,
    resolver: Arc<dyn HostNameResolver>,
    clock: Arc<dyn Clock>,
    strategy: StrategyCell,
}

impl Rediscovery {
    /// 새 재발견 생성
    pub fn new(
        initial_router: ServerAddress,
        settings: RoutingSettings,
        provider: Arc<dyn ClusterCompositionProvider>,
        resolver: Arc<dyn HostNameResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            initial_router,
            settings,
            provider,
            resolver,
            clock,
            strategy: StrategyCell::new(NextAttemptStrategy::KnownRoutersFirst),
        }
    }

    /// 다음 시도 전략 조회
    pub fn next_attempt_strategy(&self) -> NextAttemptStrategy {
        self.strategy.load()
    }

    /// 클러스터 구성 조회
    ///
    /// 성공하면 라우터가 비지 않은 구성을 돌려줍니다. 모든 시도가
    /// 소진되면 `ServiceUnavailable`, 인증 실패는 즉시 전파됩니다.
    pub async fn lookup(
        &self,
        routing_table: &RoutingTable,
        pool: &dyn ConnectionPool,
    ) -> RoutingResult<ClusterComposition> {
        let mut failures: u32 = 0;
        let mut delay = Duration::ZERO;

        loop {
            if !delay.is_zero() {
                info!(
                    delay_ms = delay.as_millis() as u64,
                    "Unable to fetch new routing table, will retry"
                );
                self.clock.delay(delay).await;
            }

            if let Some(composition) = self.lookup_once(routing_table, pool).await? {
                self.strategy.store(if composition.has_writers() {
                    NextAttemptStrategy::KnownRoutersFirst
                } else {
                    NextAttemptStrategy::BootstrapFirst
                });
                return Ok(composition);
            }

            failures += 1;
            if failures >= self.settings.max_routing_failures() {
                return Err(RoutingError::service_unavailable(NO_ROUTERS_AVAILABLE));
            }

            delay = cmp::max(self.settings.retry_timeout_delay(), delay * 2);
        }
    }

    /// 한 번의 시도
    async fn lookup_once(
        &self,
        routing_table: &RoutingTable,
        pool: &dyn ConnectionPool,
    ) -> RoutingResult<Option<ClusterComposition>> {
        match self.strategy.load() {
            NextAttemptStrategy::BootstrapFirst => {
                if let Some(composition) = self
                    .lookup_on_bootstrap(routing_table, pool, &HashSet::new())
                    .await?
                {
                    return Ok(Some(composition));
                }
                self.lookup_on_known_routers(routing_table, pool, &mut HashSet::new())
                    .await
            }
            NextAttemptStrategy::KnownRoutersFirst => {
                let mut seen = HashSet::new();
                if let Some(composition) = self
                    .lookup_on_known_routers(routing_table, pool, &mut seen)
                    .await?
                {
                    return Ok(Some(composition));
                }
                self.lookup_on_bootstrap(routing_table, pool, &seen).await
            }
        }
    }

    async fn lookup_on_known_routers(
        &self,
        routing_table: &RoutingTable,
        pool: &dyn ConnectionPool,
        seen: &mut HashSet<ServerAddress>,
    ) -> RoutingResult<Option<ClusterComposition>> {
        let routers = routing_table.routers();

        for address in routers.iter() {
            if let Some(composition) = self.lookup_on_router(address, routing_table, pool).await? {
                return Ok(Some(composition));
            }
            seen.insert(address.clone());
        }

        Ok(None)
    }

    async fn lookup_on_bootstrap(
        &self,
        routing_table: &RoutingTable,
        pool: &dyn ConnectionPool,
        seen: &HashSet<ServerAddress>,
    ) -> RoutingResult<Option<ClusterComposition>> {
        let resolved = self.resolver.resolve(&self.initial_router).await;

        for address in resolved.iter().filter(|a| !seen.contains(*a)) {
            if let Some(composition) = self.lookup_on_router(address, routing_table, pool).await? {
                return Ok(Some(composition));
            }
        }

        Ok(None)
    }

    /// 단일 라우터에서 구성 조회
    ///
    /// 인증 실패와 취소는 전파하고, 그 외 실패는 해당 주소를 잊고 다음
    /// 후보로 넘어갑니다.
    async fn lookup_on_router(
        &self,
        address: &ServerAddress,
        routing_table: &RoutingTable,
        pool: &dyn ConnectionPool,
    ) -> RoutingResult<Option<ClusterComposition>> {
        let result = async {
            let mut connection = pool.acquire(address).await?;
            self.provider
                .get_cluster_composition(connection.as_mut())
                .await
        }
        .await;

        match result {
            Ok(composition) => {
                debug!(address = %address, "Fetched cluster composition from router");
                Ok(Some(composition))
            }
            Err(error) if error.is_authentication() || error.is_cancelled() => Err(error),
            Err(error) => {
                warn!(address = %address, error = %error, "Failed to fetch routing table from router");
                routing_table.forget(address);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::routing::resolver::PassthroughResolver;
    use crate::routing::testing::{addr, composition, FakePool, FakeProvider, ListResolver};
    use crate::routing::AccessMode;

    const BOOTSTRAP: &str = "bootstrap";

    struct Fixture {
        clock: Arc<FakeClock>,
        provider: Arc<FakeProvider>,
        pool: FakePool,
        table: RoutingTable,
    }

    impl Fixture {
        fn new(routers: &[ServerAddress]) -> Self {
            let clock = Arc::new(FakeClock::new());
            Self {
                clock: clock.clone(),
                provider: Arc::new(FakeProvider::new()),
                pool: FakePool::new(),
                table: RoutingTable::new(clock, routers.to_vec()),
            }
        }

        fn rediscovery(&self, settings: RoutingSettings) -> Rediscovery {
            Rediscovery::new(
                addr(BOOTSTRAP, 7687),
                settings,
                self.provider.clone(),
                Arc::new(PassthroughResolver::new()),
                self.clock.clone(),
            )
        }

        fn rediscovery_with_resolver(
            &self,
            settings: RoutingSettings,
            resolver: Arc<dyn HostNameResolver>,
        ) -> Rediscovery {
            Rediscovery::new(
                addr(BOOTSTRAP, 7687),
                settings,
                self.provider.clone(),
                resolver,
                self.clock.clone(),
            )
        }
    }

    fn settings(max_failures: u32, delay_ms: u64) -> RoutingSettings {
        RoutingSettings::new(max_failures, Duration::from_millis(delay_ms)).unwrap()
    }

    fn healthy_composition() -> ClusterComposition {
        composition(
            60_000,
            &["reader1:1", "reader2:2"],
            &["writer1:3"],
            &["router1:4", "router2:5"],
        )
    }

    #[tokio::test]
    async fn test_lookup_on_first_known_router() {
        let fixture = Fixture::new(&[addr("router1", 4)]);
        fixture
            .provider
            .respond(addr("router1", 4), Ok(healthy_composition()));

        let rediscovery = fixture.rediscovery(settings(3, 50));
        let result = rediscovery
            .lookup(&fixture.table, &fixture.pool)
            .await
            .unwrap();

        assert_eq!(result, healthy_composition());
        assert_eq!(fixture.provider.contacted(), vec![addr("router1", 4)]);
    }

    #[tokio::test]
    async fn test_broken_router_is_forgotten_and_next_tried() {
        let fixture = Fixture::new(&[addr("router1", 4), addr("router2", 5)]);
        fixture.table.update(&composition(
            0,
            &["router1:4"],
            &["router1:4"],
            &["router1:4", "router2:5"],
        ));
        fixture.provider.respond(
            addr("router1", 4),
            Err(RoutingError::connection("connection refused")),
        );
        fixture
            .provider
            .respond(addr("router2", 5), Ok(healthy_composition()));

        let rediscovery = fixture.rediscovery(settings(3, 50));
        let result = rediscovery
            .lookup(&fixture.table, &fixture.pool)
            .await
            .unwrap();

        assert_eq!(result, healthy_composition());
        // 실패한 라우터는 리더/라이터에서 잊혀짐
        assert!(fixture.table.readers().is_empty());
        assert!(fixture.table.writers().is_empty());
        assert_eq!(
            fixture.provider.contacted(),
            vec![addr("router1", 4), addr("router2", 5)]
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_bootstrap_when_known_routers_fail() {
        let fixture = Fixture::new(&[addr("router1", 4)]);
        fixture.provider.respond(
            addr("router1", 4),
            Err(RoutingError::connection("refused")),
        );
        fixture
            .provider
            .respond(addr(BOOTSTRAP, 7687), Ok(healthy_composition()));

        let rediscovery = fixture.rediscovery(settings(3, 50));
        let result = rediscovery
            .lookup(&fixture.table, &fixture.pool)
            .await
            .unwrap();

        assert_eq!(result, healthy_composition());
        assert_eq!(
            fixture.provider.contacted(),
            vec![addr("router1", 4), addr(BOOTSTRAP, 7687)]
        );
    }

    #[tokio::test]
    async fn test_bootstrap_addresses_already_seen_are_skipped() {
        // 부트스트랩이 이미 시도한 알려진 라우터로 해석되는 경우
        let fixture = Fixture::new(&[addr("router1", 4)]);
        fixture.provider.respond(
            addr("router1", 4),
            Err(RoutingError::connection("refused")),
        );

        let resolver = Arc::new(ListResolver::new(vec![addr("router1", 4)]));
        let rediscovery = fixture.rediscovery_with_resolver(settings(1, 50), resolver);

        let result = rediscovery.lookup(&fixture.table, &fixture.pool).await;

        assert!(matches!(result, Err(RoutingError::ServiceUnavailable(_))));
        // router1은 한 번만 접촉됨
        assert_eq!(fixture.provider.contacted(), vec![addr("router1", 4)]);
    }

    #[tokio::test]
    async fn test_authentication_error_aborts_discovery() {
        let fixture = Fixture::new(&[addr("router1", 4), addr("router2", 5)]);
        fixture.table.update(&composition(
            60_000,
            &["router1:4"],
            &["router1:4"],
            &["router1:4", "router2:5"],
        ));
        fixture.provider.respond(
            addr("router1", 4),
            Err(RoutingError::authentication("bad credentials")),
        );

        let rediscovery = fixture.rediscovery(settings(3, 50));
        let result = rediscovery.lookup(&fixture.table, &fixture.pool).await;

        assert!(matches!(result, Err(RoutingError::Authentication(_))));
        // 이후 라우터는 접촉하지 않고 테이블도 그대로
        assert_eq!(fixture.provider.contacted(), vec![addr("router1", 4)]);
        assert!(fixture.table.readers().contains(&addr("router1", 4)));
    }

    #[tokio::test]
    async fn test_exhaustion_after_max_failures_with_delays() {
        let fixture = Fixture::new(&[addr("router1", 4)]);
        // 모든 응답이 실패 (기본 응답이 실패)

        let rediscovery = fixture.rediscovery(settings(2, 50));
        let result = rediscovery.lookup(&fixture.table, &fixture.pool).await;

        match result {
            Err(RoutingError::ServiceUnavailable(message)) => {
                assert_eq!(message, NO_ROUTERS_AVAILABLE);
            }
            other => panic!("Expected service unavailable, got {:?}", other),
        }
        // 두 번의 시도 사이에 정확히 한 번, 기본 지연만큼 대기
        assert_eq!(
            fixture.clock.recorded_sleeps(),
            vec![Duration::from_millis(50)]
        );
    }

    #[tokio::test]
    async fn test_delay_grows_exponentially() {
        let fixture = Fixture::new(&[addr("router1", 4)]);

        let rediscovery = fixture.rediscovery(settings(4, 50));
        let result = rediscovery.lookup(&fixture.table, &fixture.pool).await;

        assert!(matches!(result, Err(RoutingError::ServiceUnavailable(_))));
        assert_eq!(
            fixture.clock.recorded_sleeps(),
            vec![
                Duration::from_millis(50),
                Duration::from_millis(100),
                Duration::from_millis(200),
            ]
        );
    }

    #[tokio::test]
    async fn test_no_writers_flips_strategy_to_bootstrap_first() {
        let fixture = Fixture::new(&[addr("router1", 4)]);
        fixture.provider.respond(
            addr("router1", 4),
            Ok(composition(60_000, &["reader1:1"], &[], &["router1:4"])),
        );

        let rediscovery = fixture.rediscovery(settings(3, 50));
        assert_eq!(
            rediscovery.next_attempt_strategy(),
            NextAttemptStrategy::KnownRoutersFirst
        );

        rediscovery
            .lookup(&fixture.table, &fixture.pool)
            .await
            .unwrap();

        assert_eq!(
            rediscovery.next_attempt_strategy(),
            NextAttemptStrategy::BootstrapFirst
        );
    }

    #[tokio::test]
    async fn test_bootstrap_first_tries_bootstrap_before_known_routers() {
        let fixture = Fixture::new(&[addr("router1", 4)]);
        // 첫 조회: 라이터 없는 구성 → 전략 전환
        fixture.provider.respond(
            addr("router1", 4),
            Ok(composition(0, &["reader1:1"], &[], &["router1:4"])),
        );
        let rediscovery = fixture.rediscovery(settings(3, 50));
        rediscovery
            .lookup(&fixture.table, &fixture.pool)
            .await
            .unwrap();

        // 두 번째 조회: 부트스트랩이 먼저 접촉되어야 함
        fixture
            .provider
            .respond(addr(BOOTSTRAP, 7687), Ok(healthy_composition()));
        rediscovery
            .lookup(&fixture.table, &fixture.pool)
            .await
            .unwrap();

        assert_eq!(
            fixture.provider.contacted(),
            vec![addr("router1", 4), addr(BOOTSTRAP, 7687)]
        );
    }

    #[tokio::test]
    async fn test_strategy_stays_bootstrap_first_until_writers_observed() {
        let fixture = Fixture::new(&[addr("router1", 4)]);
        let rediscovery = fixture.rediscovery(settings(3, 50));

        // 라이터 없는 구성이 연속으로 와도 부트스트랩 우선 유지
        fixture.provider.respond(
            addr("router1", 4),
            Ok(composition(0, &["reader1:1"], &[], &["router1:4"])),
        );
        rediscovery
            .lookup(&fixture.table, &fixture.pool)
            .await
            .unwrap();

        fixture.provider.respond(
            addr(BOOTSTRAP, 7687),
            Ok(composition(0, &["reader1:1"], &[], &["router1:4"])),
        );
        rediscovery
            .lookup(&fixture.table, &fixture.pool)
            .await
            .unwrap();
        assert_eq!(
            rediscovery.next_attempt_strategy(),
            NextAttemptStrategy::BootstrapFirst
        );

        // 라이터가 관측되면 원래 전략으로 복귀
        fixture
            .provider
            .respond(addr(BOOTSTRAP, 7687), Ok(healthy_composition()));
        rediscovery
            .lookup(&fixture.table, &fixture.pool)
            .await
            .unwrap();
        assert_eq!(
            rediscovery.next_attempt_strategy(),
            NextAttemptStrategy::KnownRoutersFirst
        );
    }

    #[tokio::test]
    async fn test_pool_acquire_failure_forgets_router() {
        let fixture = Fixture::new(&[addr("router1", 4), addr("router2", 5)]);
        fixture.pool.fail_connecting(addr("router1", 4));
        fixture
            .provider
            .respond(addr("router2", 5), Ok(healthy_composition()));

        let rediscovery = fixture.rediscovery(settings(3, 50));
        let result = rediscovery
            .lookup(&fixture.table, &fixture.pool)
            .await
            .unwrap();

        assert_eq!(result, healthy_composition());
        // router1은 연결 단계에서 실패했으므로 프로바이더까지 가지 않음
        assert_eq!(fixture.provider.contacted(), vec![addr("router2", 5)]);
    }

    #[test]
    fn test_table_stays_usable_for_reads_during_failover_refresh() {
        // 라이터 없는 구성도 수락은 되므로 리더 스냅샷은 남는다
        let clock = Arc::new(FakeClock::new());
        let table = RoutingTable::new(clock, vec![addr("router1", 4)]);
        table.update(&composition(60_000, &["reader1:1"], &[], &["router1:4"]));

        assert!(table.is_stale_for(AccessMode::Read));
        assert!(!table.readers().is_empty());
    }
}
