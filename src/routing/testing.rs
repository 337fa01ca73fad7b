//! 테스트 지원
//!
//! 라우팅 테스트용 가짜 풀/연결/프로바이더와 구성 빌더

use std::collections::{HashMap, VecDeque};

use futures::future::BoxFuture;
use parking_lot::Mutex;

use crate::error::{RoutingError, RoutingResult};
use crate::spi::{Connection, ConnectionPool, Record, ServerVersion, Value};

use super::address::ServerAddress;
use super::composition::ClusterComposition;
use super::provider::ClusterCompositionProvider;
use super::resolver::HostNameResolver;

/// 주소 생성 단축 함수
pub fn addr(host: &str, port: u16) -> ServerAddress {
    ServerAddress::new(host, port)
}

/// "host:port" 목록에서 구성 생성
pub fn composition(
    expires_at: u64,
    readers: &[&str],
    writers: &[&str],
    routers: &[&str],
) -> ClusterComposition {
    let parse = |addresses: &[&str]| -> Vec<ServerAddress> {
        addresses
            .iter()
            .map(|a| ServerAddress::parse(a).expect("valid test address"))
            .collect()
    };

    ClusterComposition::new(
        expires_at,
        parse(readers),
        parse(writers),
        parse(routers),
    )
}

/// 라우팅 프로시저 결과 레코드 생성
pub fn routing_record(ttl: i64, readers: &[&str], writers: &[&str], routers: &[&str]) -> Record {
    let entry = |role: &str, addresses: &[&str]| {
        let mut map = HashMap::new();
        map.insert("role".to_string(), Value::String(role.to_string()));
        map.insert(
            "addresses".to_string(),
            Value::List(
                addresses
                    .iter()
                    .map(|a| Value::String(a.to_string()))
                    .collect(),
            ),
        );
        Value::Map(map)
    };

    Record::new(
        vec!["ttl".to_string(), "servers".to_string()],
        vec![
            Value::Integer(ttl),
            Value::List(vec![
                entry("READ", readers),
                entry("WRITE", writers),
                entry("ROUTE", routers),
            ]),
        ],
    )
}

// ============================================================================
// FakeConnection - 가짜 연결
// ============================================================================

/// 스크립트된 응답을 돌려주는 가짜 연결
pub struct FakeConnection {
    address: ServerAddress,
    version: ServerVersion,
    responses: Mutex<VecDeque<RoutingResult<Vec<Record>>>>,
    calls: Mutex<Vec<(String, HashMap<String, Value>)>>,
}

impl FakeConnection {
    /// 새 가짜 연결 생성 (기본 버전 3.2.0)
    pub fn new(address: ServerAddress) -> Self {
        Self {
            address,
            version: ServerVersion::V3_2_0,
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 서버 버전 지정
    pub fn with_version(mut self, version: ServerVersion) -> Self {
        self.version = version;
        self
    }

    /// 응답 추가
    pub fn with_response(self, response: RoutingResult<Vec<Record>>) -> Self {
        self.responses.lock().push_back(response);
        self
    }

    /// 기록된 프로시저 호출
    pub fn calls(&self) -> Vec<(String, HashMap<String, Value>)> {
        self.calls.lock().clone()
    }
}

impl Connection for FakeConnection {
    fn address(&self) -> &ServerAddress {
        &self.address
    }

    fn server_version(&self) -> ServerVersion {
        self.version
    }

    fn run_procedure<'a>(
        &'a mut self,
        procedure: &'a str,
        parameters: HashMap<String, Value>,
    ) -> BoxFuture<'a, RoutingResult<Vec<Record>>> {
        Box::pin(async move {
            self.calls
                .lock()
                .push((procedure.to_string(), parameters));
            self.responses.lock().pop_front().unwrap_or_else(|| {
                Err(RoutingError::connection("no scripted response"))
            })
        })
    }
}

// ============================================================================
// FakePool - 가짜 연결 풀
// ============================================================================

/// 가짜 연결 풀
///
/// 기본적으로 모든 주소에 대해 가짜 연결을 돌려주며, 주소 단위로 연결
/// 실패를 스크립트할 수 있습니다. purge와 획득 기록을 남깁니다.
#[derive(Default)]
pub struct FakePool {
    failing: Mutex<Vec<ServerAddress>>,
    active: Mutex<HashMap<ServerAddress, usize>>,
    purged: Mutex<Vec<ServerAddress>>,
    acquired: Mutex<Vec<ServerAddress>>,
}

impl FakePool {
    /// 새 가짜 풀 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 주소로의 연결이 항상 실패하도록 설정
    pub fn fail_connecting(&self, address: ServerAddress) {
        self.failing.lock().push(address);
    }

    /// 주소의 활성 연결 수 설정
    pub fn set_active(&self, address: ServerAddress, count: usize) {
        self.active.lock().insert(address, count);
    }

    /// purge된 주소 목록
    pub fn purged(&self) -> Vec<ServerAddress> {
        self.purged.lock().clone()
    }

    /// 획득 시도된 주소 목록
    pub fn acquired(&self) -> Vec<ServerAddress> {
        self.acquired.lock().clone()
    }
}

impl ConnectionPool for FakePool {
    fn acquire<'a>(
        &'a self,
        address: &'a ServerAddress,
    ) -> BoxFuture<'a, RoutingResult<Box<dyn Connection>>> {
        Box::pin(async move {
            self.acquired.lock().push(address.clone());
            if self.failing.lock().contains(address) {
                return Err(RoutingError::service_unavailable(format!(
                    "Unable to connect to {}",
                    address
                )));
            }
            Ok(Box::new(FakeConnection::new(address.clone())) as Box<dyn Connection>)
        })
    }

    fn purge(&self, address: &ServerAddress) {
        self.purged.lock().push(address.clone());
    }

    fn active_connections(&self, address: &ServerAddress) -> usize {
        self.active.lock().get(address).copied().unwrap_or(0)
    }
}

// ============================================================================
// FakeProvider - 가짜 프로바이더
// ============================================================================

/// 주소별 응답을 스크립트하는 가짜 구성 프로바이더
///
/// 스크립트되지 않은 조회는 연결 실패로 응답합니다. 접촉 순서를
/// 기록합니다.
#[derive(Default)]
pub struct FakeProvider {
    responses: Mutex<HashMap<ServerAddress, VecDeque<RoutingResult<ClusterComposition>>>>,
    contacted: Mutex<Vec<ServerAddress>>,
}

impl FakeProvider {
    /// 새 가짜 프로바이더 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 주소에 대한 응답 추가
    pub fn respond(&self, address: ServerAddress, response: RoutingResult<ClusterComposition>) {
        self.responses
            .lock()
            .entry(address)
            .or_default()
            .push_back(response);
    }

    /// 접촉된 주소 목록 (순서대로)
    pub fn contacted(&self) -> Vec<ServerAddress> {
        self.contacted.lock().clone()
    }
}

impl ClusterCompositionProvider for FakeProvider {
    fn get_cluster_composition<'a>(
        &'a self,
        connection: &'a mut dyn Connection,
    ) -> BoxFuture<'a, RoutingResult<ClusterComposition>> {
        Box::pin(async move {
            // 동시성 테스트에서 호출자 간 교차를 허용
            tokio::task::yield_now().await;

            let address = connection.address().clone();
            self.contacted.lock().push(address.clone());
            self.responses
                .lock()
                .get_mut(&address)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| {
                    Err(RoutingError::connection(format!(
                        "no scripted composition for {}",
                        address
                    )))
                })
        })
    }
}

// ============================================================================
// ListResolver - 고정 목록 해석기
// ============================================================================

/// 고정된 주소 목록을 돌려주는 해석기
pub struct ListResolver {
    addresses: Vec<ServerAddress>,
}

impl ListResolver {
    /// 새 해석기 생성
    pub fn new(addresses: Vec<ServerAddress>) -> Self {
        Self { addresses }
    }
}

impl HostNameResolver for ListResolver {
    fn resolve<'a>(&'a self, _address: &'a ServerAddress) -> BoxFuture<'a, Vec<ServerAddress>> {
        let addresses = self.addresses.clone();
        Box::pin(async move { addresses })
    }
}
