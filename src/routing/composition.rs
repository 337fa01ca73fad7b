//! 클러스터 구성
//!
//! 클러스터의 역할별 서버 집합 스냅샷

use std::collections::HashMap;
use std::fmt;

use crate::error::{RoutingError, RoutingResult};
use crate::spi::{Record, Value};

use super::address::{AddressSet, ServerAddress};

/// 라우팅 레코드의 TTL 필드 키
const TTL_KEY: &str = "ttl";
/// 라우팅 레코드의 서버 목록 필드 키
const SERVERS_KEY: &str = "servers";
/// 서버 엔트리의 역할 필드 키
const ROLE_KEY: &str = "role";
/// 서버 엔트리의 주소 목록 필드 키
const ADDRESSES_KEY: &str = "addresses";

// ============================================================================
// ServerRole - 서버 역할
// ============================================================================

/// 서버 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerRole {
    /// 라우팅 테이블 제공자
    Route,
    /// 쓰기 트랜잭션 처리 (리더)
    Write,
    /// 읽기 트랜잭션 처리 (팔로워)
    Read,
}

impl ServerRole {
    /// 문자열에서 역할 파싱
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ROUTE" => Some(Self::Route),
            "WRITE" => Some(Self::Write),
            "READ" => Some(Self::Read),
            _ => None,
        }
    }

    /// 역할을 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Route => "ROUTE",
            Self::Write => "WRITE",
            Self::Read => "READ",
        }
    }
}

// ============================================================================
// ClusterComposition - 클러스터 구성
// ============================================================================

/// 클러스터 구성 스냅샷
///
/// 라우팅 프로시저 결과로 생성되며 생성 이후 변경되지 않습니다.
/// 다음 구성이 수락되면 폐기됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterComposition {
    expires_at: u64,
    readers: AddressSet,
    writers: AddressSet,
    routers: AddressSet,
}

impl ClusterComposition {
    /// 새 구성 생성
    pub fn new(
        expires_at: u64,
        readers: impl IntoIterator<Item = ServerAddress>,
        writers: impl IntoIterator<Item = ServerAddress>,
        routers: impl IntoIterator<Item = ServerAddress>,
    ) -> Self {
        Self {
            expires_at,
            readers: readers.into_iter().collect(),
            writers: writers.into_iter().collect(),
            routers: routers.into_iter().collect(),
        }
    }

    /// 라우팅 레코드에서 구성 파싱
    ///
    /// `expires_at`은 `now_millis + max(0, ttl) * 1000`으로 계산합니다.
    /// 알 수 없는 역할은 무시합니다. 라우터 집합이 비었는지는 호출자
    /// (프로바이더)가 검증합니다.
    pub fn parse(record: &Record, now_millis: u64) -> RoutingResult<Self> {
        let ttl = record
            .get(TTL_KEY)
            .and_then(Value::as_int)
            .ok_or_else(|| RoutingError::protocol("Routing record has no valid 'ttl' field"))?;

        let servers = record
            .get(SERVERS_KEY)
            .and_then(Value::as_list)
            .ok_or_else(|| RoutingError::protocol("Routing record has no valid 'servers' field"))?;

        let mut readers = Vec::new();
        let mut writers = Vec::new();
        let mut routers = Vec::new();

        for entry in servers {
            let entry = entry.as_map().ok_or_else(|| {
                RoutingError::protocol("Server entry in routing record is not a map")
            })?;

            let role_str = entry.get(ROLE_KEY).and_then(Value::as_str).ok_or_else(|| {
                RoutingError::protocol("Server entry in routing record has no 'role' field")
            })?;

            let role = match ServerRole::from_str(role_str) {
                Some(role) => role,
                None => continue,
            };

            let addresses = entry
                .get(ADDRESSES_KEY)
                .and_then(Value::as_list)
                .ok_or_else(|| {
                    RoutingError::protocol(
                        "Server entry in routing record has no 'addresses' field",
                    )
                })?;

            let target = match role {
                ServerRole::Read => &mut readers,
                ServerRole::Write => &mut writers,
                ServerRole::Route => &mut routers,
            };

            for value in addresses {
                let raw = value.as_str().ok_or_else(|| {
                    RoutingError::protocol("Server address in routing record is not a string")
                })?;
                let address = ServerAddress::parse(raw).map_err(|_| {
                    RoutingError::protocol(format!(
                        "Invalid server address '{}' in routing record",
                        raw
                    ))
                })?;
                target.push(address);
            }
        }

        let expires_at = now_millis + ttl.max(0) as u64 * 1000;
        Ok(Self::new(expires_at, readers, writers, routers))
    }

    /// 구성을 라우팅 레코드 형태로 직렬화
    pub fn to_record(&self, now_millis: u64) -> Record {
        let ttl = (self.expires_at.saturating_sub(now_millis) / 1000) as i64;

        let entry = |role: ServerRole, addresses: &AddressSet| {
            let mut map = HashMap::new();
            map.insert(
                ROLE_KEY.to_string(),
                Value::String(role.as_str().to_string()),
            );
            map.insert(
                ADDRESSES_KEY.to_string(),
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
            vec![TTL_KEY.to_string(), SERVERS_KEY.to_string()],
            vec![
                Value::Integer(ttl),
                Value::List(vec![
                    entry(ServerRole::Read, &self.readers),
                    entry(ServerRole::Write, &self.writers),
                    entry(ServerRole::Route, &self.routers),
                ]),
            ],
        )
    }

    /// 만료 시각 (단조 밀리초)
    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }

    /// 리더 집합
    pub fn readers(&self) -> &AddressSet {
        &self.readers
    }

    /// 라이터 집합
    pub fn writers(&self) -> &AddressSet {
        &self.writers
    }

    /// 라우터 집합
    pub fn routers(&self) -> &AddressSet {
        &self.routers
    }

    /// 라이터 존재 여부
    pub fn has_writers(&self) -> bool {
        !self.writers.is_empty()
    }

    /// 라우터 존재 여부
    pub fn has_routers(&self) -> bool {
        !self.routers.is_empty()
    }
}

impl fmt::Display for ClusterComposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClusterComposition {{ expires_at: {}, readers: {}, writers: {}, routers: {} }}",
            self.expires_at, self.readers, self.writers, self.routers
        )
    }
}
