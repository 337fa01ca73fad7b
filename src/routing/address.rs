//! 서버 주소
//!
//! 클러스터 멤버 주소 값 타입과 순서 유지 집합

use std::fmt;
use std::sync::Arc;

use crate::error::{RoutingError, RoutingResult};

/// 기본 포트
pub const DEFAULT_PORT: u16 = 7687;

// ============================================================================
// ServerAddress - 서버 주소
// ============================================================================

/// 서버 주소
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    /// 호스트
    pub host: String,
    /// 포트
    pub port: u16,
}

impl ServerAddress {
    /// 새 서버 주소 생성
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// "host:port" 문자열에서 파싱
    ///
    /// 마지막 `:` 기준으로 분리합니다. IPv6 리터럴은 `[::1]:7687` 형식으로
    /// 괄호를 사용하며, 호스트에는 괄호 없이 저장됩니다. 포트가 없으면
    /// 기본 포트를 사용합니다.
    pub fn parse(address: &str) -> RoutingResult<Self> {
        let address = address.trim();
        if address.is_empty() {
            return Err(RoutingError::configuration("Empty server address"));
        }

        let (host_part, port_part) = match address.rfind(':') {
            // "[::1]" 처럼 마지막 ':'가 괄호 안에 있으면 포트 없음
            Some(_) if address.ends_with(']') => (address, None),
            Some(idx) => (&address[..idx], Some(&address[idx + 1..])),
            None => (address, None),
        };

        let port = match port_part {
            Some(p) => p.parse().map_err(|_| {
                RoutingError::configuration(format!("Invalid port in server address '{}'", address))
            })?,
            None => DEFAULT_PORT,
        };

        let host = host_part.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(RoutingError::configuration(format!(
                "Missing host in server address '{}'",
                address
            )));
        }

        Ok(Self::new(host, port))
    }

    /// 소켓 주소 문자열로 변환
    pub fn to_socket_addr(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_PORT)
    }
}

// ============================================================================
// AddressSet - 주소 집합
// ============================================================================

/// 순서 유지 주소 집합
///
/// 중복이 없고 삽입 순서가 유지됩니다. 내부 배열을 `Arc`로 보관하므로
/// 스냅샷은 복사 없이 참조 카운트 증가만으로 얻습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSet {
    addresses: Arc<[ServerAddress]>,
}

impl AddressSet {
    /// 빈 집합 생성
    pub fn new() -> Self {
        Self {
            addresses: Arc::from(Vec::<ServerAddress>::new()),
        }
    }

    /// 집합 전체 교체
    pub fn update(&mut self, addresses: impl IntoIterator<Item = ServerAddress>) {
        *self = addresses.into_iter().collect();
    }

    /// 주소 제거
    pub fn remove(&mut self, address: &ServerAddress) {
        if self.contains(address) {
            let remaining: Vec<ServerAddress> = self
                .addresses
                .iter()
                .filter(|a| *a != address)
                .cloned()
                .collect();
            self.addresses = Arc::from(remaining);
        }
    }

    /// 포함 여부
    pub fn contains(&self, address: &ServerAddress) -> bool {
        self.addresses.contains(address)
    }

    /// 집합 크기
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// 빈 집합 여부
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// 삽입 순서 반복자
    pub fn iter(&self) -> std::slice::Iter<'_, ServerAddress> {
        self.addresses.iter()
    }

    /// 배열 스냅샷
    pub fn snapshot(&self) -> Arc<[ServerAddress]> {
        Arc::clone(&self.addresses)
    }
}

impl Default for AddressSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<ServerAddress> for AddressSet {
    fn from_iter<I: IntoIterator<Item = ServerAddress>>(iter: I) -> Self {
        let mut unique: Vec<ServerAddress> = Vec::new();
        for address in iter {
            if !unique.contains(&address) {
                unique.push(address);
            }
        }
        Self {
            addresses: Arc::from(unique),
        }
    }
}

impl<'a> IntoIterator for &'a AddressSet {
    type Item = &'a ServerAddress;
    type IntoIter = std::slice::Iter<'a, ServerAddress>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for AddressSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, address) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", address)?;
        }
        write!(f, "]")
    }
}
