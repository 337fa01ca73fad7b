//! 호스트명 해석
//!
//! 부트스트랩 주소를 0개 이상의 실제 주소로 확장

use futures::future::BoxFuture;
use tracing::warn;

use super::address::ServerAddress;

/// 호스트명 해석기
///
/// 부트스트랩 호스트명을 해석해 재발견이 시도할 주소 목록을 돌려줍니다.
pub trait HostNameResolver: Send + Sync {
    /// 주소 해석
    fn resolve<'a>(&'a self, address: &'a ServerAddress) -> BoxFuture<'a, Vec<ServerAddress>>;
}

// ============================================================================
// DnsHostNameResolver - DNS 해석기
// ============================================================================

/// DNS 기반 해석기
///
/// 해석된 모든 IP가 부트스트랩 포트를 유지합니다. 해석에 실패하면 경고를
/// 남기고 원래 주소를 그대로 돌려줍니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct DnsHostNameResolver;

impl DnsHostNameResolver {
    /// 새 해석기 생성
    pub fn new() -> Self {
        Self
    }
}

impl HostNameResolver for DnsHostNameResolver {
    fn resolve<'a>(&'a self, address: &'a ServerAddress) -> BoxFuture<'a, Vec<ServerAddress>> {
        Box::pin(async move {
            match tokio::net::lookup_host((address.host.as_str(), address.port)).await {
                Ok(sockets) => {
                    let mut resolved: Vec<ServerAddress> = Vec::new();
                    for socket in sockets {
                        let candidate = ServerAddress::new(socket.ip().to_string(), address.port);
                        if !resolved.contains(&candidate) {
                            resolved.push(candidate);
                        }
                    }
                    if resolved.is_empty() {
                        vec![address.clone()]
                    } else {
                        resolved
                    }
                }
                Err(error) => {
                    warn!(address = %address, error = %error, "Failed to resolve host, using unresolved address");
                    vec![address.clone()]
                }
            }
        })
    }
}

// ============================================================================
// PassthroughResolver - 무변환 해석기
// ============================================================================

/// 무변환 해석기
///
/// 주소를 해석 없이 그대로 돌려줍니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughResolver;

impl PassthroughResolver {
    /// 새 해석기 생성
    pub fn new() -> Self {
        Self
    }
}

impl HostNameResolver for PassthroughResolver {
    fn resolve<'a>(&'a self, address: &'a ServerAddress) -> BoxFuture<'a, Vec<ServerAddress>> {
        let address = address.clone();
        Box::pin(async move { vec![address] })
    }
}
