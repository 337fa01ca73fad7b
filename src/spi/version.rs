//! Server version definitions.

use std::fmt;

/// 서버 버전
///
/// 서버 에이전트 문자열("Zeta4G/3.2.1" 또는 "3.2.1")에서 파싱한
/// 시맨틱 버전입니다. 라우팅 프로시저 선택에 사용됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerVersion {
    /// 메이저 버전
    pub major: u32,
    /// 마이너 버전
    pub minor: u32,
    /// 패치 버전
    pub patch: u32,
}

impl ServerVersion {
    /// 파라미터 기반 라우팅 프로시저가 도입된 버전
    pub const V3_2_0: ServerVersion = ServerVersion::new(3, 2, 0);

    /// 개발 버전 (파싱 불가능한 에이전트는 최신으로 취급)
    pub const IN_DEV: ServerVersion = ServerVersion::new(u32::MAX, u32::MAX, u32::MAX);

    /// 새 버전 생성
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// 에이전트 문자열에서 파싱
    ///
    /// "Product/x.y.z" 또는 "x.y.z" 형식을 허용하며, 빠진 구성요소는
    /// 0으로 채웁니다.
    pub fn parse(agent: &str) -> Option<Self> {
        let version = agent.rsplit('/').next()?.trim();
        if version.is_empty() {
            return None;
        }

        let mut parts = version.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            Some(p) => p.parse().ok()?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(p) => p.parse().ok()?,
            None => 0,
        };

        Some(Self::new(major, minor, patch))
    }

    /// 에이전트 문자열에서 파싱 (실패 시 최신 버전으로 취급)
    pub fn from_agent(agent: &str) -> Self {
        Self::parse(agent).unwrap_or(Self::IN_DEV)
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
