//! 전송 계층 계약
//!
//! 라우팅 코어가 소비하는 연결/연결 풀 인터페이스

use std::collections::HashMap;

use futures::future::BoxFuture;

use crate::error::RoutingResult;
use crate::routing::ServerAddress;

use super::record::{Record, Value};
use super::version::ServerVersion;

/// 열린 서버 연결
///
/// 실제 와이어 프로토콜 구현이 제공하는 최소 능력만 노출합니다.
/// 라우팅 코어는 프로시저 호출과 서버 버전 조회만 사용합니다.
pub trait Connection: Send {
    /// 연결된 서버 주소
    fn address(&self) -> &ServerAddress;

    /// 서버 버전
    fn server_version(&self) -> ServerVersion;

    /// 서버 프로시저 실행
    ///
    /// 결과 레코드 목록을 반환합니다. 서버 에러는 `RoutingError`로
    /// 변환되어 전파됩니다.
    fn run_procedure<'a>(
        &'a mut self,
        procedure: &'a str,
        parameters: HashMap<String, Value>,
    ) -> BoxFuture<'a, RoutingResult<Vec<Record>>>;
}

/// 서버별 연결 풀
///
/// 스레드 안전해야 하며, 동시 호출이 가능합니다.
pub trait ConnectionPool: Send + Sync {
    /// 주소에 대한 연결 획득
    fn acquire<'a>(
        &'a self,
        address: &'a ServerAddress,
    ) -> BoxFuture<'a, RoutingResult<Box<dyn Connection>>>;

    /// 주소의 유휴/열린 연결 제거
    fn purge(&self, address: &ServerAddress);

    /// 주소의 활성 연결 수 (best-effort)
    fn active_connections(&self, address: &ServerAddress) -> usize;
}
