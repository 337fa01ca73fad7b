//! 클러스터 구성 프로바이더
//!
//! 라우터에서 라우팅 프로시저를 호출해 구성을 가져옵니다.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use crate::clock::Clock;
use crate::error::{RoutingError, RoutingResult};
use crate::spi::{Connection, ServerVersion};

use super::composition::ClusterComposition;
use super::settings::RoutingContext;

/// 레거시 라우팅 프로시저 (3.2 미만)
pub const GET_SERVERS: &str = "dbms.cluster.routing.getServers";
/// 컨텍스트 기반 라우팅 프로시저 (3.2 이상)
pub const GET_ROUTING_TABLE: &str = "dbms.cluster.routing.getRoutingTable";
/// 라우팅 컨텍스트 파라미터 이름
pub const GET_ROUTING_TABLE_PARAM: &str = "context";

/// 클러스터 구성 프로바이더
///
/// 라우터로 추정되는 열린 연결에서 수락된 [`ClusterComposition`]을
/// 가져오거나 실패를 돌려줍니다.
pub trait ClusterCompositionProvider: Send + Sync {
    /// 연결에서 클러스터 구성 조회
    fn get_cluster_composition<'a>(
        &'a self,
        connection: &'a mut dyn Connection,
    ) -> BoxFuture<'a, RoutingResult<ClusterComposition>>;
}

// ============================================================================
// RoutingProcedureRunner - 프로시저 실행기
// ============================================================================

/// 라우팅 프로시저 실행기
///
/// 서버 버전에 따라 레거시 또는 컨텍스트 기반 프로시저를 호출하고
/// 결과 레코드를 검증합니다.
#[derive(Debug)]
pub struct RoutingProcedureRunner {
    context: RoutingContext,
    clock: Arc<dyn Clock>,
}

impl RoutingProcedureRunner {
    /// 새 실행기 생성
    pub fn new(context: RoutingContext, clock: Arc<dyn Clock>) -> Self {
        Self { context, clock }
    }

    fn reclassify(error: RoutingError, connection_address: String) -> RoutingError {
        // 프로시저가 없는 서버는 라우터가 아님
        if error.is_procedure_not_found() {
            RoutingError::protocol(format!(
                "Server at {} does not support routing",
                connection_address
            ))
        } else {
            error
        }
    }
}

impl ClusterCompositionProvider for RoutingProcedureRunner {
    fn get_cluster_composition<'a>(
        &'a self,
        connection: &'a mut dyn Connection,
    ) -> BoxFuture<'a, RoutingResult<ClusterComposition>> {
        Box::pin(async move {
            let address = connection.address().to_string();

            let result = if connection.server_version() >= ServerVersion::V3_2_0 {
                let mut parameters = HashMap::new();
                parameters.insert(
                    GET_ROUTING_TABLE_PARAM.to_string(),
                    self.context.as_value(),
                );
                connection.run_procedure(GET_ROUTING_TABLE, parameters).await
            } else {
                connection.run_procedure(GET_SERVERS, HashMap::new()).await
            };

            let records = result.map_err(|error| Self::reclassify(error, address.clone()))?;

            if records.len() != 1 {
                return Err(RoutingError::protocol(format!(
                    "Expected exactly one record from routing procedure, got {}",
                    records.len()
                )));
            }

            let composition = ClusterComposition::parse(&records[0], self.clock.millis())?;

            if !composition.has_routers() {
                return Err(RoutingError::protocol(format!(
                    "Routing record from {} contains no routers",
                    address
                )));
            }

            debug!(address = %address, composition = %composition, "Got cluster composition");
            Ok(composition)
        })
    }
}
