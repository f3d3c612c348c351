//! Test harness: a fully wired gateway on a manual clock.

use std::sync::Arc;

use gateway_runtime::{Gateway, GatewayConfig, GatewayContainer};
use gw_03_processing::SyncReport;
use gw_04_document_service::RequestContext;
use shared_types::ManualTimeSource;

/// System id used by every scenario.
pub const SYSTEM: &str = "SYS1";

/// Unix time the manual clock starts at.
pub const START: u64 = 1_700_000_000;

pub struct TestGateway {
    pub gateway: Gateway,
    pub time: Arc<ManualTimeSource>,
}

impl TestGateway {
    pub fn new() -> Self {
        let config = GatewayConfig {
            system_id: SYSTEM.to_string(),
            ..Default::default()
        };
        Self::with_config(config)
    }

    pub fn with_config(config: GatewayConfig) -> Self {
        let time = Arc::new(ManualTimeSource::new(START));
        let container = GatewayContainer::with_time(config, time.clone());
        Self {
            gateway: Gateway::new(Arc::new(container)),
            time,
        }
    }

    pub fn container(&self) -> &Arc<GatewayContainer> {
        self.gateway.container()
    }

    pub fn ctx(&self, user: &str) -> RequestContext {
        RequestContext::new(user, SYSTEM)
    }

    /// Settle every open deal and transaction, then run one watcher pass.
    pub async fn settle(&self) -> SyncReport {
        let c = self.container();
        c.deals.settle_all();
        c.ledger.confirm_all();
        c.watcher.sync_once().await
    }
}

impl Default for TestGateway {
    fn default() -> Self {
        Self::new()
    }
}
