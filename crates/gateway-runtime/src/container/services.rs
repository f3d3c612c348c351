//! # Service Container
//!
//! Builds every subsystem and connects it to its adapters.
//!
//! ```text
//! InMemoryContentStore ─→ MeteredContentStore ─┐
//! InMemoryDealSettlement ──────────────────────┤
//! InMemoryLedger ─→ MeteredLedger ─→ IndexClient ─→ DocumentPipeline ─→ services
//! InMemoryKeystore ────────────────────────────┤
//! ProcessingTracker ───────────────────────────┘
//!        └───────────→ SettlementWatcher (deals + ledger)
//! ```
//!
//! The concrete in-memory adapters are kept alongside the wired ports so
//! tests and local runs can drive settlement by hand.

use std::sync::Arc;

use gw_01_content_storage::{ContentStore, InMemoryContentStore, InMemoryDealSettlement};
use gw_02_index_ledger::{InMemoryLedger, IndexClient, LedgerTransport};
use gw_03_processing::{ProcessingTracker, SettlementWatcher};
use gw_04_document_service::{
    CompositionService, DocumentPipeline, EhrService, InMemoryKeystore, QueryService,
    StatusService,
};
use shared_types::{SystemTimeSource, TimeSource};
use tracing::{info, instrument};

use crate::adapters::{MeteredContentStore, MeteredLedger};
use crate::container::config::GatewayConfig;

/// Custodian reported by the local deal settlement adapter.
const LOCAL_CUSTODIAN: &str = "f01000";

pub struct GatewayContainer {
    pub config: GatewayConfig,

    // =========================================================================
    // ADAPTERS
    // =========================================================================
    pub content: Arc<InMemoryContentStore>,
    pub deals: Arc<InMemoryDealSettlement>,
    pub ledger: Arc<InMemoryLedger>,
    pub keystore: Arc<InMemoryKeystore>,

    // =========================================================================
    // SUBSYSTEMS
    // =========================================================================
    pub tracker: Arc<ProcessingTracker>,
    pub pipeline: Arc<DocumentPipeline>,
    pub watcher: Arc<SettlementWatcher>,

    pub ehr: EhrService,
    pub status: StatusService,
    pub compositions: CompositionService,
    pub queries: QueryService,
}

impl GatewayContainer {
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_time(config, Arc::new(SystemTimeSource))
    }

    /// Build the container on a caller-supplied clock.
    #[instrument(name = "gateway_init", skip_all, fields(system_id = %config.system_id))]
    pub fn with_time(config: GatewayConfig, time: Arc<dyn TimeSource>) -> Self {
        info!("[gw-runtime] wiring adapters");
        let content = Arc::new(InMemoryContentStore::new());
        let deals = Arc::new(InMemoryDealSettlement::new(LOCAL_CUSTODIAN));
        let ledger = Arc::new(InMemoryLedger::new());
        let keystore = Arc::new(InMemoryKeystore::new());

        let metered_content: Arc<dyn ContentStore> =
            Arc::new(MeteredContentStore::new(content.clone()));
        let metered_ledger: Arc<dyn LedgerTransport> =
            Arc::new(MeteredLedger::new(ledger.clone()));

        info!("[gw-runtime] initializing subsystems");
        let tracker = Arc::new(ProcessingTracker::new(time.clone()));
        let pipeline = Arc::new(DocumentPipeline::new(
            IndexClient::new(metered_ledger.clone()),
            metered_content,
            deals.clone(),
            tracker.clone(),
            keystore.clone(),
            time,
            config.document_service(),
        ));
        let watcher = Arc::new(
            SettlementWatcher::new(tracker.clone(), deals.clone(), metered_ledger)
                .with_retention(config.request_retention()),
        );

        Self {
            ehr: EhrService::new(pipeline.clone()),
            status: StatusService::new(pipeline.clone()),
            compositions: CompositionService::new(pipeline.clone()),
            queries: QueryService::new(pipeline.clone()),
            config,
            content,
            deals,
            ledger,
            keystore,
            tracker,
            pipeline,
            watcher,
        }
    }
}
