//! Record poller
//!
//! Periodically pulls the simulation manager records of every configured
//! infrastructure, downloads code for records it has not seen yet, lets the
//! record handler update each local snapshot and pushes the changes back.
//! All requests are issued one after another.

use anyhow::{Context, Result};
use scalarm_client::{ExperimentManagerClient, RecordSync, SimulationManagerRecord};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{self, Duration};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::service::RecordHandler;

/// A record being monitored
struct TrackedRecord {
    sync: RecordSync,
    /// Whether the code archive has been stored locally
    has_code: bool,
}

/// Counters for a single poll pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    /// Records returned by the experiment manager
    pub fetched: usize,
    /// Code archives written
    pub downloaded: usize,
    /// Update requests accepted
    pub updated: usize,
    /// Failed operations (fetches, downloads, handler runs, updates) and
    /// records skipped for lacking an id
    pub failed: usize,
}

/// Poller that keeps local snapshots in step with the experiment manager
pub struct RecordPoller {
    config: Config,
    client: ExperimentManagerClient,
    handler: Arc<dyn RecordHandler>,
    poll_interval: Duration,
    /// Tracked records, keyed by infrastructure then record id
    tracked: HashMap<String, HashMap<String, TrackedRecord>>,
}

impl RecordPoller {
    /// Creates a new record poller
    pub fn new(
        config: Config,
        client: ExperimentManagerClient,
        handler: Arc<dyn RecordHandler>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            config,
            client,
            handler,
            poll_interval,
            tracked: HashMap::new(),
        }
    }

    /// Number of records currently tracked for `infrastructure`
    #[allow(dead_code)]
    pub fn tracked_count(&self, infrastructure: &str) -> usize {
        self.tracked.get(infrastructure).map_or(0, HashMap::len)
    }

    /// Starts the polling loop
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting record poller (interval: {:?})", self.poll_interval);

        let mut interval = time::interval(self.poll_interval);

        loop {
            interval.tick().await;

            debug!("Polling experiment manager");

            match self.poll_once().await {
                Ok(summary) => {
                    if summary.updated > 0 || summary.downloaded > 0 || summary.failed > 0 {
                        info!(
                            "Poll finished: {} fetched, {} downloaded, {} updated, {} failed",
                            summary.fetched, summary.downloaded, summary.updated, summary.failed
                        );
                    }
                }
                Err(e) => {
                    error!("Error during poll cycle: {:#}", e);
                }
            }
        }
    }

    /// Performs a single poll pass over all infrastructures
    ///
    /// Resolves the experiment manager first if that has not happened yet.
    /// A failing infrastructure or record is logged and counted, and does
    /// not stop the rest of the pass.
    pub async fn poll_once(&mut self) -> Result<PollSummary> {
        if self.client.service_address().is_none() {
            self.client
                .locate(&self.config.information_service_address)
                .await
                .context("Failed to locate experiment manager")?;
        }

        let mut summary = PollSummary::default();

        for infrastructure in self.config.infrastructures.clone() {
            match self.client.fetch_records(&infrastructure).await {
                Ok(records) => {
                    debug!("{} record(s) for {}", records.len(), infrastructure);
                    summary.fetched += records.len();
                    self.process_records(&infrastructure, records, &mut summary).await;
                }
                Err(e) => {
                    warn!("Failed to fetch records for {}: {}", infrastructure, e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn process_records(
        &mut self,
        infrastructure: &str,
        records: Vec<SimulationManagerRecord>,
        summary: &mut PollSummary,
    ) {
        let mut previous = self.tracked.remove(infrastructure).unwrap_or_default();
        let mut current = HashMap::with_capacity(records.len());

        for record in records {
            if record.id.is_empty() {
                warn!("Skipping record without id on {}", infrastructure);
                summary.failed += 1;
                continue;
            }

            let id = record.id.clone();
            let mut tracked = match previous.remove(&id) {
                Some(mut tracked) => {
                    tracked.sync.refresh(record);
                    tracked
                }
                None => {
                    info!("Tracking new record {} on {}", id, infrastructure);
                    TrackedRecord {
                        sync: RecordSync::new(record),
                        has_code: false,
                    }
                }
            };

            self.process_record(infrastructure, &mut tracked, summary).await;
            current.insert(id, tracked);
        }

        for id in previous.keys() {
            info!("Record {} no longer reported on {}, dropping", id, infrastructure);
        }

        self.tracked.insert(infrastructure.to_string(), current);
    }

    async fn process_record(
        &self,
        infrastructure: &str,
        tracked: &mut TrackedRecord,
        summary: &mut PollSummary,
    ) {
        let id = tracked.sync.id().to_string();

        if !tracked.has_code {
            match self.client.fetch_code(&id, infrastructure).await {
                Ok(_) => {
                    tracked.has_code = true;
                    summary.downloaded += 1;
                }
                Err(e) => {
                    warn!("Failed to download code for {}: {}", id, e);
                    summary.failed += 1;
                }
            }
        }

        if let Err(e) = self
            .handler
            .handle(infrastructure, tracked.sync.current_mut())
        {
            warn!("Handler failed for record {}: {:#}", id, e);
            summary.failed += 1;
            return;
        }

        match self.client.sync(&mut tracked.sync, infrastructure).await {
            Ok(true) => {
                info!("Pushed update for record {}", id);
                summary.updated += 1;
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Failed to update record {}: {}", id, e);
                summary.failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Form, Path, Query, State};
    use axum::http::StatusCode;
    use axum::routing::{get, put};
    use axum::{Json, Router};
    use scalarm_client::Credentials;
    use std::sync::Mutex;

    /// Marks running records as done
    struct FinishRunning;

    impl RecordHandler for FinishRunning {
        fn handle(&self, _: &str, record: &mut SimulationManagerRecord) -> Result<()> {
            if record.state == "running" {
                record.state = "done".to_string();
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct Service {
        /// Address the directory hands out, which is this server itself
        address: Mutex<String>,
        /// Records served per infrastructure; missing infrastructures get status "error"
        records: Mutex<HashMap<String, serde_json::Value>>,
        downloads: Mutex<Vec<String>>,
        updates: Mutex<Vec<(String, String)>>,
    }

    async fn experiment_managers(State(service): State<Arc<Service>>) -> Json<Vec<String>> {
        Json(vec![service.address.lock().unwrap().clone()])
    }

    async fn list(
        State(service): State<Arc<Service>>,
        Query(query): Query<HashMap<String, String>>,
    ) -> Json<serde_json::Value> {
        let records = service.records.lock().unwrap();
        match records.get(&query["infrastructure"]) {
            Some(list) => Json(serde_json::json!({ "status": "ok", "sm_records": list })),
            None => Json(serde_json::json!({ "status": "error" })),
        }
    }

    async fn code(State(service): State<Arc<Service>>, Path(id): Path<String>) -> Vec<u8> {
        service.downloads.lock().unwrap().push(id);
        b"PK".to_vec()
    }

    async fn update(
        State(service): State<Arc<Service>>,
        Path(id): Path<String>,
        Form(form): Form<HashMap<String, String>>,
    ) -> StatusCode {
        service
            .updates
            .lock()
            .unwrap()
            .push((id, form["parameters"].clone()));
        StatusCode::OK
    }

    async fn spawn_service() -> (String, Arc<Service>) {
        let service = Arc::new(Service::default());
        let router = Router::new()
            .route("/experiment_managers", get(experiment_managers))
            .route("/simulation_managers", get(list))
            .route("/simulation_managers/{id}/code", get(code))
            .route("/simulation_managers/{id}", put(update))
            .with_state(service.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        *service.address.lock().unwrap() = address.clone();
        (address, service)
    }

    fn poller(address: &str, infrastructures: &[&str], sources: &std::path::Path) -> RecordPoller {
        let config: Config = serde_json::from_value(serde_json::json!({
            "InformationServiceAddress": address,
            "Login": "monitor",
            "Password": "secret",
            "Infrastructures": infrastructures,
            "ScalarmScheme": "http"
        }))
        .unwrap();
        let client = ExperimentManagerClient::new(Credentials::new("monitor", "secret"), "http")
            .unwrap()
            .with_sources_dir(sources);

        RecordPoller::new(config, client, Arc::new(FinishRunning), Duration::from_secs(1))
    }

    fn set_records(service: &Service, infrastructure: &str, records: serde_json::Value) {
        service
            .records
            .lock()
            .unwrap()
            .insert(infrastructure.to_string(), records);
    }

    #[tokio::test]
    async fn test_poll_once_downloads_and_updates() {
        let (address, service) = spawn_service().await;
        let sources = tempfile::tempdir().unwrap();
        set_records(
            &service,
            "qsub",
            serde_json::json!([
                { "_id": "sm-1", "state": "running" },
                { "_id": "sm-2", "state": "created" }
            ]),
        );

        let mut poller = poller(&address, &["qsub"], sources.path());
        let summary = poller.poll_once().await.unwrap();

        assert_eq!(
            summary,
            PollSummary {
                fetched: 2,
                downloaded: 2,
                updated: 1,
                failed: 0
            }
        );
        assert_eq!(poller.tracked_count("qsub"), 2);
        assert!(sources.path().join("sources_sm-1.zip").exists());
        assert_eq!(
            *service.updates.lock().unwrap(),
            vec![("sm-1".to_string(), r#"{"state":"done"}"#.to_string())]
        );
    }

    #[tokio::test]
    async fn test_code_is_downloaded_once() {
        let (address, service) = spawn_service().await;
        let sources = tempfile::tempdir().unwrap();
        set_records(&service, "qsub", serde_json::json!([{ "_id": "sm-1", "state": "done" }]));

        let mut poller = poller(&address, &["qsub"], sources.path());
        poller.poll_once().await.unwrap();
        let second = poller.poll_once().await.unwrap();

        assert_eq!(second.downloaded, 0);
        assert_eq!(second.updated, 0);
        assert_eq!(*service.downloads.lock().unwrap(), vec!["sm-1".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_infrastructure_does_not_stop_pass() {
        let (address, service) = spawn_service().await;
        let sources = tempfile::tempdir().unwrap();
        set_records(&service, "qsub", serde_json::json!([{ "_id": "sm-1", "state": "done" }]));

        let mut poller = poller(&address, &["broken", "qsub"], sources.path());
        let summary = poller.poll_once().await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.fetched, 1);
        assert_eq!(poller.tracked_count("qsub"), 1);
        assert_eq!(poller.tracked_count("broken"), 0);
    }

    #[tokio::test]
    async fn test_vanished_records_are_dropped() {
        let (address, service) = spawn_service().await;
        let sources = tempfile::tempdir().unwrap();
        set_records(
            &service,
            "qsub",
            serde_json::json!([{ "_id": "sm-1" }, { "_id": "sm-2" }]),
        );

        let mut poller = poller(&address, &["qsub"], sources.path());
        poller.poll_once().await.unwrap();
        assert_eq!(poller.tracked_count("qsub"), 2);

        set_records(&service, "qsub", serde_json::json!([{ "_id": "sm-2" }]));
        poller.poll_once().await.unwrap();
        assert_eq!(poller.tracked_count("qsub"), 1);
    }

    #[tokio::test]
    async fn test_records_without_id_are_skipped() {
        let (address, service) = spawn_service().await;
        let sources = tempfile::tempdir().unwrap();
        set_records(
            &service,
            "qsub",
            serde_json::json!([
                { "state": "running" },
                { "_id": null, "state": "running" },
                { "_id": "sm-1", "state": "done" }
            ]),
        );

        let mut poller = poller(&address, &["qsub"], sources.path());
        let summary = poller.poll_once().await.unwrap();

        assert_eq!(summary.fetched, 3);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.updated, 0);
        assert_eq!(poller.tracked_count("qsub"), 1);
        assert_eq!(*service.downloads.lock().unwrap(), vec!["sm-1".to_string()]);
        assert!(service.updates.lock().unwrap().is_empty());
        assert!(!sources.path().join("sources_.zip").exists());
    }

    #[tokio::test]
    async fn test_unreachable_directory_fails_pass() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);
        let sources = tempfile::tempdir().unwrap();

        let mut poller = poller(&address, &["qsub"], sources.path());
        assert!(poller.poll_once().await.is_err());
    }
}
