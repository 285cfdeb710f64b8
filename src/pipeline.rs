//! Wires adapters, store, dispatcher, scheduler and facade from a [`FeedConfig`].

use std::sync::Arc;

use axum::Router;

use crate::api::{create_router, AppState};
use crate::config::FeedConfig;
use crate::dispatch::{DispatchJob, Dispatcher, DownstreamSink, HttpSink};
use crate::facade::QueryFacade;
use crate::http::HttpClient;
use crate::ingest::providers::{NoaaProvider, UsgsProvider};
use crate::ingest::scheduler::Scheduler;
use crate::ingest::FetchJob;
use crate::snapshot::SnapshotStore;

pub struct Pipeline {
    pub store: Arc<SnapshotStore>,
    pub facade: QueryFacade,
    pub seismic: Arc<FetchJob>,
    pub cyclone: Arc<FetchJob>,
    pub scheduler: Scheduler,
}

impl Pipeline {
    /// Build with the HTTP sink pointed at `cfg.downstream.url`.
    pub fn build(cfg: &FeedConfig, client: Arc<dyn HttpClient>) -> Self {
        let sink = Arc::new(HttpSink::new(cfg.downstream.url.clone(), Arc::clone(&client)));
        Self::build_with_sink(cfg, client, sink)
    }

    pub fn build_with_sink(
        cfg: &FeedConfig,
        client: Arc<dyn HttpClient>,
        sink: Arc<dyn DownstreamSink>,
    ) -> Self {
        let store = Arc::new(SnapshotStore::new());

        let seismic = Arc::new(FetchJob::new(
            Arc::new(UsgsProvider::new(Arc::clone(&client), cfg.seismic.clone())),
            Arc::clone(&store),
        ));
        let cyclone = Arc::new(FetchJob::new(
            Arc::new(NoaaProvider::new(client, cfg.cyclone.clone())),
            Arc::clone(&store),
        ));
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&store), sink));
        let facade = QueryFacade::new(Arc::clone(&store), Arc::clone(&dispatcher));

        let mut scheduler = Scheduler::new();
        scheduler
            .register_with_warm_up(seismic.clone(), cfg.seismic_interval())
            .register_with_warm_up(cyclone.clone(), cfg.cyclone_interval())
            .register(
                Arc::new(DispatchJob::new(Arc::clone(&dispatcher))),
                cfg.dispatch_interval(),
            );

        Self {
            store,
            facade,
            seismic,
            cyclone,
            scheduler,
        }
    }

    pub fn router(&self) -> Router {
        create_router(AppState {
            facade: self.facade.clone(),
        })
    }
}
