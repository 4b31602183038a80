use std::sync::Arc;

use crate::config::AppConfig;
use crate::ingest::JudgeResultIngestor;
use crate::realtime::RealtimeGateway;
use crate::store::ResultStore;
use crate::utils::jwt::TokenAuthenticator;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ResultStore>,
    pub ingestor: Arc<JudgeResultIngestor>,
    pub gateway: Arc<RealtimeGateway>,
    pub authenticator: TokenAuthenticator,
}

impl AppState {
    /// Wire the pipeline: store -> ingestor -> gateway.
    pub fn new(config: AppConfig, store: Arc<dyn ResultStore>) -> Self {
        let ingestor = Arc::new(JudgeResultIngestor::new(Arc::clone(&store)));
        let gateway = RealtimeGateway::new(config.realtime.clone(), Arc::clone(&ingestor));
        let authenticator = TokenAuthenticator::new(config.auth.jwt_secret.as_bytes());

        Self {
            config: Arc::new(config),
            store,
            ingestor,
            gateway,
            authenticator,
        }
    }

    pub fn shutdown(&self) {
        self.gateway.shutdown();
    }
}
