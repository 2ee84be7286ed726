use std::sync::Arc;

use crate::{
    auth::{HandoffStore, OAuthFlowService},
    social::RobloxSocialClient,
};

#[derive(Clone)]
pub struct AppState {
    flow: Arc<OAuthFlowService>,
    social: Arc<RobloxSocialClient>,
}

impl AppState {
    pub fn new(flow: Arc<OAuthFlowService>, social: Arc<RobloxSocialClient>) -> Self {
        Self { flow, social }
    }

    pub fn flow(&self) -> Arc<OAuthFlowService> {
        Arc::clone(&self.flow)
    }

    pub fn handoff(&self) -> Arc<HandoffStore> {
        self.flow.store()
    }

    pub fn social(&self) -> Arc<RobloxSocialClient> {
        Arc::clone(&self.social)
    }
}
