use std::sync::Arc;

use crate::config::ConfigV1;
use crate::media::MediaHost;
use crate::store::Store;
use crate::tokens::TokenService;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigV1>,
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenService>,
    pub media: Arc<dyn MediaHost>,
}
