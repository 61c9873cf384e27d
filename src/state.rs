use std::sync::Arc;

use crate::config::Config;
use crate::services::{AddressResolver, Notifier};
use crate::store::Store;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub resolver: Arc<dyn AddressResolver>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<Config>,
}
