use std::sync::Arc;

use fyp_core::{Dispatcher, GroupService, RequestService};
use fyp_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub requests: RequestService,
    pub groups: GroupService,
    pub jwt_secret: String,
    /// Bearer token the profile provider uses on `/sync`. Sync is disabled when unset.
    pub sync_token: Option<String>,
}

impl AppStateInner {
    pub fn new(
        db: Arc<Database>,
        dispatcher: Dispatcher,
        jwt_secret: String,
        sync_token: Option<String>,
    ) -> AppState {
        let sink = Arc::new(dispatcher);
        Arc::new(Self {
            requests: RequestService::new(db.clone(), sink.clone()),
            groups: GroupService::new(db.clone(), sink),
            db,
            jwt_secret,
            sync_token,
        })
    }
}
