//! Navigation requests issued by the session layer

use tokio::sync::mpsc;

/// Something that can move the user to another path
///
/// The host router implements this; the session store and route guard only
/// ever ask for the login screen.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Forward navigation requests to whoever drives the router
impl Navigator for mpsc::UnboundedSender<String> {
    fn navigate(&self, path: &str) {
        if self.send(path.to_string()).is_err() {
            tracing::debug!(path, "Navigation receiver dropped");
        }
    }
}
