use std::sync::Arc;

use occasio_directory::UserDirectory;
use occasio_queue::QueueTransport;
use occasio_store::MessageLogStore;

/// Process-wide handles the scheduler triad reads and writes (§5
/// AMBIENT: "constructed once in `occasio-server::main`...passed down by
/// reference or clone").
#[derive(Clone)]
pub struct SchedulerDeps {
    pub store: MessageLogStore,
    pub directory: Arc<dyn UserDirectory>,
    pub queue: Arc<dyn QueueTransport>,
}
