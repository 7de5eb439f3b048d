use std::sync::Arc;

use shopfloor_engine::OperationRunner;

#[derive(Clone)]
pub(crate) struct AppState {
    runner: Arc<dyn OperationRunner>,
}

impl AppState {
    pub fn new(runner: Arc<dyn OperationRunner>) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &dyn OperationRunner {
        self.runner.as_ref()
    }
}
