use crate::queue::DetectionQueue;

#[derive(Clone)]
pub struct AppState {
    pub queue: DetectionQueue,
}

impl AppState {
    pub fn new(queue: DetectionQueue) -> AppState {
        AppState { queue }
    }
}
