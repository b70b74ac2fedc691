use crate::event::JobEvent;
use tokio::sync::mpsc;

pub type Sender<T> = mpsc::Sender<T>;
pub type Receiver<T> = mpsc::Receiver<T>;

/// Channel carrying extracted events from file tasks to the correlator task.
pub type EventSender = Sender<JobEvent>;
pub type EventReceiver = Receiver<JobEvent>;

/// Create a bounded channel with the specified buffer size.
///
/// Producers block once `buffer_size` events are waiting, so a slow sink
/// throttles file reading instead of growing memory.
pub fn create_channel<T>(buffer_size: usize) -> (Sender<T>, Receiver<T>) {
    mpsc::channel(buffer_size.max(1))
}
