use tokio::sync::watch;

/// Monotonic refresh tick. The panel host subscribes once and re-renders on
/// every change; commands bump the tick after any mutation that could move
/// the task list.
#[derive(Debug)]
pub struct RefreshSignal {
    sender: watch::Sender<u64>,
}

impl RefreshSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(0);
        Self { sender }
    }

    pub fn bump(&self) {
        self.sender.send_modify(|tick| *tick += 1);
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.sender.subscribe()
    }
}

impl Default for RefreshSignal {
    fn default() -> Self {
        Self::new()
    }
}
