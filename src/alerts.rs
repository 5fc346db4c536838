use log::debug;

/// User-facing notification channel.
pub trait AlertSink: Send {
    fn notify(&mut self, message: &str);
    fn notify_error(&mut self, message: &str);
    fn clear_error(&mut self) {}
}

/// Prints alerts to the terminal the command loop runs in.
#[derive(Debug, Default)]
pub struct ConsoleAlerts {
    error_shown: bool,
}

impl ConsoleAlerts {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AlertSink for ConsoleAlerts {
    fn notify(&mut self, message: &str) {
        debug!("alert: {message}");
        println!("  {message}");
    }

    fn notify_error(&mut self, message: &str) {
        debug!("error alert: {message}");
        eprintln!("  ! {message}");
        self.error_shown = true;
    }

    fn clear_error(&mut self) {
        if std::mem::take(&mut self.error_shown) {
            debug!("error alert cleared");
        }
    }
}
