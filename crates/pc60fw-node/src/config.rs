use pc60fw_codec::Command;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Send the enable-notifications command right after subscribing.
    pub enable_notify_command: bool,
    /// Display brightness to set right after subscribing.
    pub brightness: Option<u8>,
    /// Bound of the transport-to-session event queue.
    pub event_queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enable_notify_command: false,
            brightness: None,
            event_queue_capacity: 256,
        }
    }
}

impl SessionConfig {
    /// Commands to send once the link is subscribed, in send order.
    pub fn startup_commands(&self) -> Vec<Command> {
        let mut commands = Vec::new();
        if self.enable_notify_command {
            commands.push(Command::EnableNotifications);
        }
        if let Some(level) = self.brightness {
            commands.push(Command::SetBrightness(level));
        }
        commands
    }
}
