// Audio sinks - log the text, or hand it to an external speech command
use crate::application::announcer::AnnouncementSink;
use tokio::process::Command;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogAnnouncer;

impl AnnouncementSink for LogAnnouncer {
    fn announce(&self, text: &str) {
        tracing::info!(target: "announce", "{}", text);
    }
}

/// Runs `program args... <text>` for every announcement without waiting for it
#[derive(Debug, Clone)]
pub struct CommandAnnouncer {
    program: String,
    args: Vec<String>,
}

impl CommandAnnouncer {
    /// `None` when the command line is empty
    pub fn from_command_line(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl AnnouncementSink for CommandAnnouncer {
    fn announce(&self, text: &str) {
        tracing::info!(target: "announce", "{}", text);
        match Command::new(&self.program).args(&self.args).arg(text).spawn() {
            Ok(_child) => {}
            Err(e) => tracing::warn!("Failed to run speech command {}: {}", self.program, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_split() {
        assert!(CommandAnnouncer::from_command_line(&[]).is_none());

        let cmd = vec!["espeak-ng".to_string(), "-v".to_string(), "id".to_string()];
        let announcer = CommandAnnouncer::from_command_line(&cmd).unwrap();
        assert_eq!(announcer.program, "espeak-ng");
        assert_eq!(announcer.args, vec!["-v", "id"]);
    }

    #[tokio::test]
    async fn test_missing_program_does_not_panic() {
        let announcer =
            CommandAnnouncer::from_command_line(&["/nonexistent/speak".to_string()]).unwrap();
        announcer.announce("UnitA naik ke 53.2 MW");
    }
}
