use guidedog_core::Command;
use std::io::Write;
use tokio::sync::mpsc::Receiver;

/// Console stand-in for the speech, vibration and notice devices.
///
/// Speech is last-message-wins: a new utterance interrupts the one before it,
/// and `StopSpeaking` clears it without a replacement.
pub struct ConsoleOutput<W: Write> {
    out: W,
    speaking: Option<String>,
}

impl<W: Write> ConsoleOutput<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            speaking: None,
        }
    }

    /// The utterance currently playing, if any.
    pub fn speaking(&self) -> Option<&str> {
        self.speaking.as_deref()
    }

    pub fn handle(&mut self, command: Command) -> std::io::Result<()> {
        match command {
            Command::Speak { text, rate } => {
                if let Some(previous) = self.speaking.take() {
                    tracing::debug!("Interrupting: {}", previous);
                }
                tracing::info!("Speak (x{:.1}): {}", rate, text);
                writeln!(self.out, "[speak x{rate:.1}] {text}")?;
                self.speaking = Some(text);
            }
            Command::StopSpeaking => {
                if self.speaking.take().is_some() {
                    writeln!(self.out, "[silence]")?;
                }
            }
            Command::Vibrate(pattern) => {
                let millis = pattern
                    .as_millis()
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join("-");
                tracing::info!("Vibrate {:?}: {}", pattern, millis);
                writeln!(self.out, "[vibrate] {millis}")?;
            }
            Command::Notify(message) => {
                tracing::warn!("Notice: {}", message);
                writeln!(self.out, "[notice] {message}")?;
            }
            Command::ThreatChanged(state) => {
                tracing::debug!("Threat state: {:?}", state);
                if state.warning_text.is_empty() {
                    writeln!(self.out, "[threat {}]", state.level)?;
                } else {
                    writeln!(self.out, "[threat {}] {}", state.level, state.warning_text)?;
                }
            }
        }
        self.out.flush()
    }

    /// Executes commands until every sender is gone.
    pub async fn run(mut self, mut commands: Receiver<Command>) {
        while let Some(command) = commands.recv().await {
            if let Err(e) = self.handle(command) {
                tracing::error!("Failed to write output: {}", e);
            }
        }
        tracing::debug!("Command channel closed");
    }
}
