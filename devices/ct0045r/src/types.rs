use std::fmt;

/// Meaning of a recognized host command.
///
/// Several table rows share a meaning because hosts terminate lines with
/// either `\r` or `\n`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// `~#`, answered with the model string on its second occurrence
    Identify,
    /// Answered with the line configuration string
    ReadConfig,
    /// Tilt/threshold query carrying one parameter byte
    Tilt,
    /// Start streaming
    Start,
    /// Stop streaming
    Stop,
    SelfTest,
    /// Mode and format settings, acknowledged without a reply
    Setting,
}

impl Command {
    /// Whether the tablet writes anything back for this command
    pub fn has_reply(&self) -> bool {
        matches!(self, Command::Identify | Command::ReadConfig | Command::Tilt)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Command::Identify => "identify",
            Command::ReadConfig => "read-config",
            Command::Tilt => "tilt",
            Command::Start => "start",
            Command::Stop => "stop",
            Command::SelfTest => "self-test",
            Command::Setting => "setting",
        })
    }
}
