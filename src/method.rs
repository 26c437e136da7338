use std::fmt;

/// How a command is delivered to the receiver.
///
/// The prefix word selects the command class on the wire. Bare commands
/// (`SETCH`, `FORCECH`, the empty status probe) carry no prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputMethod {
    /// No prefix: the verb is a top-level protocol command.
    Unspecified,
    /// Simulated remote-control button press.
    IrCode,
    /// Simulated keyboard key press.
    Keyboard,
    /// Jump straight to a named screen.
    Teleport,
}

impl InputMethod {
    /// Wire prefix word, empty for [`InputMethod::Unspecified`].
    pub fn as_prefix(self) -> &'static str {
        match self {
            Self::Unspecified => "",
            Self::IrCode => "IRCODE",
            Self::Keyboard => "KEYBOARD",
            Self::Teleport => "TELEPORT",
        }
    }
}

impl fmt::Display for InputMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => write!(f, "BARE"),
            other => write!(f, "{}", other.as_prefix()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_words() {
        assert_eq!(InputMethod::Unspecified.as_prefix(), "");
        assert_eq!(InputMethod::IrCode.as_prefix(), "IRCODE");
        assert_eq!(InputMethod::Keyboard.as_prefix(), "KEYBOARD");
        assert_eq!(InputMethod::Teleport.as_prefix(), "TELEPORT");
    }

    #[test]
    fn display_names_bare_commands() {
        assert_eq!(InputMethod::Unspecified.to_string(), "BARE");
        assert_eq!(InputMethod::Teleport.to_string(), "TELEPORT");
    }
}
