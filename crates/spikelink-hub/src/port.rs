use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HubError;

/// A device port on the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Port {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Port {
    pub const ALL: [Port; 6] = [Port::A, Port::B, Port::C, Port::D, Port::E, Port::F];

    pub fn letter(self) -> char {
        match self {
            Port::A => 'A',
            Port::B => 'B',
            Port::C => 'C',
            Port::D => 'D',
            Port::E => 'E',
            Port::F => 'F',
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for Port {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next().map(|c| c.to_ascii_uppercase()), chars.next()) {
            (Some(letter), None) => Port::ALL
                .into_iter()
                .find(|port| port.letter() == letter)
                .ok_or_else(|| HubError::InvalidPort(s.to_string())),
            _ => Err(HubError::InvalidPort(s.to_string())),
        }
    }
}

/// One of the hub's face buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonId {
    Left,
    Right,
    Center,
}

impl ButtonId {
    pub const ALL: [ButtonId; 3] = [ButtonId::Left, ButtonId::Right, ButtonId::Center];

    /// Attribute name under `hub.button`.
    pub fn as_str(self) -> &'static str {
        match self {
            ButtonId::Left => "left",
            ButtonId::Right => "right",
            ButtonId::Center => "center",
        }
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ButtonId {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ButtonId::ALL
            .into_iter()
            .find(|button| button.as_str() == wanted)
            .ok_or_else(|| HubError::InvalidButton(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_parses_case_insensitively() {
        assert_eq!("a".parse::<Port>().unwrap(), Port::A);
        assert_eq!(" F ".parse::<Port>().unwrap(), Port::F);
        assert!("G".parse::<Port>().is_err());
        assert!("AB".parse::<Port>().is_err());
        assert!("".parse::<Port>().is_err());
    }

    #[test]
    fn button_round_trips_through_str() {
        for button in ButtonId::ALL {
            assert_eq!(button.to_string().parse::<ButtonId>().unwrap(), button);
        }
        assert!(matches!(
            "middle".parse::<ButtonId>(),
            Err(HubError::InvalidButton(_))
        ));
    }
}
