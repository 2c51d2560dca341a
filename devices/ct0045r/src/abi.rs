//! Wire constants and the host command table.

use crate::types::Command;

/// Width of a command table row. The query buffer never grows past this.
pub const MAX_QUERY_LEN: usize = 6;

/// Length of every coordinate and tilt packet
pub const PACKET_LEN: usize = 7;

/// Offset of the parameter byte inside a tilt query
pub const TILT_PARAM_OFFSET: usize = 3;

/// Header of a tilt response
pub const TILT_HEADER: u8 = 0xa3;

/// Header bits of a coordinate packet
pub const POINTER_HEADER: u8 = 0xe0;

/// Byte a host may send on an idle line
pub const IDLE_FILLER: u8 = b'@';

/// Reply to the second identification query
pub const MODEL_STRING: &[u8; 18] = b"~#CT-0045R,V1.3-5,";

/// Reply to the configuration query
pub const CONFIG_STRING: &[u8; 8] = b"96,N,8,0";

/// Plug and play banner queued once when the tablet powers up
pub const BANNER: [u8; 61] = [
    0x5c, 0x39, 0x36, 0x2c, 0x4e, 0x2c, 0x38, 0x2c,
    0x31, 0x28, 0x01, 0x24, 0x57, 0x41, 0x43, 0x30,
    0x30, 0x34, 0x35, 0x5c, 0x5c, 0x50, 0x45, 0x4e, 0x5c,
    0x57, 0x41, 0x43, 0x30, 0x30, 0x30, 0x30, 0x5c,
    0x54, 0x61, 0x62, 0x6c, 0x65, 0x74, 0x0d, 0x0a,
    0x43, 0x54, 0x2d, 0x30, 0x30, 0x34, 0x35, 0x52,
    0x2c, 0x56, 0x31, 0x2e, 0x33, 0x2d, 0x35, 0x0d,
    0x0a, 0x45, 0x37, 0x29,
];

/// One position of a command pattern
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatternByte {
    Lit(u8),
    /// Matches any byte
    Any,
}

impl PatternByte {
    #[inline(always)]
    pub const fn matches(&self, byte: u8) -> bool {
        match self {
            PatternByte::Lit(b) => *b == byte,
            PatternByte::Any => true,
        }
    }
}

/// A host command the tablet recognizes
#[derive(Debug)]
pub struct CommandPattern {
    /// Printable form, for diagnostics only
    pub name: &'static str,
    pub command: Command,
    pub bytes: &'static [PatternByte],
}

impl CommandPattern {
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Full-length match only. A pattern never matches a prefix of a query.
    pub fn matches(&self, query: &[u8]) -> bool {
        self.bytes.len() == query.len()
            && self.bytes.iter().zip(query).all(|(p, b)| p.matches(*b))
    }

    pub fn has_wildcard(&self) -> bool {
        self.bytes.contains(&PatternByte::Any)
    }
}

macro_rules! pattern_byte {
    (_) => {
        PatternByte::Any
    };
    ($byte:expr) => {
        PatternByte::Lit($byte)
    };
}

macro_rules! impl_command_table {
    [$( $name:literal => $command:ident [ $( $byte:tt ),+ ]; )+] => {
        /// Recognized host commands, in match order.
        ///
        /// The table is prefix-unambiguous: no pattern can match a proper
        /// prefix of another pattern's input.
        pub static COMMANDS: &[CommandPattern] = &[
            $(
                CommandPattern {
                    name: $name,
                    command: Command::$command,
                    bytes: &[ $( pattern_byte!($byte) ),+ ],
                },
            )+
        ];
    };
}

impl_command_table![
    "\\nSP\\n" => Stop [b'\n', b'S', b'P', b'\n'];
    "~#" => Identify [b'~', b'#'];
    "\\nTE\\n" => SelfTest [b'\n', b'T', b'E', b'\n'];
    "RE\\n" => ReadConfig [b'R', b'E', b'\n'];
    "AS1\\n" => Setting [b'A', b'S', b'1', b'\n'];
    "IC1\\n" => Setting [b'I', b'C', b'1', b'\n'];
    "OC1\\n" => Setting [b'O', b'C', b'1', b'\n'];
    "IT2\\n" => Setting [b'I', b'T', b'2', b'\n'];
    "SU3\\n" => Setting [b'S', b'U', b'3', b'\n'];
    "PH1\\n" => Setting [b'P', b'H', b'1', b'\n'];
    "ST\\n" => Start [b'S', b'T', b'\n'];
    "SP\\r" => Stop [b'S', b'P', b'\r'];
    "TE\\r" => SelfTest [b'T', b'E', b'\r'];
    "SP\\n" => Stop [b'S', b'P', b'\n'];
    "#AL1\\r" => Setting [b'#', b'A', b'L', b'1', b'\r'];
    "ST\\r" => Start [b'S', b'T', b'\r'];
    // trailing parameter byte at TILT_PARAM_OFFSET
    "TS?<p>" => Tilt [b'T', b'S', b'?', _];
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_lengths_fit_query() {
        for pattern in COMMANDS {
            assert!(
                (2..=MAX_QUERY_LEN).contains(&pattern.len()),
                "{} has length {}",
                pattern.name,
                pattern.len()
            );
        }
    }

    #[test]
    fn single_wildcard_pattern_is_tilt() {
        let wild: Vec<_> = COMMANDS.iter().filter(|p| p.has_wildcard()).collect();
        assert_eq!(wild.len(), 1);
        assert_eq!(wild[0].command, Command::Tilt);
        assert_eq!(wild[0].bytes[TILT_PARAM_OFFSET], PatternByte::Any);
        // the parameter is the final byte of the query
        assert_eq!(TILT_PARAM_OFFSET, wild[0].len() - 1);
    }

    #[test]
    fn table_is_prefix_unambiguous() {
        for a in COMMANDS {
            for b in COMMANDS.iter().filter(|b| b.len() > a.len()) {
                let overlaps = a
                    .bytes
                    .iter()
                    .zip(b.bytes)
                    .all(|(x, y)| match (x, y) {
                        (PatternByte::Lit(x), PatternByte::Lit(y)) => x == y,
                        _ => true,
                    });
                assert!(!overlaps, "{} is a prefix of {}", a.name, b.name);
            }
        }
    }

    #[test]
    fn wire_strings() {
        assert_eq!(MODEL_STRING.len(), 18);
        assert_eq!(CONFIG_STRING.len(), 8);
        assert_eq!(&BANNER[41..56], b"CT-0045R,V1.3-5");
        assert_eq!(BANNER[60], b')');
    }
}
