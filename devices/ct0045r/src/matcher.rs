//! Byte-at-a-time recognizer for host commands.

use tracing::debug;

use crate::abi::{CommandPattern, COMMANDS, MAX_QUERY_LEN};
use crate::types::Command;

/// A recognized command together with the bytes that matched it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    index: usize,
    query: [u8; MAX_QUERY_LEN],
    len: usize,
}

impl Match {
    /// Row of the command table that matched
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pattern(&self) -> &'static CommandPattern {
        &COMMANDS[self.index]
    }

    pub fn command(&self) -> Command {
        self.pattern().command
    }

    /// The query bytes as received, including any wildcard positions
    pub fn bytes(&self) -> &[u8] {
        &self.query[..self.len]
    }
}

/// Accumulates unmatched input until it forms a command.
///
/// The query never exceeds `MAX_QUERY_LEN`. When it fills up without a match
/// it is discarded so the next byte starts a fresh command.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    query: [u8; MAX_QUERY_LEN],
    len: usize,
    resyncs: u64,
}

impl Matcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns the command once its last byte arrives.
    pub fn feed(&mut self, byte: u8) -> Option<Match> {
        self.query[self.len] = byte;
        self.len += 1;

        let query = &self.query[..self.len];
        if let Some(index) = COMMANDS.iter().position(|p| p.matches(query)) {
            let found = Match {
                index,
                query: self.query,
                len: self.len,
            };
            self.len = 0;
            return Some(found);
        }

        if self.len == MAX_QUERY_LEN {
            debug!(query = ?self.query, "no command matched, resynchronizing");
            self.len = 0;
            self.resyncs += 1;
        }
        None
    }

    /// Bytes received since the last command or resync
    pub fn query(&self) -> &[u8] {
        &self.query[..self.len]
    }

    pub fn is_idle(&self) -> bool {
        self.len == 0
    }

    /// Times the query was discarded without a match
    pub fn resyncs(&self) -> u64 {
        self.resyncs
    }

    pub fn reset(&mut self) {
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::PatternByte;

    fn feed_all(matcher: &mut Matcher, bytes: &[u8]) -> Vec<Match> {
        bytes.iter().filter_map(|b| matcher.feed(*b)).collect()
    }

    #[test]
    fn every_pattern_is_recognized() {
        for (index, pattern) in COMMANDS.iter().enumerate() {
            for wildcard in [0x00, b'@', 0x5f, 0xff] {
                let bytes: Vec<u8> = pattern
                    .bytes
                    .iter()
                    .map(|p| match p {
                        PatternByte::Lit(b) => *b,
                        PatternByte::Any => wildcard,
                    })
                    .collect();

                let mut matcher = Matcher::new();
                let (last, head) = bytes.split_last().unwrap();
                for b in head {
                    assert_eq!(matcher.feed(*b), None, "{} matched early", pattern.name);
                }
                let found = matcher.feed(*last).expect(pattern.name);
                assert_eq!(found.index(), index);
                assert_eq!(found.bytes(), bytes.as_slice());
                assert!(matcher.query().is_empty());
            }
        }
    }

    #[test]
    fn unmatched_run_resyncs() {
        let mut matcher = Matcher::new();
        let junk = [b'x'; MAX_QUERY_LEN * 3 + 2];
        for (i, b) in junk.iter().enumerate() {
            assert_eq!(matcher.feed(*b), None);
            assert!(matcher.query().len() < MAX_QUERY_LEN);
            assert_eq!(matcher.query().len(), (i + 1) % MAX_QUERY_LEN);
        }
        assert_eq!(matcher.resyncs(), 3);

        // the session recovers once the junk is flushed
        matcher.reset();
        let found = feed_all(&mut matcher, b"~#");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].command(), Command::Identify);
    }

    #[test]
    fn back_to_back_commands() {
        let mut matcher = Matcher::new();
        let found = feed_all(&mut matcher, b"~#RE\nTS?\x95SP\r");
        let commands: Vec<_> = found.iter().map(Match::command).collect();
        assert_eq!(
            commands,
            [Command::Identify, Command::ReadConfig, Command::Tilt, Command::Stop]
        );
        assert_eq!(found[2].bytes(), b"TS?\x95");
    }

    #[test]
    fn same_length_only() {
        // "\nSP\n" must not be taken for "SP\n" after the leading newline
        let mut matcher = Matcher::new();
        let found = feed_all(&mut matcher, b"\nSP\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].pattern().name, "\\nSP\\n");
    }
}
