use super::types::PID_ALL;
use crate::error::{CaptureError, Result};
use crate::utils::parse_int_auto;

/// Largest value accepted on the command line. It is [`PID_ALL`], not the
/// largest real PID (0x1fff), so the whole stream can be requested.
pub const MAX_PID: i64 = PID_ALL as i64;

/// Ordered list of PIDs to capture, as given by the user.
///
/// Duplicates are kept. The set is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidSet {
    pids: Vec<u16>,
}

impl PidSet {
    /// Parses command line tokens such as `256`, `0x100` or `0400`.
    pub fn parse<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pids = tokens
            .into_iter()
            .map(|token| parse_pid(token.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::from_pids(pids)
    }

    /// Builds a set from already numeric PIDs.
    pub fn from_pids(pids: Vec<u16>) -> Result<Self> {
        if pids.is_empty() {
            return Err(CaptureError::Usage("at least one PID is required".into()));
        }
        if let Some(pid) = pids.iter().find(|&&pid| pid as i64 > MAX_PID) {
            return Err(out_of_range(&pid.to_string()));
        }
        Ok(Self { pids })
    }

    /// PIDs in command line order.
    pub fn as_slice(&self) -> &[u16] {
        &self.pids
    }

    /// Iterates the PIDs in command line order.
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.pids.iter().copied()
    }

    /// Number of PIDs, duplicates included.
    pub fn len(&self) -> usize {
        self.pids.len()
    }

    /// True if [`PID_ALL`] was requested.
    pub fn is_whole_stream(&self) -> bool {
        self.pids.contains(&PID_ALL)
    }

    /// Whether a packet carrying `pid` should be let through.
    pub fn matches(&self, pid: u16) -> bool {
        self.is_whole_stream() || self.pids.contains(&pid)
    }
}

fn parse_pid(token: &str) -> Result<u16> {
    let value = parse_int_auto(token).map_err(|e| CaptureError::InvalidPid {
        token: token.to_string(),
        reason: e.to_string(),
    })?;
    // negative values wrap to huge unsigned ones and fail the same check
    if value < 0 || value > MAX_PID {
        return Err(out_of_range(token));
    }
    Ok(value as u16)
}

fn out_of_range(token: &str) -> CaptureError {
    CaptureError::InvalidPid {
        token: token.to_string(),
        reason: format!("not in range [0, {}]", MAX_PID),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_parse_mixed_bases() {
        let set = PidSet::parse(["0", "0x100", "0401", "18", "18"]).unwrap();
        assert_eq!(set.as_slice(), &[0, 256, 257, 18, 18]);
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_upper_boundary() {
        assert!(PidSet::parse(["8192"]).is_ok());
        assert!(PidSet::parse(["0x1fff"]).is_ok());
        match PidSet::parse(["8193"]) {
            Err(CaptureError::InvalidPid { token, reason }) => {
                assert_eq!(token, "8193");
                assert!(reason.contains("[0, 8192]"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_negative_rejected() {
        assert!(matches!(
            PidSet::parse(["-1"]),
            Err(CaptureError::InvalidPid { .. })
        ));
    }

    #[test]
    fn test_parse_error_names_token() {
        let err = PidSet::parse(["256", "video"]).unwrap_err();
        assert!(err.to_string().starts_with("video isn't a valid PID"));
    }

    #[test]
    fn test_empty_is_usage_error() {
        let none: [&str; 0] = [];
        assert!(matches!(PidSet::parse(none), Err(CaptureError::Usage(_))));
    }

    #[test]
    fn test_matches() {
        let set = PidSet::parse(["17", "256"]).unwrap();
        assert!(set.matches(256));
        assert!(!set.matches(257));
        let all = PidSet::parse(["8192"]).unwrap();
        assert!(all.is_whole_stream());
        assert!(all.matches(0x1fff));
    }

    #[quickcheck]
    fn prop_in_range_preserves_order(values: Vec<u16>) -> bool {
        let values: Vec<u16> = values.into_iter().map(|v| v % 8193).collect();
        if values.is_empty() {
            return true;
        }
        let tokens: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        matches!(PidSet::parse(&tokens), Ok(set) if set.as_slice() == values.as_slice())
    }

    #[quickcheck]
    fn prop_above_range_names_token(value: u32) -> bool {
        let value = value as i64 + MAX_PID + 1;
        let token = format!("{:#x}", value);
        match PidSet::parse(["1", token.as_str()]) {
            Err(CaptureError::InvalidPid { token: t, .. }) => t == token,
            _ => false,
        }
    }

    #[quickcheck]
    fn prop_non_numeric_names_token(word: String) -> bool {
        let token = format!("pid{}", word);
        match PidSet::parse([token.as_str()]) {
            Err(CaptureError::InvalidPid { token: t, .. }) => t == token,
            _ => false,
        }
    }
}
