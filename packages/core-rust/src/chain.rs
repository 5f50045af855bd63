//! Request id chains and their header wire format.
//!
//! A chain is the lineage of a request across service hops, oldest first.
//! On the wire it is the ids joined by single commas with no whitespace:
//!
//! ```text
//! 11111111-1111-1111-1111-111111111111,22222222-2222-2222-2222-222222222222
//! ```
//!
//! Parsing is case-insensitive; serialization is always lowercase. Input that
//! does not match the format in full is rejected as a whole, since the header
//! may come from outside the trust boundary.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::id::RequestId;

/// Separator between ids in the serialized form.
const SEPARATOR: char = ',';

/// One or more canonical UUIDs separated by commas, anchored at both ends.
static CHAIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    const UUID: &str = "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}";
    Regex::new(&format!(r"(?i)\A{UUID}(?:,{UUID})*\z")).expect("chain pattern is valid")
});

/// Reasons a header value was not accepted as a chain.
#[derive(Debug, thiserror::Error)]
pub enum ChainParseError {
    #[error("request id chain is empty")]
    Empty,
    #[error("request id chain does not match the expected format")]
    Malformed,
    /// The value matched the pattern but a segment still failed to parse.
    /// This indicates a disagreement between the pattern and the UUID parser.
    #[error("segment {segment:?} matched the chain pattern but is not a valid request id")]
    InvalidSegment {
        segment: String,
        #[source]
        source: uuid::Error,
    },
}

/// Ordered sequence of request ids, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestIdChain(Vec<RequestId>);

impl RequestIdChain {
    /// Creates an empty chain.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Parses an inbound header value.
    ///
    /// Returns `None` when the value is absent, empty, or malformed. Callers
    /// treat all three the same way: there is no prior chain.
    #[must_use]
    pub fn parse(header_value: Option<&str>) -> Option<Self> {
        match Self::try_parse(header_value?) {
            Ok(chain) => Some(chain),
            Err(ChainParseError::Empty | ChainParseError::Malformed) => None,
            Err(err @ ChainParseError::InvalidSegment { .. }) => Self::pattern_mismatch(&err),
        }
    }

    /// A segment passed the pattern but not the UUID parser: the two
    /// disagree. Fails loudly in debug builds, degrades to "no prior chain"
    /// otherwise.
    fn pattern_mismatch(err: &ChainParseError) -> Option<Self> {
        error!(error = %err, "request id chain parser rejected a pattern-valid value");
        debug_assert!(false, "chain pattern accepted an unparsable value: {err}");
        None
    }

    /// Parses a header value, reporting why it was rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ChainParseError::Empty`] for `""`, [`ChainParseError::Malformed`]
    /// when the value does not match the chain format in full, and
    /// [`ChainParseError::InvalidSegment`] if a matched segment cannot be parsed.
    pub fn try_parse(value: &str) -> Result<Self, ChainParseError> {
        if value.is_empty() {
            return Err(ChainParseError::Empty);
        }
        if !CHAIN_PATTERN.is_match(value) {
            return Err(ChainParseError::Malformed);
        }

        value
            .split(SEPARATOR)
            .map(|segment| {
                segment
                    .parse::<RequestId>()
                    .map_err(|source| ChainParseError::InvalidSegment {
                        segment: segment.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Serializes the chain into its header form.
    #[must_use]
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    /// Appends the newest id.
    pub fn push(&mut self, id: RequestId) {
        self.0.push(id);
    }

    /// Returns this chain with `id` appended.
    #[must_use]
    pub fn extended(mut self, id: RequestId) -> Self {
        self.push(id);
        self
    }

    /// Drops the oldest ids so that at most `max_len` remain.
    ///
    /// A `max_len` of zero is treated as one: the newest id is never dropped.
    pub fn retain_newest(&mut self, max_len: usize) {
        let max_len = max_len.max(1);
        if self.0.len() > max_len {
            let excess = self.0.len() - max_len;
            self.0.drain(..excess);
        }
    }

    /// The newest id, i.e. the one belonging to the current hop.
    #[must_use]
    pub fn last(&self) -> Option<RequestId> {
        self.0.last().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, RequestId> {
        self.0.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[RequestId] {
        &self.0
    }
}

impl From<Vec<RequestId>> for RequestIdChain {
    fn from(ids: Vec<RequestId>) -> Self {
        Self(ids)
    }
}

impl FromIterator<RequestId> for RequestIdChain {
    fn from_iter<I: IntoIterator<Item = RequestId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for RequestIdChain {
    type Item = RequestId;
    type IntoIter = std::vec::IntoIter<RequestId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a RequestIdChain {
    type Item = &'a RequestId;
    type IntoIter = std::slice::Iter<'a, RequestId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for RequestIdChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            fmt::Display::fmt(id, f)?;
        }
        Ok(())
    }
}

impl FromStr for RequestIdChain {
    type Err = ChainParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse(s)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const ID_1: &str = "11111111-1111-1111-1111-111111111111";
    const ID_2: &str = "22222222-2222-2222-2222-222222222222";

    fn id(s: &str) -> RequestId {
        s.parse().unwrap()
    }

    // ---- parse ----

    #[test]
    fn parse_absent_is_none() {
        assert_eq!(RequestIdChain::parse(None), None);
    }

    #[test]
    fn parse_empty_is_none() {
        assert_eq!(RequestIdChain::parse(Some("")), None);
    }

    #[test]
    fn parse_garbage_is_none() {
        assert_eq!(RequestIdChain::parse(Some("not-a-uuid")), None);
        assert_eq!(RequestIdChain::parse(Some("garbage-value")), None);
    }

    #[test]
    fn parse_single_id() {
        let chain = RequestIdChain::parse(Some(ID_1)).unwrap();
        assert_eq!(chain.as_slice(), &[id(ID_1)]);
    }

    #[test]
    fn parse_preserves_order() {
        let chain = RequestIdChain::parse(Some(&format!("{ID_2},{ID_1}"))).unwrap();
        assert_eq!(chain.as_slice(), &[id(ID_2), id(ID_1)]);
        assert_eq!(chain.last(), Some(id(ID_1)));
    }

    #[test]
    fn parse_is_case_insensitive() {
        let chain = RequestIdChain::parse(Some("ABCDEF12-3456-7890-ABCD-EF1234567890")).unwrap();
        assert_eq!(chain.serialize(), "abcdef12-3456-7890-abcd-ef1234567890");
    }

    #[test]
    fn parse_rejects_partial_matches() {
        let cases = [
            format!("{ID_1},"),
            format!(",{ID_1}"),
            format!("{ID_1},,{ID_2}"),
            format!("{ID_1}, {ID_2}"),
            format!(" {ID_1}"),
            format!("{ID_1} "),
            format!("{ID_1}\n"),
            format!("{ID_1}x"),
            format!("{{{ID_1}}}"),
            format!("urn:uuid:{ID_1}"),
            "1111111111111111111111111111111111".to_string(),
        ];
        for case in &cases {
            assert_eq!(RequestIdChain::parse(Some(case)), None, "accepted {case:?}");
        }
    }

    #[test]
    fn try_parse_reports_reason() {
        assert!(matches!(RequestIdChain::try_parse(""), Err(ChainParseError::Empty)));
        assert!(matches!(
            RequestIdChain::try_parse("garbage-value"),
            Err(ChainParseError::Malformed)
        ));
        assert!(RequestIdChain::try_parse(ID_1).is_ok());
    }

    fn invalid_segment() -> ChainParseError {
        let source = "not-a-uuid".parse::<uuid::Uuid>().unwrap_err();
        ChainParseError::InvalidSegment {
            segment: "not-a-uuid".to_string(),
            source,
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "chain pattern accepted an unparsable value")]
    fn pattern_mismatch_panics_in_debug() {
        let _ = RequestIdChain::pattern_mismatch(&invalid_segment());
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn pattern_mismatch_degrades_in_release() {
        assert_eq!(RequestIdChain::pattern_mismatch(&invalid_segment()), None);
    }

    #[test]
    fn from_str_matches_try_parse() {
        let chain: RequestIdChain = format!("{ID_1},{ID_2}").parse().unwrap();
        assert_eq!(chain.len(), 2);
    }

    // ---- serialize ----

    #[test]
    fn serialize_joins_with_commas() {
        let chain = RequestIdChain::from(vec![id(ID_1), id(ID_2)]);
        assert_eq!(chain.serialize(), format!("{ID_1},{ID_2}"));
    }

    #[test]
    fn serialize_empty_is_empty_string() {
        assert_eq!(RequestIdChain::new().serialize(), "");
    }

    #[test]
    fn serialize_is_lowercase() {
        let chain = RequestIdChain::parse(Some("AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE,FFFFFFFF-0000-0000-0000-000000000000")).unwrap();
        let out = chain.serialize();
        assert_eq!(out, out.to_lowercase());
    }

    #[test]
    fn serde_uses_list_of_strings() {
        let chain = RequestIdChain::from(vec![id(ID_1), id(ID_2)]);
        let json = serde_json::to_value(&chain).unwrap();
        assert_eq!(json, serde_json::json!([ID_1, ID_2]));
    }

    // ---- building ----

    #[test]
    fn extended_appends_newest_last() {
        let chain = RequestIdChain::parse(Some(ID_1)).unwrap().extended(id(ID_2));
        assert_eq!(chain.serialize(), format!("{ID_1},{ID_2}"));
        assert_eq!(chain.last(), Some(id(ID_2)));
    }

    #[test]
    fn retain_newest_drops_oldest() {
        let mut chain: RequestIdChain = (1..=5u128).map(RequestId::from_u128).collect();
        chain.retain_newest(3);
        let expected: Vec<_> = (3..=5u128).map(RequestId::from_u128).collect();
        assert_eq!(chain.as_slice(), expected.as_slice());
    }

    #[test]
    fn retain_newest_zero_keeps_last() {
        let mut chain: RequestIdChain = (1..=3u128).map(RequestId::from_u128).collect();
        chain.retain_newest(0);
        assert_eq!(chain.as_slice(), &[RequestId::from_u128(3)]);
    }

    #[test]
    fn retain_newest_noop_when_short() {
        let mut chain: RequestIdChain = (1..=2u128).map(RequestId::from_u128).collect();
        chain.retain_newest(10);
        assert_eq!(chain.len(), 2);
    }

    proptest! {
        #[test]
        fn serialize_then_parse_is_identity(raw in prop::collection::vec(any::<u128>(), 1..16)) {
            let chain: RequestIdChain = raw.into_iter().map(RequestId::from_u128).collect();
            let parsed = RequestIdChain::parse(Some(&chain.serialize()));
            prop_assert_eq!(parsed, Some(chain));
        }

        #[test]
        fn uppercase_input_parses_to_same_chain(raw in prop::collection::vec(any::<u128>(), 1..8)) {
            let chain: RequestIdChain = raw.into_iter().map(RequestId::from_u128).collect();
            let parsed = RequestIdChain::parse(Some(&chain.serialize().to_uppercase()));
            prop_assert_eq!(parsed, Some(chain));
        }
    }
}
