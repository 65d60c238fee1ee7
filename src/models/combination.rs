use serde::{Deserialize, Serialize};
use std::fmt;

/// How several boolean signals combine: all must hold, or any may.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CombinationMode {
    #[default]
    And,
    Or,
}

impl CombinationMode {
    /// Three-valued combination: `None` is "unknown".
    ///
    /// AND is false as soon as one input is false, OR is true as soon as one is true;
    /// otherwise any unknown input makes the result unknown. An empty input yields the
    /// identity (true for AND, false for OR).
    pub fn combine<I>(&self, values: I) -> Option<bool>
    where
        I: IntoIterator<Item = Option<bool>>,
    {
        let decisive = matches!(self, CombinationMode::Or);
        let mut unknown = false;
        for value in values {
            match value {
                Some(v) if v == decisive => return Some(decisive),
                Some(_) => {}
                None => unknown = true,
            }
        }
        if unknown {
            None
        } else {
            Some(!decisive)
        }
    }
}

impl fmt::Display for CombinationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombinationMode::And => f.write_str("AND"),
            CombinationMode::Or => f.write_str("OR"),
        }
    }
}
