use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Alliance {
    StarAlliance,
    Oneworld,
    SkyTeam,
}

impl Display for Alliance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::StarAlliance => "Star Alliance",
            Self::Oneworld => "oneworld",
            Self::SkyTeam => "SkyTeam",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AirlineTier {
    FullService,
    MidTier,
    LowCost,
}

/// Carrier tier and alliance membership, keyed by upper-case IATA code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AirlineDirectory {
    #[serde(default = "default_tiers")]
    pub tiers: BTreeMap<String, AirlineTier>,
    #[serde(default = "default_alliances")]
    pub alliances: BTreeMap<String, Alliance>,
}

impl AirlineDirectory {
    pub fn tier(&self, code: &str) -> Option<AirlineTier> {
        self.tiers.get(&code.to_ascii_uppercase()).copied()
    }

    pub fn alliance(&self, code: &str) -> Option<Alliance> {
        self.alliances.get(&code.to_ascii_uppercase()).copied()
    }

    pub fn share_alliance(&self, a: &str, b: &str) -> bool {
        match (self.alliance(a), self.alliance(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }
}

impl Default for AirlineDirectory {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
            alliances: default_alliances(),
        }
    }
}

fn default_tiers() -> BTreeMap<String, AirlineTier> {
    let full_service = [
        "UA", "AA", "DL", "AC", "LH", "BA", "AF", "KL", "LX", "OS", "NH", "JL", "SQ", "CX", "QF",
        "QR", "EK", "TK", "IB", "AY", "KE", "VS", "NZ", "SK",
    ];
    let mid_tier = ["AS", "B6", "HA", "WS", "EI", "AM"];
    let low_cost = ["WN", "NK", "F9", "G4", "SY", "FR", "U2", "W6", "VY"];

    let mut out = BTreeMap::new();
    for code in full_service {
        out.insert(code.to_string(), AirlineTier::FullService);
    }
    for code in mid_tier {
        out.insert(code.to_string(), AirlineTier::MidTier);
    }
    for code in low_cost {
        out.insert(code.to_string(), AirlineTier::LowCost);
    }
    out
}

fn default_alliances() -> BTreeMap<String, Alliance> {
    let star = [
        "UA", "AC", "LH", "LX", "OS", "NH", "SQ", "TK", "NZ", "SK", "TP", "ET", "OZ",
    ];
    let oneworld = ["AA", "BA", "QF", "CX", "JL", "IB", "AY", "QR", "AS", "RJ"];
    let skyteam = ["DL", "AF", "KL", "KE", "AM", "VS", "AZ", "MU", "SV"];

    let mut out = BTreeMap::new();
    for code in star {
        out.insert(code.to_string(), Alliance::StarAlliance);
    }
    for code in oneworld {
        out.insert(code.to_string(), Alliance::Oneworld);
    }
    for code in skyteam {
        out.insert(code.to_string(), Alliance::SkyTeam);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_case_insensitive() {
        let directory = AirlineDirectory::default();
        assert_eq!(directory.alliance("ua"), Some(Alliance::StarAlliance));
        assert_eq!(directory.tier("nk"), Some(AirlineTier::LowCost));
    }

    #[test]
    fn partners_share_alliance_but_unknowns_do_not() {
        let directory = AirlineDirectory::default();
        assert!(directory.share_alliance("UA", "AC"));
        assert!(!directory.share_alliance("UA", "DL"));
        assert!(!directory.share_alliance("B6", "B6"));
    }
}
