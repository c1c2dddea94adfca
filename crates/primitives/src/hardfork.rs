use std::{fmt, str::FromStr};

/// The name of an Ethereum hardfork.
///
/// The ordering matches activation order on mainnet, so forks can be compared with `<`/`>=` to
/// gate rule changes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub enum Hardfork {
    /// Frontier.
    Frontier,
    /// Homestead.
    Homestead,
    /// The DAO fork.
    Dao,
    /// Tangerine whistle (EIP-150 gas repricing, 63/64 call forwarding).
    Tangerine,
    /// Spurious dragon (EIP-161 empty account semantics).
    SpuriousDragon,
    /// Byzantium.
    Byzantium,
    /// Constantinople (EIP-1283 net gas metering).
    Constantinople,
    /// Petersburg (removes EIP-1283 again).
    Petersburg,
    /// Istanbul (EIP-2200 net gas metering).
    Istanbul,
    /// Muir glacier.
    MuirGlacier,
    /// Berlin (EIP-2929 cold/warm access, EIP-2930 access lists).
    Berlin,
    /// London (EIP-1559 fee market).
    London,
    /// Arrow glacier.
    ArrowGlacier,
    /// Gray glacier.
    GrayGlacier,
    /// Paris, the merge.
    Paris,
    /// Shanghai.
    Shanghai,
}

impl Hardfork {
    /// Whether the EIP-150 63/64 call gas forwarding rule is active.
    pub fn is_tangerine_active(&self) -> bool {
        *self >= Hardfork::Tangerine
    }

    /// Whether EIP-2929 cold/warm account and storage access pricing is active.
    pub fn is_berlin_active(&self) -> bool {
        *self >= Hardfork::Berlin
    }
}

impl FromStr for Hardfork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        let hardfork = match s.as_str() {
            "frontier" => Hardfork::Frontier,
            "homestead" => Hardfork::Homestead,
            "dao" => Hardfork::Dao,
            "tangerine" => Hardfork::Tangerine,
            "spuriousdragon" => Hardfork::SpuriousDragon,
            "byzantium" => Hardfork::Byzantium,
            "constantinople" => Hardfork::Constantinople,
            "petersburg" => Hardfork::Petersburg,
            "istanbul" => Hardfork::Istanbul,
            "muirglacier" => Hardfork::MuirGlacier,
            "berlin" => Hardfork::Berlin,
            "london" => Hardfork::London,
            "arrowglacier" => Hardfork::ArrowGlacier,
            "grayglacier" => Hardfork::GrayGlacier,
            "paris" | "merge" => Hardfork::Paris,
            "shanghai" => Hardfork::Shanghai,
            _ => return Err(format!("Unknown hardfork {s}")),
        };
        Ok(hardfork)
    }
}

impl fmt::Display for Hardfork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
