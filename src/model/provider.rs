// Reference data providers and what each of them can tell us
//
// Providers differ in richness: Club Log carries full history but no ITU
// zones, the CTY list carries ITU zones and UTC offsets but no history.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The external reference file format a data set was loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Club Log `cty.xml`
    Clublog,
    /// Country file in CSV form with the pattern mini-language
    CtyCsv,
    /// Pipe-delimited, depth-nested prefix list with wildcard masks
    PrefixList,
}

/// Which optional fields a provider populates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    pub itu_zone: bool,
    pub timezone: bool,
    /// Validity windows are meaningful (records for deleted or past operations)
    pub history: bool,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Clublog, Provider::CtyCsv, Provider::PrefixList];

    pub fn capabilities(&self) -> ProviderCapabilities {
        match self {
            Provider::Clublog => ProviderCapabilities {
                itu_zone: false,
                timezone: false,
                history: true,
            },
            Provider::CtyCsv => ProviderCapabilities {
                itu_zone: true,
                timezone: true,
                history: false,
            },
            Provider::PrefixList => ProviderCapabilities {
                itu_zone: true,
                timezone: true,
                history: true,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Clublog => "clublog",
            Provider::CtyCsv => "cty_csv",
            Provider::PrefixList => "prefix_list",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "clublog" | "cty_xml" => Ok(Provider::Clublog),
            "cty_csv" | "cty" => Ok(Provider::CtyCsv),
            "prefix_list" | "prefixlist" => Ok(Provider::PrefixList),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_round_trips_through_str() {
        for provider in Provider::ALL {
            assert_eq!(provider.as_str().parse::<Provider>(), Ok(provider));
        }
        assert_eq!("Cty-CSV".parse::<Provider>(), Ok(Provider::CtyCsv));
        assert!("adif".parse::<Provider>().is_err());
    }

    #[test]
    fn test_capabilities_differ_by_provider() {
        assert!(!Provider::Clublog.capabilities().itu_zone);
        assert!(Provider::Clublog.capabilities().history);
        assert!(!Provider::CtyCsv.capabilities().history);
        assert!(Provider::PrefixList.capabilities().timezone);
    }
}
