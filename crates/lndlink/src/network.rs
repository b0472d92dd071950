//! Bitcoin networks an lnd node can run on, and their chain parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LndError;

/// The network an lnd node is expected to operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Bitcoin mainnet.
    Mainnet,
    /// Bitcoin testnet3.
    Testnet,
    /// Local regression test network.
    Regtest,
    /// btcd simulation network.
    Simnet,
}

impl Network {
    /// All supported networks.
    pub const ALL: [Self; 4] = [Self::Mainnet, Self::Testnet, Self::Regtest, Self::Simnet];

    /// The identifier lnd reports for this network.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Regtest => "regtest",
            Self::Simnet => "simnet",
        }
    }

    /// Chain parameters for this network.
    #[must_use]
    pub const fn chain_params(self) -> ChainParams {
        match self {
            Self::Mainnet => ChainParams {
                network: self,
                name: "mainnet",
                bech32_hrp: "bc",
                default_port: 8333,
            },
            Self::Testnet => ChainParams {
                network: self,
                name: "testnet3",
                bech32_hrp: "tb",
                default_port: 18333,
            },
            Self::Regtest => ChainParams {
                network: self,
                name: "regtest",
                bech32_hrp: "bcrt",
                default_port: 18444,
            },
            Self::Simnet => ChainParams {
                network: self,
                name: "simnet",
                bech32_hrp: "sb",
                default_port: 18555,
            },
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = LndError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| LndError::Configuration(format!("unsupported network: {s}")))
    }
}

/// Static parameters of the chain backing a [`Network`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainParams {
    /// Network these parameters belong to.
    pub network: Network,
    /// Chain name as used by the bitcoin reference client.
    pub name: &'static str,
    /// Human-readable part of segwit addresses.
    pub bech32_hrp: &'static str,
    /// Default peer-to-peer port.
    pub default_port: u16,
}
