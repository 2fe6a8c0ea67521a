//! Market metadata inbound interface (spec §6 #1).
//!
//! Real deployments pull this from an exchange's REST `exchangeInfo`
//! endpoint or a configuration service — out of scope here (spec §1
//! Non-goals exclude REST fallback polling as a core concern). This
//! module defines the seam a real provider plugs into, plus a static
//! provider for tests and single-process demos, the same role the
//! teacher's `models::Config` fallback defaults play for its own
//! external inputs.

use anyhow::Result;

use crate::models::MarketDescriptor;

pub trait MetadataProvider: Send + Sync {
    fn markets(&self) -> Result<Vec<MarketDescriptor>>;
}

pub struct StaticMetadataProvider {
    markets: Vec<MarketDescriptor>,
}

impl StaticMetadataProvider {
    pub fn new(markets: Vec<MarketDescriptor>) -> Self {
        Self { markets }
    }
}

impl MetadataProvider for StaticMetadataProvider {
    fn markets(&self) -> Result<Vec<MarketDescriptor>> {
        Ok(self.markets.clone())
    }
}
