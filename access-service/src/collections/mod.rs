//! Entity collections: tier-filtered reads over platform entities.
//!
//! Every collection implements the same contract; what varies is the
//! row type, the declared columns, and how far a scoped operator's
//! reach extends for it.

mod collection;
mod columns;
mod dns_zones;
mod server_farms;
mod servers;
mod site_binds;

pub use collection::{EntityCollection, ScopedRule, Viewer};
pub use columns::{
    find as find_column, primary as primary_column, ColumnRole, ColumnSpec, ColumnValue,
};
pub use dns_zones::{DnsZoneCollection, DNS_ZONE_COLUMNS};
pub use server_farms::{ServerFarmCollection, SERVER_FARM_COLUMNS};
pub use servers::{ServerCollection, SERVER_COLUMNS};
pub use site_binds::{SiteBindCollection, SITE_BIND_COLUMNS};
