pub mod account;
pub mod administrator;
pub mod dns_zone;
pub mod ids;
pub mod login_host;
pub mod operator_grant;
pub mod server;
pub mod site;

pub use account::Account;
pub use administrator::{Administrator, AdministratorResponse};
pub use dns_zone::DnsZone;
pub use ids::{kind, AccountId, EntityKind, Locale, ServerId, UserId};
pub use login_host::LoginHost;
pub use operator_grant::OperatorGrant;
pub use server::{AccountHost, Server, ServerFarm, ServerReplication};
pub use site::{Site, SiteBind};
