pub mod app;
pub mod package;
pub mod registry;
pub mod token;

pub use app::{App, CountryPrice, PricePoint};
pub use package::{BackendPackage, BackendPackageData};
pub use registry::{epoch_zero, AppRegistryRow};
pub use token::{AccessTokenRecord, AdminTokenRecord, RefreshTokenRecord, RefreshedAccessToken, TokenInfo, TokenPair};
