mod request;

pub use request::{CollateralType, PositionChangeRequest};

/// ID of the protocol account owning the position.
pub type AccountId = u128;

/// ID of the pool the collateral is delegated to.
pub type PoolId = u128;
