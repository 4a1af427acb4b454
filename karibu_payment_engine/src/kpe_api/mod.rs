pub mod fulfillment_api;
pub mod wallet_api;
