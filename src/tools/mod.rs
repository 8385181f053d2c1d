pub mod exchange;

pub use exchange::{ExchangeRateClient, RateQuote, RateSource};
