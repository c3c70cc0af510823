use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Anything that can quote a current price for a symbol.
///
/// This is the only piece of a market data feed the ledger depends on. A
/// source that has no quote for a symbol returns `None`; the ledger leaves
/// that holding out of valuations rather than failing.
pub trait PriceSource {
    fn price(&self, symbol: &str) -> Option<Decimal>;
}

impl<S: BuildHasher> PriceSource for HashMap<String, Decimal, S> {
    fn price(&self, symbol: &str) -> Option<Decimal> {
        self.get(symbol).copied()
    }
}

impl PriceSource for BTreeMap<String, Decimal> {
    fn price(&self, symbol: &str) -> Option<Decimal> {
        self.get(symbol).copied()
    }
}

impl<P: PriceSource + ?Sized> PriceSource for &P {
    fn price(&self, symbol: &str) -> Option<Decimal> {
        (**self).price(symbol)
    }
}
