//! Provider registry that maps a configured [`ProviderId`] to a concrete provider.
use market_data_ingestor::providers::{DataProvider, ProviderInitError, yahoo_chart::YahooChartProvider};

use crate::config::ProviderId;

/// Build and return a boxed data provider corresponding to the supplied ProviderId.
pub fn build_provider(id: ProviderId) -> Result<Box<dyn DataProvider>, ProviderInitError> {
    match id {
        ProviderId::Yahoo => {
            let p = YahooChartProvider::new()?;
            Ok(Box::new(p))
        }
    }
}
