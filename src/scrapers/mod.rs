pub mod basketball_reference;

pub use basketball_reference::BasketballReferenceScraper;
