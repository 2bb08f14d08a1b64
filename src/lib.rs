pub mod authenticator;
pub mod browser;
pub mod config;
pub mod delay_manager;
pub mod error;
pub mod extractor;
pub mod logger;
pub mod navigator;
pub mod result_writer;

// Exporting types for convenience
pub use authenticator::{Session, SessionAuthenticator};
pub use browser::{Browser, Element, HtmlBrowser, Locator, ReqwestTransport};
pub use config::{Config, ScreenTarget, StrategyKind};
pub use error::ScreenerError;
pub use extractor::{build_strategy, CompanyRef, TickerExtractionStrategy, TickerRecord};
pub use navigator::{PaginatedScreenNavigator, ScreenReport};
pub use result_writer::ResultWriter;
