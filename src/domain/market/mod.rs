pub mod bar;
pub mod interval;
pub mod session;

pub use bar::{Bar, IndicatorBar};
pub use interval::BarInterval;
pub use session::TradingSession;
