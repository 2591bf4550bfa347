pub mod clock;
pub mod us_market;

pub use clock::{Clock, SystemClock};
