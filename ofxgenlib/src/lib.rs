//! ofxgenlib — конвертация истории брокерского счёта (CSV) в OFX-выписку по инвестициям.

pub mod assemble;
pub mod classify;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod schema;
pub mod securities;
pub mod traits;

pub mod formats {
    pub mod csv;
    pub mod header;
    pub mod ofx;
}
