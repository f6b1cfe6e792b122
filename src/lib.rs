//! epanet-view: load, simulate, inspect and plot EPANET water distribution networks

pub mod constants;
pub mod error;
pub mod input;
pub mod model;
pub mod output;
pub mod plot;
pub mod quality;
pub mod solver;
pub mod statistics;
pub mod wrapper;

pub use error::{InputError, WrapperError};
pub use wrapper::{ElementRef, EpanetWrapper};
