//! Data structures representing ETI and FIC components.

pub mod fig;
pub mod frame;
