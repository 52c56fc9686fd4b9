pub mod sweep;

pub use sweep::OverdueSweep;
