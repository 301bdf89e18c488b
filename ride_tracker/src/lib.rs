pub mod configuration;
pub mod polling;
pub mod replay;
pub mod report;
pub mod serial;
pub mod session;
