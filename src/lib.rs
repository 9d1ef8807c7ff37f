// Library target shared by the binary, the integration tests in tests/ and the
// criterion benches. main.rs imports everything through `grammaticus::*`.

pub mod app;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod event;
pub mod session;
pub mod store;
pub mod ui;
