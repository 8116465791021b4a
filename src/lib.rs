// Library root
// -----------
// The binary (`main.rs`) only parses flags, sets up logging and calls
// `actions::run`. Everything else lives here so it can be tested.
//
// Module responsibilities:
// - `cli`: flag definitions and resolving them into a single `Action`.
// - `config`: the JSON settings file (address, password, session cookie).
// - `api`: HTTP calls to the go-send server, with one re-login on demand.
// - `actions`: runs an `Action` and reports the result.
// - `error`: the library error type.
pub mod actions;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
