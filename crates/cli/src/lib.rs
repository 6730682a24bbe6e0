//! The siltkv front end: the transport-agnostic request shim in
//! [`handlers`], consumed by the `siltkv` REPL binary and by any other
//! binding a host wants to put in front of the engine.

pub mod handlers;
