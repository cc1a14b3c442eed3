//! Authentication flow: ports, redirect validation, strategy policy and
//! the orchestrating service.

pub mod ports;
pub mod redirect;
pub mod service;
pub mod strategy;
