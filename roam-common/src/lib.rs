#![cfg(not(doctest))]

#[macro_use]
extern crate diesel;

pub mod conf;
pub mod db;
pub mod email;
pub mod html;
pub mod identity;
pub mod lifecycle;
pub mod models;
pub mod request_io;
pub mod schema;
pub mod threadrand;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
