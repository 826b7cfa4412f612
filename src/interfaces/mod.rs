//! Boundary adapters. The only one shipped is the CSV batch driver.

pub mod csv;
