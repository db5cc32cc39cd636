//! Concrete sensor drivers, grouped by device class per spec.md §4.5.
//! Register-level protocols are not spec-prescribed (only the checksum
//! protocols — CRC-8/CRC-16 — are bit-exact); each driver here is a
//! realistic, internally-consistent implementation of its class.

pub mod humidity;
pub mod light;
pub mod pressure;
pub mod temperature;
