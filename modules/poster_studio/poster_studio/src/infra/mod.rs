pub mod memory;
pub mod rest;
pub mod storage;
pub mod unavailable;
