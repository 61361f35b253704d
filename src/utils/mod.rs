// src/utils/mod.rs

pub mod html;
pub mod import;
pub mod jwt;
