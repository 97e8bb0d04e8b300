pub mod clear;
pub mod download;
pub mod health;
pub mod index;
pub mod split;
