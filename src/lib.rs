pub mod auth;
pub mod commands;
pub mod config_patch;
pub mod doctor;
pub mod error;
pub mod fs_utils;
pub mod paths;
pub mod profiles;
pub mod snapshot;
pub mod switch;
pub mod ui;

#[cfg(test)]
pub mod test_utils;
