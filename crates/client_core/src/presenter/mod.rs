//! Presenters project data-access feeds into the signals a screen binds to.

pub mod details;
pub mod main_list;
