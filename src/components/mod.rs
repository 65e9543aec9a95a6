pub mod popup;
pub mod preview;
pub mod status_bar;
pub mod tree;
