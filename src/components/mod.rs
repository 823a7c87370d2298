pub mod bracket;
pub mod bracket_view;
pub mod export;
pub mod theme;
