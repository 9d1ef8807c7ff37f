pub mod category_tabs;
pub mod popup;
pub mod progress_bar;
pub mod quiz_sidebar;
pub mod text_area;
