pub mod controller;
pub mod domain;
pub mod inputter;
pub mod model;
pub mod records;
pub mod render;
pub mod source;
pub mod ui;
pub mod view;
