pub mod cards;
pub mod sets;
pub mod show;
pub mod study;
