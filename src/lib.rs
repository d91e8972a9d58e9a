pub mod app;
pub mod beeper;
pub mod channels;
pub mod keypad;
pub mod timeout;
pub mod timing;
