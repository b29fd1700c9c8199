pub mod win;

pub use win::WinNotice;
