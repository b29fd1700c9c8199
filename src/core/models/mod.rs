pub mod ortb;
